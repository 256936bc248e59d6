use time::OffsetDateTime;

use crate::validate::{is_iso8601, Checker, Mode, Violation};
use crate::wines::dto::WinePayload;
use crate::wines::repo::WineStyle;

// Character count, not byte length, so accented names get the full cap.
fn len(value: &Option<String>) -> usize {
    value.as_deref().unwrap_or_default().trim().chars().count()
}

/// The wine rule table, evaluated field by field with every violation
/// collected. On create all required fields must be present; on update a
/// supplied field (or sub-document) is held to the create-time constraints.
pub fn validate_wine(payload: &WinePayload, mode: Mode) -> Result<(), Vec<Violation>> {
    let mut c = Checker::new(mode);

    if c.required(
        "name",
        payload.name.is_some(),
        "Wine name is required and must be less than 200 characters",
    ) {
        let n = len(&payload.name);
        c.check(
            "name",
            n >= 1 && n <= 200,
            "Wine name is required and must be less than 200 characters",
        );
    }

    if c.required(
        "producer",
        payload.producer.is_some(),
        "Producer is required and must be less than 200 characters",
    ) {
        let n = len(&payload.producer);
        c.check(
            "producer",
            n >= 1 && n <= 200,
            "Producer is required and must be less than 200 characters",
        );
    }

    if c.required(
        "vintage",
        payload.vintage.is_some(),
        "Vintage must be a valid year between 1800 and current year",
    ) {
        let vintage = payload.vintage.unwrap_or_default();
        let current_year = OffsetDateTime::now_utc().year();
        c.check(
            "vintage",
            vintage >= 1800 && vintage <= current_year,
            "Vintage must be a valid year between 1800 and current year",
        );
    }

    c.required("region", payload.region.is_some(), "Region is required");
    if let Some(region) = &payload.region {
        c.check("region.country", len(&region.country) >= 1, "Country is required");
        c.check("region.area", len(&region.area) >= 1, "Area is required");
    }

    if c.required(
        "grapes",
        payload.grapes.is_some(),
        "At least one grape variety is required",
    ) {
        let grapes = payload.grapes.as_deref().unwrap_or_default();
        c.check(
            "grapes",
            !grapes.is_empty(),
            "At least one grape variety is required",
        );
        c.check(
            "grapes",
            grapes.iter().all(|g| !g.trim().is_empty()),
            "Grape variety cannot be empty",
        );
    }

    if c.required(
        "style",
        payload.style.is_some(),
        "Style must be one of: red, white, rosé, sparkling, dessert",
    ) {
        let style = payload.style.as_deref().unwrap_or_default();
        c.check(
            "style",
            WineStyle::parse(style).is_some(),
            "Style must be one of: red, white, rosé, sparkling, dessert",
        );
    }

    if c.required(
        "alcohol",
        payload.alcohol.is_some(),
        "Alcohol content must be between 0 and 50%",
    ) {
        let alcohol = payload.alcohol.unwrap_or_default();
        c.check(
            "alcohol",
            (0.0..=50.0).contains(&alcohol),
            "Alcohol content must be between 0 and 50%",
        );
    }

    c.required(
        "tastingNotes",
        payload.tasting_notes.is_some(),
        "Tasting notes are required",
    );
    if let Some(notes) = &payload.tasting_notes {
        c.check(
            "tastingNotes.aroma",
            notes.aroma.as_deref().is_some_and(|a| !a.is_empty()),
            "At least one aroma note is required",
        );
        c.check(
            "tastingNotes.taste",
            notes.taste.as_deref().is_some_and(|t| !t.is_empty()),
            "At least one taste note is required",
        );
    }

    // Ratings are optional everywhere; supplied scores must be in range.
    if let Some(ratings) = &payload.ratings {
        if let Some(personal) = ratings.personal {
            c.check(
                "ratings.personal",
                (1..=100).contains(&personal),
                "Personal rating must be between 1 and 100",
            );
        }
        if let Some(score) = ratings.critic.as_ref().and_then(|cr| cr.score) {
            c.check(
                "ratings.critic.score",
                (1..=100).contains(&score),
                "Critic score must be between 1 and 100",
            );
        }
    }

    c.required(
        "cellar",
        payload.cellar.is_some(),
        "Cellar information is required",
    );
    if let Some(cellar) = &payload.cellar {
        c.check(
            "cellar.quantity",
            cellar.quantity.is_some_and(|q| q >= 0),
            "Quantity must be a non-negative integer",
        );
        c.check(
            "cellar.purchaseDate",
            cellar
                .purchase_date
                .as_deref()
                .is_some_and(|d| is_iso8601(d.trim())),
            "Purchase date must be a valid date",
        );
        if let Some(price) = cellar.purchase_price {
            c.check(
                "cellar.purchasePrice",
                price >= 0.0,
                "Purchase price cannot be negative",
            );
        }
        if let Some(drink_by) = cellar.drink_by.as_deref() {
            c.check(
                "cellar.drinkBy",
                is_iso8601(drink_by.trim()),
                "Drink-by date must be a valid date",
            );
        }
        if let Some(location) = &cellar.location {
            c.check(
                "cellar.location.room",
                len(&location.room) <= 50,
                "Room name cannot exceed 50 characters",
            );
            c.check(
                "cellar.location.rack",
                len(&location.rack) <= 20,
                "Rack identifier cannot exceed 20 characters",
            );
            c.check(
                "cellar.location.shelf",
                len(&location.shelf) <= 20,
                "Shelf identifier cannot exceed 20 characters",
            );
            c.check(
                "cellar.location.position",
                len(&location.position) <= 20,
                "Position identifier cannot exceed 20 characters",
            );
            c.check(
                "cellar.location.notes",
                len(&location.notes) <= 200,
                "Location notes cannot exceed 200 characters",
            );
        }
    }

    c.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_payload() -> WinePayload {
        serde_json::from_value(json!({
            "name": "Château Margaux",
            "producer": "Margaux Estate",
            "vintage": 2015,
            "region": {"country": "France", "area": "Bordeaux"},
            "grapes": ["Merlot"],
            "style": "red",
            "alcohol": 13.5,
            "tastingNotes": {"aroma": ["plum"], "taste": ["dry"]},
            "cellar": {"quantity": 1, "purchaseDate": "2020-01-01"}
        }))
        .expect("payload deserializes")
    }

    #[test]
    fn valid_create_payload_passes() {
        assert!(validate_wine(&valid_payload(), Mode::Create).is_ok());
    }

    #[test]
    fn empty_create_payload_reports_every_required_field() {
        let violations = validate_wine(&WinePayload::default(), Mode::Create).unwrap_err();
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "name",
                "producer",
                "vintage",
                "region",
                "grapes",
                "style",
                "alcohol",
                "tastingNotes",
                "cellar"
            ]
        );
    }

    #[test]
    fn empty_update_payload_passes() {
        assert!(validate_wine(&WinePayload::default(), Mode::Update).is_ok());
    }

    #[test]
    fn supplied_update_fields_are_still_constrained() {
        let payload: WinePayload =
            serde_json::from_value(json!({"vintage": 1700, "style": "orange"}))
                .expect("payload deserializes");
        let violations = validate_wine(&payload, Mode::Update).unwrap_err();
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["vintage", "style"]);
    }

    #[test]
    fn vintage_bounds() {
        let current_year = OffsetDateTime::now_utc().year();
        for (year, ok) in [(1799, false), (1800, true), (current_year, true), (current_year + 1, false)] {
            let mut payload = valid_payload();
            payload.vintage = Some(year);
            assert_eq!(
                validate_wine(&payload, Mode::Create).is_ok(),
                ok,
                "vintage {year}"
            );
        }
    }

    #[test]
    fn alcohol_bounds() {
        for (alcohol, ok) in [(-0.1, false), (0.0, true), (50.0, true), (50.1, false)] {
            let mut payload = valid_payload();
            payload.alcohol = Some(alcohol);
            assert_eq!(
                validate_wine(&payload, Mode::Create).is_ok(),
                ok,
                "alcohol {alcohol}"
            );
        }
    }

    #[test]
    fn grapes_must_be_non_empty_with_non_empty_entries() {
        let mut payload = valid_payload();
        payload.grapes = Some(vec![]);
        let violations = validate_wine(&payload, Mode::Create).unwrap_err();
        assert_eq!(violations[0].field, "grapes");

        let mut payload = valid_payload();
        payload.grapes = Some(vec!["Merlot".into(), "  ".into()]);
        let violations = validate_wine(&payload, Mode::Create).unwrap_err();
        assert_eq!(violations[0].message, "Grape variety cannot be empty");
    }

    #[test]
    fn length_caps_count_characters_not_bytes() {
        // 180 accented characters are 360 bytes but within the 200-char cap.
        let mut payload = valid_payload();
        payload.producer = Some("é".repeat(180));
        assert!(validate_wine(&payload, Mode::Create).is_ok());

        let mut payload = valid_payload();
        payload.producer = Some("é".repeat(201));
        let violations = validate_wine(&payload, Mode::Create).unwrap_err();
        assert_eq!(violations[0].field, "producer");

        let mut payload = valid_payload();
        payload.cellar = serde_json::from_value(json!({
            "quantity": 1,
            "purchaseDate": "2020-01-01",
            "location": {"room": "û".repeat(50)}
        }))
        .ok();
        assert!(validate_wine(&payload, Mode::Create).is_ok());
    }

    #[test]
    fn partial_region_is_rejected() {
        let payload: WinePayload = serde_json::from_value(json!({
            "region": {"country": "France"}
        }))
        .expect("payload deserializes");
        let violations = validate_wine(&payload, Mode::Update).unwrap_err();
        assert_eq!(violations[0].field, "region.area");
    }

    #[test]
    fn tasting_note_lists_must_be_non_empty() {
        let mut payload = valid_payload();
        payload.tasting_notes = serde_json::from_value(json!({"aroma": [], "taste": ["dry"]})).ok();
        let violations = validate_wine(&payload, Mode::Create).unwrap_err();
        assert_eq!(violations[0].field, "tastingNotes.aroma");
    }

    #[test]
    fn rating_bounds() {
        let mut payload = valid_payload();
        payload.ratings = serde_json::from_value(json!({"personal": 0})).ok();
        assert!(validate_wine(&payload, Mode::Create).is_err());

        let mut payload = valid_payload();
        payload.ratings = serde_json::from_value(json!({"critic": {"score": 101}})).ok();
        let violations = validate_wine(&payload, Mode::Create).unwrap_err();
        assert_eq!(violations[0].field, "ratings.critic.score");

        let mut payload = valid_payload();
        payload.ratings =
            serde_json::from_value(json!({"personal": 92, "critic": {"score": 95}})).ok();
        assert!(validate_wine(&payload, Mode::Create).is_ok());
    }

    #[test]
    fn cellar_rules() {
        let mut payload = valid_payload();
        payload.cellar = serde_json::from_value(json!({"quantity": -1, "purchaseDate": "2020-01-01"})).ok();
        let violations = validate_wine(&payload, Mode::Create).unwrap_err();
        assert_eq!(violations[0].field, "cellar.quantity");

        let mut payload = valid_payload();
        payload.cellar = serde_json::from_value(json!({"quantity": 1, "purchaseDate": "01/01/2020"})).ok();
        let violations = validate_wine(&payload, Mode::Create).unwrap_err();
        assert_eq!(violations[0].field, "cellar.purchaseDate");

        let mut payload = valid_payload();
        payload.cellar = serde_json::from_value(json!({
            "quantity": 1,
            "purchaseDate": "2020-01-01",
            "purchasePrice": -5.0,
            "location": {"room": "r".repeat(51)}
        }))
        .ok();
        let violations = validate_wine(&payload, Mode::Create).unwrap_err();
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["cellar.purchasePrice", "cellar.location.room"]);
    }
}
