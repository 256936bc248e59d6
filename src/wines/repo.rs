use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "wine_style", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WineStyle {
    Red,
    White,
    #[sqlx(rename = "rosé")]
    #[serde(rename = "rosé")]
    Rose,
    Sparkling,
    Dessert,
}

impl WineStyle {
    pub const NAMES: [&'static str; 5] = ["red", "white", "rosé", "sparkling", "dessert"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "red" => Some(Self::Red),
            "white" => Some(Self::White),
            "rosé" => Some(Self::Rose),
            "sparkling" => Some(Self::Sparkling),
            "dessert" => Some(Self::Dessert),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub country: String,
    pub area: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subregion: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TastingNotes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appearance: Option<String>,
    pub aroma: Vec<String>,
    pub taste: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ratings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critic: Option<CriticRating>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticRating {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CellarLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shelf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Dates are carried as the ISO-8601 strings the client sent, so stored
/// values round-trip unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cellar {
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<CellarLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_price: Option<f64>,
    pub purchase_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drink_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Wine {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub producer: String,
    pub vintage: i32,
    pub style: WineStyle,
    pub alcohol: f64,
    pub region: Json<Region>,
    pub grapes: Vec<String>,
    pub tasting_notes: Json<TastingNotes>,
    pub ratings: Json<Ratings>,
    pub cellar: Json<Cellar>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct NewWine {
    pub user_id: Uuid,
    pub name: String,
    pub producer: String,
    pub vintage: i32,
    pub style: WineStyle,
    pub alcohol: f64,
    pub region: Json<Region>,
    pub grapes: Vec<String>,
    pub tasting_notes: Json<TastingNotes>,
    pub ratings: Json<Ratings>,
    pub cellar: Json<Cellar>,
}

/// Partial update; `None` leaves the stored column untouched. Supplied
/// sub-documents replace the stored one wholesale.
#[derive(Debug, Default)]
pub struct WinePatch {
    pub name: Option<String>,
    pub producer: Option<String>,
    pub vintage: Option<i32>,
    pub style: Option<WineStyle>,
    pub alcohol: Option<f64>,
    pub region: Option<Json<Region>>,
    pub grapes: Option<Vec<String>>,
    pub tasting_notes: Option<Json<TastingNotes>>,
    pub ratings: Option<Json<Ratings>>,
    pub cellar: Option<Json<Cellar>>,
}

/// Owner scoping plus the optional list filters, all AND'ed together.
#[derive(Debug, Default, Clone)]
pub struct WineFilter {
    pub style: Option<String>,
    pub country: Option<String>,
    pub vintage: Option<i32>,
    pub producer: Option<String>,
    pub cellar_room: Option<String>,
    pub cellar_rack: Option<String>,
    pub search: Option<String>,
}

const WINE_COLUMNS: &str = "id, user_id, name, producer, vintage, style, alcohol, \
     region, grapes, tasting_notes, ratings, cellar, created_at, updated_at";

// Unset filters bind as NULL and collapse to TRUE. The search term is ORed
// across name, producer and the grape list; everything else is AND'ed.
const WINE_FILTER: &str = "user_id = $1 \
     AND ($2::text IS NULL OR style::text = $2) \
     AND ($3::text IS NULL OR region->>'country' ILIKE '%' || $3 || '%') \
     AND ($4::int4 IS NULL OR vintage = $4) \
     AND ($5::text IS NULL OR producer ILIKE '%' || $5 || '%') \
     AND ($6::text IS NULL OR cellar->'location'->>'room' ILIKE '%' || $6 || '%') \
     AND ($7::text IS NULL OR cellar->'location'->>'rack' ILIKE '%' || $7 || '%') \
     AND ($8::text IS NULL \
          OR name ILIKE '%' || $8 || '%' \
          OR producer ILIKE '%' || $8 || '%' \
          OR EXISTS (SELECT 1 FROM unnest(grapes) AS g WHERE g ILIKE '%' || $8 || '%'))";

/// Maps the client sort key onto a whitelisted ORDER BY clause; anything
/// unrecognized falls back to newest-first.
pub fn order_clause(sort: &str) -> &'static str {
    match sort {
        "createdAt" => "created_at ASC",
        "-createdAt" => "created_at DESC",
        "updatedAt" => "updated_at ASC",
        "-updatedAt" => "updated_at DESC",
        "name" => "name ASC",
        "-name" => "name DESC",
        "producer" => "producer ASC",
        "-producer" => "producer DESC",
        "vintage" => "vintage ASC",
        "-vintage" => "vintage DESC",
        "alcohol" => "alcohol ASC",
        "-alcohol" => "alcohol DESC",
        _ => "created_at DESC",
    }
}

/// Escapes LIKE wildcards so filter text matches literally.
pub fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

impl Wine {
    pub async fn list(
        db: &PgPool,
        user_id: Uuid,
        filter: &WineFilter,
        order: &str,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Wine>> {
        let sql = format!(
            "SELECT {WINE_COLUMNS} FROM wines WHERE {WINE_FILTER} \
             ORDER BY {order} LIMIT $9 OFFSET $10"
        );
        let wines = sqlx::query_as::<_, Wine>(&sql)
            .bind(user_id)
            .bind(filter.style.as_deref())
            .bind(filter.country.as_deref())
            .bind(filter.vintage)
            .bind(filter.producer.as_deref())
            .bind(filter.cellar_room.as_deref())
            .bind(filter.cellar_rack.as_deref())
            .bind(filter.search.as_deref())
            .bind(limit)
            .bind(offset)
            .fetch_all(db)
            .await?;
        Ok(wines)
    }

    pub async fn count(db: &PgPool, user_id: Uuid, filter: &WineFilter) -> anyhow::Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM wines WHERE {WINE_FILTER}");
        let total = sqlx::query_scalar::<_, i64>(&sql)
            .bind(user_id)
            .bind(filter.style.as_deref())
            .bind(filter.country.as_deref())
            .bind(filter.vintage)
            .bind(filter.producer.as_deref())
            .bind(filter.cellar_room.as_deref())
            .bind(filter.cellar_rack.as_deref())
            .bind(filter.search.as_deref())
            .fetch_one(db)
            .await?;
        Ok(total)
    }

    pub async fn find(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Wine>> {
        let sql = format!("SELECT {WINE_COLUMNS} FROM wines WHERE id = $1 AND user_id = $2");
        let wine = sqlx::query_as::<_, Wine>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(db)
            .await?;
        Ok(wine)
    }

    pub async fn insert(db: &PgPool, new: NewWine) -> anyhow::Result<Wine> {
        let sql = format!(
            "INSERT INTO wines (user_id, name, producer, vintage, style, alcohol, \
             region, grapes, tasting_notes, ratings, cellar) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {WINE_COLUMNS}"
        );
        let wine = sqlx::query_as::<_, Wine>(&sql)
            .bind(new.user_id)
            .bind(new.name)
            .bind(new.producer)
            .bind(new.vintage)
            .bind(new.style)
            .bind(new.alcohol)
            .bind(new.region)
            .bind(new.grapes)
            .bind(new.tasting_notes)
            .bind(new.ratings)
            .bind(new.cellar)
            .fetch_one(db)
            .await?;
        Ok(wine)
    }

    /// Applies the patch owner-scoped and returns the post-write row;
    /// `None` when the wine is absent or owned by someone else.
    pub async fn update(
        db: &PgPool,
        user_id: Uuid,
        id: Uuid,
        patch: WinePatch,
    ) -> anyhow::Result<Option<Wine>> {
        let sql = format!(
            "UPDATE wines SET \
             name = COALESCE($3, name), \
             producer = COALESCE($4, producer), \
             vintage = COALESCE($5, vintage), \
             style = COALESCE($6, style), \
             alcohol = COALESCE($7, alcohol), \
             region = COALESCE($8, region), \
             grapes = COALESCE($9, grapes), \
             tasting_notes = COALESCE($10, tasting_notes), \
             ratings = COALESCE($11, ratings), \
             cellar = COALESCE($12, cellar), \
             updated_at = now() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {WINE_COLUMNS}"
        );
        let wine = sqlx::query_as::<_, Wine>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(patch.name)
            .bind(patch.producer)
            .bind(patch.vintage)
            .bind(patch.style)
            .bind(patch.alcohol)
            .bind(patch.region)
            .bind(patch.grapes)
            .bind(patch.tasting_notes)
            .bind(patch.ratings)
            .bind(patch.cellar)
            .fetch_optional(db)
            .await?;
        Ok(wine)
    }

    pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM wines WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
