use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use crate::wines::repo::{
    Cellar, CellarLocation, CriticRating, NewWine, Ratings, Region, TastingNotes, Wine,
    WinePatch, WineStyle,
};

/// Inbound wine payload. Every field is optional so create and partial
/// update share one shape; the validation layer decides what must be
/// present. There is deliberately no owner field.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinePayload {
    pub name: Option<String>,
    pub producer: Option<String>,
    pub vintage: Option<i32>,
    pub region: Option<RegionPayload>,
    pub grapes: Option<Vec<String>>,
    pub style: Option<String>,
    pub alcohol: Option<f64>,
    pub tasting_notes: Option<TastingNotesPayload>,
    pub ratings: Option<RatingsPayload>,
    pub cellar: Option<CellarPayload>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RegionPayload {
    pub country: Option<String>,
    pub area: Option<String>,
    pub subregion: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TastingNotesPayload {
    pub appearance: Option<String>,
    pub aroma: Option<Vec<String>>,
    pub taste: Option<Vec<String>>,
    pub finish: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RatingsPayload {
    pub personal: Option<i32>,
    pub critic: Option<CriticPayload>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CriticPayload {
    pub score: Option<i32>,
    pub reviewer: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellarPayload {
    pub quantity: Option<i64>,
    pub location: Option<LocationPayload>,
    pub purchase_price: Option<f64>,
    pub purchase_date: Option<String>,
    pub drink_by: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct LocationPayload {
    pub room: Option<String>,
    pub rack: Option<String>,
    pub shelf: Option<String>,
    pub position: Option<String>,
    pub notes: Option<String>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl RegionPayload {
    fn into_doc(self) -> anyhow::Result<Region> {
        Ok(Region {
            country: trimmed(self.country).context("region.country missing after validation")?,
            area: trimmed(self.area).context("region.area missing after validation")?,
            subregion: trimmed(self.subregion),
        })
    }
}

impl TastingNotesPayload {
    fn into_doc(self) -> anyhow::Result<TastingNotes> {
        Ok(TastingNotes {
            appearance: trimmed(self.appearance),
            aroma: self
                .aroma
                .context("tastingNotes.aroma missing after validation")?
                .into_iter()
                .map(|n| n.trim().to_string())
                .collect(),
            taste: self
                .taste
                .context("tastingNotes.taste missing after validation")?
                .into_iter()
                .map(|n| n.trim().to_string())
                .collect(),
            finish: trimmed(self.finish),
        })
    }
}

impl RatingsPayload {
    fn into_doc(self) -> Ratings {
        Ratings {
            personal: self.personal,
            critic: self.critic.map(|c| CriticRating {
                score: c.score,
                reviewer: trimmed(c.reviewer),
            }),
        }
    }
}

impl CellarPayload {
    fn into_doc(self) -> anyhow::Result<Cellar> {
        Ok(Cellar {
            quantity: self
                .quantity
                .context("cellar.quantity missing after validation")?,
            location: self.location.map(|l| CellarLocation {
                room: trimmed(l.room),
                rack: trimmed(l.rack),
                shelf: trimmed(l.shelf),
                position: trimmed(l.position),
                notes: trimmed(l.notes),
            }),
            purchase_price: self.purchase_price,
            purchase_date: trimmed(self.purchase_date)
                .context("cellar.purchaseDate missing after validation")?,
            drink_by: trimmed(self.drink_by),
        })
    }
}

fn parse_style(style: Option<String>) -> anyhow::Result<Option<WineStyle>> {
    style
        .as_deref()
        .map(|s| WineStyle::parse(s).context("unknown style after validation"))
        .transpose()
}

fn trim_grapes(grapes: Vec<String>) -> Vec<String> {
    grapes.into_iter().map(|g| g.trim().to_string()).collect()
}

impl WinePayload {
    /// Create-mode conversion; runs after validation, so missing required
    /// fields only occur on a validator bug and surface as 500s.
    pub fn into_new(self, user_id: Uuid) -> anyhow::Result<NewWine> {
        Ok(NewWine {
            user_id,
            name: trimmed(self.name).context("name missing after validation")?,
            producer: trimmed(self.producer).context("producer missing after validation")?,
            vintage: self.vintage.context("vintage missing after validation")?,
            style: parse_style(self.style)?.context("style missing after validation")?,
            alcohol: self.alcohol.context("alcohol missing after validation")?,
            region: Json(
                self.region
                    .context("region missing after validation")?
                    .into_doc()?,
            ),
            grapes: trim_grapes(self.grapes.context("grapes missing after validation")?),
            tasting_notes: Json(
                self.tasting_notes
                    .context("tastingNotes missing after validation")?
                    .into_doc()?,
            ),
            ratings: Json(self.ratings.map(RatingsPayload::into_doc).unwrap_or_default()),
            cellar: Json(
                self.cellar
                    .context("cellar missing after validation")?
                    .into_doc()?,
            ),
        })
    }

    /// Update-mode conversion: only supplied fields become patch entries.
    pub fn into_patch(self) -> anyhow::Result<WinePatch> {
        Ok(WinePatch {
            name: trimmed(self.name),
            producer: trimmed(self.producer),
            vintage: self.vintage,
            style: parse_style(self.style)?,
            alcohol: self.alcohol,
            region: self
                .region
                .map(RegionPayload::into_doc)
                .transpose()?
                .map(Json),
            grapes: self.grapes.map(trim_grapes),
            tasting_notes: self
                .tasting_notes
                .map(TastingNotesPayload::into_doc)
                .transpose()?
                .map(Json),
            ratings: self.ratings.map(|r| Json(r.into_doc())),
            cellar: self
                .cellar
                .map(CellarPayload::into_doc)
                .transpose()?
                .map(Json),
        })
    }
}

/// Query string of the list endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub style: Option<String>,
    pub country: Option<String>,
    pub vintage: Option<i32>,
    pub producer: Option<String>,
    pub search: Option<String>,
    pub cellar_room: Option<String>,
    pub cellar_rack: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + limit - 1) / limit
        };
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WineData {
    pub wine: Wine,
}

#[derive(Debug, Serialize)]
pub struct WineListData {
    pub wines: Vec<Wine>,
    pub pagination: Pagination,
}
