//! Army document model matching what the rendering side reads.
//!
//! Field names are a contract with that consumer and must not change without
//! versioning both sides.

use serde::{Deserialize, Serialize};

/// Engagement counters, zero when the export omits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmyMetrics {
    pub score: serde_json::Number,
    pub votes: i64,
    pub page_views: i64,
    pub open_link_clicks: i64,
    pub copy_link_clicks: i64,
}

/// A unit as rendered in a composition bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSummary {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub amount: Option<i64>,
    pub clash_id: Option<i64>,
    pub icon: String,
}

/// Units housed in one place, split by kind.
///
/// `siges` is the legacy misspelling still read by older clients; siege
/// machines are written to it and to `sieges`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitBuckets {
    pub troops: Vec<UnitSummary>,
    pub spells: Vec<UnitSummary>,
    pub siges: Vec<UnitSummary>,
    pub sieges: Vec<UnitSummary>,
}

/// A pet or a piece of equipment attached to a hero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSummary {
    pub name: Option<String>,
    pub clash_id: Option<i64>,
    pub icon: String,
}

/// A hero with at most one pet and two pieces of equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroSummary {
    pub name: String,
    pub icon: String,
    pub clash_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pet: Option<AssetSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub equipment: Vec<AssetSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    pub army_camp: UnitBuckets,
    pub clan_castle: UnitBuckets,
    pub heroes: Vec<HeroSummary>,
}

/// The document written to the destination collection for one army.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmyDocument {
    pub id: i64,
    pub name: Option<String>,
    pub town_hall: Option<i64>,
    pub banner: Option<String>,
    pub tags: Vec<String>,
    pub created_by_username: Option<String>,
    pub created_time: Option<String>,
    pub updated_time: Option<String>,
    pub metrics: ArmyMetrics,
    pub composition: Composition,
    pub copy_link: String,
}

impl ArmyDocument {
    /// Key of this document inside its collection.
    pub fn doc_id(&self) -> String {
        self.id.to_string()
    }
}
