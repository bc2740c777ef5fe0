//! Army model matching the web export JSON.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unit category as reported by the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitCategory {
    Troop,
    Spell,
    Siege,
}

impl UnitCategory {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Troop" => Some(UnitCategory::Troop),
            "Spell" => Some(UnitCategory::Spell),
            "Siege" => Some(UnitCategory::Siege),
            _ => None,
        }
    }
}

/// Where a unit is housed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The player's own army camps
    ArmyCamp,
    /// The reinforcement slot filled by the clan
    ClanCastle,
}

impl Placement {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "armyCamp" => Some(Placement::ArmyCamp),
            "clanCastle" => Some(Placement::ClanCastle),
            _ => None,
        }
    }
}

/// A unit line in an army.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitEntry {
    #[serde(default)]
    pub name: Option<String>,
    /// Raw category string, passed through to documents untouched
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub clash_id: Option<i64>,
    #[serde(default)]
    pub home: Option<String>,
}

impl UnitEntry {
    pub fn category(&self) -> Option<UnitCategory> {
        self.kind.as_deref().and_then(UnitCategory::from_str)
    }

    pub fn placement(&self) -> Option<Placement> {
        self.home.as_deref().and_then(Placement::from_str)
    }

    /// Troops and siege machines share the same link segments.
    pub fn is_troop_or_siege(&self) -> bool {
        matches!(
            self.category(),
            Some(UnitCategory::Troop) | Some(UnitCategory::Siege)
        )
    }

    pub fn is_spell(&self) -> bool {
        self.category() == Some(UnitCategory::Spell)
    }
}

/// Hero equipment or hero pet, both owned by a named hero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroAsset {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub clash_id: Option<i64>,
    #[serde(default)]
    pub hero: Option<String>,
}

pub type EquipmentEntry = HeroAsset;
pub type PetEntry = HeroAsset;

/// An army as exported by the web application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Army {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub town_hall: Option<i64>,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub score: Option<serde_json::Number>,
    #[serde(default)]
    pub votes: Option<i64>,
    #[serde(default)]
    pub page_views: Option<i64>,
    #[serde(default)]
    pub open_link_clicks: Option<i64>,
    #[serde(default)]
    pub copy_link_clicks: Option<i64>,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub updated_time: Option<String>,
    #[serde(default)]
    pub units: Option<Vec<UnitEntry>>,
    #[serde(default)]
    pub equipment: Option<Vec<EquipmentEntry>>,
    #[serde(default)]
    pub pets: Option<Vec<PetEntry>>,
}

/// A parsed timestamp together with the exact string it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveTimestamp {
    pub instant: DateTime<Utc>,
    pub raw: String,
}

impl Army {
    pub fn units(&self) -> &[UnitEntry] {
        self.units.as_deref().unwrap_or_default()
    }

    pub fn equipment(&self) -> &[EquipmentEntry] {
        self.equipment.as_deref().unwrap_or_default()
    }

    pub fn pets(&self) -> &[PetEntry] {
        self.pets.as_deref().unwrap_or_default()
    }

    /// Updated time if it parses, otherwise created time.
    pub fn effective_timestamp(&self) -> Option<EffectiveTimestamp> {
        [&self.updated_time, &self.created_time]
            .into_iter()
            .flatten()
            .find_map(|raw| {
                parse_timestamp(raw).map(|instant| EffectiveTimestamp {
                    instant,
                    raw: raw.clone(),
                })
            })
    }
}

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 (`Z` or numeric offset), offset-less date-times and bare
/// dates; values without an offset are read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
