//! Conversion of exported armies into destination documents.
//!
//! The transform is pure: the same army and hero mapping always yield the same
//! document.

mod link;

pub use link::*;

use crate::config::HeroIds;
use crate::models::{
    Army, ArmyDocument, ArmyMetrics, AssetSummary, Composition, HeroAsset, HeroSummary, Placement,
    UnitBuckets, UnitCategory, UnitEntry, UnitSummary,
};

/// Equipment slots per hero.
const MAX_EQUIPMENT_PER_HERO: usize = 2;

pub fn unit_icon(name: &str) -> String {
    format!("units/{}_small.webp", name)
}

pub fn hero_icon(name: &str) -> String {
    format!("heroes/{}.webp", name)
}

pub fn pet_icon(name: &str) -> String {
    format!("heroes/pets/{}.webp", name)
}

pub fn equipment_icon(name: &str) -> String {
    format!("heroes/equipment/{}_small.webp", name)
}

/// Pet and equipment chosen for one hero, in first-seen order.
#[derive(Debug, Clone, PartialEq)]
pub struct HeroLoadout<'a> {
    pub hero: &'a str,
    pub pet: Option<&'a HeroAsset>,
    pub equipment: Vec<&'a HeroAsset>,
}

/// Group an army's equipment and pets by owning hero.
///
/// Heroes appear in the order they are first mentioned, equipment before pets.
/// Each hero keeps its first pet and its first two pieces of equipment; assets
/// without an owner are dropped.
pub fn hero_loadouts(army: &Army) -> Vec<HeroLoadout<'_>> {
    let mut loadouts: Vec<HeroLoadout<'_>> = Vec::new();

    for item in army.equipment() {
        let Some(hero) = owner(item) else { continue };
        let loadout = loadout_for(&mut loadouts, hero);
        if loadout.equipment.len() < MAX_EQUIPMENT_PER_HERO {
            loadout.equipment.push(item);
        }
    }

    for pet in army.pets() {
        let Some(hero) = owner(pet) else { continue };
        let loadout = loadout_for(&mut loadouts, hero);
        if loadout.pet.is_none() {
            loadout.pet = Some(pet);
        }
    }

    loadouts
}

fn loadout_for<'l, 'a>(
    loadouts: &'l mut Vec<HeroLoadout<'a>>,
    hero: &'a str,
) -> &'l mut HeroLoadout<'a> {
    let index = match loadouts.iter().position(|l| l.hero == hero) {
        Some(index) => index,
        None => {
            loadouts.push(HeroLoadout {
                hero,
                pet: None,
                equipment: Vec::new(),
            });
            loadouts.len() - 1
        }
    };
    &mut loadouts[index]
}

fn owner(asset: &HeroAsset) -> Option<&str> {
    asset.hero.as_deref().filter(|hero| !hero.is_empty())
}

fn unit_summary(unit: &UnitEntry) -> UnitSummary {
    UnitSummary {
        name: unit.name.clone(),
        kind: unit.kind.clone(),
        amount: unit.amount,
        clash_id: unit.clash_id,
        icon: unit_icon(unit.name.as_deref().unwrap_or_default()),
    }
}

/// Split units into army camp and clan castle buckets.
///
/// Anything not placed in the clan castle counts as army camp.
pub fn split_units(units: &[UnitEntry]) -> (UnitBuckets, UnitBuckets) {
    let mut camp = UnitBuckets::default();
    let mut castle = UnitBuckets::default();

    for unit in units {
        let bucket = match unit.placement() {
            Some(Placement::ClanCastle) => &mut castle,
            _ => &mut camp,
        };
        let summary = unit_summary(unit);
        match unit.category() {
            Some(UnitCategory::Spell) => bucket.spells.push(summary),
            Some(UnitCategory::Siege) => {
                bucket.siges.push(summary.clone());
                bucket.sieges.push(summary);
            }
            _ => bucket.troops.push(summary),
        }
    }

    (camp, castle)
}

fn asset_summary(asset: &HeroAsset, icon: fn(&str) -> String) -> AssetSummary {
    AssetSummary {
        name: asset.name.clone(),
        clash_id: asset.clash_id,
        icon: icon(asset.name.as_deref().unwrap_or_default()),
    }
}

/// Hero cards for the composition, one per hero owning a pet or equipment.
pub fn build_heroes(army: &Army, hero_ids: &HeroIds) -> Vec<HeroSummary> {
    hero_loadouts(army)
        .into_iter()
        .map(|loadout| HeroSummary {
            name: loadout.hero.to_string(),
            icon: hero_icon(loadout.hero),
            clash_id: hero_ids.get(loadout.hero),
            pet: loadout.pet.map(|pet| asset_summary(pet, pet_icon)),
            equipment: loadout
                .equipment
                .iter()
                .map(|item| asset_summary(item, equipment_icon))
                .collect(),
        })
        .collect()
}

/// Transform an exported army into its destination document.
pub fn transform_army(army: &Army, hero_ids: &HeroIds) -> ArmyDocument {
    let (army_camp, clan_castle) = split_units(army.units());

    ArmyDocument {
        id: army.id,
        name: army.name.clone(),
        town_hall: army.town_hall,
        banner: army.banner.clone(),
        tags: army.tags.clone().unwrap_or_default(),
        created_by_username: army.username.clone(),
        created_time: army.created_time.clone(),
        updated_time: army.updated_time.clone(),
        metrics: ArmyMetrics {
            score: army.score.clone().unwrap_or_else(|| serde_json::Number::from(0)),
            votes: army.votes.unwrap_or(0),
            page_views: army.page_views.unwrap_or(0),
            open_link_clicks: army.open_link_clicks.unwrap_or(0),
            copy_link_clicks: army.copy_link_clicks.unwrap_or(0),
        },
        composition: Composition {
            army_camp,
            clan_castle,
            heroes: build_heroes(army, hero_ids),
        },
        copy_link: generate_copy_link(army, hero_ids),
    }
}
