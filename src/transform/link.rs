//! "Copy army" deep links understood by the game client.
//!
//! The encoding must match the client byte for byte:
//!
//! ```text
//! h{hero}[p{pet}][e{equip}[_{equip}]]-...  heroes
//! i{n}x{id}-...                            clan castle troops and sieges
//! d{n}x{id}-...                            clan castle spells
//! u{n}x{id}-...                            army camp troops and sieges
//! s{n}x{id}-...                            army camp spells
//! ```
//!
//! Segments are concatenated in that order without separators; empty ones are
//! left out.

use crate::config::HeroIds;
use crate::models::{Army, Placement, UnitEntry};

use super::{hero_loadouts, HeroLoadout};

pub const COPY_ARMY_BASE_URL: &str = "https://link.clashofclans.com/?action=CopyArmy&army=";

/// Encode one hero, or `None` when the hero has no known id.
fn hero_code(loadout: &HeroLoadout<'_>, hero_ids: &HeroIds) -> Option<String> {
    let mut code = hero_ids.get(loadout.hero)?.to_string();

    if let Some(pet_id) = loadout.pet.and_then(|pet| pet.clash_id) {
        code.push_str(&format!("p{}", pet_id));
    }

    let mut equipment = loadout.equipment.iter().map(|item| item.clash_id);
    if let Some(Some(first)) = equipment.next() {
        code.push_str(&format!("e{}", first));
        if let Some(Some(second)) = equipment.next() {
            code.push_str(&format!("_{}", second));
        }
    }

    Some(code)
}

/// Heroes segment including its `h` prefix, or `None` when no hero encodes.
pub fn heroes_segment(loadouts: &[HeroLoadout<'_>], hero_ids: &HeroIds) -> Option<String> {
    let codes: Vec<String> = loadouts
        .iter()
        .filter_map(|loadout| {
            let code = hero_code(loadout, hero_ids);
            if code.is_none() {
                tracing::debug!("No link id for hero {:?}, leaving it out", loadout.hero);
            }
            code
        })
        .collect();

    if codes.is_empty() {
        None
    } else {
        Some(format!("h{}", codes.join("-")))
    }
}

/// A unit segment with its prefix, or `None` when no unit carries an id.
fn units_segment<'a>(prefix: char, units: impl Iterator<Item = &'a UnitEntry>) -> Option<String> {
    let parts: Vec<String> = units
        .filter_map(|unit| {
            unit.clash_id
                .map(|id| format!("{}x{}", unit.amount.unwrap_or(0), id))
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(format!("{}{}", prefix, parts.join("-")))
    }
}

/// Build the copy link for an army.
pub fn generate_copy_link(army: &Army, hero_ids: &HeroIds) -> String {
    let units = army.units();
    let placed = |placement: Placement| {
        units
            .iter()
            .filter(move |unit| unit.placement() == Some(placement))
    };

    let segments = [
        heroes_segment(&hero_loadouts(army), hero_ids),
        units_segment(
            'i',
            placed(Placement::ClanCastle).filter(|u| u.is_troop_or_siege()),
        ),
        units_segment('d', placed(Placement::ClanCastle).filter(|u| u.is_spell())),
        units_segment(
            'u',
            placed(Placement::ArmyCamp).filter(|u| u.is_troop_or_siege()),
        ),
        units_segment('s', placed(Placement::ArmyCamp).filter(|u| u.is_spell())),
    ];

    let mut link = String::from(COPY_ARMY_BASE_URL);
    for segment in segments.into_iter().flatten() {
        link.push_str(&segment);
    }
    link
}
