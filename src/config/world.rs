//! Turns a scenario document into a populated [`TerritoryMap`].

use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use crate::config::schema::ScenarioConfig;
use crate::error::ConfigError;
use crate::model::{
    Nation, NationId, Resident, ResidentId, Territory, TerritoryId, TerritoryMap, Town, TownId,
};

/// Base for resident ids derived from list position.
const DERIVED_ID_BASE: u128 = 0xf1a6_0000_0000_4000_8000_0000_0000_0000;

/// A map built from a scenario, plus the name lookups the runner needs.
#[derive(Debug)]
pub struct ScenarioWorld {
    /// Populated map with adjacency computed.
    pub map: TerritoryMap,
    /// Resident ids by name.
    pub residents: HashMap<String, ResidentId>,
    /// Territory names by id.
    pub territory_names: BTreeMap<TerritoryId, String>,
}

/// Builds the map described by `scenario`.
///
/// Ids follow list order starting at 1. Residents without an explicit id
/// get one derived from their position, so saved attacks survive a rerun
/// of the same file.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` for references to undefined names.
/// A validated scenario never fails here.
pub fn build_world(scenario: &ScenarioConfig) -> Result<ScenarioWorld, ConfigError> {
    let mut map = TerritoryMap::new();

    let mut nations: HashMap<&str, NationId> = HashMap::new();
    for (i, def) in (1u64..).zip(&scenario.nations) {
        let id = NationId(i);
        nations.insert(def.name.as_str(), id);
        map.insert_nation(Nation {
            id,
            name: def.name.clone(),
        });
    }

    let mut towns: HashMap<&str, TownId> = HashMap::new();
    for (i, def) in (1u64..).zip(&scenario.towns) {
        towns.insert(def.name.as_str(), TownId(i));
    }
    let town_id = |field: &str, name: &str| {
        towns.get(name).copied().ok_or_else(|| unknown(field, name, "a defined town"))
    };

    for (def, id) in scenario.towns.iter().zip((1u64..).map(TownId)) {
        let mut town = Town::new(id, def.name.clone());
        town.nation = def
            .nation
            .as_deref()
            .map(|name| {
                nations
                    .get(name)
                    .copied()
                    .ok_or_else(|| unknown("towns.nation", name, "a defined nation"))
            })
            .transpose()?;
        for ally in &def.allies {
            town.allies.insert(town_id("towns.allies", ally)?);
        }
        for enemy in &def.enemies {
            town.enemies.insert(town_id("towns.enemies", enemy)?);
        }
        map.insert_town(town);
    }

    let mut territories: HashMap<&str, TerritoryId> = HashMap::new();
    let mut territory_names = BTreeMap::new();
    for (i, def) in (1u64..).zip(&scenario.territories) {
        let id = TerritoryId(i);
        let mut territory = Territory::new(id, def.core, def.cells.iter().copied());
        territory.town = def
            .town
            .as_deref()
            .map(|name| town_id("territories.town", name))
            .transpose()?;
        map.insert_territory(territory);
        territories.insert(def.name.as_str(), id);
        territory_names.insert(id, def.name.clone());
    }

    for (def, id) in scenario.towns.iter().zip((1u64..).map(TownId)) {
        let Some(home) = &def.home else {
            continue;
        };
        let home = territories
            .get(home.as_str())
            .copied()
            .ok_or_else(|| unknown("towns.home", home, "a defined territory"))?;
        if let Some(town) = map.town_mut(id) {
            town.home = Some(home);
        }
    }

    let mut residents = HashMap::new();
    for (i, def) in (0u128..).zip(&scenario.residents) {
        let id = ResidentId(def.id.unwrap_or_else(|| Uuid::from_u128(DERIVED_ID_BASE + i)));
        let town = def
            .town
            .as_deref()
            .map(|name| town_id("residents.town", name))
            .transpose()?;
        map.insert_resident(Resident {
            id,
            name: def.name.clone(),
            town,
        });
        residents.insert(def.name.clone(), id);
    }

    map.recompute_adjacency();

    Ok(ScenarioWorld {
        map,
        residents,
        territory_names,
    })
}

fn unknown(field: &str, value: &str, expected: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}
