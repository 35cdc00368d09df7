//! Territories and their cells.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{Coord, TerritoryId, TownId};
use crate::war::ContestId;

/// A claimable region made of cells, with one core cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Territory {
    /// Territory id
    pub id: TerritoryId,
    /// Owning town, `None` for wilderness
    #[serde(default)]
    pub town: Option<TownId>,
    /// Town currently occupying the territory
    #[serde(default)]
    pub occupier: Option<TownId>,
    /// Cell whose capture transfers the whole territory
    pub core: Coord,
    /// Member cells
    pub cells: BTreeSet<Coord>,
    /// Adjacent territories
    #[serde(default)]
    pub neighbors: BTreeSet<TerritoryId>,
    /// Whether any member cell touches a coordinate with no territory
    #[serde(default)]
    pub borders_wilderness: bool,
}

impl Territory {
    /// Creates an unowned territory from its core and member cells.
    ///
    /// The core is always a member, even if `cells` omits it.
    #[must_use]
    pub fn new(id: TerritoryId, core: Coord, cells: impl IntoIterator<Item = Coord>) -> Self {
        let mut cells: BTreeSet<Coord> = cells.into_iter().collect();
        cells.insert(core);
        Self {
            id,
            town: None,
            occupier: None,
            core,
            cells,
            neighbors: BTreeSet::new(),
            borders_wilderness: false,
        }
    }

    /// Builder-style owner assignment.
    #[must_use]
    pub fn owned_by(mut self, town: TownId) -> Self {
        self.town = Some(town);
        self
    }
}

/// Marker left on a cell while a contest runs on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveAttack {
    /// Contest running on the cell
    pub contest: ContestId,
    /// Town the attacker fights for
    pub town: TownId,
}

/// Smallest contestable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Cell coordinate
    pub coord: Coord,
    /// Territory the cell belongs to
    pub territory: TerritoryId,
    /// Town holding this single cell, independent of the territory occupier
    #[serde(default)]
    pub occupier: Option<TownId>,
    /// Running contest, if any
    #[serde(skip)]
    pub attack: Option<ActiveAttack>,
}

impl Cell {
    /// Creates an unoccupied cell.
    #[must_use]
    pub const fn new(coord: Coord, territory: TerritoryId) -> Self {
        Self {
            coord,
            territory,
            occupier: None,
            attack: None,
        }
    }

    /// Clears both the attack marker and the occupier.
    pub fn clear_war_state(&mut self) {
        self.attack = None;
        self.occupier = None;
    }
}
