//! Towns, nations and residents.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{NationId, ResidentId, TerritoryId, TownId};

/// A town: the unit that owns and occupies territory.
///
/// Ally and enemy sets are kept per town and need not be symmetric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Town {
    /// Town id
    pub id: TownId,
    /// Display name
    pub name: String,
    /// Home territory (never attackable in border-only wars)
    #[serde(default)]
    pub home: Option<TerritoryId>,
    /// Towns this town considers allies
    #[serde(default)]
    pub allies: BTreeSet<TownId>,
    /// Towns this town is at war with
    #[serde(default)]
    pub enemies: BTreeSet<TownId>,
    /// Nation membership
    #[serde(default)]
    pub nation: Option<NationId>,
}

impl Town {
    /// Creates a town with no relationships.
    #[must_use]
    pub fn new(id: TownId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            home: None,
            allies: BTreeSet::new(),
            enemies: BTreeSet::new(),
            nation: None,
        }
    }

    /// Whether `other` is in this town's ally set. `None` is never an ally.
    #[must_use]
    pub fn is_ally(&self, other: Option<TownId>) -> bool {
        other.is_some_and(|id| self.allies.contains(&id))
    }

    /// Whether `other` is in this town's enemy set. `None` is never an enemy.
    #[must_use]
    pub fn is_enemy(&self, other: Option<TownId>) -> bool {
        other.is_some_and(|id| self.enemies.contains(&id))
    }

    /// Whether `other` is this town itself or one of its allies.
    #[must_use]
    pub fn is_self_or_ally(&self, other: Option<TownId>) -> bool {
        other == Some(self.id) || self.is_ally(other)
    }
}

/// A nation grouping several towns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nation {
    /// Nation id
    pub id: NationId,
    /// Display name
    pub name: String,
}

/// A player and their current town.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resident {
    /// Player id
    pub id: ResidentId,
    /// Display name
    pub name: String,
    /// Current town membership
    #[serde(default)]
    pub town: Option<TownId>,
}
