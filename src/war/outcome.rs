//! What happened when a contest ran to completion.

use serde::Serialize;

use crate::model::{Coord, TerritoryId, TownId};

/// Result of a finished contest. Exactly one applies per finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttackOutcome {
    /// A finish hook vetoed the result; nothing changed hands
    Vetoed {
        /// Contested cell
        coord: Coord,
    },
    /// Core cell retaken by the owner's side; occupation ended
    TerritoryLiberated {
        /// Liberated territory
        territory: TerritoryId,
        /// Town that had occupied it
        from: Option<TownId>,
    },
    /// Core cell taken by a hostile town; the territory is now occupied
    TerritoryCaptured {
        /// Captured territory
        territory: TerritoryId,
        /// Owning town
        from: Option<TownId>,
        /// New occupier
        by: TownId,
    },
    /// Owner took back a cell inside its occupied territory
    CellLiberated {
        /// Cell
        coord: Coord,
        /// Territory occupier it was taken back from
        from: TownId,
    },
    /// Owner or territory occupier cleared a hostile cell hold
    CellDefended {
        /// Cell
        coord: Coord,
        /// Town whose hold was cleared, if any
        against: Option<TownId>,
    },
    /// Attacker now holds the cell
    CellCaptured {
        /// Cell
        coord: Coord,
        /// Owner of the territory
        from: Option<TownId>,
        /// New cell occupier
        by: TownId,
    },
}

impl AttackOutcome {
    /// Short snake-case label for metrics and logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Vetoed { .. } => "vetoed",
            Self::TerritoryLiberated { .. } => "territory_liberated",
            Self::TerritoryCaptured { .. } => "territory_captured",
            Self::CellLiberated { .. } => "cell_liberated",
            Self::CellDefended { .. } => "cell_defended",
            Self::CellCaptured { .. } => "cell_captured",
        }
    }

    /// Whether ownership or occupation changed.
    #[must_use]
    pub const fn changed_hands(&self) -> bool {
        !matches!(self, Self::Vetoed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_kind_tag() {
        let outcome = AttackOutcome::CellCaptured {
            coord: Coord::new(1, 2),
            from: Some(TownId(2)),
            by: TownId(1),
        };
        let json = serde_json::to_value(outcome).unwrap();
        assert_eq!(json["kind"], "cell_captured");
        assert_eq!(json["by"], 1);
        assert_eq!(outcome.label(), "cell_captured");
        assert!(outcome.changed_hands());
    }

    #[test]
    fn veto_changes_nothing() {
        let outcome = AttackOutcome::Vetoed {
            coord: Coord::new(0, 0),
        };
        assert!(!outcome.changed_hands());
        assert_eq!(outcome.label(), "vetoed");
    }
}
