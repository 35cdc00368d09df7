//! World model: towns, territories, cells and the map arena that owns them.
//!
//! Everything is addressed by id. Relationships between towns are plain
//! id sets, so the graph survives reloads without dangling references.

pub mod map;
pub mod territory;
pub mod town;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use map::TerritoryMap;
pub use territory::{ActiveAttack, Cell, Territory};
pub use town::{Nation, Resident, Town};

/// Identifier of a town.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TownId(pub u64);

impl fmt::Display for TownId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "town#{}", self.0)
    }
}

/// Identifier of a nation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NationId(pub u64);

/// Identifier of a territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TerritoryId(pub u64);

impl fmt::Display for TerritoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "territory#{}", self.0)
    }
}

/// Identifier of a player (stable across sessions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResidentId(pub Uuid);

impl ResidentId {
    /// Generates a fresh random resident id.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ResidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chunk coordinate of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    /// West-east axis
    pub x: i32,
    /// North-south axis
    pub z: i32,
}

impl Coord {
    /// Creates a coordinate.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The four orthogonal neighbors: north, south, west, east.
    #[must_use]
    pub const fn neighbors(self) -> [Self; 4] {
        [
            Self::new(self.x, self.z - 1),
            Self::new(self.x, self.z + 1),
            Self::new(self.x - 1, self.z),
            Self::new(self.x + 1, self.z),
        ]
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Block position of a flag marker.
///
/// Opaque to the war engine beyond equality and the `y` height check;
/// the world and display collaborators interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    /// World name
    pub world: String,
    /// Block x
    pub x: i32,
    /// Block y (height)
    pub y: i32,
    /// Block z
    pub z: i32,
}

impl BlockPos {
    /// Creates a block position.
    #[must_use]
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// Chunk coordinate containing this block (16x16 columns).
    #[must_use]
    pub const fn coord(&self) -> Coord {
        Coord::new(self.x >> 4, self.z >> 4)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{},{},{}", self.world, self.x, self.y, self.z)
    }
}
