//! A single running flag attack.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::timer::{ContestTimer, TimerState};
use crate::model::{BlockPos, Coord, ResidentId, TownId};

/// Process-unique contest id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContestId(pub u64);

impl fmt::Display for ContestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "contest#{}", self.0)
    }
}

/// A timed claim on one cell.
///
/// Shared as `Arc<Contest>` between the registries and the contest's
/// ticker task. The identity fields never change; progress lives in the
/// atomic [`ContestTimer`].
pub struct Contest {
    id: ContestId,
    attacker: ResidentId,
    town: TownId,
    coord: Coord,
    flag: BlockPos,
    timer: ContestTimer,
    ticker: CancellationToken,
}

impl Contest {
    pub(crate) fn new(
        id: ContestId,
        attacker: ResidentId,
        town: TownId,
        coord: Coord,
        flag: BlockPos,
        timer: ContestTimer,
    ) -> Self {
        Self {
            id,
            attacker,
            town,
            coord,
            flag,
            timer,
            ticker: CancellationToken::new(),
        }
    }

    /// Contest id.
    #[must_use]
    pub const fn id(&self) -> ContestId {
        self.id
    }

    /// Player who placed the flag.
    #[must_use]
    pub const fn attacker(&self) -> ResidentId {
        self.attacker
    }

    /// Town the attacker fought for when the flag went up.
    #[must_use]
    pub const fn town(&self) -> TownId {
        self.town
    }

    /// Cell under attack.
    #[must_use]
    pub const fn coord(&self) -> Coord {
        self.coord
    }

    /// Flag marker location.
    #[must_use]
    pub const fn flag(&self) -> &BlockPos {
        &self.flag
    }

    /// Progress clock.
    #[must_use]
    pub const fn timer(&self) -> &ContestTimer {
        &self.timer
    }

    /// Elapsed ticks.
    #[must_use]
    pub fn progress(&self) -> u64 {
        self.timer.elapsed()
    }

    /// Timer state.
    #[must_use]
    pub fn state(&self) -> TimerState {
        self.timer.state()
    }

    /// Whether the contest is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.timer.is_active()
    }

    /// Token the ticker task watches.
    pub(crate) fn ticker_token(&self) -> CancellationToken {
        self.ticker.clone()
    }

    /// Stops the ticker task. Safe to call repeatedly.
    pub(crate) fn stop_ticker(&self) {
        self.ticker.cancel();
    }
}

impl fmt::Debug for Contest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contest")
            .field("id", &self.id)
            .field("attacker", &self.attacker)
            .field("town", &self.town)
            .field("coord", &self.coord)
            .field("timer", &self.timer)
            .finish_non_exhaustive()
    }
}

/// Persisted form of a running contest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedContest {
    /// Player who placed the flag
    #[serde(rename = "id")]
    pub attacker: ResidentId,
    /// Cell under attack
    #[serde(rename = "c")]
    pub coord: Coord,
    /// Flag marker location
    #[serde(rename = "b")]
    pub flag: BlockPos,
    /// Elapsed ticks
    #[serde(rename = "p")]
    pub progress: u64,
}

impl From<&Contest> for SavedContest {
    fn from(contest: &Contest) -> Self {
        Self {
            attacker: contest.attacker,
            coord: contest.coord,
            flag: contest.flag.clone(),
            progress: contest.progress(),
        }
    }
}

/// Read-only view of an active flag, for maps and status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagSummary {
    /// Stable id derived from the cell
    pub id: String,
    /// Flag marker location
    pub flag: BlockPos,
    /// Attacking town name
    pub town_name: String,
    /// Attacking town's nation, if any
    pub nation_name: Option<String>,
    /// Progress in `[0, 1]`
    pub progress: f64,
    /// Human-readable time left
    pub time_remaining: String,
}
