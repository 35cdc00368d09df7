//! Collaborators the war engine talks to.
//!
//! The engine never renders, stores or queries the world itself. It calls
//! these traits from inside its critical section, so implementations must
//! be quick and must not call back into the engine.

pub mod events;
pub mod persistence;

pub use events::EventHooks;
pub use persistence::{JsonFilePersistence, NoPersistence, SavedWar, WarPersistence};

use crate::error::ServiceError;
use crate::model::{BlockPos, Coord, ResidentId, TerritoryId, Town, TownId};
use crate::war::{AttackOutcome, Contest};

// ============================================================================
// World
// ============================================================================

/// Block-level queries and flag marker placement.
pub trait WorldSurface: Send + Sync {
    /// Places the flag marker for a new contest.
    ///
    /// # Errors
    ///
    /// Returns an error when the marker could not be placed. The contest
    /// still runs.
    fn place_marker(&self, flag: &BlockPos, town: TownId) -> Result<(), ServiceError>;

    /// Removes a flag marker.
    ///
    /// # Errors
    ///
    /// Returns an error when the marker could not be removed.
    fn remove_marker(&self, flag: &BlockPos) -> Result<(), ServiceError>;

    /// Whether the marker at `flag` is still standing.
    fn marker_intact(&self, flag: &BlockPos) -> bool;

    /// Whether nothing blocks the sky above the flag.
    fn has_unobstructed_sky_above(&self, flag: &BlockPos) -> bool;

    /// Highest buildable block in a world.
    fn max_build_height(&self, world: &str) -> i32;
}

/// World where every marker stands and nothing blocks the sky.
#[derive(Debug, Clone, Copy)]
pub struct OpenSky {
    max_height: i32,
}

impl OpenSky {
    /// Creates an open world with the given build height.
    #[must_use]
    pub const fn new(max_height: i32) -> Self {
        Self { max_height }
    }
}

impl Default for OpenSky {
    fn default() -> Self {
        Self::new(320)
    }
}

impl WorldSurface for OpenSky {
    fn place_marker(&self, _flag: &BlockPos, _town: TownId) -> Result<(), ServiceError> {
        Ok(())
    }

    fn remove_marker(&self, _flag: &BlockPos) -> Result<(), ServiceError> {
        Ok(())
    }

    fn marker_intact(&self, _flag: &BlockPos) -> bool {
        true
    }

    fn has_unobstructed_sky_above(&self, _flag: &BlockPos) -> bool {
        true
    }

    fn max_build_height(&self, _world: &str) -> i32 {
        self.max_height
    }
}

// ============================================================================
// Display
// ============================================================================

/// Progress feedback for running contests (boss bars, beacons, map layers).
///
/// Every method defaults to a no-op. Failures are logged by the engine and
/// never stop a contest.
#[allow(unused_variables)]
pub trait ContestDisplay: Send + Sync {
    /// A contest was registered.
    ///
    /// # Errors
    ///
    /// Returns an error when the display could not be set up.
    fn on_contest_created(&self, contest: &Contest, town: &Town) -> Result<(), ServiceError> {
        Ok(())
    }

    /// A contest crossed into a new progress tier.
    ///
    /// # Errors
    ///
    /// Returns an error when the display could not be updated.
    fn on_tier_changed(&self, contest: &Contest, tier: usize) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Periodic progress refresh.
    ///
    /// # Errors
    ///
    /// Returns an error when the display could not be updated.
    fn on_progress(&self, contest: &Contest, time_remaining: &str) -> Result<(), ServiceError> {
        Ok(())
    }

    /// A contest left the registry (cancelled or finished).
    ///
    /// # Errors
    ///
    /// Returns an error when the display could not be torn down.
    fn on_contest_removed(&self, contest: &Contest) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// Display that shows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDisplay;

impl ContestDisplay for NoDisplay {}

// ============================================================================
// Hooks
// ============================================================================

/// Answer of a vetoable hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verdict {
    /// Let the action proceed
    #[default]
    Allow,
    /// Stop the action
    Deny,
}

impl Verdict {
    /// Whether the action was denied.
    #[must_use]
    pub const fn is_denied(self) -> bool {
        matches!(self, Self::Deny)
    }
}

/// An attack that passed every built-in check and is about to start.
#[derive(Debug, Clone, Copy)]
pub struct AttackAttempt<'a> {
    /// Player placing the flag
    pub attacker: ResidentId,
    /// Attacking town
    pub town: TownId,
    /// Target cell
    pub coord: Coord,
    /// Territory of the target cell
    pub territory: TerritoryId,
    /// Owner of that territory
    pub defender: Option<TownId>,
    /// Flag location
    pub flag: &'a BlockPos,
}

/// Lifecycle hooks for other plugins.
#[allow(unused_variables)]
pub trait WarHooks: Send + Sync {
    /// Called before an attack is created. `Deny` rejects it with
    /// `AttackCustomCancel`.
    fn on_attack_starting(&self, attempt: &AttackAttempt<'_>) -> Verdict {
        Verdict::Allow
    }

    /// Called after a contest was cancelled.
    fn on_attack_cancelled(&self, contest: &Contest) {}

    /// Called when a contest completes, before the outcome is applied.
    /// `Deny` leaves ownership untouched.
    fn on_attack_finishing(&self, contest: &Contest) -> Verdict {
        Verdict::Allow
    }

    /// Called with the applied outcome.
    fn on_attack_finished(&self, contest: &Contest, outcome: &AttackOutcome) {}
}

/// Hooks that never veto anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl WarHooks for AllowAll {}
