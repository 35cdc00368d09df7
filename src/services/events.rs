//! Hooks and display that write to the structured event stream.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::{ContestDisplay, Verdict, WarHooks};
use crate::error::ServiceError;
use crate::model::Town;
use crate::observability::{Event, EventEmitter};
use crate::war::{AttackOutcome, Contest};

/// Emits an [`Event`] for every contest lifecycle step.
///
/// Never vetoes anything. Used by the command-line runner as both the
/// display and the hooks of the war.
#[derive(Debug, Clone)]
pub struct EventHooks {
    emitter: Arc<EventEmitter>,
}

impl EventHooks {
    /// Creates hooks writing to `emitter`.
    #[must_use]
    pub const fn new(emitter: Arc<EventEmitter>) -> Self {
        Self { emitter }
    }
}

impl ContestDisplay for EventHooks {
    fn on_contest_created(&self, contest: &Contest, town: &Town) -> Result<(), ServiceError> {
        self.emitter.emit(Event::AttackStarted {
            timestamp: Utc::now(),
            contest: contest.id(),
            attacker: contest.attacker(),
            town: town.id,
            coord: contest.coord(),
            duration_ticks: contest.timer().total(),
        });
        Ok(())
    }

    fn on_tier_changed(&self, contest: &Contest, tier: usize) -> Result<(), ServiceError> {
        self.emitter.emit(Event::TierChanged {
            timestamp: Utc::now(),
            contest: contest.id(),
            tier,
        });
        Ok(())
    }
}

impl WarHooks for EventHooks {
    fn on_attack_cancelled(&self, contest: &Contest) {
        self.emitter.emit(Event::AttackCancelled {
            timestamp: Utc::now(),
            contest: contest.id(),
            coord: contest.coord(),
            progress: contest.progress(),
        });
    }

    fn on_attack_finishing(&self, _contest: &Contest) -> Verdict {
        Verdict::Allow
    }

    fn on_attack_finished(&self, contest: &Contest, outcome: &AttackOutcome) {
        info!(contest = %contest.id(), outcome = outcome.label(), "outcome recorded");
        self.emitter.emit(Event::AttackFinished {
            timestamp: Utc::now(),
            contest: contest.id(),
            outcome: *outcome,
        });
    }
}
