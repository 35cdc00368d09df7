//! Background tasks: one ticker per contest plus the periodic save loop.
//!
//! Tasks hold only a weak handle to the engine, so dropping every
//! [`FlagWar`] clone stops them at their next firing.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::contest::Contest;
use super::manager::{FlagWar, Shared, TickStatus};

/// Smallest period a task will run at.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Spawns the ticker for `contest`.
///
/// The first firing happens one `period` after spawning. The task exits
/// when the contest's ticker token is cancelled, when the engine is
/// dropped, or when a tick reports [`TickStatus::Stopped`].
pub(crate) fn spawn_ticker(
    engine: Weak<Shared>,
    contest: Arc<Contest>,
    period: Duration,
) -> JoinHandle<()> {
    let token = contest.ticker_token();
    let period = period.max(MIN_PERIOD);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = token.cancelled() => {
                    debug!(contest = %contest.id(), "ticker cancelled");
                    break;
                }
                _ = interval.tick() => {
                    let Some(shared) = engine.upgrade() else {
                        debug!(contest = %contest.id(), "engine dropped, ticker exiting");
                        break;
                    };
                    let war = FlagWar::from_shared(shared);
                    if war.attack_tick(&contest).await == TickStatus::Stopped {
                        break;
                    }
                }
            }
        }
    })
}

/// Spawns the dirty-state save loop.
///
/// Every `period`, saves a snapshot if anything changed since the last
/// save. Exits on engine shutdown or drop.
pub(crate) fn spawn_save_loop(shared: &Arc<Shared>, period: Duration) -> JoinHandle<()> {
    let engine = Arc::downgrade(shared);
    let token = shared.shutdown_token();
    let period = period.max(MIN_PERIOD);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = token.cancelled() => {
                    debug!("save loop stopped");
                    break;
                }
                _ = interval.tick() => {
                    let Some(shared) = engine.upgrade() else {
                        break;
                    };
                    if let Err(e) = FlagWar::from_shared(shared).save_if_dirty().await {
                        warn!(error = %e, "periodic war save failed");
                    }
                }
            }
        }
    })
}
