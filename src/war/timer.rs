//! Per-contest progression clock.
//!
//! Lock-free atomic state, advanced by the contest's own ticker task
//! while the registries stay behind the war lock. Terminal transitions go
//! through compare-and-swap so exactly one caller observes `Finished`.

use std::sync::atomic::{AtomicU8, AtomicU64, AtomicUsize, Ordering};

/// Game ticks per second of game time.
pub const TICKS_PER_SECOND: u64 = 20;

/// Lifecycle of a contest timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Counting up
    Active,
    /// Reached its total duration
    Finished,
    /// Stopped before completion
    Cancelled,
}

impl TimerState {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Active => 0,
            Self::Finished => 1,
            Self::Cancelled => 2,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Active,
            1 => Self::Finished,
            _ => Self::Cancelled,
        }
    }
}

/// Result of a single [`ContestTimer::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Timer is not active; nothing changed
    Inactive,
    /// Progress moved forward
    Progressed {
        /// Elapsed ticks after the step
        elapsed: u64,
        /// New tier, when this step crossed a tier boundary
        tier_changed: Option<usize>,
    },
    /// This step completed the timer
    Finished,
}

/// Maps normalized progress onto `tier_count` display buckets.
///
/// Negative or NaN progress maps to tier 0, anything above 1.0 to the
/// last tier, and exactly 1.0 to the last tier as well.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn tier_for(progress: f64, tier_count: usize) -> usize {
    let last = tier_count.saturating_sub(1);
    if progress.is_nan() || progress <= 0.0 {
        return 0;
    }
    if progress >= 1.0 {
        return last;
    }
    ((progress * tier_count as f64) as usize).min(last)
}

/// Formats a tick count as `"42s"` or `"3m 7s"`.
#[must_use]
pub fn format_time_remaining(ticks: u64) -> String {
    let seconds = ticks / TICKS_PER_SECOND;
    if seconds < 60 {
        return format!("{seconds}s");
    }
    format!("{}m {}s", seconds / 60, seconds % 60)
}

/// Atomic elapsed/total clock with a tier cache.
pub struct ContestTimer {
    total: u64,
    tier_count: usize,
    elapsed: AtomicU64,
    tier: AtomicUsize,
    state: AtomicU8,
}

impl ContestTimer {
    /// Creates an active timer. `initial` is clamped to `total`.
    #[must_use]
    pub fn new(total: u64, initial: u64, tier_count: usize) -> Self {
        let elapsed = initial.min(total);
        let timer = Self {
            total,
            tier_count: tier_count.max(1),
            elapsed: AtomicU64::new(elapsed),
            tier: AtomicUsize::new(0),
            state: AtomicU8::new(TimerState::Active.as_u8()),
        };
        timer.tier.store(timer.current_tier(), Ordering::SeqCst);
        timer
    }

    /// Total duration in ticks.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Elapsed ticks, always within `0..=total`.
    #[must_use]
    pub fn elapsed(&self) -> u64 {
        self.elapsed.load(Ordering::SeqCst)
    }

    /// Ticks left until completion.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.elapsed())
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TimerState {
        TimerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Whether the timer still counts.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state() == TimerState::Active
    }

    /// `elapsed / total`, clamped to `[0, 1]`. A zero-length timer is complete.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn normalized(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.elapsed() as f64 / self.total as f64).clamp(0.0, 1.0)
    }

    /// Last tier reported by [`advance`](Self::advance).
    #[must_use]
    pub fn tier(&self) -> usize {
        self.tier.load(Ordering::SeqCst)
    }

    /// Number of display tiers.
    #[must_use]
    pub const fn tier_count(&self) -> usize {
        self.tier_count
    }

    fn current_tier(&self) -> usize {
        tier_for(self.normalized(), self.tier_count)
    }

    /// Moves the clock forward by `step` ticks.
    ///
    /// When the step would reach the total, elapsed is pinned to the total
    /// and the timer finishes; only the caller that wins the transition
    /// sees [`Advance::Finished`].
    pub fn advance(&self, step: u64) -> Advance {
        if !self.is_active() {
            return Advance::Inactive;
        }

        let next = self.elapsed().saturating_add(step);
        if next >= self.total {
            if self.transition(TimerState::Finished) {
                self.elapsed.store(self.total, Ordering::SeqCst);
                return Advance::Finished;
            }
            return Advance::Inactive;
        }

        self.elapsed.fetch_max(next, Ordering::SeqCst);

        let tier = self.current_tier();
        let previous = self.tier.swap(tier, Ordering::SeqCst);
        Advance::Progressed {
            elapsed: self.elapsed(),
            tier_changed: (tier != previous).then_some(tier),
        }
    }

    /// Forces `Active -> Finished` without moving the clock.
    ///
    /// Returns `true` if this call made the transition.
    pub fn finish(&self) -> bool {
        self.transition(TimerState::Finished)
    }

    /// Forces `Active -> Cancelled`. Idempotent.
    ///
    /// Returns `true` if this call made the transition.
    pub fn cancel(&self) -> bool {
        self.transition(TimerState::Cancelled)
    }

    fn transition(&self, to: TimerState) -> bool {
        self.state
            .compare_exchange(
                TimerState::Active.as_u8(),
                to.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }
}

impl std::fmt::Debug for ContestTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContestTimer")
            .field("elapsed", &self.elapsed())
            .field("total", &self.total)
            .field("tier", &self.tier())
            .field("state", &self.state())
            .finish()
    }
}
