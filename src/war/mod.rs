//! The flag war engine.
//!
//! A contest starts when a player plants a flag on a cell. Each contest
//! has its own ticker task advancing an atomic [`ContestTimer`]; every
//! change to the registries or the map goes through the single
//! [`FlagWar`] critical section.

pub mod contest;
pub mod manager;
pub mod outcome;
pub mod predicates;
pub mod scheduler;
pub mod timer;

pub use contest::{Contest, ContestId, FlagSummary, SavedContest};
pub use manager::{FlagWar, FlagWarBuilder, RestoreSummary, TickStatus};
pub use outcome::AttackOutcome;
pub use timer::{Advance, ContestTimer, TICKS_PER_SECOND, TimerState, format_time_remaining, tier_for};
