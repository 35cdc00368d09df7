//! Structured war event stream.
//!
//! Typed events serialized as newline-delimited JSON, each carrying a
//! monotonically increasing sequence number.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Coord, ResidentId, TownId};
use crate::war::{AttackOutcome, ContestId};

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// Why a war run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every contest resolved
    Completed,
    /// SIGINT / Ctrl-C
    Interrupted,
    /// SIGTERM
    Terminated,
}

/// A discrete event emitted while a war runs.
///
/// Tagged with `"type"` when serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The war engine started.
    WarStarted {
        /// When the war started.
        timestamp: DateTime<Utc>,
        /// Scenario name.
        scenario: String,
        /// Number of territories on the map.
        territories: usize,
        /// Contests resumed from saved state.
        resumed_contests: usize,
    },

    /// A contest was created.
    AttackStarted {
        /// When the flag went up.
        timestamp: DateTime<Utc>,
        /// Contest id.
        contest: ContestId,
        /// Attacking player.
        attacker: ResidentId,
        /// Attacking town.
        town: TownId,
        /// Target cell.
        coord: Coord,
        /// Contest length in game ticks.
        duration_ticks: u64,
    },

    /// An attack attempt failed validation.
    AttackRejected {
        /// When the attempt was made.
        timestamp: DateTime<Utc>,
        /// Attacking player.
        attacker: ResidentId,
        /// Target cell.
        coord: Coord,
        /// Error code (e.g. `"not_enemy"`).
        reason: String,
    },

    /// A contest crossed into a new progress tier.
    TierChanged {
        /// When the tier changed.
        timestamp: DateTime<Utc>,
        /// Contest id.
        contest: ContestId,
        /// New tier index.
        tier: usize,
    },

    /// A contest was cancelled.
    AttackCancelled {
        /// When the contest was cancelled.
        timestamp: DateTime<Utc>,
        /// Contest id.
        contest: ContestId,
        /// Target cell.
        coord: Coord,
        /// Progress at cancellation, in ticks.
        progress: u64,
    },

    /// A contest ran to completion.
    AttackFinished {
        /// When the contest finished.
        timestamp: DateTime<Utc>,
        /// Contest id.
        contest: ContestId,
        /// Resolved outcome.
        outcome: AttackOutcome,
    },

    /// The war engine stopped.
    WarStopped {
        /// When the war stopped.
        timestamp: DateTime<Utc>,
        /// Why it stopped.
        reason: StopReason,
        /// Cells left occupied.
        occupied_cells: usize,
    },
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EventEnvelope {
    sequence: u64,
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Serialization or I/O failures are dropped; the event stream must never
/// take the war down with it.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Creates an emitter that discards everything.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
