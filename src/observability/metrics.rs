//! Prometheus-compatible war metrics.
//!
//! Label values are drawn from closed sets (rejection codes, outcome
//! labels) so cardinality stays bounded no matter what players do.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::FlagWarError;

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Installs the global metrics recorder.
///
/// With `Some(port)` a Prometheus scrape endpoint listens on
/// `127.0.0.1:<port>`. Without a port the recorder is installed with no
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `FlagWarError::Io` if the recorder or listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), FlagWarError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| FlagWarError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!("flagwar_attacks_started_total", "Contests created");
    describe_counter!(
        "flagwar_attacks_rejected_total",
        "Attack attempts rejected, by reason"
    );
    describe_counter!("flagwar_attacks_cancelled_total", "Contests cancelled");
    describe_counter!(
        "flagwar_attacks_finished_total",
        "Contests finished, by outcome"
    );
    describe_gauge!("flagwar_active_contests", "Contests currently running");
    describe_gauge!("flagwar_occupied_cells", "Cells held by an occupier");
    describe_histogram!(
        "flagwar_save_duration_ms",
        "Time spent persisting war state in milliseconds"
    );
    describe_counter!("flagwar_save_failures_total", "Failed state saves");
}

/// Records a created contest.
pub fn record_attack_started() {
    counter!("flagwar_attacks_started_total").increment(1);
}

/// Records a rejected attack attempt by its error code.
pub fn record_attack_rejected(reason: &'static str) {
    counter!("flagwar_attacks_rejected_total", "reason" => reason).increment(1);
}

/// Records a cancelled contest.
pub fn record_attack_cancelled() {
    counter!("flagwar_attacks_cancelled_total").increment(1);
}

/// Records a finished contest by outcome label.
pub fn record_attack_finished(outcome: &'static str) {
    counter!("flagwar_attacks_finished_total", "outcome" => outcome).increment(1);
}

/// Sets the running contest gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_active_contests(count: usize) {
    gauge!("flagwar_active_contests").set(count as f64);
}

/// Sets the occupied cell gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_occupied_cells(count: usize) {
    gauge!("flagwar_occupied_cells").set(count as f64);
}

/// Records a state save.
pub fn record_save(duration: Duration, success: bool) {
    histogram!("flagwar_save_duration_ms").record(duration.as_secs_f64() * 1000.0);
    if !success {
        counter!("flagwar_save_failures_total").increment(1);
    }
}
