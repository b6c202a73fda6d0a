//! Check-in metrics.
//!
//! # Exported Metrics
//!
//! - `checkin_scans_submitted_total` - Codes sent for verification
//! - `checkin_verdicts_total{verdict}` - Verdicts by kind (confirmed, `wrong_event`, rejected)
//! - `checkin_toggles_total{command,outcome}` - Manual toggles by command and outcome
//! - `checkin_roster_fetches_total` - Roster requests issued
//! - `checkin_stale_results_total` - Results dropped because their session ended

use crate::types::ScanVerdict;
use metrics::describe_counter;
use vybeme_api::CheckInCommand;

/// Register descriptions of all check-in metrics.
///
/// Call once at startup, after the recorder is installed.
pub fn register_checkin_metrics() {
    describe_counter!(
        "checkin_scans_submitted_total",
        "Total number of decoded codes submitted for verification"
    );
    describe_counter!(
        "checkin_verdicts_total",
        "Total number of scan verdicts by kind (confirmed, wrong_event, rejected)"
    );
    describe_counter!(
        "checkin_toggles_total",
        "Total number of manual check-in toggles by command and outcome"
    );
    describe_counter!(
        "checkin_roster_fetches_total",
        "Total number of roster fetches issued"
    );
    describe_counter!(
        "checkin_stale_results_total",
        "Total number of API results discarded after their session ended"
    );

    tracing::info!("Check-in metrics registered");
}

/// Record a code submitted for verification.
pub fn record_scan_submitted() {
    metrics::counter!("checkin_scans_submitted_total").increment(1);
}

/// Record a scan verdict.
pub fn record_verdict(verdict: &ScanVerdict) {
    metrics::counter!("checkin_verdicts_total", "verdict" => verdict.label()).increment(1);
}

/// Record the outcome of a toggle request.
pub fn record_toggle(command: CheckInCommand, succeeded: bool) {
    let outcome = if succeeded { "success" } else { "failure" };
    metrics::counter!(
        "checkin_toggles_total",
        "command" => command.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a roster fetch.
pub fn record_roster_fetch() {
    metrics::counter!("checkin_roster_fetches_total").increment(1);
}

/// Record a result dropped as stale.
pub fn record_stale_result() {
    metrics::counter!("checkin_stale_results_total").increment(1);
}
