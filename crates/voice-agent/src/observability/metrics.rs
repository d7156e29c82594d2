//! Metrics definitions for the voice agent.
//!
//! All metrics follow Prometheus naming conventions:
//! - `va_` prefix
//! - `_total` suffix for counters
//!
//! # Cardinality
//!
//! Every label value comes from a closed set defined in code:
//! - `outcome`: joined, already_connected, failed, superseded
//! - `reason`: requested, grace_expired, stale_join, subscribe_failed
//! - `trigger`: command, connected, settled, idle, error_retry
//! - `route`: the six ingress routes plus status
//! - `status`: success, error

use crate::state::{ConnectionState, StartTrigger, TeardownReason};
use metrics::{counter, gauge};

/// Record the outcome of a connect request.
///
/// Metric: `va_connect_total`
/// Labels: `outcome`
pub fn record_connect(outcome: &'static str) {
    counter!("va_connect_total", "outcome" => outcome).increment(1);
}

/// Record a connection teardown.
///
/// Metric: `va_teardown_total`
/// Labels: `reason`
pub fn record_teardown(reason: TeardownReason) {
    counter!("va_teardown_total", "reason" => reason.as_str()).increment(1);
}

/// Record a finished playback start attempt.
///
/// Metric: `va_playback_start_total`
/// Labels: `trigger`, `status`
pub fn record_playback_start(trigger: StartTrigger, success: bool) {
    counter!("va_playback_start_total",
        "trigger" => trigger.as_str(),
        "status" => if success { "success" } else { "error" }
    )
    .increment(1);
}

/// Record a player fault (error event or failed start).
///
/// Metric: `va_player_fault_total`
pub fn record_player_fault() {
    counter!("va_player_fault_total").increment(1);
}

/// Set the connection state gauge.
///
/// Metric: `va_connection_state`
/// Values: 0 idle, 1 joining, 2 connecting, 3 connected, 4 disconnected
pub fn set_connection_state(state: ConnectionState) {
    gauge!("va_connection_state").set(state.gauge_value());
}

/// Set the occupancy gauge.
///
/// Metric: `va_occupancy`
#[allow(clippy::cast_precision_loss)] // member counts are tiny
pub fn set_occupancy(count: usize) {
    gauge!("va_occupancy").set(count as f64);
}

/// Record an ingress request.
///
/// Metric: `va_ingress_requests_total`
/// Labels: `route`, `status`
pub fn record_ingress_request(route: &'static str, status_code: u16) {
    let status = if (200..300).contains(&status_code) {
        "success"
    } else {
        "error"
    };
    counter!("va_ingress_requests_total", "route" => route, "status" => status).increment(1);
}
