//! Observability: health probes and Prometheus metrics.
//!
//! `/metrics` renders the `metrics-exporter-prometheus` recorder installed in
//! `main`; everything else records through the `metrics` facade.

pub mod health;
pub mod metrics;

pub use health::{health_router, HealthState};

use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;

/// Router serving `GET /metrics` from the installed recorder.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    )
}
