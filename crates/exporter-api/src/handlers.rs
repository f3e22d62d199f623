//! Route handlers.
//!
//! Both handlers take one `Arc<Snapshot>` from the store and work from that
//! copy alone.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use serde::Serialize;
use tracing::debug;

use exporter_metrics::{CONTENT_TYPE as PROMETHEUS_CONTENT_TYPE, render_prometheus};
use exporter_state::epoch_secs;

use crate::ApiState;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// `ok` when the last successful cycle is fresh, `stale` otherwise.
    pub status: &'static str,
    /// Whether the most recent cycle reached Portainer.
    pub up: bool,
    pub last_scrape_timestamp: u64,
    pub seconds_since_last_scrape: Option<u64>,
    pub stale_after_seconds: u64,
    pub containers: usize,
    pub last_error: Option<String>,
}

// ── Prometheus ─────────────────────────────────────────────────

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let snapshot = state.store.current();
    let body = render_prometheus(&snapshot);
    debug!(containers = snapshot.records.len(), up = snapshot.up, "served metrics");
    (
        StatusCode::OK,
        [(CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        body,
    )
}

// ── Health ─────────────────────────────────────────────────────

/// GET /health
pub async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let snapshot = state.store.current();
    let now = epoch_secs();
    let fresh = snapshot.is_fresh(now, state.stale_after);

    let report = HealthReport {
        status: if fresh { "ok" } else { "stale" },
        up: snapshot.up,
        last_scrape_timestamp: snapshot.last_scrape_timestamp,
        seconds_since_last_scrape: snapshot.age_secs(now),
        stale_after_seconds: state.stale_after.as_secs(),
        containers: snapshot.records.len(),
        last_error: snapshot.last_error.clone(),
    };

    let status = if fresh {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}
