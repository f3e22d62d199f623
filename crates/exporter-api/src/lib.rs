//! exporter-api — HTTP surface of the Portainer exporter.
//!
//! Read-only routes over the shared [`SnapshotStore`]. Handlers never talk
//! to Portainer; they format whatever the collector last published.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/metrics` | Prometheus exposition of the current snapshot |
//! | GET | `/health` | Liveness and freshness of the last successful cycle |
//!
//! Any other path is a 404.

pub mod handlers;

use std::time::Duration;

use axum::Router;
use axum::routing::get;
use exporter_state::SnapshotStore;

/// Shared state for the handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: SnapshotStore,
    /// Age of the last successful cycle beyond which `/health` fails.
    pub stale_after: Duration,
}

/// Build the exporter router.
pub fn build_router(store: SnapshotStore, stale_after: Duration) -> Router {
    let state = ApiState { store, stale_after };

    Router::new()
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/health", get(handlers::health))
        .with_state(state)
}
