//! exporter-metrics — collection and exposition for the Portainer exporter.
//!
//! # Architecture
//!
//! ```text
//! Collector
//!   ├── collect_once() → list endpoints, list containers per endpoint,
//!   │                    classify, publish Snapshot to SnapshotStore
//!   └── run() → fixed-interval loop until shutdown
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for /metrics
//! ```
//!
//! A failed endpoint listing publishes `up=false` with the previous
//! timestamp; a failed container listing only drops that endpoint's
//! containers from the cycle.

pub mod collector;
pub mod prometheus;

pub use collector::Collector;
pub use prometheus::{CONTENT_TYPE, render_prometheus};
