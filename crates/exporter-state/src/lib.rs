//! exporter-state — domain types and the shared snapshot store.
//!
//! # Architecture
//!
//! ```text
//! Collector ──publish(Snapshot)──► SnapshotStore ◄──current()── HTTP handlers
//! ```
//!
//! A `Snapshot` is immutable once built. The `SnapshotStore` holds an
//! `Arc<Snapshot>` and swaps it whole, so a reader always sees one complete
//! cycle's result. The store is `Clone` + `Send` + `Sync` and is handed to
//! both the collector and the router at construction time.

pub mod store;
pub mod types;

pub use store::SnapshotStore;
pub use types::*;
