//! Domain types for container metrics.
//!
//! Upstream state and health strings are classified into small closed
//! enums whose integer values are the exported gauge values.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// ── Classifiers ───────────────────────────────────────────────────

/// Docker container lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerState {
    Exited,
    Running,
    Paused,
    Created,
    Restarting,
    Dead,
    Unknown,
}

impl ContainerState {
    /// Classify a Docker state string.
    ///
    /// Only the exact lowercase Docker vocabulary is recognised; anything
    /// else, including case variants, is `Unknown`.
    pub fn classify(raw: &str) -> Self {
        match raw {
            "exited" => Self::Exited,
            "running" => Self::Running,
            "paused" => Self::Paused,
            "created" => Self::Created,
            "restarting" => Self::Restarting,
            "dead" => Self::Dead,
            _ => Self::Unknown,
        }
    }

    /// Value exported on the `container_state` gauge.
    pub fn gauge_value(self) -> u8 {
        match self {
            Self::Exited => 0,
            Self::Running => 1,
            Self::Paused => 2,
            Self::Created => 3,
            Self::Restarting => 4,
            Self::Dead => 5,
            Self::Unknown => 6,
        }
    }
}

/// Docker health check status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthStatus {
    /// No health check configured.
    None,
    Healthy,
    Unhealthy,
    Starting,
}

impl HealthStatus {
    /// Classify a Docker health status string. Absent, empty and
    /// unrecognised values are `None`.
    pub fn classify(raw: Option<&str>) -> Self {
        match raw {
            Some("healthy") => Self::Healthy,
            Some("unhealthy") => Self::Unhealthy,
            Some("starting") => Self::Starting,
            _ => Self::None,
        }
    }

    /// Value exported on the `container_health` gauge.
    pub fn gauge_value(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Healthy => 1,
            Self::Unhealthy => 2,
            Self::Starting => 3,
        }
    }
}

// ── Records ───────────────────────────────────────────────────────

/// One observed container in one collection cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerMetricRecord {
    /// Container name without the leading `/`.
    pub name: String,
    /// Display name of the owning Docker host.
    pub hostname: String,
    /// Image reference, possibly with registry and tag.
    pub image: String,
    pub state: ContainerState,
    pub health: HealthStatus,
    pub restart_count: u64,
}

// ── Snapshot ──────────────────────────────────────────────────────

/// The complete result of one collection cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub records: Vec<ContainerMetricRecord>,
    /// Whether the cycle that produced this snapshot reached Portainer.
    pub up: bool,
    /// Unix timestamp (seconds) of the last successful cycle, 0 if none.
    pub last_scrape_timestamp: u64,
    /// Cycle-level error message when `up` is false.
    pub last_error: Option<String>,
}

impl Snapshot {
    /// The snapshot served before the first cycle finishes.
    pub fn initial() -> Self {
        Self {
            records: Vec::new(),
            up: false,
            last_scrape_timestamp: 0,
            last_error: None,
        }
    }

    /// A successful cycle's snapshot.
    pub fn collected(records: Vec<ContainerMetricRecord>, timestamp: u64) -> Self {
        Self {
            records,
            up: true,
            last_scrape_timestamp: timestamp,
            last_error: None,
        }
    }

    /// A failed cycle's snapshot: no records, and the timestamp of the
    /// last successful cycle carried over from `previous`.
    pub fn failed(previous: &Snapshot, error: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            up: false,
            last_scrape_timestamp: previous.last_scrape_timestamp,
            last_error: Some(error.into()),
        }
    }

    /// Seconds since the last successful cycle, or `None` if there never
    /// was one.
    pub fn age_secs(&self, now: u64) -> Option<u64> {
        (self.last_scrape_timestamp > 0).then(|| now.saturating_sub(self.last_scrape_timestamp))
    }

    /// Whether the last successful cycle finished within `stale_after`.
    pub fn is_fresh(&self, now: u64, stale_after: Duration) -> bool {
        self.age_secs(now)
            .is_some_and(|age| age <= stale_after.as_secs())
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::initial()
    }
}

/// Current Unix time in whole seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
