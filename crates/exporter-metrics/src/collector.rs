//! Collector — polls Portainer and publishes one snapshot per cycle.
//!
//! A cycle never fails outward: every upstream error is turned into a
//! degraded snapshot so the loop keeps its schedule.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use exporter_portainer::{ContainerDescriptor, PortainerApi};
use exporter_state::{
    ContainerMetricRecord, ContainerState, HealthStatus, Snapshot, SnapshotStore, epoch_secs,
};

/// Periodically collects container state from Portainer into a
/// [`SnapshotStore`].
pub struct Collector<A> {
    api: A,
    store: SnapshotStore,
    interval: Duration,
}

impl<A: PortainerApi> Collector<A> {
    /// Create a collector that publishes into `store` every `interval`.
    pub fn new(api: A, store: SnapshotStore, interval: Duration) -> Self {
        Self {
            api,
            store,
            interval,
        }
    }

    /// Run one full cycle and publish its snapshot.
    pub async fn collect_once(&self) -> Arc<Snapshot> {
        let started = Instant::now();

        let endpoints = match self.api.list_endpoints().await {
            Ok(endpoints) => endpoints,
            Err(e) => {
                error!(error = %e, kind = e.kind(), "endpoint listing failed, publishing degraded snapshot");
                let previous = self.store.current();
                return self.store.publish(Snapshot::failed(&previous, e.to_string()));
            }
        };

        // Listings run concurrently; join_all keeps them in endpoint order.
        let listings = join_all(
            endpoints
                .iter()
                .map(|endpoint| self.api.list_containers(endpoint.id)),
        )
        .await;

        let mut records = Vec::new();
        let mut failed_endpoints = 0usize;
        for (endpoint, listing) in endpoints.iter().zip(listings) {
            let hostname = endpoint.name.to_lowercase();
            match listing {
                Ok(containers) => {
                    debug!(endpoint_id = endpoint.id, %hostname, containers = containers.len(), "endpoint collected");
                    records.extend(containers.into_iter().map(|c| to_record(&hostname, c)));
                }
                Err(e) => {
                    failed_endpoints += 1;
                    warn!(
                        endpoint_id = endpoint.id,
                        %hostname,
                        error = %e,
                        kind = e.kind(),
                        "container listing failed, endpoint contributes no containers"
                    );
                }
            }
        }

        info!(
            endpoints = endpoints.len(),
            failed_endpoints,
            containers = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "collection cycle complete"
        );

        self.store.publish(Snapshot::collected(records, epoch_secs()))
    }

    /// Run the collection loop until shutdown signal.
    ///
    /// The first cycle starts immediately. Cycles never overlap: a cycle
    /// that overruns the interval delays the next tick. A shutdown signal
    /// abandons an in-flight cycle.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "collector started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = self.collect_once() => {}
                        _ = shutdown.changed() => {
                            info!("collector shutting down, abandoning in-flight cycle");
                            break;
                        }
                    }
                }
                _ = shutdown.changed() => {
                    info!("collector shutting down");
                    break;
                }
            }
        }
    }
}

/// Classify one container listing entry.
fn to_record(hostname: &str, container: ContainerDescriptor) -> ContainerMetricRecord {
    ContainerMetricRecord {
        name: container.name.trim_start_matches('/').to_string(),
        hostname: hostname.to_string(),
        image: container.image,
        state: ContainerState::classify(&container.state),
        health: HealthStatus::classify(container.health.as_deref()),
        restart_count: container.restart_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use exporter_portainer::{Endpoint, EndpointId, PortainerError};

    /// In-memory Portainer: `None` container listings fail as unreachable.
    #[derive(Default)]
    struct FakePortainer {
        endpoints: Vec<Endpoint>,
        containers: HashMap<EndpointId, Option<Vec<ContainerDescriptor>>>,
        fail_endpoints: Arc<AtomicBool>,
        endpoint_calls: Arc<AtomicUsize>,
        endpoint_delay: Option<Duration>,
        container_delays: HashMap<EndpointId, Duration>,
    }

    impl<A: PortainerApi> Collector<A> {
        fn store(&self) -> &SnapshotStore {
            &self.store
        }
    }

    impl FakePortainer {
        fn with_endpoint(mut self, id: EndpointId, name: &str, containers: Option<Vec<ContainerDescriptor>>) -> Self {
            self.endpoints.push(Endpoint { id, name: name.to_string() });
            self.containers.insert(id, containers);
            self
        }
    }

    impl PortainerApi for FakePortainer {
        async fn list_endpoints(&self) -> Result<Vec<Endpoint>, PortainerError> {
            self.endpoint_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.endpoint_delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_endpoints.load(Ordering::SeqCst) {
                return Err(PortainerError::Auth {
                    url: "http://portainer/api/endpoints".to_string(),
                    status: 401,
                });
            }
            Ok(self.endpoints.clone())
        }

        async fn list_containers(
            &self,
            endpoint_id: EndpointId,
        ) -> Result<Vec<ContainerDescriptor>, PortainerError> {
            if let Some(delay) = self.container_delays.get(&endpoint_id) {
                tokio::time::sleep(*delay).await;
            }
            match self.containers.get(&endpoint_id) {
                Some(Some(containers)) => Ok(containers.clone()),
                _ => Err(PortainerError::Unavailable {
                    url: format!("http://portainer/api/endpoints/{endpoint_id}/docker/containers/json"),
                    reason: "connection refused".to_string(),
                }),
            }
        }
    }

    fn container(name: &str, image: &str, state: &str, health: Option<&str>, restarts: u64) -> ContainerDescriptor {
        ContainerDescriptor {
            name: name.to_string(),
            image: image.to_string(),
            state: state.to_string(),
            health: health.map(str::to_string),
            restart_count: restarts,
        }
    }

    fn collector(api: FakePortainer) -> Collector<FakePortainer> {
        Collector::new(api, SnapshotStore::new(), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn collects_and_classifies_all_endpoints() {
        let api = FakePortainer::default()
            .with_endpoint(1, "host-a", Some(vec![container("/web", "nginx:latest", "running", Some("healthy"), 2)]))
            .with_endpoint(2, "host-b", Some(vec![container("/db", "postgres:15", "exited", None, 0)]));
        let collector = collector(api);

        let snap = collector.collect_once().await;
        assert!(snap.up);
        assert!(snap.last_scrape_timestamp > 0);
        assert_eq!(snap.last_error, None);
        assert_eq!(
            snap.records,
            vec![
                ContainerMetricRecord {
                    name: "web".to_string(),
                    hostname: "host-a".to_string(),
                    image: "nginx:latest".to_string(),
                    state: ContainerState::Running,
                    health: HealthStatus::Healthy,
                    restart_count: 2,
                },
                ContainerMetricRecord {
                    name: "db".to_string(),
                    hostname: "host-b".to_string(),
                    image: "postgres:15".to_string(),
                    state: ContainerState::Exited,
                    health: HealthStatus::None,
                    restart_count: 0,
                },
            ]
        );
        assert_eq!(collector.store().current(), snap);
    }

    #[tokio::test]
    async fn endpoint_listing_failure_keeps_previous_timestamp() {
        let api = FakePortainer::default()
            .with_endpoint(1, "host-a", Some(vec![container("/web", "nginx:latest", "running", None, 0)]));
        let fail = Arc::clone(&api.fail_endpoints);
        let collector = collector(api);

        let ok = collector.collect_once().await;
        assert!(ok.up);

        fail.store(true, Ordering::SeqCst);
        let failed = collector.collect_once().await;
        assert!(!failed.up);
        assert!(failed.records.is_empty());
        assert_eq!(failed.last_scrape_timestamp, ok.last_scrape_timestamp);
        assert!(failed.last_error.as_deref().unwrap().contains("401"));
    }

    #[tokio::test]
    async fn endpoint_listing_failure_before_any_success() {
        let api = FakePortainer::default();
        api.fail_endpoints.store(true, Ordering::SeqCst);
        let collector = collector(api);

        let snap = collector.collect_once().await;
        assert!(!snap.up);
        assert_eq!(snap.last_scrape_timestamp, 0);
    }

    #[tokio::test]
    async fn one_failing_endpoint_does_not_blank_the_others() {
        let api = FakePortainer::default()
            .with_endpoint(1, "host-a", Some(vec![container("/a1", "img:a", "running", None, 0)]))
            .with_endpoint(2, "host-b", None)
            .with_endpoint(3, "host-c", Some(vec![
                container("/c1", "img:c", "paused", None, 0),
                container("/c2", "img:c", "dead", Some("unhealthy"), 7),
            ]));
        let collector = collector(api);

        let snap = collector.collect_once().await;
        assert!(snap.up);
        let hosts: Vec<(&str, &str)> = snap
            .records
            .iter()
            .map(|r| (r.hostname.as_str(), r.name.as_str()))
            .collect();
        assert_eq!(hosts, vec![("host-a", "a1"), ("host-c", "c1"), ("host-c", "c2")]);
    }

    #[tokio::test]
    async fn slow_endpoint_does_not_hold_up_the_others() {
        // Endpoint 2 hangs until its request times out; 1 and 3 are slow but answer.
        let mut api = FakePortainer::default()
            .with_endpoint(1, "host-a", Some(vec![container("/a1", "img:a", "running", None, 0)]))
            .with_endpoint(2, "host-b", None)
            .with_endpoint(3, "host-c", Some(vec![container("/c1", "img:c", "running", None, 0)]));
        for id in [1, 2, 3] {
            api.container_delays.insert(id, Duration::from_millis(500));
        }
        let collector = collector(api);

        let started = Instant::now();
        let snap = collector.collect_once().await;
        let elapsed = started.elapsed();

        assert!(snap.up);
        let hosts: Vec<&str> = snap.records.iter().map(|r| r.hostname.as_str()).collect();
        assert_eq!(hosts, vec!["host-a", "host-c"]);
        // Listed one after another this would take at least 1.5s.
        assert!(elapsed < Duration::from_millis(1_200), "cycle took {elapsed:?}");
    }

    #[tokio::test]
    async fn hostname_is_lowercased_and_name_stripped() {
        let api = FakePortainer::default()
            .with_endpoint(1, "Prod-Host", Some(vec![container("//nested", "img", "Running", Some("Healthy"), 0)]));
        let snap = collector(api).collect_once().await;

        let record = &snap.records[0];
        assert_eq!(record.hostname, "prod-host");
        assert_eq!(record.name, "nested");
        assert_eq!(record.state, ContainerState::Unknown);
        assert_eq!(record.health, HealthStatus::None);
    }

    #[tokio::test]
    async fn duplicates_are_kept() {
        let api = FakePortainer::default().with_endpoint(
            1,
            "host-a",
            Some(vec![
                container("/web", "nginx", "running", None, 0),
                container("/web", "nginx", "running", None, 0),
            ]),
        );
        let snap = collector(api).collect_once().await;
        assert_eq!(snap.records.len(), 2);
    }

    #[tokio::test]
    async fn zero_endpoints_is_a_successful_empty_cycle() {
        let snap = collector(FakePortainer::default()).collect_once().await;
        assert!(snap.up);
        assert!(snap.records.is_empty());
    }

    #[tokio::test]
    async fn loop_keeps_running_after_failures() {
        let api = FakePortainer::default();
        api.fail_endpoints.store(true, Ordering::SeqCst);
        let calls = Arc::clone(&api.endpoint_calls);
        let collector = collector(api);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { collector.run(shutdown_rx).await });

        tokio::time::sleep(Duration::from_millis(300)).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("collector stops on shutdown")
            .unwrap();

        assert!(calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn shutdown_abandons_in_flight_cycle() {
        let api = FakePortainer {
            endpoint_delay: Some(Duration::from_secs(30)),
            ..FakePortainer::default()
        };
        let calls = Arc::clone(&api.endpoint_calls);
        let collector = Collector::new(api, SnapshotStore::new(), Duration::from_secs(60));
        let store = collector.store().clone();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { collector.run(shutdown_rx).await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("collector stops without waiting for the cycle")
            .unwrap();
        assert_eq!(*store.current(), Snapshot::initial());
    }
}
