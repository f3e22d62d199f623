//! Prometheus text exposition format.
//!
//! Renders a [`Snapshot`] into the text format scraped by Prometheus.
//! Rendering is a pure function of the snapshot.

use exporter_state::{ContainerMetricRecord, Snapshot};

/// Content type of the rendered exposition.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render a snapshot into Prometheus text format.
///
/// Per-container gauges carry `container_name`, `hostname` and `image`
/// labels. The exporter's own `up` and timestamp gauges are always present
/// exactly once, even for an empty snapshot.
pub fn render_prometheus(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    out.push_str(
        "# HELP container_state Container state (0=exited, 1=running, 2=paused, 3=created, 4=restarting, 5=dead, 6=unknown).\n",
    );
    out.push_str("# TYPE container_state gauge\n");
    for r in &snapshot.records {
        out.push_str(&format!(
            "container_state{{{}}} {}\n",
            labels(r),
            r.state.gauge_value()
        ));
    }

    out.push_str(
        "# HELP container_health Container health status (0=none, 1=healthy, 2=unhealthy, 3=starting).\n",
    );
    out.push_str("# TYPE container_health gauge\n");
    for r in &snapshot.records {
        out.push_str(&format!(
            "container_health{{{}}} {}\n",
            labels(r),
            r.health.gauge_value()
        ));
    }

    out.push_str("# HELP container_restart_count Number of times the container has been restarted.\n");
    out.push_str("# TYPE container_restart_count gauge\n");
    for r in &snapshot.records {
        out.push_str(&format!(
            "container_restart_count{{{}}} {}\n",
            labels(r),
            r.restart_count
        ));
    }

    out.push_str("# HELP portainer_exporter_up Whether the last collection cycle reached Portainer.\n");
    out.push_str("# TYPE portainer_exporter_up gauge\n");
    out.push_str(&format!("portainer_exporter_up {}\n", u8::from(snapshot.up)));

    out.push_str(
        "# HELP portainer_exporter_last_scrape_timestamp Unix timestamp of the last successful collection cycle.\n",
    );
    out.push_str("# TYPE portainer_exporter_last_scrape_timestamp gauge\n");
    out.push_str(&format!(
        "portainer_exporter_last_scrape_timestamp {}\n",
        snapshot.last_scrape_timestamp
    ));

    out
}

fn labels(r: &ContainerMetricRecord) -> String {
    format!(
        "container_name=\"{}\",hostname=\"{}\",image=\"{}\"",
        escape_label_value(&r.name),
        escape_label_value(&r.hostname),
        escape_label_value(&r.image)
    )
}

/// Escape a label value: backslash, double quote and line feed.
fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}
