//! Portainer wire types and their conversion into descriptors.
//!
//! Listings are first parsed as a JSON array of untyped values; each entry
//! is then decoded on its own so that one bad entry is reported as a
//! [`PortainerError::MalformedRecord`] without losing the rest. Inside an
//! entry only the name is required; any other field with an unexpected type
//! is treated as absent.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::PortainerError;

/// Portainer endpoint identifier.
pub type EndpointId = i64;

/// A Docker host registered in Portainer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub id: EndpointId,
    pub name: String,
}

/// A container as listed by one endpoint, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDescriptor {
    /// Primary name as Docker reports it, usually with a leading `/`.
    pub name: String,
    pub image: String,
    /// Raw Docker state string (`running`, `exited`, ...).
    pub state: String,
    /// Raw health status string, if the container has a health check.
    pub health: Option<String>,
    pub restart_count: u64,
}

/// Endpoint listings arrive either bare or wrapped for pagination.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum EndpointsPayload {
    List(Vec<Value>),
    Paged { results: Vec<Value> },
}

impl EndpointsPayload {
    pub(crate) fn into_entries(self) -> Vec<Value> {
        match self {
            Self::List(entries) | Self::Paged { results: entries } => entries,
        }
    }
}

#[derive(Deserialize)]
struct RawEndpoint {
    #[serde(rename = "Id")]
    id: EndpointId,
    #[serde(rename = "Name", default)]
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawContainer {
    #[serde(default)]
    names: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    image: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    state: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    health: Option<RawHealth>,
    #[serde(default, deserialize_with = "lenient")]
    restart_count: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawHealth {
    #[serde(default, deserialize_with = "lenient")]
    status: Option<String>,
}

/// Decode an optional field, mapping a value of the wrong type to `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Decode one endpoint entry.
pub(crate) fn parse_endpoint(entry: Value) -> Result<Endpoint, PortainerError> {
    let raw: RawEndpoint = serde_json::from_value(entry)
        .map_err(|e| PortainerError::MalformedRecord(format!("endpoint: {e}")))?;
    Ok(Endpoint {
        id: raw.id,
        name: raw
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "unknown".to_string()),
    })
}

/// Decode one container entry.
pub(crate) fn parse_container(entry: Value) -> Result<ContainerDescriptor, PortainerError> {
    let raw: RawContainer = serde_json::from_value(entry)
        .map_err(|e| PortainerError::MalformedRecord(format!("container: {e}")))?;

    let name = raw
        .names
        .into_iter()
        .find(|n| !n.trim_start_matches('/').is_empty())
        .ok_or_else(|| PortainerError::MalformedRecord("container has no name".to_string()))?;

    let health = raw
        .health
        .and_then(|h| h.status)
        .filter(|s| !s.is_empty())
        .or_else(|| raw.status.as_deref().and_then(health_from_status_text));

    Ok(ContainerDescriptor {
        name,
        image: raw
            .image
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| "unknown".to_string()),
        state: raw.state.unwrap_or_default(),
        health,
        restart_count: raw.restart_count.unwrap_or(0),
    })
}

/// Derive the health status from Docker's human-readable `Status` column,
/// e.g. `Up 2 hours (healthy)` or `Up 3 seconds (health: starting)`.
fn health_from_status_text(status: &str) -> Option<String> {
    let status = status.to_ascii_lowercase();
    // "unhealthy" contains "healthy", so it goes first.
    let health = if status.contains("(unhealthy)") {
        "unhealthy"
    } else if status.contains("(healthy)") {
        "healthy"
    } else if status.contains("(health: starting)") {
        "starting"
    } else {
        return None;
    };
    Some(health.to_string())
}
