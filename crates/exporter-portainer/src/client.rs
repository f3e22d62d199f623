//! HTTP client for the Portainer API.
//!
//! Every request carries the API token and is bounded by the configured
//! per-request timeout. The client never retries; a failed call is reported
//! to the caller, which decides what the cycle publishes.

use std::error::Error as StdError;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use exporter_core::{AuthScheme, ExporterConfig};

use crate::PortainerApi;
use crate::error::PortainerError;
use crate::types::{
    ContainerDescriptor, Endpoint, EndpointId, EndpointsPayload, parse_container, parse_endpoint,
};

const USER_AGENT: &str = concat!("portainer-exporter/", env!("CARGO_PKG_VERSION"));

/// Portainer API client.
#[derive(Clone)]
pub struct PortainerClient {
    http: Client,
    base_url: String,
    token: String,
    auth_scheme: AuthScheme,
}

impl PortainerClient {
    /// Build a client from validated exporter configuration.
    pub fn new(config: &ExporterConfig) -> reqwest::Result<Self> {
        Self::with_settings(
            &config.portainer_url,
            config.token(),
            config.auth_scheme,
            config.request_timeout,
        )
    }

    /// Build a client from individual settings.
    pub fn with_settings(
        base_url: &str,
        token: &str,
        auth_scheme: AuthScheme,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            auth_scheme,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.auth_scheme {
            AuthScheme::ApiKey => request.header("X-API-Key", &self.token),
            AuthScheme::Bearer => request.bearer_auth(&self.token),
        }
    }

    /// GET `path` and decode the body as `T`, mapping failures onto the
    /// error taxonomy.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, PortainerError> {
        let url = format!("{}{}", self.base_url, path);
        let request = self.authorize(self.http.get(&url).query(query));

        let response = request.send().await.map_err(|e| PortainerError::Unavailable {
            url: url.clone(),
            reason: describe(&e),
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PortainerError::Auth {
                url,
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(PortainerError::Protocol {
                url,
                reason: format!("HTTP {status}"),
            });
        }

        let body = response.bytes().await.map_err(|e| PortainerError::Unavailable {
            url: url.clone(),
            reason: describe(&e),
        })?;

        serde_json::from_slice(&body).map_err(|e| PortainerError::Protocol {
            url,
            reason: format!("invalid JSON body: {e}"),
        })
    }
}

impl PortainerApi for PortainerClient {
    async fn list_endpoints(&self) -> Result<Vec<Endpoint>, PortainerError> {
        let payload: EndpointsPayload = self.get_json("/api/endpoints", &[]).await?;

        let mut endpoints = Vec::new();
        for entry in payload.into_entries() {
            match parse_endpoint(entry) {
                Ok(endpoint) => endpoints.push(endpoint),
                Err(e) => warn!(error = %e, "skipping endpoint entry"),
            }
        }

        debug!(count = endpoints.len(), "listed endpoints");
        Ok(endpoints)
    }

    async fn list_containers(
        &self,
        endpoint_id: EndpointId,
    ) -> Result<Vec<ContainerDescriptor>, PortainerError> {
        let path = format!("/api/endpoints/{endpoint_id}/docker/containers/json");
        let entries: Vec<Value> = self.get_json(&path, &[("all", "true")]).await?;

        let mut containers = Vec::with_capacity(entries.len());
        for entry in entries {
            match parse_container(entry) {
                Ok(container) => containers.push(container),
                Err(e) => warn!(endpoint_id, error = %e, "skipping container entry"),
            }
        }

        debug!(endpoint_id, count = containers.len(), "listed containers");
        Ok(containers)
    }
}

/// Render a reqwest error with its source chain; the top-level message
/// alone rarely names the actual cause.
fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        return "request timed out".to_string();
    }
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
