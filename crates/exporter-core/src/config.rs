//! Exporter configuration.
//!
//! Every setting is a CLI flag that falls back to an environment variable,
//! so the exporter runs from env alone inside a container. [`ConfigArgs`]
//! holds the raw values; [`ExporterConfig`] is the validated form handed to
//! the rest of the process.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::{Args, ValueEnum};
use thiserror::Error;
use url::Url;

/// Freshness window, in scrape intervals, used when `STALE_AFTER` is unset.
pub const DEFAULT_STALENESS_FACTOR: u32 = 3;

/// Upper bound for every duration setting (one day).
pub const MAX_DURATION_SECS: u64 = 24 * 60 * 60;

/// Errors that prevent the exporter from starting.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    MissingVar(&'static str),

    #[error("invalid PORTAINER_URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

/// How the API token is presented to Portainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AuthScheme {
    /// `X-API-Key: <token>` (Portainer access tokens).
    #[default]
    ApiKey,
    /// `Authorization: Bearer <token>` (JWTs from `/api/auth`).
    Bearer,
}

/// Raw configuration as read from flags and the environment.
#[derive(Clone, Args)]
pub struct ConfigArgs {
    /// Base URL of the Portainer instance, e.g. `https://portainer.local:9443`.
    #[arg(long, env = "PORTAINER_URL")]
    pub portainer_url: Option<String>,

    /// Portainer API token.
    #[arg(long, env = "PORTAINER_TOKEN", hide_env_values = true)]
    pub portainer_token: Option<String>,

    /// How the token is sent upstream.
    #[arg(long, env = "PORTAINER_AUTH_SCHEME", value_enum, default_value_t = AuthScheme::ApiKey)]
    pub auth_scheme: AuthScheme,

    /// Seconds between collection cycles.
    #[arg(long, env = "SCRAPE_INTERVAL", default_value = "30")]
    pub scrape_interval: u64,

    /// Port the metrics server listens on.
    #[arg(long, env = "LISTEN_PORT", default_value = "8081")]
    pub listen_port: u16,

    /// Address the metrics server binds to.
    #[arg(long, env = "LISTEN_ADDRESS", default_value = "0.0.0.0")]
    pub listen_address: IpAddr,

    /// Log level or tracing filter directive.
    #[arg(long, env = "LOG_LEVEL", default_value = "INFO")]
    pub log_level: String,

    /// Timeout in seconds for each upstream request.
    #[arg(long, env = "REQUEST_TIMEOUT", default_value = "10")]
    pub request_timeout: u64,

    /// Seconds without a successful cycle before `/health` reports stale.
    /// Defaults to three scrape intervals.
    #[arg(long, env = "STALE_AFTER")]
    pub stale_after: Option<u64>,
}

impl Default for ConfigArgs {
    fn default() -> Self {
        Self {
            portainer_url: None,
            portainer_token: None,
            auth_scheme: AuthScheme::ApiKey,
            scrape_interval: 30,
            listen_port: 8081,
            listen_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            log_level: "INFO".to_string(),
            request_timeout: 10,
            stale_after: None,
        }
    }
}

/// Validated exporter configuration.
#[derive(Clone)]
pub struct ExporterConfig {
    /// Portainer base URL without a trailing slash.
    pub portainer_url: String,
    token: String,
    pub auth_scheme: AuthScheme,
    pub scrape_interval: Duration,
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub request_timeout: Duration,
    pub stale_after: Duration,
}

impl ExporterConfig {
    /// The Portainer API token.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for ExporterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExporterConfig")
            .field("portainer_url", &self.portainer_url)
            .field("token", &"<redacted>")
            .field("auth_scheme", &self.auth_scheme)
            .field("scrape_interval", &self.scrape_interval)
            .field("listen_addr", &self.listen_addr)
            .field("log_level", &self.log_level)
            .field("request_timeout", &self.request_timeout)
            .field("stale_after", &self.stale_after)
            .finish()
    }
}

impl TryFrom<ConfigArgs> for ExporterConfig {
    type Error = ConfigError;

    fn try_from(args: ConfigArgs) -> Result<Self, Self::Error> {
        let raw_url = args
            .portainer_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingVar("PORTAINER_URL"))?;
        let portainer_url = normalize_base_url(&raw_url)?;

        let token = args
            .portainer_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingVar("PORTAINER_TOKEN"))?;

        let scrape_interval = bounded_secs("SCRAPE_INTERVAL", args.scrape_interval)?;
        let request_timeout = bounded_secs("REQUEST_TIMEOUT", args.request_timeout)?;
        let stale_after = match args.stale_after {
            Some(secs) => bounded_secs("STALE_AFTER", secs)?,
            None => scrape_interval
                .checked_mul(DEFAULT_STALENESS_FACTOR)
                .ok_or_else(|| ConfigError::InvalidValue {
                    var: "SCRAPE_INTERVAL",
                    reason: "too large to derive STALE_AFTER".to_string(),
                })?,
        };

        Ok(Self {
            portainer_url,
            token,
            auth_scheme: args.auth_scheme,
            scrape_interval,
            listen_addr: SocketAddr::new(args.listen_address, args.listen_port),
            log_level: args.log_level,
            request_timeout,
            stale_after,
        })
    }
}

/// A whole-second setting between 1 and [`MAX_DURATION_SECS`].
fn bounded_secs(var: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            var,
            reason: "must be at least 1 second".to_string(),
        });
    }
    if secs > MAX_DURATION_SECS {
        return Err(ConfigError::InvalidValue {
            var,
            reason: format!("must be at most {MAX_DURATION_SECS} seconds"),
        });
    }
    Ok(Duration::from_secs(secs))
}

/// Check that `raw` is an absolute http(s) URL and strip trailing slashes.
fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let parsed = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(raw.trim_end_matches('/').to_string()),
        other => Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {other:?}"),
        }),
    }
}
