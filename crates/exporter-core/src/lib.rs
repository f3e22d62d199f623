pub mod config;

pub use config::{AuthScheme, ConfigArgs, ConfigError, ExporterConfig};
