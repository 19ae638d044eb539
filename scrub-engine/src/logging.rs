//! Logging configuration for the scrub engine.
//!
//! The engine logs exclusively through the `tracing` facade; there is no
//! process-wide tracer object. Hosts that already install a subscriber can
//! ignore this module entirely; [`init`] is a convenience for standalone
//! use.

use crate::error::{Result, ScrubError};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base log level for engine components.
    pub base_level: Level,
    /// Whether to use JSON output format.
    pub json_format: bool,
    /// Environment-filter override; takes precedence over `base_level`.
    pub env_filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            json_format: false,
            env_filter: None,
        }
    }
}

impl LogConfig {
    /// A verbose configuration suitable for debugging detection runs.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            ..Self::default()
        }
    }

    /// A minimal configuration for production with JSON output.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            json_format: true,
            env_filter: None,
        }
    }
}

/// Installs a global `tracing` subscriber for the given configuration.
///
/// Fails if a subscriber is already installed or the filter override does
/// not parse.
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = match &config.env_filter {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| ScrubError::Configuration(format!("bad log filter: {e}")))?,
        None => EnvFilter::new(format!(
            "scrub_engine={}",
            config.base_level.to_string().to_lowercase()
        )),
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| ScrubError::Configuration(format!("logging already initialized: {e}")))
}
