//! Tracing setup for busyfeed
//!
//! Provides unified logging configuration for the feed server and its crates.
//!
//! # Usage
//!
//! ```ignore
//! use busyfeed_core::tracing::{init_tracing, TracingConfig, TracingOutputFormat};
//!
//! init_tracing(TracingConfig::server().with_format(TracingOutputFormat::Json))
//!     .expect("failed to initialize tracing");
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt as fmt_layer, prelude::*};

/// Crates whose events are enabled by the default filter.
const FILTER_TARGETS: &[&str] = &[
    "busyfeed",
    "busyfeed_core",
    "busyfeed_sources",
    "busyfeed_server",
    "tower_http",
];

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// Failed to set global subscriber
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// Failed to parse env filter directive
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Output format for tracing logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Human-readable pretty format (default)
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for log collectors
    Json,
}

impl TracingOutputFormat {
    /// Returns the name used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for TracingOutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TracingOutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown log format '{}' (expected pretty, compact or json)",
                other
            )),
        }
    }
}

/// Configuration for tracing initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Level for the workspace crates when `RUST_LOG` is not set
    pub level: Level,
    pub format: TracingOutputFormat,
}

impl TracingConfig {
    /// Create a config suitable for the feed server
    #[must_use]
    pub fn server() -> Self {
        Self {
            level: Level::INFO,
            format: TracingOutputFormat::Compact,
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Builds the filter directive used when `RUST_LOG` is unset.
    pub fn default_directive(&self) -> String {
        FILTER_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, self.level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Initialize tracing with the given configuration.
///
/// This should be called once at process start.
/// The `RUST_LOG` environment variable overrides the default level.
///
/// # Errors
///
/// Returns an error if the global subscriber has already been set.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.default_directive())?,
    };
    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format {
        TracingOutputFormat::Pretty => {
            tracing::subscriber::set_global_default(registry.with(fmt_layer::layer().pretty()))?
        }
        TracingOutputFormat::Compact => {
            tracing::subscriber::set_global_default(registry.with(fmt_layer::layer().compact()))?
        }
        TracingOutputFormat::Json => {
            tracing::subscriber::set_global_default(registry.with(fmt_layer::layer().json()))?
        }
    }

    Ok(())
}
