//! Feed configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use busyfeed_core::{DEFAULT_COLOR, Operator};
use busyfeed_sources::FetchConfig;

use crate::error::{ServerError, ServerResult};

/// How busy time is laid out in the feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedStyle {
    /// One VFREEBUSY per source calendar.
    #[default]
    FreeBusy,
    /// One opaque `Busy` VEVENT per distinct interval.
    Events,
}

impl FeedStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FreeBusy => "freebusy",
            Self::Events => "events",
        }
    }
}

impl fmt::Display for FeedStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "freebusy" => Ok(Self::FreeBusy),
            "events" => Ok(Self::Events),
            other => Err(format!(
                "unknown feed style '{}' (expected freebusy or events)",
                other
            )),
        }
    }
}

/// Everything a request needs to build the feed.
///
/// Operator identity and the collections root have no defaults; requests
/// fail with a configuration error while they are unset.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Operator display name.
    pub name: Option<String>,

    /// Operator email address.
    pub email: Option<String>,

    /// Root of the calendar collections tree.
    pub root_dir: Option<PathBuf>,

    /// Feed layout.
    pub style: FeedStyle,

    /// Calendar color for the events style.
    pub color: String,

    /// Fetch timeout and user agent.
    pub fetch: FetchConfig,

    /// Maximum number of sources fetched at once.
    pub max_concurrent_fetches: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            name: None,
            email: None,
            root_dir: None,
            style: FeedStyle::default(),
            color: DEFAULT_COLOR.to_string(),
            fetch: FetchConfig::default(),
            max_concurrent_fetches: Self::DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}

impl FeedConfig {
    /// Default fetch parallelism.
    pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

    /// Creates a configuration with the required fields set.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        root_dir: impl Into<PathBuf>,
    ) -> Self {
        Self::default()
            .with_name(name)
            .with_email(email)
            .with_root_dir(root_dir)
    }

    /// Builder: set the operator name. Empty strings count as unset.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = non_empty(name.into());
        self
    }

    /// Builder: set the operator email. Empty strings count as unset.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = non_empty(email.into());
        self
    }

    /// Builder: set the collections root.
    pub fn with_root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(root_dir.into());
        self
    }

    /// Builder: set the feed style.
    pub fn with_style(mut self, style: FeedStyle) -> Self {
        self.style = style;
        self
    }

    /// Builder: set the calendar color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Builder: set the per-source fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch = self.fetch.with_timeout(timeout);
        self
    }

    /// Builder: set fetch parallelism. Zero is raised to one.
    pub fn with_max_concurrent_fetches(mut self, max: usize) -> Self {
        self.max_concurrent_fetches = max.max(1);
        self
    }

    /// Returns the operator identity.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the name or email is unset.
    pub fn operator(&self) -> ServerResult<Operator> {
        let name = self
            .name
            .as_deref()
            .ok_or_else(|| ServerError::missing("name", "BUSYFEED_NAME"))?;
        let email = self
            .email
            .as_deref()
            .ok_or_else(|| ServerError::missing("email", "BUSYFEED_EMAIL"))?;
        Ok(Operator::new(name, email))
    }

    /// Returns the collections root.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if it is unset.
    pub fn root_dir(&self) -> ServerResult<&Path> {
        self.root_dir
            .as_deref()
            .ok_or_else(|| ServerError::missing("root-dir", "BUSYFEED_ROOT_DIR"))
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
