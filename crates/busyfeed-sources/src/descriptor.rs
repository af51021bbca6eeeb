//! Calendar source descriptors.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{SourceError, SourceResult};

/// Where a calendar's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceDescriptor {
    /// A calendar file on the local filesystem.
    Local(PathBuf),
    /// A subscribed calendar served over HTTP(S).
    Remote(Url),
}

impl SourceDescriptor {
    /// Creates a local descriptor.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local(path.into())
    }

    /// Parses a subscription URL into a remote descriptor.
    ///
    /// `webcal://` and `webcals://` are rewritten to `http://` and
    /// `https://`. Any other scheme than HTTP(S) is rejected.
    pub fn remote(raw: &str) -> SourceResult<Self> {
        let raw = raw.trim();
        let normalized = rewrite_webcal(raw);
        let url = Url::parse(&normalized).map_err(|e| {
            SourceError::discovery(format!("invalid subscription URL '{}'", raw)).with_cause(e)
        })?;

        match url.scheme() {
            "http" | "https" => Ok(Self::Remote(url)),
            other => Err(SourceError::discovery(format!(
                "unsupported subscription scheme '{}'",
                other
            ))),
        }
    }

    /// Returns true for subscribed (remote) calendars.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// Returns the local path, if this is a local descriptor.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => Some(path),
            Self::Remote(_) => None,
        }
    }
}

fn rewrite_webcal(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("webcals://") {
        format!("https://{}", &raw["webcals://".len()..])
    } else if lower.starts_with("webcal://") {
        format!("http://{}", &raw["webcal://".len()..])
    } else {
        raw.to_string()
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{}", url),
        }
    }
}
