//! Error types for calendar source operations.
//!
//! Every step of the per-source pipeline (discovery, fetch, parse,
//! classification) reports failures as a [`SourceError`]. None of them is
//! fatal for the feed as a whole: the aggregation loop logs them and moves on.

use std::fmt;
use thiserror::Error;

/// The category of a source error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceErrorCode {
    /// A sidecar file could not be read or did not describe a valid source.
    Discovery,
    /// Reading the local file or the remote URL failed (I/O, network, non-2xx).
    Fetch,
    /// The fetch did not finish within the configured timeout.
    Timeout,
    /// The fetch was abandoned because the request was cancelled.
    Cancelled,
    /// The calendar bytes are not a valid iCalendar stream.
    Parse,
    /// A single event could not be classified (bad or missing timestamps).
    Classification,
}

impl SourceErrorCode {
    /// Returns a machine-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovery => "discovery_error",
            Self::Fetch => "fetch_error",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Parse => "parse_error",
            Self::Classification => "classification_error",
        }
    }

    /// Returns true if this error drops the whole source rather than a single event.
    pub fn drops_source(&self) -> bool {
        !matches!(self, Self::Classification)
    }
}

impl fmt::Display for SourceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while processing one calendar source.
#[derive(Debug, Error)]
pub struct SourceError {
    /// The error code categorizing this error.
    code: SourceErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// The source (path or URL) the error relates to.
    origin: Option<String>,
    /// The underlying cause of this error, if any.
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SourceError {
    /// Creates a new source error with the given code and message.
    pub fn new(code: SourceErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            origin: None,
            cause: None,
        }
    }

    /// Creates a discovery error.
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::Discovery, message)
    }

    /// Creates a fetch error.
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::Fetch, message)
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::Timeout, message)
    }

    /// Creates a cancellation error.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::Cancelled, message)
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::Parse, message)
    }

    /// Creates a classification error.
    pub fn classification(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::Classification, message)
    }

    /// Sets the source this error relates to.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Sets the underlying cause of this error.
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> SourceErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the source this error relates to, if set.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref origin) = self.origin {
            write!(f, "[{}] ", origin)?;
        }
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(ref cause) = self.cause {
            write!(f, " ({})", cause)?;
        }
        Ok(())
    }
}

impl From<busyfeed_core::TimeError> for SourceError {
    fn from(err: busyfeed_core::TimeError) -> Self {
        Self::classification(err.to_string()).with_cause(err)
    }
}

/// A specialized Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;
