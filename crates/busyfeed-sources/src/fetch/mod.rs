//! Resolving source descriptors into calendar text.
//!
//! The [`CalendarFetcher`] trait is the seam between the aggregation loop and
//! I/O. [`HttpFetcher`] reads local files and performs plain HTTP GETs;
//! [`MemoryFetcher`] serves canned responses.

mod config;
mod http;

pub use config::FetchConfig;
pub use http::HttpFetcher;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::descriptor::SourceDescriptor;
use crate::error::{SourceError, SourceErrorCode, SourceResult};

/// A boxed future that is Send.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The decoded contents of one calendar source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCalendar {
    /// Where the text came from.
    pub source: SourceDescriptor,
    /// The calendar text, decoded lossily from UTF-8.
    pub text: String,
}

impl RawCalendar {
    /// Creates a raw calendar from already-decoded text.
    pub fn new(source: SourceDescriptor, text: impl Into<String>) -> Self {
        Self {
            source,
            text: text.into(),
        }
    }

    /// Decodes bytes, replacing invalid UTF-8 sequences.
    pub fn from_bytes(source: SourceDescriptor, bytes: &[u8]) -> Self {
        Self {
            source,
            text: String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

/// Something that can turn a [`SourceDescriptor`] into calendar text.
///
/// Implementations must be `Send + Sync`; the aggregation loop shares one
/// fetcher across concurrently running fetches.
pub trait CalendarFetcher: Send + Sync {
    /// Returns a short name for this fetcher, used in logs.
    fn name(&self) -> &str;

    /// Fetches one source.
    ///
    /// The future resolves to a [`SourceErrorCode::Cancelled`] error as soon
    /// as `cancel` fires.
    fn fetch<'a>(
        &'a self,
        source: &'a SourceDescriptor,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, SourceResult<RawCalendar>>;
}

/// A fetcher that serves fixed responses keyed by descriptor.
///
/// Descriptors without a response fail with a fetch error.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    responses: HashMap<SourceDescriptor, Result<String, (SourceErrorCode, String)>>,
}

impl MemoryFetcher {
    /// Creates an empty fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `text` for `source`.
    pub fn with_calendar(mut self, source: SourceDescriptor, text: impl Into<String>) -> Self {
        self.responses.insert(source, Ok(text.into()));
        self
    }

    /// Fails `source` with the given error code.
    pub fn with_failure(
        mut self,
        source: SourceDescriptor,
        code: SourceErrorCode,
        message: impl Into<String>,
    ) -> Self {
        self.responses.insert(source, Err((code, message.into())));
        self
    }
}

impl CalendarFetcher for MemoryFetcher {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch<'a>(
        &'a self,
        source: &'a SourceDescriptor,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, SourceResult<RawCalendar>> {
        Box::pin(async move {
            if cancel.is_cancelled() {
                return Err(SourceError::cancelled("fetch cancelled").with_origin(source.to_string()));
            }
            match self.responses.get(source) {
                Some(Ok(text)) => Ok(RawCalendar::new(source.clone(), text.clone())),
                Some(Err((code, message))) => {
                    Err(SourceError::new(*code, message.clone()).with_origin(source.to_string()))
                }
                None => Err(SourceError::fetch("no such source").with_origin(source.to_string())),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_is_lossy() {
        let raw = RawCalendar::from_bytes(
            SourceDescriptor::local("/x.ics"),
            b"BEGIN:VCALENDAR\xff\r\n",
        );
        assert_eq!(raw.text, "BEGIN:VCALENDAR\u{fffd}\r\n");
    }

    #[tokio::test]
    async fn memory_fetcher_serves_and_fails() {
        let ok = SourceDescriptor::local("/ok.ics");
        let bad = SourceDescriptor::local("/bad.ics");
        let fetcher = MemoryFetcher::new()
            .with_calendar(ok.clone(), "BEGIN:VCALENDAR")
            .with_failure(bad.clone(), SourceErrorCode::Timeout, "slow");
        let cancel = CancellationToken::new();

        assert_eq!(fetcher.name(), "memory");
        assert_eq!(fetcher.fetch(&ok, &cancel).await.unwrap().text, "BEGIN:VCALENDAR");

        let err = fetcher.fetch(&bad, &cancel).await.unwrap_err();
        assert_eq!(err.code(), SourceErrorCode::Timeout);
        assert_eq!(err.origin(), Some("/bad.ics"));

        let err = fetcher
            .fetch(&SourceDescriptor::local("/missing.ics"), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.code(), SourceErrorCode::Fetch);
    }

    #[tokio::test]
    async fn memory_fetcher_honours_cancellation() {
        let source = SourceDescriptor::local("/ok.ics");
        let fetcher = MemoryFetcher::new().with_calendar(source.clone(), "x");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = fetcher.fetch(&source, &cancel).await.unwrap_err();
        assert_eq!(err.code(), SourceErrorCode::Cancelled);
    }
}
