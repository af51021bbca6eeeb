//! Shared application state.

use std::sync::Arc;

use busyfeed_sources::{CalendarFetcher, HttpFetcher};
use tokio_util::sync::CancellationToken;

use crate::aggregate::Aggregator;
use crate::config::FeedConfig;
use crate::error::ServerResult;

/// State handed to every request.
///
/// Nothing in here changes after startup; each request builds its feed from
/// scratch.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<FeedConfig>,
    pub aggregator: Aggregator,
    /// Parent of every per-request cancellation token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Creates state backed by the filesystem and HTTP fetcher.
    pub fn new(config: FeedConfig, shutdown: CancellationToken) -> ServerResult<Self> {
        let fetcher = HttpFetcher::new(config.fetch.clone())?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher), shutdown))
    }

    /// Creates state backed by the given fetcher.
    pub fn with_fetcher(
        config: FeedConfig,
        fetcher: Arc<dyn CalendarFetcher>,
        shutdown: CancellationToken,
    ) -> Self {
        let aggregator = Aggregator::new(fetcher, config.max_concurrent_fetches);
        Self {
            config: Arc::new(config),
            aggregator,
            shutdown,
        }
    }
}
