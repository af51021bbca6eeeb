//! HTTP free/busy feed server.
//!
//! This crate provides the `busyfeed` server that:
//! - Discovers calendar sources under a collections root on every request
//! - Fetches, parses and classifies each source concurrently
//! - Serves the merged busy time as one iCalendar feed on `GET /`
//!
//! # Example
//!
//! ```rust,no_run
//! use busyfeed_server::{AppState, FeedConfig, SignalHandler, serve};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FeedConfig::new("Jane Doe", "jane@example.com", "/var/lib/radicale/collections");
//!     let signals = SignalHandler::new();
//!     signals.spawn_listener();
//!
//!     let state = AppState::new(config, signals.token())?;
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:5000").await?;
//!     serve(listener, state).await?;
//!     Ok(())
//! }
//! ```

mod aggregate;
mod cli;
mod config;
mod error;
mod routes;
mod signals;
mod state;

pub use aggregate::{AggregateReport, Aggregator, FeedOptions};
pub use cli::Cli;
pub use config::{FeedConfig, FeedStyle};
pub use error::{ServerError, ServerResult};
pub use routes::{CALENDAR_CONTENT_TYPE, router};
pub use signals::SignalHandler;
pub use state::AppState;

use axum::Router;
use busyfeed_core::{TracingConfig, init_tracing};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Level, info, warn};

/// Builds the application with request tracing.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the feed until the state's shutdown token is cancelled.
pub async fn serve(listener: TcpListener, state: AppState) -> ServerResult<()> {
    let shutdown = state.shutdown.clone();
    let app = app(state);

    info!(address = %listener.local_addr()?, "Serving free/busy feed");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Runs the server described by the command line.
pub async fn run(cli: Cli) -> ServerResult<()> {
    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    init_tracing(
        TracingConfig::server()
            .with_level(level)
            .with_format(cli.log_format),
    )?;

    let config = cli.feed_config();
    if config.operator().is_err() || config.root_dir().is_err() {
        warn!("Operator name, email or root directory is unset; requests will fail");
    }

    let signals = SignalHandler::new();
    signals.spawn_listener();

    let state = AppState::new(config, signals.token())?;
    let listener = TcpListener::bind(cli.listen).await?;
    serve(listener, state).await
}
