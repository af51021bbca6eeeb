//! Unix signal handling for the server.
//!
//! SIGTERM and SIGINT (Ctrl+C elsewhere) cancel the shutdown token. Every
//! request derives its own cancellation token from it, so in-flight fetches
//! are abandoned while the listener drains.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Turns process signals into a cancelled [`CancellationToken`].
#[derive(Debug, Clone, Default)]
pub struct SignalHandler {
    shutdown: CancellationToken,
}

impl SignalHandler {
    /// Creates a new signal handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns the signal listener task.
    ///
    /// This should be called once at server startup.
    #[cfg(unix)]
    pub fn spawn_listener(&self) {
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            use tokio::signal::unix::{SignalKind, signal};

            let (mut sigterm, mut sigint) =
                match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                    (Ok(term), Ok(int)) => (term, int),
                    (Err(e), _) | (_, Err(e)) => {
                        warn!(error = %e, "Failed to install signal handlers");
                        return;
                    }
                };

            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, initiating shutdown"),
                _ = sigint.recv() => info!("Received SIGINT, initiating shutdown"),
                _ = shutdown.cancelled() => {}
            }
            shutdown.cancel();

            debug!("Signal listener stopped");
        });
    }

    /// Non-Unix implementation: Ctrl+C only.
    #[cfg(not(unix))]
    pub fn spawn_listener(&self) {
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if result.is_ok() {
                        info!("Received Ctrl+C, initiating shutdown");
                    }
                }
                _ = shutdown.cancelled() => {}
            }
            shutdown.cancel();
        });
    }

    /// Returns the token cancelled on shutdown.
    pub fn token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}
