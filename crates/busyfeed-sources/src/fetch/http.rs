//! Filesystem and HTTP fetcher.

use std::path::Path;

use reqwest::{Client, Response};
use tokio_util::sync::CancellationToken;
use tracing::trace;
use url::Url;

use crate::descriptor::SourceDescriptor;
use crate::error::{SourceError, SourceResult};

use super::config::FetchConfig;
use super::{BoxFuture, CalendarFetcher, RawCalendar};

/// Reads local calendar files and downloads subscribed calendars.
///
/// One HTTP client is shared by every fetch. Each fetch makes a single
/// attempt bounded by [`FetchConfig::timeout`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Creates a fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| SourceError::fetch("failed to create HTTP client").with_cause(e))?;

        Ok(Self { client, config })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn read_local(&self, path: &Path) -> SourceResult<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .map_err(|e| SourceError::fetch("failed to read calendar file").with_cause(e))
    }

    async fn get(&self, url: &Url) -> SourceResult<Vec<u8>> {
        trace!(url = %url, "Sending request");

        let response = self.client.get(url.clone()).send().await.map_err(request_error)?;
        self.handle_response(response).await
    }

    async fn handle_response(&self, response: Response) -> SourceResult<Vec<u8>> {
        let status = response.status();
        trace!(status = %status, "Received response");

        if !status.is_success() {
            return Err(SourceError::fetch(format!("unexpected status {}", status)));
        }

        let body = response.bytes().await.map_err(request_error)?;
        Ok(body.to_vec())
    }
}

fn request_error(err: reqwest::Error) -> SourceError {
    if err.is_timeout() {
        SourceError::timeout("request timed out").with_cause(err)
    } else {
        SourceError::fetch("request failed").with_cause(err)
    }
}

impl CalendarFetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    fn fetch<'a>(
        &'a self,
        source: &'a SourceDescriptor,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, SourceResult<RawCalendar>> {
        Box::pin(async move {
            let read = async {
                match source {
                    SourceDescriptor::Local(path) => self.read_local(path).await,
                    SourceDescriptor::Remote(url) => self.get(url).await,
                }
            };

            let bytes = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(SourceError::cancelled("fetch cancelled")),
                result = tokio::time::timeout(self.config.timeout, read) => match result {
                    Ok(read) => read,
                    Err(_) => Err(SourceError::timeout(format!(
                        "no response within {}s",
                        self.config.timeout.as_secs_f64()
                    ))),
                },
            }
            .map_err(|e| e.with_origin(source.to_string()))?;

            trace!(source = %source, bytes = bytes.len(), "Fetched calendar");
            Ok(RawCalendar::from_bytes(source.clone(), &bytes))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceErrorCode;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

    fn fetcher(timeout: Duration) -> HttpFetcher {
        HttpFetcher::new(FetchConfig::new().with_timeout(timeout)).unwrap()
    }

    fn remote_source(server: &MockServer, path: &str) -> SourceDescriptor {
        SourceDescriptor::remote(&format!("{}{}", server.uri(), path)).unwrap()
    }

    mod local {
        use super::*;

        #[tokio::test]
        async fn reads_file_lossily() {
            let tmp = TempDir::new().unwrap();
            let path = tmp.path().join("cal.ics");
            std::fs::write(&path, b"BEGIN:VCALENDAR\r\nX-BAD:\xfe\r\n").unwrap();

            let source = SourceDescriptor::local(&path);
            let raw = fetcher(Duration::from_secs(5))
                .fetch(&source, &CancellationToken::new())
                .await
                .unwrap();

            assert_eq!(raw.source, source);
            assert!(raw.text.starts_with("BEGIN:VCALENDAR"));
            assert!(raw.text.contains('\u{fffd}'));
        }

        #[tokio::test]
        async fn missing_file_is_fetch_error() {
            let tmp = TempDir::new().unwrap();
            let source = SourceDescriptor::local(tmp.path().join("absent.ics"));

            let err = fetcher(Duration::from_secs(5))
                .fetch(&source, &CancellationToken::new())
                .await
                .unwrap_err();

            assert_eq!(err.code(), SourceErrorCode::Fetch);
            assert_eq!(err.origin(), Some(source.to_string().as_str()));
        }
    }

    mod remote {
        use super::*;

        #[tokio::test]
        async fn downloads_body() {
            let server = MockServer::start().await;
            Mock::given(matchers::method("GET"))
                .and(matchers::path("/team.ics"))
                .respond_with(ResponseTemplate::new(200).set_body_string("BEGIN:VCALENDAR\r\n"))
                .expect(1)
                .mount(&server)
                .await;

            let raw = fetcher(Duration::from_secs(5))
                .fetch(&remote_source(&server, "/team.ics"), &CancellationToken::new())
                .await
                .unwrap();

            assert_eq!(raw.text, "BEGIN:VCALENDAR\r\n");
        }

        #[tokio::test]
        async fn sends_user_agent() {
            let server = MockServer::start().await;
            Mock::given(matchers::method("GET"))
                .and(matchers::header("user-agent", "busyfeed-test"))
                .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
                .expect(1)
                .mount(&server)
                .await;

            let fetcher = HttpFetcher::new(FetchConfig::new().with_user_agent("busyfeed-test"))
                .unwrap();
            let raw = fetcher
                .fetch(&remote_source(&server, "/"), &CancellationToken::new())
                .await
                .unwrap();
            assert_eq!(raw.text, "ok");
        }

        #[tokio::test]
        async fn non_success_status_is_fetch_error() {
            let server = MockServer::start().await;
            Mock::given(matchers::method("GET"))
                .respond_with(ResponseTemplate::new(404))
                .mount(&server)
                .await;

            let err = fetcher(Duration::from_secs(5))
                .fetch(&remote_source(&server, "/gone.ics"), &CancellationToken::new())
                .await
                .unwrap_err();

            assert_eq!(err.code(), SourceErrorCode::Fetch);
            assert!(err.message().contains("404"));
        }

        #[tokio::test]
        async fn slow_server_times_out() {
            let server = MockServer::start().await;
            Mock::given(matchers::method("GET"))
                .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
                .mount(&server)
                .await;

            let err = fetcher(Duration::from_millis(200))
                .fetch(&remote_source(&server, "/slow.ics"), &CancellationToken::new())
                .await
                .unwrap_err();

            assert_eq!(err.code(), SourceErrorCode::Timeout);
        }

        #[tokio::test]
        async fn cancellation_aborts_request() {
            let server = MockServer::start().await;
            Mock::given(matchers::method("GET"))
                .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
                .mount(&server)
                .await;

            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                trigger.cancel();
            });

            let err = fetcher(Duration::from_secs(30))
                .fetch(&remote_source(&server, "/slow.ics"), &cancel)
                .await
                .unwrap_err();

            assert_eq!(err.code(), SourceErrorCode::Cancelled);
        }

        #[tokio::test]
        async fn unreachable_host_is_fetch_error() {
            // Port 9 on localhost is the discard service; nothing listens there in CI.
            let source = SourceDescriptor::remote("http://127.0.0.1:9/cal.ics").unwrap();
            let err = fetcher(Duration::from_secs(5))
                .fetch(&source, &CancellationToken::new())
                .await
                .unwrap_err();

            assert!(matches!(
                err.code(),
                SourceErrorCode::Fetch | SourceErrorCode::Timeout
            ));
        }
    }
}
