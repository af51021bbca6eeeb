//! HTTP routes.

use axum::{
    Router,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use busyfeed_core::encode_calendar;
use busyfeed_sources::locate_sources;
use tracing::info;

use crate::aggregate::FeedOptions;
use crate::error::ServerResult;
use crate::state::AppState;

/// Media type of the feed.
pub const CALENDAR_CONTENT_TYPE: &str = "text/calendar";

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(feed))
}

/// GET / - the merged free/busy feed
async fn feed(State(state): State<AppState>) -> ServerResult<Response> {
    let operator = state.config.operator()?;
    let root = state.config.root_dir()?.to_path_buf();

    let sources = tokio::task::spawn_blocking(move || locate_sources(&root)).await?;

    // Dropping this future (client gone) cancels the fetches still in flight.
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    let options = FeedOptions::new(operator.clone(), state.config.style, &state.config.color);
    let (calendar, report) = state.aggregator.aggregate(&sources, &options, &cancel).await;

    info!(
        style = %state.config.style,
        sources = report.sources_seen,
        failed = report.sources_failed,
        skipped_events = report.events_skipped,
        components = report.components,
        "Built feed"
    );

    let headers = [
        (header::CONTENT_TYPE, CALENDAR_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            attachment_disposition(&operator.attachment_filename()),
        ),
    ];
    Ok((headers, encode_calendar(&calendar)).into_response())
}

/// `attachment; filename="..."` with the name as an RFC 6266 quoted-string.
fn attachment_disposition(filename: &str) -> String {
    let mut quoted = String::with_capacity(filename.len() + 2);
    for ch in filename.chars().filter(|c| !c.is_control()) {
        if ch == '"' || ch == '\\' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    format!("attachment; filename=\"{}\"", quoted)
}
