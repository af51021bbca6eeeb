//! Merging per-source busy time into one output calendar.
//!
//! Sources are fetched concurrently (bounded) and processed in isolation:
//! any failure is logged and the source contributes nothing. A slow source
//! holds only its own slot; results are put back into discovery order once
//! every fetch has finished.

use std::collections::HashSet;
use std::sync::Arc;

use busyfeed_core::{BusySlot, FeedComponent, FreeBusyBlock, Interval, Operator, OutputCalendar};
use busyfeed_sources::{
    CalendarFetcher, Classification, SourceDescriptor, SourceResult, classify_calendar,
    parse_calendar,
};
use chrono::{DateTime, Utc};
use futures_util::{StreamExt, stream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::FeedStyle;

/// Per-request parameters of the output feed.
#[derive(Debug, Clone)]
pub struct FeedOptions {
    pub operator: Operator,
    pub style: FeedStyle,
    /// Calendar color, emitted by the events style only.
    pub color: String,
    /// DTSTAMP of every generated component.
    pub stamp: DateTime<Utc>,
}

impl FeedOptions {
    pub fn new(operator: Operator, style: FeedStyle, color: impl Into<String>) -> Self {
        Self {
            operator,
            style,
            color: color.into(),
            stamp: Utc::now(),
        }
    }

    /// Builder: set the DTSTAMP.
    pub fn with_stamp(mut self, stamp: DateTime<Utc>) -> Self {
        self.stamp = stamp;
        self
    }
}

/// Counters describing one aggregation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateReport {
    /// Sources handed to the aggregator.
    pub sources_seen: usize,
    /// Sources dropped by a fetch or parse failure.
    pub sources_failed: usize,
    /// Events dropped by a classification failure.
    pub events_skipped: usize,
    /// Components written to the output calendar.
    pub components: usize,
}

/// Builds output calendars from calendar sources.
#[derive(Clone)]
pub struct Aggregator {
    fetcher: Arc<dyn CalendarFetcher>,
    max_concurrent: usize,
}

impl Aggregator {
    /// Creates an aggregator that fetches at most `max_concurrent` sources at once.
    pub fn new(fetcher: Arc<dyn CalendarFetcher>, max_concurrent: usize) -> Self {
        Self {
            fetcher,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Fetches, parses and classifies every source and assembles the feed.
    pub async fn aggregate(
        &self,
        sources: &[SourceDescriptor],
        options: &FeedOptions,
        cancel: &CancellationToken,
    ) -> (OutputCalendar, AggregateReport) {
        let mut outcomes: Vec<(usize, SourceDescriptor, SourceResult<Classification>)> =
            stream::iter(sources.iter().cloned().enumerate())
                .map(|(index, source)| {
                    let fetcher = Arc::clone(&self.fetcher);
                    let cancel = cancel.clone();
                    async move {
                        let outcome = process_source(fetcher.as_ref(), &source, &cancel).await;
                        (index, source, outcome)
                    }
                })
                .buffer_unordered(self.max_concurrent)
                .collect()
                .await;
        outcomes.sort_unstable_by_key(|(index, _, _)| *index);

        let mut report = AggregateReport {
            sources_seen: sources.len(),
            ..Default::default()
        };
        let mut classified = Vec::with_capacity(outcomes.len());

        for (_, source, outcome) in outcomes {
            match outcome {
                Ok(classification) => {
                    report.events_skipped += classification.skipped;
                    classified.push((source, classification));
                }
                Err(e) => {
                    warn!(source = %source, error = %e, "Skipping source");
                    report.sources_failed += 1;
                }
            }
        }

        let calendar = match options.style {
            FeedStyle::FreeBusy => free_busy_calendar(&classified, options),
            FeedStyle::Events => busy_events_calendar(&classified, options),
        };
        report.components = calendar.len();

        (calendar, report)
    }
}

async fn process_source(
    fetcher: &dyn CalendarFetcher,
    source: &SourceDescriptor,
    cancel: &CancellationToken,
) -> SourceResult<Classification> {
    let raw = fetcher.fetch(source, cancel).await?;
    let parsed = parse_calendar(&raw)?;
    Ok(classify_calendar(&parsed, &source.to_string()))
}

/// One VFREEBUSY per source with at least one busy entry.
fn free_busy_calendar(
    classified: &[(SourceDescriptor, Classification)],
    options: &FeedOptions,
) -> OutputCalendar {
    let mut calendar = OutputCalendar::new(&options.operator);

    for (source, classification) in classified {
        let mut block =
            FreeBusyBlock::new(source.to_string(), options.operator.clone(), options.stamp);
        for entry in classification.busy() {
            block.push_busy(entry.interval);
        }

        if block.is_empty() {
            debug!(source = %source, "No busy time");
            continue;
        }
        calendar.push(FeedComponent::FreeBusy(block));
    }

    calendar
}

/// One `Busy` VEVENT per distinct interval across all sources.
///
/// Recurring slots keep their source DTSTART/DTEND so the copied rules expand
/// the same way they did in the source calendar.
fn busy_events_calendar(
    classified: &[(SourceDescriptor, Classification)],
    options: &FeedOptions,
) -> OutputCalendar {
    let mut calendar = OutputCalendar::new(&options.operator).with_color(&options.color);
    let mut seen: HashSet<Interval> = HashSet::new();

    for (_, classification) in classified {
        for entry in classification.busy() {
            if !seen.insert(entry.interval) {
                continue;
            }
            let slot = BusySlot::new(entry.interval, options.stamp)
                .with_recurrence(entry.anchor.clone(), entry.recurrence.clone());
            calendar.push(FeedComponent::Busy(slot));
        }
    }

    calendar
}
