//! Calendar sources: discovery, fetching, parsing and classification.
//!
//! Each stage handles one source at a time and reports failures as a
//! [`SourceError`], so one broken calendar never affects another:
//!
//! ```text
//!  collections root
//!        │ locate_sources()
//!        ▼
//!  SourceDescriptor ── Local(path) | Remote(url)
//!        │ CalendarFetcher::fetch()
//!        ▼
//!   RawCalendar
//!        │ parse_calendar()
//!        ▼
//!  ParsedCalendar
//!        │ classify_calendar()
//!        ▼
//!  Classification ── busy / free entries
//! ```
//!
//! # Example
//!
//! ```ignore
//! use busyfeed_sources::{CalendarFetcher, HttpFetcher, FetchConfig, locate_sources};
//!
//! let fetcher = HttpFetcher::new(FetchConfig::new())?;
//! for source in locate_sources(root) {
//!     let raw = fetcher.fetch(&source, &cancel).await?;
//!     let busy = classify_calendar(&parse_calendar(&raw)?, &source.to_string());
//! }
//! ```

pub mod classify;
pub mod descriptor;
pub mod error;
pub mod fetch;
pub mod locator;
pub mod parse;

pub use classify::{
    Availability, Classification, ClassifiedEntry, classify_calendar, classify_event,
    parse_duration,
};
pub use descriptor::SourceDescriptor;
pub use error::{SourceError, SourceErrorCode, SourceResult};
pub use fetch::{BoxFuture, CalendarFetcher, FetchConfig, HttpFetcher, MemoryFetcher, RawCalendar};
pub use locator::locate_sources;
pub use parse::{
    ComponentNode, ParsedCalendar, Property, PropertyValue, parse_calendar, parse_calendar_text,
};
