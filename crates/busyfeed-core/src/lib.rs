//! Core types: time normalization, free/busy feed model, wire encoding

pub mod encode;
pub mod feed;
pub mod time;
pub mod tracing;

pub use encode::{encode_calendar, format_utc};
pub use feed::{
    BUSY_SUMMARY, BusySlot, DEFAULT_COLOR, EventAnchor, FeedComponent, FreeBusyBlock, Operator,
    OutputCalendar, PROTOCOL_VERSION, RecurrenceProperty,
};
pub use time::{Interval, TimeError, TimeValue, resolve_timezone};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
