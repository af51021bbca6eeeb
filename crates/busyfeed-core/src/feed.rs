//! Output feed types.
//!
//! This module provides the in-memory model of the aggregated feed:
//! - [`Operator`]: The person publishing the feed
//! - [`FreeBusyBlock`]: One VFREEBUSY unit grouping a single source's busy time
//! - [`BusySlot`]: One synthetic "Busy" VEVENT (single-feed style)
//! - [`OutputCalendar`]: The top-level container handed to the encoder

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::{Interval, TimeValue};

/// iCalendar protocol version written into every feed.
pub const PROTOCOL_VERSION: &str = "2.0";

/// Calendar color used by the single-feed style when none is configured.
pub const DEFAULT_COLOR: &str = "#d20f44";

/// Summary given to every synthetic busy event.
pub const BUSY_SUMMARY: &str = "Busy";

/// The identity the feed is published under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    /// Display name.
    pub name: String,
    /// Email address (without `mailto:`).
    pub email: String,
}

impl Operator {
    /// Creates a new operator identity.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Returns the PRODID of feeds published by this operator.
    pub fn product_id(&self) -> String {
        format!("-//Free Busy {}//EN", self.name)
    }

    /// Returns the download filename: the name with spaces replaced by
    /// underscores, plus `.ics`.
    pub fn attachment_filename(&self) -> String {
        format!("{}.ics", self.name.replace(' ', "_"))
    }
}

/// A recurrence property carried through verbatim (RRULE, RDATE, EXDATE, EXRULE).
///
/// The value is never evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceProperty {
    /// Property name, upper-case.
    pub name: String,
    /// Property parameters in source order.
    pub params: Vec<(String, String)>,
    /// Raw property value.
    pub value: String,
}

impl RecurrenceProperty {
    /// Creates a recurrence property without parameters.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            value: value.into(),
        }
    }

    /// Builder method to add a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }
}

/// The start and end of an event in the form its source wrote them.
///
/// Recurrence rules expand against DTSTART as written (date, zoned or UTC),
/// so a recurring slot is published with these values rather than with its
/// normalized interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAnchor {
    pub start: TimeValue,
    pub end: Option<TimeValue>,
    /// DURATION value, set only when the event has no DTEND.
    pub duration: Option<String>,
}

impl EventAnchor {
    /// Creates an anchor with an explicit end.
    pub fn new(start: TimeValue, end: TimeValue) -> Self {
        Self {
            start,
            end: Some(end),
            duration: None,
        }
    }
}

/// The busy time of one source, published as a VFREEBUSY component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeBusyBlock {
    /// Unique identifier of this block.
    pub uid: String,
    /// Creation timestamp (DTSTAMP).
    pub stamp: DateTime<Utc>,
    /// Label of the source the block was built from. Not published.
    pub source: String,
    /// Identity the busy time belongs to.
    pub attendee: Operator,
    /// Busy intervals in source order.
    pub busy: Vec<Interval>,
}

impl FreeBusyBlock {
    /// Creates an empty block with a fresh random UID.
    pub fn new(source: impl Into<String>, attendee: Operator, stamp: DateTime<Utc>) -> Self {
        Self {
            uid: Uuid::new_v4().to_string(),
            stamp,
            source: source.into(),
            attendee,
            busy: Vec::new(),
        }
    }

    /// Builder method to add a busy interval.
    pub fn with_busy(mut self, interval: Interval) -> Self {
        self.busy.push(interval);
        self
    }

    /// Appends a busy interval.
    pub fn push_busy(&mut self, interval: Interval) {
        self.busy.push(interval);
    }

    /// Returns `true` if the block holds no busy interval.
    pub fn is_empty(&self) -> bool {
        self.busy.is_empty()
    }

    /// Returns the interval covering all busy periods, if any.
    pub fn span(&self) -> Option<Interval> {
        Interval::span(&self.busy)
    }
}

/// An anonymized busy event, published as a VEVENT with summary "Busy".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusySlot {
    /// Unique identifier of this event.
    pub uid: String,
    /// Creation timestamp (DTSTAMP).
    pub stamp: DateTime<Utc>,
    /// The busy interval.
    pub interval: Interval,
    /// Recurrence properties copied from the source event.
    pub recurrence: Vec<RecurrenceProperty>,
    /// Source times published in place of `interval` for recurring slots.
    pub anchor: Option<EventAnchor>,
}

impl BusySlot {
    /// Creates a busy slot with a fresh random UID.
    pub fn new(interval: Interval, stamp: DateTime<Utc>) -> Self {
        Self {
            uid: Uuid::new_v4().to_string(),
            stamp,
            interval,
            recurrence: Vec::new(),
            anchor: None,
        }
    }

    /// Builder method to attach recurrence properties together with the
    /// source times they expand from.
    pub fn with_recurrence(
        mut self,
        anchor: EventAnchor,
        recurrence: Vec<RecurrenceProperty>,
    ) -> Self {
        if !recurrence.is_empty() {
            self.anchor = Some(anchor);
        }
        self.recurrence = recurrence;
        self
    }

    pub fn is_recurring(&self) -> bool {
        !self.recurrence.is_empty()
    }
}

/// A component of the output calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedComponent {
    /// A per-source VFREEBUSY block.
    FreeBusy(FreeBusyBlock),
    /// A synthetic busy VEVENT.
    Busy(BusySlot),
}

/// The aggregated calendar returned to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputCalendar {
    /// PRODID value.
    pub product_id: String,
    /// VERSION value.
    pub version: String,
    /// Optional `X-CALENDAR-COLOR` value.
    pub color: Option<String>,
    /// Components in emission order.
    pub components: Vec<FeedComponent>,
}

impl OutputCalendar {
    /// Creates an empty calendar published by `operator`.
    pub fn new(operator: &Operator) -> Self {
        Self {
            product_id: operator.product_id(),
            version: PROTOCOL_VERSION.to_string(),
            color: None,
            components: Vec::new(),
        }
    }

    /// Builder method to set the calendar color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Appends a component.
    pub fn push(&mut self, component: FeedComponent) {
        self.components.push(component);
    }

    /// Returns the number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` if the calendar has no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Iterates over the VFREEBUSY blocks.
    pub fn free_busy_blocks(&self) -> impl Iterator<Item = &FreeBusyBlock> {
        self.components.iter().filter_map(|c| match c {
            FeedComponent::FreeBusy(block) => Some(block),
            FeedComponent::Busy(_) => None,
        })
    }

    /// Iterates over the synthetic busy events.
    pub fn busy_slots(&self) -> impl Iterator<Item = &BusySlot> {
        self.components.iter().filter_map(|c| match c {
            FeedComponent::Busy(slot) => Some(slot),
            FeedComponent::FreeBusy(_) => None,
        })
    }

    /// Returns every busy interval in the calendar, in emission order.
    pub fn busy_intervals(&self) -> Vec<Interval> {
        self.components
            .iter()
            .flat_map(|c| match c {
                FeedComponent::FreeBusy(block) => block.busy.clone(),
                FeedComponent::Busy(slot) => vec![slot.interval],
            })
            .collect()
    }
}
