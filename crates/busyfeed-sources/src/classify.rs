//! Busy/free classification of calendar events.
//!
//! Each VEVENT is reduced to a UTC [`Interval`] and an [`Availability`].
//! `TRANSP:TRANSPARENT` marks an event free; anything else, including no
//! TRANSP at all, blocks time. Recurrence rules are carried along but not
//! expanded, so only the base instance is classified.

use busyfeed_core::{EventAnchor, Interval, RecurrenceProperty, TimeValue};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::error::{SourceError, SourceResult};
use crate::parse::{ComponentNode, ParsedCalendar, PropertyValue};

/// Whether an event blocks time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Availability {
    Busy,
    Free,
}

impl Availability {
    /// Maps a TRANSP value to an availability.
    pub fn from_transparency(transp: Option<&str>) -> Self {
        match transp {
            Some(value) if value.trim().eq_ignore_ascii_case("TRANSPARENT") => Self::Free,
            _ => Self::Busy,
        }
    }
}

/// A classified event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedEntry {
    pub interval: Interval,
    pub availability: Availability,
    /// RRULE/RDATE/EXDATE/EXRULE of the event, verbatim.
    pub recurrence: Vec<RecurrenceProperty>,
    /// DTSTART/DTEND (or DURATION) as written in the source.
    pub anchor: EventAnchor,
}

impl ClassifiedEntry {
    pub fn is_busy(&self) -> bool {
        self.availability == Availability::Busy
    }
}

/// Classifies a single VEVENT.
///
/// # Errors
///
/// Returns a classification error when DTSTART is missing, when a timestamp
/// or DURATION cannot be decoded, or when a TZID is unknown.
pub fn classify_event(event: &ComponentNode) -> SourceResult<ClassifiedEntry> {
    let start_value = event_time(event, "DTSTART")?
        .ok_or_else(|| SourceError::classification("event has no DTSTART"))?;
    let start = start_value.to_utc()?;
    let end_value = event_time(event, "DTEND")?;
    let duration = match end_value {
        Some(_) => None,
        None => event.text("DURATION").map(|raw| raw.trim().to_string()),
    };

    let end = match (&end_value, &duration) {
        (Some(end), _) => end.to_utc()?,
        (None, Some(raw)) => checked_end(start, parse_duration(raw)?, "DURATION")?,
        (None, None) if start_value.is_date() => {
            checked_end(start, Duration::days(1), "all-day end")?
        }
        (None, None) => start,
    };

    Ok(ClassifiedEntry {
        interval: Interval::new(start, end),
        availability: Availability::from_transparency(event.text("TRANSP")),
        recurrence: event.recurrence(),
        anchor: EventAnchor {
            start: start_value,
            end: end_value,
            duration,
        },
    })
}

fn event_time(event: &ComponentNode, name: &str) -> SourceResult<Option<TimeValue>> {
    match event.get(name) {
        None => Ok(None),
        Some(PropertyValue::Time(value)) => Ok(Some(value.clone())),
        Some(PropertyValue::Unrecognized(raw)) | Some(PropertyValue::Text(raw)) => Err(
            SourceError::classification(format!("cannot decode {} value '{}'", name, raw)),
        ),
        Some(PropertyValue::Recurrence(_)) => Err(SourceError::classification(format!(
            "{} has an unexpected value",
            name
        ))),
    }
}

/// End of an event without DTEND (RFC 5545 §3.6.1).
fn checked_end(
    start: DateTime<Utc>,
    length: Duration,
    what: &str,
) -> SourceResult<DateTime<Utc>> {
    start
        .checked_add_signed(length)
        .ok_or_else(|| SourceError::classification(format!("{} out of range", what)))
}

/// Parses a non-negative iCalendar DURATION such as `PT1H30M` or `P1W`.
pub fn parse_duration(raw: &str) -> SourceResult<Duration> {
    let value = raw.trim();
    if value.starts_with('-') {
        return Err(SourceError::classification(format!(
            "negative DURATION '{}'",
            raw
        )));
    }
    let value = value.trim_start_matches('+');

    let parsed = iso8601::duration(value)
        .map_err(|e| SourceError::classification(format!("invalid DURATION '{}': {}", raw, e)))?;
    let std_duration: std::time::Duration = parsed.into();

    Duration::from_std(std_duration).map_err(|e| {
        SourceError::classification(format!("DURATION '{}' out of range", raw)).with_cause(e)
    })
}

/// Classification results for one calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub entries: Vec<ClassifiedEntry>,
    /// Events dropped because they could not be classified.
    pub skipped: usize,
}

impl Classification {
    /// Returns the busy entries, in calendar order.
    pub fn busy(&self) -> impl Iterator<Item = &ClassifiedEntry> {
        self.entries.iter().filter(|e| e.is_busy())
    }

    pub fn busy_count(&self) -> usize {
        self.busy().count()
    }
}

/// Classifies every VEVENT of a calendar.
///
/// Events that fail classification are logged at debug level and counted in
/// [`Classification::skipped`]; the rest of the calendar is unaffected.
pub fn classify_calendar(calendar: &ParsedCalendar, origin: &str) -> Classification {
    let mut classification = Classification::default();

    for event in calendar.events() {
        match classify_event(event) {
            Ok(entry) => classification.entries.push(entry),
            Err(e) => {
                debug!(
                    source = origin,
                    uid = event.text("UID").unwrap_or_default(),
                    error = %e,
                    "Skipping event"
                );
                classification.skipped += 1;
            }
        }
    }

    classification
}
