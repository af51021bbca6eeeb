//! Calendar text parsing.
//!
//! RFC 5545 decoding is delegated to the `icalendar` parser. The result is
//! converted into an owned [`ParsedCalendar`] whose property values are typed
//! just enough for classification: timestamps are decoded, recurrence
//! properties are kept opaque, and everything else stays text.

use busyfeed_core::{RecurrenceProperty, TimeValue};
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{self, read_calendar, unfold},
};

use crate::error::{SourceError, SourceResult};
use crate::fetch::RawCalendar;

const CALENDAR_HEADER: &str = "BEGIN:VCALENDAR";

/// Properties decoded as timestamps.
const TIME_PROPERTIES: &[&str] = &["DTSTART", "DTEND", "DUE", "RECURRENCE-ID"];

/// Properties passed through without evaluation.
const RECURRENCE_PROPERTIES: &[&str] = &["RRULE", "RDATE", "EXDATE", "EXRULE"];

/// A decoded property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// A date or date-time.
    Time(TimeValue),
    /// A recurrence rule or date list, kept verbatim.
    Recurrence(RecurrenceProperty),
    /// Any other value, unescaped text as it appeared on the wire.
    Text(String),
    /// A timestamp property whose value could not be decoded.
    Unrecognized(String),
}

/// A named property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

/// One component (VEVENT, VTODO, VTIMEZONE, ...) with its own properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentNode {
    pub name: String,
    pub properties: Vec<Property>,
}

impl ComponentNode {
    /// Returns the first value of the named property.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| &p.value)
    }

    /// Returns the named property as text, if it is text.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            PropertyValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the recurrence properties of this component.
    pub fn recurrence(&self) -> Vec<RecurrenceProperty> {
        self.properties
            .iter()
            .filter_map(|p| match &p.value {
                PropertyValue::Recurrence(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn is_event(&self) -> bool {
        self.name == "VEVENT"
    }
}

/// A parsed calendar: its own properties plus all components, flattened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCalendar {
    pub properties: Vec<Property>,
    pub components: Vec<ComponentNode>,
}

impl ParsedCalendar {
    /// Returns the VEVENT components.
    pub fn events(&self) -> impl Iterator<Item = &ComponentNode> {
        self.components.iter().filter(|c| c.is_event())
    }

    /// Returns the calendar display name (`X-WR-CALNAME`), if set.
    pub fn display_name(&self) -> Option<&str> {
        self.properties.iter().find_map(|p| match &p.value {
            PropertyValue::Text(text) if p.name == "X-WR-CALNAME" => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Parses a fetched calendar.
pub fn parse_calendar(raw: &RawCalendar) -> SourceResult<ParsedCalendar> {
    parse_calendar_text(&raw.text).map_err(|e| e.with_origin(raw.source.to_string()))
}

/// Parses calendar text.
///
/// # Errors
///
/// Returns a parse error when the text does not start with
/// `BEGIN:VCALENDAR` or is rejected by the iCalendar parser.
pub fn parse_calendar_text(text: &str) -> SourceResult<ParsedCalendar> {
    let text = text.trim_start_matches('\u{feff}').trim_start();
    let has_header = text
        .get(..CALENDAR_HEADER.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(CALENDAR_HEADER));
    if !has_header {
        return Err(SourceError::parse("input does not start with BEGIN:VCALENDAR"));
    }

    let unfolded = unfold(text);
    let calendar = read_calendar(&unfolded)
        .map_err(|e| SourceError::parse(format!("malformed calendar: {}", e)))?;

    let mut parsed = ParsedCalendar {
        properties: calendar.properties.iter().map(convert_property).collect(),
        components: Vec::new(),
    };
    flatten(&calendar.components, &mut parsed);

    Ok(parsed)
}

/// Depth-first walk. A VCALENDAR wrapper contributes its properties to the
/// calendar rather than appearing as a component.
fn flatten(nodes: &[parser::Component<'_>], parsed: &mut ParsedCalendar) {
    for node in nodes {
        let name = node.name.to_string().to_ascii_uppercase();
        let properties = node.properties.iter().map(convert_property);
        if name == "VCALENDAR" {
            parsed.properties.extend(properties);
        } else {
            parsed.components.push(ComponentNode {
                name,
                properties: properties.collect(),
            });
        }
        flatten(&node.components, parsed);
    }
}

fn convert_property(prop: &parser::Property<'_>) -> Property {
    let name = prop.name.to_string().to_ascii_uppercase();
    let raw = prop.val.to_string();

    let value = if TIME_PROPERTIES.contains(&name.as_str()) {
        match DatePerhapsTime::try_from(prop) {
            Ok(time) => PropertyValue::Time(time_value(time)),
            Err(_) => PropertyValue::Unrecognized(raw),
        }
    } else if RECURRENCE_PROPERTIES.contains(&name.as_str()) {
        let params = prop
            .params
            .iter()
            .map(|p| {
                (
                    p.key.to_string(),
                    p.val.as_ref().map(|v| v.to_string()).unwrap_or_default(),
                )
            })
            .collect();
        PropertyValue::Recurrence(RecurrenceProperty {
            name: name.clone(),
            params,
            value: raw,
        })
    } else {
        PropertyValue::Text(raw)
    };

    Property { name, value }
}

fn time_value(time: DatePerhapsTime) -> TimeValue {
    match time {
        DatePerhapsTime::Date(date) => TimeValue::Date(date),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => TimeValue::Floating(naive),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(utc)) => TimeValue::Utc(utc),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            TimeValue::Zoned { date_time, tzid }
        }
    }
}
