//! iCalendar wire encoding for the output feed.
//!
//! Builds an `icalendar` [`Calendar`] from an [`OutputCalendar`] and renders
//! it. Line folding, TEXT escaping and parameter quoting are left to the
//! `icalendar` crate.
//!
//! # Example
//!
//! ```rust
//! use busyfeed_core::{Operator, OutputCalendar, encode_calendar};
//!
//! let calendar = OutputCalendar::new(&Operator::new("Jane Doe", "jane@example.com"));
//! let ics = encode_calendar(&calendar);
//! assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
//! ```

use chrono::{DateTime, Utc};
use icalendar::{
    Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, Event, EventLike,
    Property, parser,
};

use crate::feed::{BUSY_SUMMARY, BusySlot, FeedComponent, FreeBusyBlock, OutputCalendar};
use crate::time::TimeValue;

const FREE_BUSY: &str = "VFREEBUSY";

/// Encodes the calendar into its wire representation.
pub fn encode_calendar(calendar: &OutputCalendar) -> String {
    let mut ical = Calendar::empty();
    ical.append_property(Property::new("PRODID", &calendar.product_id));
    ical.append_property(Property::new("VERSION", &calendar.version));
    if let Some(ref color) = calendar.color {
        ical.append_property(Property::new("X-CALENDAR-COLOR", color));
    }

    for component in &calendar.components {
        match component {
            FeedComponent::FreeBusy(block) => ical.push(free_busy_component(block)),
            FeedComponent::Busy(slot) => ical.push(busy_event(slot)),
        };
    }

    ical.to_string()
}

/// `icalendar` has no VFREEBUSY type; the component is built as a generic
/// one and filled through the [`Component`] trait.
fn free_busy_component(block: &FreeBusyBlock) -> CalendarComponent {
    let mut component = CalendarComponent::from(parser::Component {
        name: FREE_BUSY.into(),
        properties: Vec::new(),
        components: Vec::new(),
    });

    if let CalendarComponent::Other(ref mut vfreebusy) = component {
        vfreebusy.add_property("UID", &block.uid);
        vfreebusy.timestamp(block.stamp);
        if let Some(span) = block.span() {
            vfreebusy.add_property("DTSTART", format_utc(&span.start));
            vfreebusy.add_property("DTEND", format_utc(&span.end));
        }

        let mut attendee = Property::new("ATTENDEE", format!("mailto:{}", block.attendee.email));
        attendee.add_parameter("CN", &block.attendee.name);
        vfreebusy.append_property(attendee);

        for interval in &block.busy {
            let mut period = Property::new(
                "FREEBUSY",
                format!("{}/{}", format_utc(&interval.start), format_utc(&interval.end)),
            );
            period.add_parameter("FBTYPE", "BUSY");
            vfreebusy.append_multi_property(period);
        }
    }

    component
}

fn busy_event(slot: &BusySlot) -> Event {
    let mut event = Event::new();
    event
        .uid(&slot.uid)
        .timestamp(slot.stamp)
        .summary(BUSY_SUMMARY);

    match slot.anchor {
        Some(ref anchor) => {
            event.starts(date_perhaps_time(&anchor.start));
            if let Some(ref end) = anchor.end {
                event.ends(date_perhaps_time(end));
            } else if let Some(ref duration) = anchor.duration {
                event.add_property("DURATION", duration);
            }
        }
        None => {
            event.starts(slot.interval.start).ends(slot.interval.end);
        }
    }

    for prop in &slot.recurrence {
        let mut property = Property::new(&prop.name, &prop.value);
        for (key, value) in &prop.params {
            property.add_parameter(key, value);
        }
        event.append_multi_property(property);
    }

    event.done()
}

fn date_perhaps_time(value: &TimeValue) -> DatePerhapsTime {
    match value {
        TimeValue::Date(date) => DatePerhapsTime::Date(*date),
        TimeValue::Floating(naive) => CalendarDateTime::Floating(*naive).into(),
        TimeValue::Utc(dt) => CalendarDateTime::Utc(*dt).into(),
        TimeValue::Zoned { date_time, tzid } => CalendarDateTime::WithTimezone {
            date_time: *date_time,
            tzid: tzid.clone(),
        }
        .into(),
    }
}

/// Formats a UTC instant as an iCalendar DATE-TIME (`YYYYMMDDTHHMMSSZ`).
pub fn format_utc(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{EventAnchor, Operator, RecurrenceProperty};
    use crate::time::Interval;
    use chrono::{NaiveDate, TimeZone};

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
    }

    fn operator() -> Operator {
        Operator::new("Jane Doe", "jane@example.com")
    }

    /// Returns the encoded feed from the first VFREEBUSY line on.
    fn free_busy_tail(calendar: &OutputCalendar) -> String {
        let ics = encode_calendar(calendar);
        let start = ics.find("BEGIN:VFREEBUSY").unwrap();
        ics[start..].to_string()
    }

    #[test]
    fn empty_calendar() {
        let ics = encode_calendar(&OutputCalendar::new(&operator()));
        assert_eq!(
            ics,
            "BEGIN:VCALENDAR\r\n\
             PRODID:-//Free Busy Jane Doe//EN\r\n\
             VERSION:2.0\r\n\
             END:VCALENDAR\r\n"
        );
    }

    #[test]
    fn free_busy_block() {
        let mut block = FreeBusyBlock::new("work.ics", operator(), utc(8, 0))
            .with_busy(Interval::new(utc(9, 0), utc(10, 0)))
            .with_busy(Interval::new(utc(14, 0), utc(15, 0)));
        block.uid = "block-1".to_string();

        let mut calendar = OutputCalendar::new(&operator());
        calendar.push(FeedComponent::FreeBusy(block));

        assert_eq!(
            free_busy_tail(&calendar),
            "BEGIN:VFREEBUSY\r\n\
             ATTENDEE;CN=Jane Doe:mailto:jane@example.com\r\n\
             DTEND:20240301T150000Z\r\n\
             DTSTAMP:20240301T080000Z\r\n\
             DTSTART:20240301T090000Z\r\n\
             UID:block-1\r\n\
             FREEBUSY;FBTYPE=BUSY:20240301T090000Z/20240301T100000Z\r\n\
             FREEBUSY;FBTYPE=BUSY:20240301T140000Z/20240301T150000Z\r\n\
             END:VFREEBUSY\r\n\
             END:VCALENDAR\r\n"
        );
    }

    #[test]
    fn busy_slot_with_color() {
        let mut slot = BusySlot::new(Interval::new(utc(9, 0), utc(9, 30)), utc(8, 0));
        slot.uid = "slot-1".to_string();

        let mut calendar = OutputCalendar::new(&operator()).with_color("#d20f44");
        calendar.push(FeedComponent::Busy(slot));

        assert_eq!(
            encode_calendar(&calendar),
            "BEGIN:VCALENDAR\r\n\
             PRODID:-//Free Busy Jane Doe//EN\r\n\
             VERSION:2.0\r\n\
             X-CALENDAR-COLOR:#d20f44\r\n\
             BEGIN:VEVENT\r\n\
             DTEND:20240301T093000Z\r\n\
             DTSTAMP:20240301T080000Z\r\n\
             DTSTART:20240301T090000Z\r\n\
             SUMMARY:Busy\r\n\
             UID:slot-1\r\n\
             END:VEVENT\r\n\
             END:VCALENDAR\r\n"
        );
    }

    mod recurring {
        use super::*;

        #[test]
        fn zoned_series_keeps_wall_clock_start() {
            let start = NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap();
            let anchor = EventAnchor::new(
                TimeValue::Zoned {
                    date_time: start,
                    tzid: "Europe/Berlin".to_string(),
                },
                TimeValue::Zoned {
                    date_time: start + chrono::Duration::hours(1),
                    tzid: "Europe/Berlin".to_string(),
                },
            );
            let slot = BusySlot::new(Interval::new(utc(9, 0), utc(10, 0)), utc(8, 0))
                .with_recurrence(
                    anchor,
                    vec![
                        RecurrenceProperty::new("RRULE", "FREQ=WEEKLY;COUNT=10"),
                        RecurrenceProperty::new("EXDATE", "20240315T100000")
                            .with_param("TZID", "Europe/Berlin"),
                    ],
                );

            let mut calendar = OutputCalendar::new(&operator());
            calendar.push(FeedComponent::Busy(slot));
            let ics = encode_calendar(&calendar);

            assert!(ics.contains("DTSTART;TZID=Europe/Berlin:20240301T100000\r\n"));
            assert!(ics.contains("DTEND;TZID=Europe/Berlin:20240301T110000\r\n"));
            assert!(ics.contains("RRULE:FREQ=WEEKLY;COUNT=10\r\n"));
            assert!(ics.contains("EXDATE;TZID=Europe/Berlin:20240315T100000\r\n"));
            assert!(!ics.contains("DTSTART:20240301T090000Z"));
        }

        #[test]
        fn all_day_series_stays_a_date() {
            let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
            let anchor = EventAnchor {
                start: TimeValue::Date(day),
                end: None,
                duration: Some("P1D".to_string()),
            };
            let midnight = day.and_hms_opt(0, 0, 0).unwrap().and_utc();
            let slot = BusySlot::new(
                Interval::new(midnight, midnight + chrono::Duration::days(1)),
                utc(8, 0),
            )
            .with_recurrence(
                anchor,
                vec![
                    RecurrenceProperty::new("RRULE", "FREQ=DAILY;UNTIL=20240310"),
                    RecurrenceProperty::new("EXDATE", "20240306").with_param("VALUE", "DATE"),
                ],
            );

            let mut calendar = OutputCalendar::new(&operator());
            calendar.push(FeedComponent::Busy(slot));
            let ics = encode_calendar(&calendar);

            assert!(ics.contains("DTSTART;VALUE=DATE:20240304\r\n"));
            assert!(ics.contains("DURATION:P1D\r\n"));
            assert!(ics.contains("EXDATE;VALUE=DATE:20240306\r\n"));
            assert!(!ics.contains("DTSTART:20240304T000000Z"));
            assert!(!ics.contains("DTEND"));
        }
    }

    #[test]
    fn operator_name_is_escaped() {
        let calendar = OutputCalendar::new(&Operator::new("Doe, Jane", "jane@example.com"));
        assert!(encode_calendar(&calendar).contains("PRODID:-//Free Busy Doe\\, Jane//EN\r\n"));
    }

    #[test]
    fn attendee_name_is_quoted() {
        let attendee = Operator::new("Doe, Jane", "jane@example.com");
        let block = FreeBusyBlock::new("a.ics", attendee.clone(), utc(8, 0))
            .with_busy(Interval::new(utc(9, 0), utc(10, 0)));
        let mut calendar = OutputCalendar::new(&attendee);
        calendar.push(FeedComponent::FreeBusy(block));

        assert!(
            encode_calendar(&calendar)
                .contains("ATTENDEE;CN=\"Doe, Jane\":mailto:jane@example.com\r\n")
        );
    }

    #[test]
    fn long_lines_are_folded() {
        let calendar = OutputCalendar::new(&Operator::new("x".repeat(100), "jane@example.com"));
        let ics = encode_calendar(&calendar);

        for physical in ics.trim_end_matches("\r\n").split("\r\n") {
            assert!(physical.len() <= 75, "line too long: {}", physical);
        }
        assert!(ics.replace("\r\n ", "").contains(&"x".repeat(100)));
    }

    #[test]
    fn format_utc_basic() {
        assert_eq!(format_utc(&utc(9, 5)), "20240301T090500Z");
    }
}
