//! Time types for free/busy aggregation.
//!
//! This module provides [`TimeValue`] for representing the shapes a calendar
//! date property can take (date-only, floating, UTC or zoned date-time), and
//! [`Interval`] for the normalized UTC `(start, end)` pairs the feed is made of.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while normalizing a [`TimeValue`] to UTC.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// The TZID is not an IANA timezone name.
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    /// The wall-clock time falls into a DST gap of its timezone.
    #[error("local time {date_time} does not exist in {tzid}")]
    NonexistentLocalTime {
        date_time: NaiveDateTime,
        tzid: String,
    },
}

/// A date or date-time value as found in a calendar property.
///
/// Calendar streams carry four shapes of time values:
/// - **Date**: a date without a time component (`VALUE=DATE`)
/// - **Floating**: a date-time without timezone information
/// - **Utc**: a date-time with the `Z` suffix
/// - **Zoned**: a wall-clock date-time with a `TZID` parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum TimeValue {
    /// A date-only value.
    Date(NaiveDate),
    /// A date-time without timezone.
    Floating(NaiveDateTime),
    /// A date-time in UTC.
    Utc(DateTime<Utc>),
    /// A wall-clock date-time in a named timezone.
    Zoned { date_time: NaiveDateTime, tzid: String },
}

impl TimeValue {
    /// Returns `true` if this is a date-only value.
    pub fn is_date(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// Normalizes this value to a UTC instant.
    ///
    /// - Date-only values become midnight UTC.
    /// - Floating date-times are assumed to be UTC.
    /// - UTC date-times are returned unchanged.
    /// - Zoned date-times are converted to the same instant in UTC. For
    ///   ambiguous wall-clock times (DST fold) the earlier instant is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the TZID is unknown or the wall-clock time does
    /// not exist in that timezone.
    pub fn to_utc(&self) -> Result<DateTime<Utc>, TimeError> {
        match self {
            Self::Date(date) => Ok(date.and_time(NaiveTime::MIN).and_utc()),
            Self::Floating(naive) => Ok(naive.and_utc()),
            Self::Utc(dt) => Ok(*dt),
            Self::Zoned { date_time, tzid } => {
                let tz = resolve_timezone(tzid)?;
                match tz.from_local_datetime(date_time) {
                    LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
                    LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
                    LocalResult::None => Err(TimeError::NonexistentLocalTime {
                        date_time: *date_time,
                        tzid: tzid.clone(),
                    }),
                }
            }
        }
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Floating(naive) => write!(f, "{}", naive.format("%Y-%m-%dT%H:%M:%S")),
            Self::Utc(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%SZ")),
            Self::Zoned { date_time, tzid } => {
                write!(f, "{} ({})", date_time.format("%Y-%m-%dT%H:%M:%S"), tzid)
            }
        }
    }
}

/// Resolves a TZID parameter value to an IANA timezone.
///
/// Some producers prefix TZIDs with `/` (e.g. `/Europe/Berlin`); the prefix
/// is ignored.
pub fn resolve_timezone(tzid: &str) -> Result<Tz, TimeError> {
    let name = tzid.trim().trim_matches('"').trim_start_matches('/');
    Tz::from_str(name).map_err(|_| TimeError::UnknownTimezone(tzid.to_string()))
}

/// A busy interval normalized to UTC.
///
/// `start <= end` is not enforced: upstream calendars occasionally carry
/// inverted ranges and those are recorded as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    /// Start of the interval.
    pub start: DateTime<Utc>,
    /// End of the interval.
    pub end: DateTime<Utc>,
}

impl Interval {
    /// Creates a new interval.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Creates an interval from two time values, normalizing both to UTC.
    pub fn from_values(start: &TimeValue, end: &TimeValue) -> Result<Self, TimeError> {
        Ok(Self::new(start.to_utc()?, end.to_utc()?))
    }

    /// Returns the length of this interval (negative when inverted).
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Returns `true` if the end lies before the start.
    pub fn is_inverted(&self) -> bool {
        self.end < self.start
    }

    /// Returns the smallest interval covering all given intervals.
    pub fn span<'a>(intervals: impl IntoIterator<Item = &'a Interval>) -> Option<Interval> {
        intervals.into_iter().fold(None, |acc, iv| {
            let lo = iv.start.min(iv.end);
            let hi = iv.start.max(iv.end);
            Some(match acc {
                None => Interval::new(lo, hi),
                Some(span) => Interval::new(span.start.min(lo), span.end.max(hi)),
            })
        })
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.start.format("%Y-%m-%dT%H:%M:%SZ"),
            self.end.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    mod normalization {
        use super::*;

        #[test]
        fn date_becomes_midnight_utc() {
            let value = TimeValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
            assert_eq!(value.to_utc().unwrap(), utc(2024, 3, 1, 0, 0, 0));
            assert!(value.is_date());
        }

        #[test]
        fn floating_is_assumed_utc() {
            let value = TimeValue::Floating(naive(2024, 3, 1, 9, 0));
            assert_eq!(value.to_utc().unwrap(), utc(2024, 3, 1, 9, 0, 0));
        }

        #[test]
        fn utc_is_unchanged() {
            let dt = utc(2024, 3, 1, 9, 30, 15);
            assert_eq!(TimeValue::Utc(dt).to_utc().unwrap(), dt);
        }

        #[test]
        fn zoned_keeps_the_instant() {
            let value = TimeValue::Zoned {
                date_time: naive(2024, 3, 1, 9, 0),
                tzid: "Europe/Berlin".to_string(),
            };
            // CET is UTC+1 in March before the DST switch.
            assert_eq!(value.to_utc().unwrap(), utc(2024, 3, 1, 8, 0, 0));
        }

        #[test]
        fn zoned_accepts_slash_prefixed_tzid() {
            let value = TimeValue::Zoned {
                date_time: naive(2024, 7, 1, 12, 0),
                tzid: "/America/New_York".to_string(),
            };
            assert_eq!(value.to_utc().unwrap(), utc(2024, 7, 1, 16, 0, 0));
        }

        #[test]
        fn unknown_timezone_is_an_error() {
            let value = TimeValue::Zoned {
                date_time: naive(2024, 3, 1, 9, 0),
                tzid: "Mars/Olympus_Mons".to_string(),
            };
            assert_eq!(
                value.to_utc(),
                Err(TimeError::UnknownTimezone("Mars/Olympus_Mons".to_string()))
            );
        }

        #[test]
        fn dst_gap_is_an_error() {
            // 02:30 does not exist in Berlin on 2024-03-31.
            let value = TimeValue::Zoned {
                date_time: naive(2024, 3, 31, 2, 30),
                tzid: "Europe/Berlin".to_string(),
            };
            assert!(matches!(
                value.to_utc(),
                Err(TimeError::NonexistentLocalTime { .. })
            ));
        }

        #[test]
        fn dst_fold_uses_earliest() {
            // 02:30 happens twice in Berlin on 2024-10-27; first as CEST.
            let value = TimeValue::Zoned {
                date_time: naive(2024, 10, 27, 2, 30),
                tzid: "Europe/Berlin".to_string(),
            };
            assert_eq!(value.to_utc().unwrap(), utc(2024, 10, 27, 0, 30, 0));
        }

        #[test]
        fn serde_roundtrip() {
            let value = TimeValue::Zoned {
                date_time: naive(2024, 3, 1, 9, 0),
                tzid: "Europe/Berlin".to_string(),
            };
            let json = serde_json::to_string(&value).unwrap();
            let parsed: TimeValue = serde_json::from_str(&json).unwrap();
            assert_eq!(value, parsed);
        }
    }

    mod interval {
        use super::*;

        #[test]
        fn from_values_normalizes_both_ends() {
            let start = TimeValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
            let end = TimeValue::Floating(naive(2024, 3, 1, 9, 0));
            let interval = Interval::from_values(&start, &end).unwrap();

            assert_eq!(interval.start, utc(2024, 3, 1, 0, 0, 0));
            assert_eq!(interval.end, utc(2024, 3, 1, 9, 0, 0));
            assert_eq!(interval.duration(), Duration::hours(9));
            assert!(!interval.is_inverted());
        }

        #[test]
        fn inverted_interval_is_kept() {
            let interval = Interval::new(utc(2024, 3, 1, 10, 0, 0), utc(2024, 3, 1, 9, 0, 0));
            assert!(interval.is_inverted());
            assert_eq!(interval.duration(), Duration::hours(-1));
        }

        #[test]
        fn span_covers_all_intervals() {
            let intervals = [
                Interval::new(utc(2024, 3, 1, 14, 0, 0), utc(2024, 3, 1, 15, 0, 0)),
                Interval::new(utc(2024, 3, 1, 9, 0, 0), utc(2024, 3, 1, 10, 0, 0)),
                Interval::new(utc(2024, 3, 2, 1, 0, 0), utc(2024, 3, 1, 23, 0, 0)),
            ];
            let span = Interval::span(&intervals).unwrap();
            assert_eq!(span.start, utc(2024, 3, 1, 9, 0, 0));
            assert_eq!(span.end, utc(2024, 3, 2, 1, 0, 0));
        }

        #[test]
        fn span_of_nothing_is_none() {
            assert!(Interval::span(std::iter::empty::<&Interval>()).is_none());
        }

        #[test]
        fn display() {
            let interval = Interval::new(utc(2024, 3, 1, 9, 0, 0), utc(2024, 3, 1, 10, 0, 0));
            assert_eq!(
                interval.to_string(),
                "2024-03-01T09:00:00Z/2024-03-01T10:00:00Z"
            );
        }
    }
}
