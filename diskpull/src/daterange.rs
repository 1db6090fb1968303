//! Inclusive date-range filter over the group headings.
//!
//! Headings look like "12 January" or "12 January 2023"; when the year is
//! absent the current calendar year is assumed. Near a year boundary a
//! heading genuinely from the prior year can therefore misclassify; that
//! matches how the surface renders and is accepted as-is.

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::errors::SurfaceError;

/// Where a heading's date falls relative to a [`DateRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePosition {
    Before,
    Within,
    After,
}

/// "12 January" or "12 January 2023".
fn label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{1,2})\s+([A-Za-z]+)(?:\s+(\d{4}))?$").expect("label pattern is valid")
    })
}

fn month_number(name: &str) -> Option<u32> {
    match name.to_lowercase().as_str() {
        "january" => Some(1),
        "february" => Some(2),
        "march" => Some(3),
        "april" => Some(4),
        "may" => Some(5),
        "june" => Some(6),
        "july" => Some(7),
        "august" => Some(8),
        "september" => Some(9),
        "october" => Some(10),
        "november" => Some(11),
        "december" => Some(12),
        _ => None,
    }
}

/// Parse a rendered group heading into a calendar date.
pub fn parse_group_label(label: &str) -> Result<NaiveDate, SurfaceError> {
    let trimmed = label.trim();
    let caps = label_pattern()
        .captures(trimmed)
        .ok_or_else(|| SurfaceError::UnparsableLabel(label.to_string()))?;

    let day: u32 = caps[1]
        .parse()
        .map_err(|_| SurfaceError::UnparsableLabel(label.to_string()))?;
    let month = month_number(&caps[2])
        .ok_or_else(|| SurfaceError::UnparsableLabel(label.to_string()))?;
    let year: i32 = match caps.get(3) {
        Some(m) => m
            .as_str()
            .parse()
            .map_err(|_| SurfaceError::UnparsableLabel(label.to_string()))?,
        None => Local::now().year(),
    };

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| SurfaceError::UnparsableLabel(label.to_string()))
}

fn earliest_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid calendar date")
}

/// Inclusive filter window over the groups' dates. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
    enabled: bool,
}

impl DateRange {
    /// No filtering; every heading classifies as `Within`.
    pub fn disabled() -> Self {
        Self {
            from: earliest_date(),
            to: earliest_date(),
            enabled: false,
        }
    }

    /// Build a range from `YYYY-MM-DD` bounds. Empty strings leave a bound
    /// unbounded: a missing `from` becomes 1970-01-01, a missing `to`
    /// becomes today. Both empty disables filtering entirely.
    pub fn new(from: &str, to: &str) -> Result<Self, SurfaceError> {
        if from.is_empty() && to.is_empty() {
            return Ok(Self::disabled());
        }

        let parse_bound = |value: &str, which: &str| -> Result<NaiveDate, SurfaceError> {
            NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
                SurfaceError::InvalidConfig(format!(
                    "invalid '{which}' date {value:?} (use YYYY-MM-DD): {e}"
                ))
            })
        };

        let from_date = if from.is_empty() {
            earliest_date()
        } else {
            parse_bound(from, "from")?
        };
        let to_date = if to.is_empty() {
            Local::now().date_naive()
        } else {
            parse_bound(to, "to")?
        };

        if from_date > to_date {
            return Err(SurfaceError::InvalidConfig(format!(
                "'from' date ({from_date}) is after 'to' date ({to_date})"
            )));
        }

        Ok(Self {
            from: from_date,
            to: to_date,
            enabled: true,
        })
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    /// Classify a rendered heading against this range, inclusive on both
    /// bounds. A disabled range classifies everything as `Within`. An
    /// unparsable heading is an error; the engine decides the policy.
    pub fn classify(&self, label: &str) -> Result<RangePosition, SurfaceError> {
        if !self.enabled {
            return Ok(RangePosition::Within);
        }

        let date = parse_group_label(label)?;
        if date < self.from {
            Ok(RangePosition::Before)
        } else if date > self.to {
            Ok(RangePosition::After)
        } else {
            Ok(RangePosition::Within)
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.enabled {
            write!(f, "all dates")
        } else {
            write!(f, "{} to {}", self.from, self.to)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn june_2024() -> DateRange {
        DateRange::new("2024-06-01", "2024-06-30").expect("valid range")
    }

    #[test]
    fn parses_day_month_year() {
        let date = parse_group_label("12 January 2023").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 1, 12).unwrap());
    }

    #[test]
    fn yearless_label_assumes_current_year() {
        let date = parse_group_label("3 March").unwrap();
        assert_eq!(date.year(), Local::now().year());
        assert_eq!(date.month(), 3);
        assert_eq!(date.day(), 3);
    }

    #[test]
    fn label_parsing_ignores_surrounding_whitespace_and_case() {
        let date = parse_group_label("  5 JUNE 2024  ").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 6, 5).unwrap());
    }

    #[test]
    fn rejects_non_date_labels() {
        assert!(matches!(
            parse_group_label("Yesterday"),
            Err(SurfaceError::UnparsableLabel(_))
        ));
        assert!(matches!(
            parse_group_label("12 Fooember 2023"),
            Err(SurfaceError::UnparsableLabel(_))
        ));
        assert!(matches!(
            parse_group_label("31 February 2023"),
            Err(SurfaceError::UnparsableLabel(_))
        ));
    }

    #[test]
    fn bounds_are_inclusive() {
        let range = june_2024();
        assert_eq!(range.classify("1 June 2024").unwrap(), RangePosition::Within);
        assert_eq!(
            range.classify("30 June 2024").unwrap(),
            RangePosition::Within
        );
        assert_eq!(range.classify("31 May 2024").unwrap(), RangePosition::Before);
        assert_eq!(range.classify("1 July 2024").unwrap(), RangePosition::After);
    }

    #[test]
    fn disabled_range_always_within() {
        let range = DateRange::new("", "").unwrap();
        assert!(!range.enabled());
        assert_eq!(range.classify("1 July 1999").unwrap(), RangePosition::Within);
    }

    #[test]
    fn missing_to_defaults_to_today() {
        let range = DateRange::new("2024-01-01", "").unwrap();
        assert!(range.enabled());
        assert_eq!(range.to(), Local::now().date_naive());
    }

    #[test]
    fn missing_from_defaults_to_earliest() {
        let range = DateRange::new("", "2023-12-31").unwrap();
        assert!(range.enabled());
        assert_eq!(range.from(), NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
    }

    #[test]
    fn inverted_bounds_rejected_at_construction() {
        assert!(matches!(
            DateRange::new("2024-06-30", "2024-06-01"),
            Err(SurfaceError::InvalidConfig(_))
        ));
    }

    #[test]
    fn malformed_bound_rejected_at_construction() {
        assert!(matches!(
            DateRange::new("June 1, 2024", ""),
            Err(SurfaceError::InvalidConfig(_))
        ));
    }

    #[test]
    fn unparsable_label_with_enabled_range_is_an_error() {
        let range = june_2024();
        assert!(matches!(
            range.classify("Screenshots"),
            Err(SurfaceError::UnparsableLabel(_))
        ));
    }
}
