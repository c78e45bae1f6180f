//! Text codecs shared by the built-in dialects.
//!
//! Drivers frequently hand temporal, interval and geometric values back as
//! text. These helpers parse that text into [`Value`](sqlbridge_core::Value)
//! payloads and render payloads back to the text forms databases accept.
//! All parsers return `None` on malformed input; callers decide how to fail.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use regex::Regex;
use sqlbridge_core::{Interval, Point};

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SECOND;

/// Julian day number of 1970-01-01T00:00:00Z.
const UNIX_EPOCH_JULIAN_DAY: f64 = 2_440_587.5;

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f %#z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

fn epoch_date() -> NaiveDate {
    NaiveDate::default()
}

/// Parse an ISO-8601 style timestamp into microseconds since the Unix epoch.
///
/// A trailing `Z` or numeric offset is honoured; text without a zone is
/// read as UTC. A bare date parses to midnight.
pub fn parse_timestamp_micros(text: &str) -> Option<i64> {
    let text = text.trim();
    let text = text.strip_suffix(['Z', 'z']).unwrap_or(text);
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt.timestamp_micros());
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc().timestamp_micros());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_micros())
}

/// Render microseconds since the epoch as `YYYY-MM-DD HH:MM:SS.ffffff`.
pub fn format_timestamp(micros: i64) -> Option<String> {
    DateTime::from_timestamp_micros(micros)
        .map(|dt| dt.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string())
}

/// Like [`format_timestamp`] with an explicit `Z` zone designator.
pub fn format_timestamp_utc(micros: i64) -> Option<String> {
    format_timestamp(micros).map(|s| s + "Z")
}

/// Unix seconds to microseconds.
pub fn epoch_seconds_to_micros(seconds: i64) -> Option<i64> {
    seconds.checked_mul(MICROS_PER_SECOND)
}

/// Julian day number (SQLite `julianday()`) to microseconds since the epoch.
pub fn julian_day_to_micros(day: f64) -> Option<i64> {
    let micros = ((day - UNIX_EPOCH_JULIAN_DAY) * MICROS_PER_DAY as f64).round();
    if micros.is_finite() && micros.abs() < i64::MAX as f64 {
        Some(micros as i64)
    } else {
        None
    }
}

/// Parse `YYYY-MM-DD` (a time part, if any, is ignored) into days since the epoch.
pub fn parse_date_days(text: &str) -> Option<i32> {
    let text = text.trim();
    let date_part = text.get(..10).unwrap_or(text);
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    i32::try_from(date.signed_duration_since(epoch_date()).num_days()).ok()
}

/// Render days since the epoch as `YYYY-MM-DD`.
pub fn format_date(days: i32) -> Option<String> {
    let delta = TimeDelta::try_days(i64::from(days))?;
    epoch_date()
        .checked_add_signed(delta)
        .map(|d| d.format("%Y-%m-%d").to_string())
}

/// Parse `HH:MM[:SS[.ffffff]]` into microseconds since midnight.
pub fn parse_time_micros(text: &str) -> Option<i64> {
    let text = text.trim();
    let time = NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()?;
    Some(
        i64::from(time.num_seconds_from_midnight()) * MICROS_PER_SECOND
            + i64::from(time.nanosecond() / 1_000),
    )
}

/// Render microseconds since midnight as `HH:MM:SS.ffffff`.
pub fn format_time(micros: i64) -> Option<String> {
    if !(0..MICROS_PER_DAY).contains(&micros) {
        return None;
    }
    let secs = u32::try_from(micros / MICROS_PER_SECOND).ok()?;
    let nanos = u32::try_from((micros % MICROS_PER_SECOND) * 1_000).ok()?;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
        .map(|t| t.format("%H:%M:%S%.6f").to_string())
}

/// Parse a decimal seconds literal such as `-6.5` into microseconds.
fn seconds_to_micros(text: &str) -> Option<i64> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (whole, frac) = body.split_once('.').unwrap_or((body, ""));
    let whole: i64 = whole.parse().ok()?;
    let mut digits: String = frac.chars().take(6).collect();
    while digits.len() < 6 {
        digits.push('0');
    }
    let frac: i64 = digits.parse().ok()?;
    let micros = whole.checked_mul(MICROS_PER_SECOND)?.checked_add(frac)?;
    Some(if negative { -micros } else { micros })
}

fn iso_interval_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^P(?:([+-]?\d+)Y)?(?:([+-]?\d+)M)?(?:([+-]?\d+)W)?(?:([+-]?\d+)D)?(?:T(?:([+-]?\d+)H)?(?:([+-]?\d+)M)?(?:([+-]?\d+(?:\.\d+)?)S)?)?$",
        )
        .expect("valid ISO interval regex")
    })
}

fn verbose_interval_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:\s*[+-]?\d+\s*(?:years?|mons?|months?|weeks?|days?))*\s*(?:[+-]?\d+:\d{1,2}(?::\d{1,2}(?:\.\d+)?)?)?\s*$",
        )
        .expect("valid interval regex")
    })
}

fn interval_unit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)([+-]?\d+)\s*(years?|mons?|months?|weeks?|days?)")
            .expect("valid interval unit regex")
    })
}

fn interval_clock_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([+-])?(\d+):(\d{1,2})(?::(\d{1,2}(?:\.\d+)?))?")
            .expect("valid interval clock regex")
    })
}

fn capture_i64(caps: &regex::Captures<'_>, group: usize) -> Option<i64> {
    caps.get(group).map_or(Some(0), |m| m.as_str().parse().ok())
}

/// Parse an interval in either ISO-8601 (`P1Y2M3DT4H`) or PostgreSQL output
/// form (`1 year 2 mons 3 days 04:05:06.5`, `-1 days +02:03:00`).
pub fn parse_interval(text: &str) -> Option<Interval> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(caps) = iso_interval_re().captures(text) {
        let years = capture_i64(&caps, 1)?;
        let months = capture_i64(&caps, 2)?;
        let weeks = capture_i64(&caps, 3)?;
        let days = capture_i64(&caps, 4)?;
        let hours = capture_i64(&caps, 5)?;
        let minutes = capture_i64(&caps, 6)?;
        let seconds = caps.get(7).map_or(Some(0), |m| seconds_to_micros(m.as_str()))?;
        let micros = hours
            .checked_mul(3_600 * MICROS_PER_SECOND)?
            .checked_add(minutes.checked_mul(60 * MICROS_PER_SECOND)?)?
            .checked_add(seconds)?;
        return Some(Interval::new(
            i32::try_from(years.checked_mul(12)?.checked_add(months)?).ok()?,
            i32::try_from(weeks.checked_mul(7)?.checked_add(days)?).ok()?,
            micros,
        ));
    }
    if !verbose_interval_re().is_match(text) {
        return None;
    }
    let mut months: i64 = 0;
    let mut days: i64 = 0;
    for caps in interval_unit_re().captures_iter(text) {
        let amount: i64 = caps[1].parse().ok()?;
        let unit = caps[2].to_ascii_lowercase();
        if unit.starts_with('y') {
            months = months.checked_add(amount.checked_mul(12)?)?;
        } else if unit.starts_with("mon") {
            months = months.checked_add(amount)?;
        } else if unit.starts_with('w') {
            days = days.checked_add(amount.checked_mul(7)?)?;
        } else {
            days = days.checked_add(amount)?;
        }
    }
    let mut micros: i64 = 0;
    if let Some(caps) = interval_clock_re().captures(text) {
        let hours: i64 = caps[2].parse().ok()?;
        let minutes: i64 = caps[3].parse().ok()?;
        let seconds = caps.get(4).map_or(Some(0), |m| seconds_to_micros(m.as_str()))?;
        micros = hours
            .checked_mul(3_600 * MICROS_PER_SECOND)?
            .checked_add(minutes.checked_mul(60 * MICROS_PER_SECOND)?)?
            .checked_add(seconds)?;
        if caps.get(1).is_some_and(|m| m.as_str() == "-") {
            micros = -micros;
        }
    }
    Some(Interval::new(
        i32::try_from(months).ok()?,
        i32::try_from(days).ok()?,
        micros,
    ))
}

fn point_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*\(?\s*([^,()\s]+)\s*,\s*([^,()\s]+)\s*\)?\s*$")
            .expect("valid point regex")
    })
}

/// Parse `(x,y)` (parentheses optional).
pub fn parse_point(text: &str) -> Option<Point> {
    let caps = point_re().captures(text)?;
    Some(Point::new(caps[1].parse().ok()?, caps[2].parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_forms() {
        let base = parse_timestamp_micros("2024-03-01 12:30:00").unwrap();
        assert_eq!(parse_timestamp_micros("2024-03-01T12:30:00Z"), Some(base));
        assert_eq!(parse_timestamp_micros("2024-03-01 14:30:00+02"), Some(base));
        assert_eq!(parse_timestamp_micros("2024-03-01 12:30:00.000000Z"), Some(base));
        assert_eq!(
            parse_timestamp_micros("2024-03-01 12:30:00.25"),
            Some(base + 250_000)
        );
        assert_eq!(parse_timestamp_micros("not a timestamp"), None);
    }

    #[test]
    fn test_timestamp_format_parses_back() {
        let micros = 1_709_296_200_123_456;
        let text = format_timestamp_utc(micros).unwrap();
        assert_eq!(text, "2024-03-01 12:30:00.123456Z");
        assert_eq!(parse_timestamp_micros(&text), Some(micros));
    }

    #[test]
    fn test_epoch_and_julian() {
        assert_eq!(epoch_seconds_to_micros(2), Some(2_000_000));
        assert_eq!(julian_day_to_micros(UNIX_EPOCH_JULIAN_DAY + 1.0), Some(MICROS_PER_DAY));
    }

    #[test]
    fn test_dates_and_times() {
        assert_eq!(parse_date_days("1970-01-02"), Some(1));
        assert_eq!(parse_date_days("1969-12-31 10:00:00"), Some(-1));
        assert_eq!(format_date(19_783).as_deref(), Some("2024-03-01"));
        assert_eq!(parse_time_micros("01:00:00.5"), Some(3_600_500_000));
        assert_eq!(format_time(3_600_500_000).as_deref(), Some("01:00:00.500000"));
        assert_eq!(format_time(MICROS_PER_DAY), None);
    }

    #[test]
    fn test_interval_postgres_output() {
        assert_eq!(
            parse_interval("1 year 2 mons 3 days 04:05:06.5"),
            Some(Interval::new(14, 3, 14_706_500_000))
        );
        assert_eq!(
            parse_interval("-1 days +02:03:00"),
            Some(Interval::new(0, -1, 7_380_000_000))
        );
        assert_eq!(parse_interval("-00:00:01"), Some(Interval::new(0, 0, -1_000_000)));
        assert_eq!(parse_interval("garbage"), None);
    }

    #[test]
    fn test_interval_iso() {
        let interval = Interval::new(14, 3, 14_706_500_000);
        assert_eq!(parse_interval(&interval.to_iso8601()), Some(interval));
        assert_eq!(parse_interval("PT0S"), Some(Interval::default()));
        assert_eq!(parse_interval("P2W"), Some(Interval::new(0, 14, 0)));
    }

    #[test]
    fn test_interval_overflow_is_malformed() {
        assert_eq!(parse_interval("P999999999999999999Y"), None);
        assert_eq!(parse_interval("P9223372036854775807W"), None);
        assert_eq!(parse_interval("99999999999999:00"), None);
        assert_eq!(parse_interval("999999999999999999 years"), None);
        assert_eq!(parse_interval("9223372036854775807 weeks"), None);
        assert_eq!(parse_interval("PT9223372036854775807H"), None);
    }

    #[test]
    fn test_point() {
        assert_eq!(parse_point("(1.5,-2)"), Some(Point::new(1.5, -2.0)));
        assert_eq!(parse_point(" 3 , 4 "), Some(Point::new(3.0, 4.0)));
        assert_eq!(parse_point("(a,b)"), None);
    }
}
