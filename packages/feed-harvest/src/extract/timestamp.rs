//! Timestamp resolution via a fallback chain.
//!
//! Displayed timestamps depend on locale and feed state: detail views show
//! "9:54 pm · 15 Oct 2018", feed views show "5m". The machine attribute
//! (`<time datetime="...">`) is reliable but not always rendered. Resolution
//! tries, in order:
//!
//! 1. relative displayed text → collection time
//! 2. absolute displayed text (`<time><sep><date>`)
//! 3. the machine attribute
//! 4. collection time
//!
//! Every stage is total; a parse failure just falls through.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::record::{ResolvedTimestamp, TimestampSource};

/// Words that mark a displayed time as relative to now.
const RELATIVE_WORDS: &[&str] = &[
    "now", "ago", "just", "today", "yesterday", "sec", "secs", "second", "seconds", "min",
    "mins", "minute", "minutes", "hr", "hrs", "hour", "hours", "day", "days", "wk", "wks",
    "week", "weeks", "mo", "mos", "month", "months", "yr", "yrs", "year", "years",
];

/// Unit letters accepted directly after a number ("5m", "2h", "3d").
const RELATIVE_UNITS: &[&str] = &["s", "m", "h", "d", "w", "y"];

/// Clock formats tried on the time part.
const TIME_FORMATS: &[&str] = &["%I:%M %p", "%I:%M%p", "%I:%M:%S %p", "%H:%M", "%H:%M:%S"];

/// Date formats tried on the date part.
///
/// `%B` also accepts the abbreviated month name when parsing.
const DATE_FORMATS: &[&str] = &["%d %B %Y", "%B %d, %Y", "%B %d %Y", "%Y-%m-%d"];

/// Resolves displayed and machine timestamps into a date and time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestampResolver {
    /// Separator between the time part and the date part of displayed text
    pub separator: String,
}

impl Default for TimestampResolver {
    fn default() -> Self {
        Self {
            separator: "·".to_string(),
        }
    }
}

impl TimestampResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different time/date separator.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Resolve a timestamp. Never fails.
    pub fn resolve(
        &self,
        displayed: &str,
        machine_attr: Option<&str>,
        collected_at: DateTime<Utc>,
    ) -> ResolvedTimestamp {
        let displayed = displayed.trim();

        if is_relative(displayed) {
            return ResolvedTimestamp::from_datetime(
                collected_at.naive_utc(),
                TimestampSource::Relative,
            );
        }

        if let Some(datetime) = self.parse_displayed(displayed) {
            return ResolvedTimestamp::from_datetime(datetime, TimestampSource::Displayed);
        }

        if let Some(datetime) = machine_attr.and_then(parse_machine) {
            return ResolvedTimestamp::from_datetime(datetime, TimestampSource::Machine);
        }

        debug!(displayed = %displayed, "No parseable timestamp, using collection time");
        ResolvedTimestamp::from_datetime(collected_at.naive_utc(), TimestampSource::CollectionTime)
    }

    /// Parse "<time> <sep> <date>" displayed text.
    fn parse_displayed(&self, displayed: &str) -> Option<NaiveDateTime> {
        if self.separator.is_empty() || !displayed.contains(self.separator.as_str()) {
            return None;
        }

        let parts: Vec<&str> = displayed
            .split(self.separator.as_str())
            .map(str::trim)
            .collect();
        let [time_part, date_part] = parts.as_slice() else {
            return None;
        };

        let time = parse_clock(time_part)?;
        let date = parse_date(date_part)?;
        Some(date.and_time(time))
    }
}

/// Whether displayed text uses relative vocabulary ("5m", "2 hours ago").
pub fn is_relative(displayed: &str) -> bool {
    let lower = displayed.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .any(|token| {
            if RELATIVE_WORDS.contains(&token) {
                return true;
            }
            // "5m", "2h", "10mins"
            let unit = token.trim_start_matches(|c: char| c.is_ascii_digit());
            unit.len() < token.len()
                && !unit.is_empty()
                && (RELATIVE_UNITS.contains(&unit) || RELATIVE_WORDS.contains(&unit))
        })
}

fn parse_clock(text: &str) -> Option<NaiveTime> {
    let upper = text.to_uppercase();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(&upper, format).ok())
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// Parse a machine-readable timestamp into naive UTC.
fn parse_machine(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Some(datetime.with_timezone(&Utc).naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn collected() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 5, 8, 30, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_relative_short_circuits() {
        let resolver = TimestampResolver::new();
        for text in ["5m", "2h", "now", "3 days ago", "1 week", "Just now", "10mins"] {
            let ts = resolver.resolve(text, Some("2018-10-15T21:54:07.000Z"), collected());
            assert_eq!(ts.source, TimestampSource::Relative, "{text}");
            assert_eq!(ts.date, date(2024, 11, 5));
            assert_eq!(ts.time, time(8, 30, 0));
        }
    }

    #[test]
    fn test_absolute_displayed_day_month_year() {
        let ts = TimestampResolver::new().resolve("9:54 pm · 15 Oct 2018", None, collected());
        assert_eq!(ts.source, TimestampSource::Displayed);
        assert_eq!(ts.date, date(2018, 10, 15));
        assert_eq!(ts.time, time(21, 54, 0));
    }

    #[test]
    fn test_absolute_displayed_month_day_year_24h() {
        let ts = TimestampResolver::new().resolve("09:54 · Oct 15, 2018", None, collected());
        assert_eq!(ts.source, TimestampSource::Displayed);
        assert_eq!(ts.date, date(2018, 10, 15));
        assert_eq!(ts.time, time(9, 54, 0));
    }

    #[test]
    fn test_month_names_are_not_relative() {
        assert!(!is_relative("9:54 pm · 15 May 2018"));
        assert!(!is_relative("Oct 15, 2018"));
        assert!(!is_relative("Monday"));
        assert!(is_relative("yesterday"));
    }

    #[test]
    fn test_falls_back_to_machine_attribute() {
        let resolver = TimestampResolver::new();

        // No separator
        let ts = resolver.resolve("15 Oct 2018", Some("2018-10-15T21:54:07.000Z"), collected());
        assert_eq!(ts.source, TimestampSource::Machine);
        assert_eq!(ts.time, time(21, 54, 7));

        // Separator but unparseable time part
        let ts = resolver.resolve("late · 15 Oct 2018", Some("2018-10-15T21:54:07+02:00"), collected());
        assert_eq!(ts.source, TimestampSource::Machine);
        assert_eq!(ts.time, time(19, 54, 7));

        // Naive ISO attribute
        let ts = resolver.resolve("", Some("2020-01-02T03:04:05"), collected());
        assert_eq!(ts.date, date(2020, 1, 2));
    }

    #[test]
    fn test_last_resort_is_collection_time() {
        let resolver = TimestampResolver::new();
        for (text, attr) in [("", None), ("garbage", Some("not a date")), ("· ·", Some(""))] {
            let ts = resolver.resolve(text, attr, collected());
            assert_eq!(ts.source, TimestampSource::CollectionTime);
            assert_eq!(ts.date, date(2024, 11, 5));
        }
    }

    #[test]
    fn test_custom_separator() {
        let resolver = TimestampResolver::new().with_separator("|");
        let ts = resolver.resolve("21:54 | 15 October 2018", None, collected());
        assert_eq!(ts.source, TimestampSource::Displayed);
        assert_eq!(ts.date, date(2018, 10, 15));
    }
}
