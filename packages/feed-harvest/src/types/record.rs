//! Record types - typed field values and the ordered record built per item.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which stage of the timestamp fallback chain produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampSource {
    /// Parsed from the absolute text shown on the item
    Displayed,

    /// Parsed from the machine-readable attribute
    Machine,

    /// Displayed text was relative ("5m", "2 hours ago"); collection time used
    Relative,

    /// Nothing parsed; collection time used as the last resort
    CollectionTime,
}

impl TimestampSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Displayed => "displayed",
            Self::Machine => "machine",
            Self::Relative => "relative",
            Self::CollectionTime => "collection_time",
        }
    }
}

/// A timestamp split into calendar date and wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedTimestamp {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub source: TimestampSource,
}

impl ResolvedTimestamp {
    pub fn new(date: NaiveDate, time: NaiveTime, source: TimestampSource) -> Self {
        Self { date, time, source }
    }

    /// Split a datetime, dropping sub-second precision.
    pub fn from_datetime(datetime: NaiveDateTime, source: TimestampSource) -> Self {
        let datetime = datetime.with_nanosecond(0).unwrap_or(datetime);
        Self::new(datetime.date(), datetime.time(), source)
    }

    pub fn datetime(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

impl fmt::Display for ResolvedTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.date.format("%Y-%m-%d"),
            self.time.format("%H:%M:%S")
        )
    }
}

/// One typed field value.
///
/// `Absent` marks a field no strategy could read and that has no default.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Count(i64),
    Score(f64),
    Url(String),
    Timestamp(ResolvedTimestamp),
    Absent,
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Borrow the string content of text and URL values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Url(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<i64> {
        match self {
            Self::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_score(&self) -> Option<f64> {
        match self {
            Self::Score(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&ResolvedTimestamp> {
        match self {
            Self::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    /// Render for a tabular export cell (absent renders empty).
    pub fn to_cell(&self) -> String {
        match self {
            Self::Text(s) | Self::Url(s) => s.clone(),
            Self::Count(n) => n.to_string(),
            Self::Score(x) => x.to_string(),
            Self::Timestamp(ts) => ts.to_string(),
            Self::Absent => String::new(),
        }
    }
}

/// A structured record built from one feed item.
///
/// Field order follows the schema that built it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing an earlier value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Text or URL content of a field, if present.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    pub fn count(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(FieldValue::as_count)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_preserves_field_order() {
        let record = Record::new()
            .with("title", FieldValue::Text("Laptop".to_string()))
            .with("price", FieldValue::Score(499.99))
            .with("reviews", FieldValue::Count(12));

        let names: Vec<&str> = record.field_names().collect();
        assert_eq!(names, vec!["title", "price", "reviews"]);
        assert_eq!(record.text("title"), Some("Laptop"));
        assert_eq!(record.count("reviews"), Some(12));
        assert_eq!(record.count("title"), None);
    }

    #[test]
    fn test_cells() {
        assert_eq!(FieldValue::Absent.to_cell(), "");
        assert_eq!(FieldValue::Count(1200).to_cell(), "1200");

        let ts = ResolvedTimestamp::from_datetime(
            NaiveDate::from_ymd_opt(2018, 10, 15)
                .unwrap()
                .and_hms_milli_opt(21, 54, 7, 450)
                .unwrap(),
            TimestampSource::Machine,
        );
        assert_eq!(FieldValue::Timestamp(ts).to_cell(), "2018-10-15 21:54:07");
    }

    #[test]
    fn test_serializes_absent_as_null() {
        let record = Record::new()
            .with("username", FieldValue::Text("ada".to_string()))
            .with("likes", FieldValue::Count(3))
            .with("url", FieldValue::Absent);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "username": "ada", "likes": 3, "url": null })
        );
    }
}
