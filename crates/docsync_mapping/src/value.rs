//! Typed property value.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use std::fmt;

/// Formats tried, in order, when a timestamp is read from text.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// A value held by a document property or an entity property.
///
/// Documents carry loosely typed values (most editors store text), while
/// entity properties are strongly typed. Conversion between the two is the
/// job of the property accessor in the engine crate; this type only knows
/// how to render itself and how to answer the "is this unset?" questions the
/// default-value policy asks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// No value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Text value.
    Text(String),
    /// Timestamp without zone (wall-clock time of the host).
    DateTime(NaiveDateTime),
}

impl Value {
    /// Creates a text value.
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for null and for text that is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// True for null and for the integer zero.
    pub fn is_zero_or_null(&self) -> bool {
        matches!(self, Value::Null | Value::Integer(0))
    }

    /// True for null and for a timestamp that was never set.
    pub fn is_min_datetime_or_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::DateTime(dt) => is_unset_datetime(dt),
            _ => false,
        }
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as a timestamp, if it is one.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Interprets the value as an integer key.
    ///
    /// Integers are returned as-is; text is trimmed and parsed. Everything
    /// else (including blank text) has no key.
    pub fn as_key(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Text(_) => "text",
            Value::DateTime(_) => "datetime",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

/// Parses a boolean literal (`true`/`false`, any case, surrounding
/// whitespace ignored).
pub fn parse_bool(literal: &str) -> Option<bool> {
    let literal = literal.trim();
    if literal.eq_ignore_ascii_case("true") {
        Some(true)
    } else if literal.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parses a timestamp literal.
///
/// RFC 3339 input with an offset is normalized to UTC. Plain dates resolve
/// to midnight.
pub fn parse_datetime(literal: &str) -> Option<NaiveDateTime> {
    let literal = literal.trim();
    if literal.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(literal) {
        return Some(dt.naive_utc());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(literal, format) {
            return Some(dt);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(literal, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// True if the timestamp is one of the "never set" sentinels: the minimum
/// representable value, `0001-01-01 00:00:00`, or the Unix epoch (the
/// `Default` of most Rust timestamp fields).
pub fn is_unset_datetime(dt: &NaiveDateTime) -> bool {
    if *dt == NaiveDateTime::MIN {
        return true;
    }
    if dt.num_seconds_from_midnight() != 0 || dt.nanosecond() != 0 {
        return false;
    }
    let date = dt.date();
    Some(date) == NaiveDate::from_ymd_opt(1, 1, 1)
        || Some(date) == NaiveDate::from_ymd_opt(1970, 1, 1)
}
