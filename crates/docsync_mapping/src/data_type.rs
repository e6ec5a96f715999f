//! Declared field data types.

use crate::error::MappingError;
use crate::value::{parse_bool, parse_datetime, Value};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Data type declared on a field mapping.
///
/// Governs how a default-value literal is parsed and which default-value
/// policy applies during synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DataType {
    /// Free text. The default applies only when the entity value is blank.
    String,
    /// Integer. The default applies only when the entity value is zero.
    Integer,
    /// Boolean. The default always overwrites.
    Boolean,
    /// Timestamp. The default applies only when the entity value is unset.
    DateTime,
    /// Timestamp that is always stamped with the current time on sync.
    DateTimeStamp,
}

impl DataType {
    /// All data types, in declaration order.
    pub const ALL: [DataType; 5] = [
        DataType::String,
        DataType::Integer,
        DataType::Boolean,
        DataType::DateTime,
        DataType::DateTimeStamp,
    ];

    /// Name as written in mapping files.
    pub fn name(self) -> &'static str {
        match self {
            DataType::String => "String",
            DataType::Integer => "Integer",
            DataType::Boolean => "Boolean",
            DataType::DateTime => "DateTime",
            DataType::DateTimeStamp => "DateTimeStamp",
        }
    }

    /// Parses a default-value literal into a typed value.
    ///
    /// `String` and `DateTimeStamp` keep the raw literal (the latter is
    /// never used at sync time, the current time is stamped instead).
    /// Returns `None` when the literal is not valid for this type.
    pub fn parse_literal(self, literal: &str) -> Option<Value> {
        match self {
            DataType::Integer => literal.trim().parse().ok().map(Value::Integer),
            DataType::DateTime => parse_datetime(literal).map(Value::DateTime),
            DataType::Boolean => parse_bool(literal).map(Value::Bool),
            DataType::String | DataType::DateTimeStamp => Some(Value::text(literal)),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        DataType::ALL
            .into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| MappingError::malformed(format!("unknown data type '{s}'")))
    }
}
