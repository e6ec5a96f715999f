//! Error types for the mapping crate.

use crate::data_type::DataType;
use std::io;
use thiserror::Error;

/// Result type for mapping operations.
pub type MappingResult<T> = Result<T, MappingError>;

/// Errors that can occur while loading or validating a mapping definition.
#[derive(Error, Debug)]
pub enum MappingError {
    /// A required attribute is missing or a structural rule is broken.
    #[error("malformed mapping: {message}")]
    MalformedMapping {
        /// Description of the problem.
        message: String,
    },

    /// A default-value literal does not parse as its declared data type.
    #[error("default value {literal:?} of field '{field}' is not a valid {data_type}")]
    ValueCoercion {
        /// Field whose default failed to parse.
        field: String,
        /// The literal as written in the mapping file.
        literal: String,
        /// Declared data type.
        data_type: DataType,
    },

    /// The mapping source is not well-formed XML.
    #[error("invalid mapping XML: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The mapping file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl MappingError {
    /// Creates a malformed mapping error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedMapping {
            message: message.into(),
        }
    }

    /// Creates a value coercion error.
    pub fn value_coercion(
        field: impl Into<String>,
        literal: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        Self::ValueCoercion {
            field: field.into(),
            literal: literal.into(),
            data_type,
        }
    }
}
