//! Error types for the sync engine.

use docsync_mapping::MappingError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during synchronization.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The mapping definition is invalid or cannot be bound to entity types.
    #[error("mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// A value cannot be converted to the target property's type.
    #[error("cannot convert {value:?} to {target} for property '{property}'")]
    TypeCoercion {
        /// Target property.
        property: String,
        /// Rendered source value.
        value: String,
        /// Declared target type.
        target: String,
    },

    /// The named property does not exist on the target.
    #[error("property '{property}' not found on {owner}")]
    PropertyNotFound {
        /// Type or document that was searched.
        owner: String,
        /// Property name.
        property: String,
    },

    /// The persistence session has no collection with this name.
    #[error("collection not found: {name}")]
    CollectionNotFound {
        /// Collection name.
        name: String,
    },

    /// The persistence layer failed (commit, lookup, ...).
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The document store failed (parent lookup, save, delete).
    #[error("content store error: {0}")]
    ContentStore(String),

    /// A structural invariant does not hold (for example a cyclic parent
    /// chain).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl SyncError {
    /// Creates a malformed mapping error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Mapping(MappingError::malformed(message))
    }

    /// Creates a type coercion error.
    pub fn type_coercion(
        property: impl Into<String>,
        value: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::TypeCoercion {
            property: property.into(),
            value: value.into(),
            target: target.into(),
        }
    }

    /// Creates a property not found error.
    pub fn property_not_found(owner: impl Into<String>, property: impl Into<String>) -> Self {
        Self::PropertyNotFound {
            owner: owner.into(),
            property: property.into(),
        }
    }

    /// Creates an invariant violation error.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    /// Returns true if the error only affects a single field assignment and
    /// the surrounding synchronization should carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SyncError::TypeCoercion { .. } | SyncError::PropertyNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_errors() {
        assert!(SyncError::type_coercion("Views", "abc", "integer").is_recoverable());
        assert!(SyncError::property_not_found("Blog.NewsItem", "Body").is_recoverable());
        assert!(!SyncError::Persistence("disk full".into()).is_recoverable());
        assert!(!SyncError::invariant("cycle").is_recoverable());
        assert!(!SyncError::malformed("no key").is_recoverable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::CollectionNotFound {
            name: "News".into(),
        };
        assert_eq!(err.to_string(), "collection not found: News");

        let err = SyncError::type_coercion("Views", "abc", "integer");
        assert!(err.to_string().contains("Views"));
        assert!(err.to_string().contains("integer"));
    }
}
