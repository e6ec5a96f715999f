//! CLI error type.

use docsync_mapping::MappingError;
use thiserror::Error;

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Errors reported by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// The mapping file could not be loaded.
    #[error("{path}: {source}")]
    Load {
        /// File that failed.
        path: String,
        /// Loader error.
        #[source]
        source: MappingError,
    },

    /// The output format is not supported.
    #[error("unknown output format '{0}' (expected text or json)")]
    UnknownFormat(String),

    /// Verification found problems.
    #[error("verification failed with {0} problem(s)")]
    VerificationFailed(usize),

    /// Directory traversal failed.
    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// JSON rendering failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
