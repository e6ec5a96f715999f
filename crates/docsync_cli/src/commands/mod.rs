//! CLI command implementations.

pub mod discover;
pub mod inspect;
pub mod verify;

use crate::error::{CliError, CliResult};
use docsync_mapping::{load_file, MappingSchema};
use std::path::Path;

/// Loads a mapping file, tagging errors with its path.
pub fn load(path: &Path) -> CliResult<MappingSchema> {
    load_file(path).map_err(|source| CliError::Load {
        path: path.display().to_string(),
        source,
    })
}
