//! Discover command implementation.

use crate::error::CliResult;
use docsync_mapping::load_file;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// File name hosts use for their mapping definition.
pub const DEFAULT_FILE_NAME: &str = "TableMappings.config";

/// Finds every file named `file_name` (ignoring case) below `root`, in a
/// stable order. A host uses the first one.
pub fn find(root: &Path, file_name: &str) -> CliResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.eq_ignore_ascii_case(file_name))
        {
            debug!("found {:?}", entry.path());
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

/// Runs the discover command.
pub fn run(root: &Path, file_name: &str) -> CliResult<()> {
    info!("Searching {:?} for {}", root, file_name);
    let found = find(root, file_name)?;

    if found.is_empty() {
        println!("No {file_name} found below {}", root.display());
        return Ok(());
    }

    for (i, path) in found.iter().enumerate() {
        let marker = if i == 0 { "*" } else { " " };
        match load_file(path) {
            Ok(schema) => println!(
                "{marker} {} ({} table(s))",
                path.display(),
                schema.tables.len()
            ),
            Err(err) => println!("{marker} {} (invalid: {err})", path.display()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_nested_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("b/config")).unwrap();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::write(root.join("b/config/TableMappings.config"), "<mappings />").unwrap();
        fs::write(root.join("a/tablemappings.config"), "<mappings />").unwrap();
        fs::write(root.join("a/Other.config"), "").unwrap();

        let found = find(root, DEFAULT_FILE_NAME).unwrap();
        assert_eq!(
            found,
            vec![
                root.join("a/tablemappings.config"),
                root.join("b/config/TableMappings.config"),
            ]
        );
    }

    #[test]
    fn finds_the_sample_definition() {
        let file = docsync_testkit::MappingFile::sample();
        let found = find(file.root(), DEFAULT_FILE_NAME).unwrap();
        assert_eq!(found, vec![file.path().to_path_buf()]);
        assert!(run(file.root(), DEFAULT_FILE_NAME).is_ok());
    }

    #[test]
    fn nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find(dir.path(), DEFAULT_FILE_NAME).unwrap().is_empty());
        assert!(run(dir.path(), DEFAULT_FILE_NAME).is_ok());
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find(&dir.path().join("nope"), DEFAULT_FILE_NAME).is_err());
    }
}
