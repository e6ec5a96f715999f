//! Verify command implementation.
//!
//! A definition that loads can still be unusable: the engine refuses tables
//! without a key, never selects a table without a document type, and only
//! honours the first enabled column. These checks report such problems
//! without needing the entity types.

use crate::error::{CliError, CliResult};
use docsync_mapping::{DataType, MappingSchema, Value};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// A problem found in a loaded mapping definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    /// Table the problem belongs to.
    pub table: String,
    /// Description.
    pub message: String,
}

impl Problem {
    fn new(table: &str, message: impl Into<String>) -> Self {
        Self {
            table: table.to_string(),
            message: message.into(),
        }
    }
}

/// Checks a loaded schema for structural problems.
pub fn check(schema: &MappingSchema) -> Vec<Problem> {
    let mut problems = Vec::new();

    for table in &schema.tables {
        let name = table.name.as_str();

        if table.key_field().is_none() {
            problems.push(Problem::new(name, "no key field"));
        }
        if table.document_type.is_none() {
            problems.push(Problem::new(
                name,
                "no document type, the table is never selected",
            ));
        }

        let mut aliases = HashSet::new();
        for field in &table.field_mappings {
            if !aliases.insert(field.alias.to_ascii_lowercase()) {
                problems.push(Problem::new(
                    name,
                    format!("alias '{}' is mapped more than once", field.alias),
                ));
            }
            if field.key && (field.inherit || field.default_value.is_some()) {
                problems.push(Problem::new(
                    name,
                    format!("key field '{}' declares a default or inheritance", field.name),
                ));
            }
        }

        let enabled: Vec<_> = table
            .field_mappings
            .iter()
            .filter(|f| f.is_enabled_column)
            .collect();
        if enabled.len() > 1 {
            problems.push(Problem::new(
                name,
                format!("{} enabled columns, only the first is used", enabled.len()),
            ));
        }
        for field in enabled {
            let typed_otherwise = field
                .field_type
                .is_some_and(|ty| ty != DataType::Boolean);
            let bad_default = field
                .default_value
                .as_ref()
                .is_some_and(|v| !matches!(v, Value::Bool(_)));
            if typed_otherwise || bad_default {
                problems.push(Problem::new(
                    name,
                    format!("enabled column '{}' is not boolean", field.name),
                ));
            }
            if field.key {
                problems.push(Problem::new(
                    name,
                    format!("field '{}' is both key and enabled column", field.name),
                ));
            }
        }
    }

    problems
}

/// Runs the verify command.
pub fn run(path: &Path) -> CliResult<()> {
    info!("Verifying mapping file {:?}", path);
    let schema = super::load(path)?;
    let problems = check(&schema);

    println!("Checked {} table(s)", schema.tables.len());
    for problem in &problems {
        println!("  [{}] {}", problem.table, problem.message);
    }

    println!();
    if problems.is_empty() {
        println!("✓ Mapping verification passed");
        Ok(())
    } else {
        println!("✗ Mapping verification failed");
        Err(CliError::VerificationFailed(problems.len()))
    }
}
