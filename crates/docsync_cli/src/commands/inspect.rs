//! Inspect command implementation.

use crate::error::{CliError, CliResult};
use docsync_mapping::{MappingSchema, TableMapping};
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;
use tracing::info;

/// Mapping file inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult<'a> {
    /// Mapping file path.
    pub path: String,
    /// Number of tables.
    pub table_count: usize,
    /// Number of field mappings across all tables.
    pub field_count: usize,
    /// The loaded schema.
    pub schema: &'a MappingSchema,
}

impl<'a> InspectResult<'a> {
    /// Summarizes a loaded schema.
    pub fn new(path: &Path, schema: &'a MappingSchema) -> Self {
        Self {
            path: path.display().to_string(),
            table_count: schema.tables.len(),
            field_count: schema.tables.iter().map(|t| t.field_mappings.len()).sum(),
            schema,
        }
    }
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> CliResult<()> {
    info!("Inspecting mapping file {:?}", path);
    let schema = super::load(path)?;
    let result = InspectResult::new(path, &schema);
    println!("{}", render(&result, format)?);
    Ok(())
}

/// Renders the result in `text` or `json` format.
pub fn render(result: &InspectResult<'_>, format: &str) -> CliResult<String> {
    match format {
        "json" => Ok(serde_json::to_string_pretty(result)?),
        "text" => Ok(render_text(result)),
        other => Err(CliError::UnknownFormat(other.to_string())),
    }
}

fn render_text(result: &InspectResult<'_>) -> String {
    let schema = result.schema;
    let mut out = String::new();
    let _ = writeln!(out, "docsync Mapping Inspection");
    let _ = writeln!(out, "==========================");
    let _ = writeln!(out);
    let _ = writeln!(out, "Path: {}", result.path);
    let _ = writeln!(out, "Namespace:    {}", schema.namespace.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "Assembly:     {}", schema.assembly.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "Data context: {}", schema.data_context.as_deref().unwrap_or("-"));
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Tables: {} ({} fields)",
        result.table_count, result.field_count
    );

    for table in &schema.tables {
        let _ = writeln!(out);
        write_table(&mut out, table);
    }
    out
}

fn write_table(out: &mut String, table: &TableMapping) {
    let _ = writeln!(
        out,
        "  [{}] {} -> {} (collection {})",
        table.name,
        table.document_type.as_deref().unwrap_or("<no document type>"),
        table.entity_type_full_name,
        table.entity_property_name
    );
    let _ = writeln!(
        out,
        "    auto-map: {}, allow delete: {}",
        table.auto_map_fields, table.allow_delete
    );

    for field in &table.field_mappings {
        let mut flags = Vec::new();
        if field.key {
            flags.push("key".to_string());
        }
        if field.is_enabled_column {
            flags.push("enabled".to_string());
        }
        if field.inherit {
            flags.push("inherit".to_string());
        }
        if let Some(data_type) = field.field_type {
            flags.push(data_type.to_string());
        }
        if let Some(default) = &field.default_value {
            flags.push(format!("default={default}"));
        }

        let _ = write!(out, "    {} <- {}", field.name, field.alias);
        if !flags.is_empty() {
            let _ = write!(out, " [{}]", flags.join(", "));
        }
        let _ = writeln!(out);
    }
}
