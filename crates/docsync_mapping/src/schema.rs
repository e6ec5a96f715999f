//! In-memory mapping schema.

use crate::data_type::DataType;
use crate::error::{MappingError, MappingResult};
use crate::value::Value;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

/// Binding from one document property alias to one entity property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMapping {
    /// Entity property name.
    pub name: String,
    /// Document property alias.
    pub alias: String,
    /// Whether this field holds the entity's integer key.
    pub key: bool,
    /// Whether this boolean field marks the entity as enabled (soft delete).
    pub is_enabled_column: bool,
    /// Whether to look the value up on ancestors when the document lacks it.
    pub inherit: bool,
    /// Typed default value.
    pub default_value: Option<Value>,
    /// Declared data type.
    pub field_type: Option<DataType>,
}

impl FieldMapping {
    /// Creates a field mapping whose alias equals its name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            alias: name.clone(),
            name,
            key: false,
            is_enabled_column: false,
            inherit: false,
            default_value: None,
            field_type: None,
        }
    }

    /// Sets the document alias.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// Marks this field as the key.
    #[must_use]
    pub fn as_key(mut self) -> Self {
        self.key = true;
        self
    }

    /// Marks this field as the enabled column.
    #[must_use]
    pub fn as_enabled_column(mut self) -> Self {
        self.is_enabled_column = true;
        self
    }

    /// Enables ancestor inheritance.
    #[must_use]
    pub fn inherited(mut self) -> Self {
        self.inherit = true;
        self
    }

    /// Sets the declared data type.
    #[must_use]
    pub fn with_type(mut self, field_type: DataType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    /// Sets a typed default value.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Case-insensitive alias comparison.
    pub fn matches_alias(&self, alias: &str) -> bool {
        self.alias.eq_ignore_ascii_case(alias)
    }
}

/// Binding from one document content type to one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableMapping {
    /// Table label, unique within the schema.
    pub name: String,
    /// Content type alias that selects this mapping.
    pub document_type: Option<String>,
    /// Assembly (module) the entity type lives in.
    pub assembly: Option<String>,
    /// Namespace of the entity type.
    pub namespace: Option<String>,
    /// Fully qualified entity type name, `namespace.TypeName`.
    pub entity_type_full_name: String,
    /// Name of the collection exposed by the persistence session.
    pub entity_property_name: String,
    /// Whether unmapped same-named properties are copied implicitly.
    pub auto_map_fields: bool,
    /// Parsed but not consulted; reserved for delete gating.
    pub allow_delete: bool,
    /// Field rules in declaration order.
    pub field_mappings: Vec<FieldMapping>,
}

impl TableMapping {
    /// Creates a table mapping with the loader's defaults applied.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        let name = name.into();
        let namespace = namespace.into();
        Self {
            entity_type_full_name: format!("{namespace}.{name}"),
            entity_property_name: name.clone(),
            document_type: Some(name.clone()),
            name,
            assembly: None,
            namespace: Some(namespace),
            auto_map_fields: true,
            allow_delete: false,
            field_mappings: Vec::new(),
        }
    }

    /// Adds a field mapping.
    #[must_use]
    pub fn with_field(mut self, field: FieldMapping) -> Self {
        self.field_mappings.push(field);
        self
    }

    /// Entity type name without its namespace.
    pub fn entity_type_name(&self) -> &str {
        self.entity_type_full_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.entity_type_full_name)
    }

    /// The key field, if one is declared.
    pub fn key_field(&self) -> Option<&FieldMapping> {
        self.field_mappings.iter().find(|f| f.key)
    }

    /// The enabled (soft-delete) column, if one is declared.
    pub fn enabled_column(&self) -> Option<&FieldMapping> {
        self.field_mappings.iter().find(|f| f.is_enabled_column)
    }

    /// Finds an explicit field mapping by document alias.
    pub fn field_by_alias(&self, alias: &str) -> Option<&FieldMapping> {
        self.field_mappings.iter().find(|f| f.matches_alias(alias))
    }

    /// Whether this mapping handles documents of the given content type.
    pub fn maps_document_type(&self, content_type_alias: &str) -> bool {
        self.document_type
            .as_deref()
            .is_some_and(|dt| dt.eq_ignore_ascii_case(content_type_alias))
    }

    fn validate(&self) -> MappingResult<()> {
        if self.name.trim().is_empty() {
            return Err(MappingError::malformed("table name must not be empty"));
        }

        let keys = self.field_mappings.iter().filter(|f| f.key).count();
        if keys > 1 {
            return Err(MappingError::malformed(format!(
                "table '{}' declares {keys} key fields, at most one is allowed",
                self.name
            )));
        }

        for field in &self.field_mappings {
            if field.name.trim().is_empty() {
                return Err(MappingError::malformed(format!(
                    "table '{}' has a field without a name",
                    self.name
                )));
            }
            if field.default_value.is_some() && field.field_type.is_none() {
                return Err(MappingError::malformed(format!(
                    "field '{}' of table '{}' declares a default value without a data type",
                    field.name, self.name
                )));
            }
        }

        Ok(())
    }
}

/// The full mapping definition: document-level defaults plus every table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MappingSchema {
    /// Default namespace for entity types.
    pub namespace: Option<String>,
    /// Default assembly for entity types.
    pub assembly: Option<String>,
    /// Persistence context type name.
    pub data_context: Option<String>,
    /// Table mappings in declaration order.
    pub tables: Vec<TableMapping>,
}

impl MappingSchema {
    /// Parses a mapping definition from XML text.
    pub fn from_xml(xml: &str) -> MappingResult<Self> {
        crate::loader::load_str(xml)
    }

    /// Loads a mapping definition from a file.
    pub fn load_file(path: impl AsRef<Path>) -> MappingResult<Self> {
        crate::loader::load_file(path)
    }

    /// Selects the table for a document content type (case-insensitive).
    pub fn table_for_document_type(&self, content_type_alias: &str) -> Option<&TableMapping> {
        self.tables
            .iter()
            .find(|t| t.maps_document_type(content_type_alias))
    }

    /// Finds a table by name.
    pub fn table(&self, name: &str) -> Option<&TableMapping> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Checks the schema invariants.
    ///
    /// Table names are non-empty and unique, document types are unique
    /// (case-insensitive), every table has at most one key field, every
    /// default value has a declared type and every entity type is
    /// namespace-qualified.
    pub fn validate(&self) -> MappingResult<()> {
        let mut names = HashSet::new();
        let mut document_types = HashSet::new();

        for table in &self.tables {
            table.validate()?;

            if !names.insert(table.name.as_str()) {
                return Err(MappingError::malformed(format!(
                    "duplicate table name '{}'",
                    table.name
                )));
            }

            if let Some(document_type) = &table.document_type {
                if !document_types.insert(document_type.to_ascii_lowercase()) {
                    return Err(MappingError::malformed(format!(
                        "document type '{document_type}' is mapped by more than one table"
                    )));
                }
            }

            if !table.entity_type_full_name.contains('.') {
                return Err(MappingError::malformed(format!(
                    "entity type '{}' of table '{}' is not namespace-qualified",
                    table.entity_type_full_name, table.name
                )));
            }
        }

        Ok(())
    }
}
