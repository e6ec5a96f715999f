//! Resolution of table mappings against entity property tables.

use crate::entity::PropertyInfo;
use crate::error::{SyncError, SyncResult};
use crate::registry::EntityRegistry;
use docsync_mapping::TableMapping;
use tracing::{debug, warn};

/// A table mapping with every field name resolved to an entity property.
#[derive(Debug, Clone)]
pub(crate) struct BoundTable {
    /// Target property per field mapping, in declaration order. `None` for
    /// fields that name no entity property.
    pub fields: Vec<Option<PropertyInfo>>,
    /// Key property.
    pub key: PropertyInfo,
    /// Document alias holding the key.
    pub key_alias: String,
    /// Soft-delete flag property.
    pub enabled: Option<PropertyInfo>,
    /// Full property table of the entity type.
    pub properties: Vec<PropertyInfo>,
}

impl BoundTable {
    /// Finds an entity property by name, ignoring case.
    pub fn property(&self, name: &str) -> Option<&PropertyInfo> {
        self.properties.iter().find(|p| p.matches(name))
    }
}

pub(crate) fn bind_table(
    table: &TableMapping,
    registry: &EntityRegistry,
) -> SyncResult<BoundTable> {
    let prototype = registry.create(&table.entity_type_full_name).ok_or_else(|| {
        SyncError::malformed(format!(
            "table '{}' maps to unregistered entity type {}",
            table.name, table.entity_type_full_name
        ))
    })?;
    let properties = prototype.properties().to_vec();
    let lookup = |name: &str| properties.iter().find(|p| p.matches(name)).cloned();

    let key_field = table.key_field().ok_or_else(|| {
        SyncError::malformed(format!("table '{}' declares no key field", table.name))
    })?;
    let key = lookup(&key_field.name).ok_or_else(|| {
        SyncError::malformed(format!(
            "key field '{}' of table '{}' is not a property of {}",
            key_field.name, table.name, table.entity_type_full_name
        ))
    })?;

    let enabled = match table.enabled_column() {
        Some(field) => Some(lookup(&field.name).ok_or_else(|| {
            SyncError::malformed(format!(
                "enabled column '{}' of table '{}' is not a property of {}",
                field.name, table.name, table.entity_type_full_name
            ))
        })?),
        None => None,
    };

    let fields = table
        .field_mappings
        .iter()
        .map(|field| {
            let target = lookup(&field.name);
            if target.is_none() {
                warn!(
                    table = %table.name,
                    field = %field.name,
                    "field does not match any property of {}",
                    table.entity_type_full_name
                );
            }
            target
        })
        .collect();

    debug!(
        table = %table.name,
        entity = %table.entity_type_full_name,
        "bound table mapping"
    );

    Ok(BoundTable {
        fields,
        key,
        key_alias: key_field.alias.clone(),
        enabled,
        properties,
    })
}
