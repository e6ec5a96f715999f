//! The synchronization engine.

use crate::accessor;
use crate::ancestor::AncestorResolver;
use crate::binding::{bind_table, BoundTable};
use crate::config::SyncConfig;
use crate::document::{ContentService, Document, DocumentId};
use crate::entity::{Entity, PropertyInfo};
use crate::error::{SyncError, SyncResult};
use crate::persistence::{entity_ref, PersistenceProvider};
use crate::registry::EntityRegistry;
use chrono::Local;
use docsync_mapping::{DataType, FieldMapping, MappingSchema, TableMapping, Value};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Supplies the key of the authenticated user, if any.
pub trait PrincipalProvider: Send + Sync {
    /// Key of the current user, `None` when nobody is authenticated.
    fn current_user_key(&self) -> Option<Value>;
}

/// Terminal state of one document event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No table maps the document's content type.
    NoMapping,
    /// A new entity was added.
    Created {
        /// Table name.
        table: String,
        /// Generated key, written back to the document.
        key: i64,
    },
    /// An existing entity was updated in place.
    Updated {
        /// Table name.
        table: String,
        /// Entity key.
        key: i64,
    },
    /// The document carries a key that matches no entity.
    Missing {
        /// Table name.
        table: String,
        /// Key read from the document.
        key: i64,
    },
    /// The entity's enabled column was cleared.
    SoftDeleted {
        /// Table name.
        table: String,
        /// Entity key.
        key: i64,
    },
    /// The entity was removed.
    Deleted {
        /// Table name.
        table: String,
        /// Entity key.
        key: i64,
    },
    /// Delete requested but there was no key or no entity.
    NothingToDelete {
        /// Table name.
        table: String,
        /// Key read from the document, if it had one.
        key: Option<i64>,
    },
    /// A mapped document was deleted from the content store.
    Trashed {
        /// The deleted document.
        document: DocumentId,
    },
}

impl SyncOutcome {
    /// Whether the event changed the target store.
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            SyncOutcome::Created { .. }
                | SyncOutcome::Updated { .. }
                | SyncOutcome::SoftDeleted { .. }
                | SyncOutcome::Deleted { .. }
        )
    }
}

/// Counters over the engine's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Entities created.
    pub created: u64,
    /// Entities updated.
    pub updated: u64,
    /// Entities removed.
    pub deleted: u64,
    /// Entities disabled through their enabled column.
    pub soft_deleted: u64,
    /// Events that ended without touching the target store.
    pub skipped: u64,
    /// Field assignments skipped because of a conversion error.
    pub field_errors: u64,
}

/// One-way document to entity synchronization.
///
/// The schema is bound against the registry once, in [`SyncEngine::new`].
/// Every handler runs one event to completion, commit included, inside its
/// own session.
pub struct SyncEngine<P: PersistenceProvider> {
    config: SyncConfig,
    schema: Arc<MappingSchema>,
    bound: Vec<BoundTable>,
    registry: EntityRegistry,
    provider: P,
    principal: Option<Arc<dyn PrincipalProvider>>,
    stats: RwLock<SyncStats>,
}

impl<P: PersistenceProvider> SyncEngine<P> {
    /// Binds `schema` against `registry` and creates the engine.
    ///
    /// Fails with a mapping error if a table's entity type is not
    /// registered, if a table has no key field, or if the key or enabled
    /// column names no property of the entity type.
    pub fn new(
        schema: impl Into<Arc<MappingSchema>>,
        registry: EntityRegistry,
        provider: P,
        config: SyncConfig,
    ) -> SyncResult<Self> {
        let schema = schema.into();
        schema.validate()?;

        let bound = schema
            .tables
            .iter()
            .map(|table| bind_table(table, &registry))
            .collect::<SyncResult<Vec<_>>>()?;

        info!("sync engine ready with {} table mapping(s)", bound.len());

        Ok(Self {
            config,
            schema,
            bound,
            registry,
            provider,
            principal: None,
            stats: RwLock::new(SyncStats::default()),
        })
    }

    /// Sets the source of the current user's key for inherited `UserID`
    /// fields.
    #[must_use]
    pub fn with_principal(mut self, principal: impl PrincipalProvider + 'static) -> Self {
        self.principal = Some(Arc::new(principal));
        self
    }

    /// The loaded schema.
    pub fn schema(&self) -> &MappingSchema {
        &self.schema
    }

    /// The engine configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The persistence provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Resets every counter to zero.
    pub fn reset_stats(&self) {
        *self.stats.write() = SyncStats::default();
    }

    /// Creates or updates the entity for a saved document.
    ///
    /// A document whose key alias holds an integer updates that entity;
    /// any other document creates a new one, and the generated key is
    /// written back to the document's key property.
    pub fn on_document_saved(
        &self,
        content: &dyn ContentService,
        document: &mut Document,
    ) -> SyncResult<SyncOutcome> {
        let Some((table, bound)) = self.lookup(&document.content_type_alias) else {
            debug!(
                document = %document.id,
                "no mapping for content type {}", document.content_type_alias
            );
            self.stats.write().skipped += 1;
            return Ok(SyncOutcome::NoMapping);
        };

        let key = document.value(&bound.key_alias).and_then(|v| v.as_key());
        let mut session = self.provider.open_session()?;

        let entity = match key {
            Some(key) => match session.collection(&table.entity_property_name)?.find(key)? {
                Some(entity) => entity,
                None => {
                    warn!(
                        document = %document.id,
                        "{} entity {key} no longer exists, not recreating it", table.name
                    );
                    self.stats.write().skipped += 1;
                    return Ok(SyncOutcome::Missing {
                        table: table.name.clone(),
                        key,
                    });
                }
            },
            None => entity_ref(self.instantiate(table)?),
        };

        {
            let mut guard = entity.lock();
            self.sync_fields(table, bound, content, document, &mut **guard)?;
        }

        if let Some(key) = key {
            session.save_changes()?;
            info!(document = %document.id, "updated {} entity {key}", table.name);
            self.stats.write().updated += 1;
            return Ok(SyncOutcome::Updated {
                table: table.name.clone(),
                key,
            });
        }

        session
            .collection(&table.entity_property_name)?
            .add(Arc::clone(&entity))?;
        session.save_changes()?;
        drop(session);

        let generated = accessor::get(&**entity.lock(), &bound.key.name).unwrap_or(Value::Null);
        let key = generated.as_key().ok_or_else(|| {
            SyncError::invariant(format!(
                "{} entity has no integer key after commit",
                table.name
            ))
        })?;
        info!(document = %document.id, "created {} entity {key}", table.name);
        self.stats.write().created += 1;

        // The entity is already committed; a failure from here on leaves the
        // document without its key.
        if !document.properties.set(&bound.key_alias, Value::Integer(key)) {
            warn!(
                document = %document.id,
                "document has no '{}' property to receive key {key}", bound.key_alias
            );
        }
        if self.config.save_document_after_key_writeback {
            content.save(document)?;
        }

        Ok(SyncOutcome::Created {
            table: table.name.clone(),
            key,
        })
    }

    /// Handles a newly created document. Same as
    /// [`on_document_saved`](Self::on_document_saved).
    pub fn on_document_created(
        &self,
        content: &dyn ContentService,
        document: &mut Document,
    ) -> SyncResult<SyncOutcome> {
        self.on_document_saved(content, document)
    }

    /// Handles a batch of saved documents, one outcome per document.
    pub fn on_documents_saved(
        &self,
        content: &dyn ContentService,
        documents: &mut [Document],
    ) -> SyncResult<Vec<SyncOutcome>> {
        documents
            .iter_mut()
            .map(|document| self.on_document_saved(content, document))
            .collect()
    }

    /// Removes or disables the entities of documents that are being
    /// deleted.
    pub fn on_document_deleting(&self, documents: &[Document]) -> SyncResult<Vec<SyncOutcome>> {
        documents
            .iter()
            .map(|document| self.delete_document(document))
            .collect()
    }

    /// Permanently deletes trashed documents that have a mapping.
    ///
    /// The recycle bin is not supported: a mapped document that is moved to
    /// it is deleted through the content service instead, and the host's
    /// delete event then reaches [`on_document_deleting`](Self::on_document_deleting).
    pub fn on_document_trashed(
        &self,
        content: &dyn ContentService,
        documents: &[Document],
    ) -> SyncResult<Vec<SyncOutcome>> {
        let mut outcomes = Vec::with_capacity(documents.len());
        for document in documents {
            if self.lookup(&document.content_type_alias).is_some() {
                content.delete(document)?;
                info!(document = %document.id, "deleted trashed document");
                outcomes.push(SyncOutcome::Trashed {
                    document: document.id,
                });
            } else {
                outcomes.push(SyncOutcome::NoMapping);
            }
        }
        Ok(outcomes)
    }

    fn delete_document(&self, document: &Document) -> SyncResult<SyncOutcome> {
        let Some((table, bound)) = self.lookup(&document.content_type_alias) else {
            self.stats.write().skipped += 1;
            return Ok(SyncOutcome::NoMapping);
        };

        let nothing = |key| {
            self.stats.write().skipped += 1;
            Ok(SyncOutcome::NothingToDelete {
                table: table.name.clone(),
                key,
            })
        };

        let Some(key) = document.value(&bound.key_alias).and_then(|v| v.as_key()) else {
            debug!(document = %document.id, "document has no {} key", table.name);
            return nothing(None);
        };

        let mut session = self.provider.open_session()?;
        let repository = session.collection(&table.entity_property_name)?;
        let Some(entity) = repository.find(key)? else {
            debug!(document = %document.id, "{} entity {key} already gone", table.name);
            return nothing(Some(key));
        };

        let outcome = match &bound.enabled {
            Some(enabled) => {
                accessor::assign(&mut **entity.lock(), enabled, &Value::Bool(false))?;
                SyncOutcome::SoftDeleted {
                    table: table.name.clone(),
                    key,
                }
            }
            None => {
                repository.remove(&entity)?;
                SyncOutcome::Deleted {
                    table: table.name.clone(),
                    key,
                }
            }
        };
        session.save_changes()?;

        let mut stats = self.stats.write();
        if let SyncOutcome::SoftDeleted { .. } = outcome {
            info!(document = %document.id, "disabled {} entity {key}", table.name);
            stats.soft_deleted += 1;
        } else {
            info!(document = %document.id, "removed {} entity {key}", table.name);
            stats.deleted += 1;
        }
        Ok(outcome)
    }

    fn lookup(&self, content_type_alias: &str) -> Option<(&TableMapping, &BoundTable)> {
        self.schema
            .tables
            .iter()
            .zip(&self.bound)
            .find(|(table, _)| table.maps_document_type(content_type_alias))
    }

    fn instantiate(&self, table: &TableMapping) -> SyncResult<Box<dyn Entity>> {
        self.registry
            .create(&table.entity_type_full_name)
            .ok_or_else(|| {
                SyncError::malformed(format!(
                    "entity type {} is not registered",
                    table.entity_type_full_name
                ))
            })
    }

    /// Applies explicit fields, then auto-mapped properties.
    fn sync_fields(
        &self,
        table: &TableMapping,
        bound: &BoundTable,
        content: &dyn ContentService,
        document: &Document,
        entity: &mut dyn Entity,
    ) -> SyncResult<()> {
        for (field, target) in table.field_mappings.iter().zip(&bound.fields) {
            if field.key {
                continue;
            }
            let Some(target) = target else {
                continue;
            };

            if let Some(value) = document.value(&field.alias) {
                self.assign(entity, target, &value)?;
                continue;
            }

            if let Some(default) = &field.default_value {
                self.apply_default(entity, field, target, default)?;
            }

            // Runs after the default, so an inherited value wins.
            if field.inherit {
                self.apply_inherited(content, document, entity, field, target)?;
            }
        }

        if table.auto_map_fields {
            for property in document.properties.iter() {
                if table.field_by_alias(&property.alias).is_some() {
                    continue;
                }
                let Some(target) = bound.property(&property.alias) else {
                    continue;
                };
                // The key belongs to the store, whatever the document says.
                if target.matches(&bound.key.name) {
                    continue;
                }
                if target.ty.kind.is_scalar() {
                    self.assign(entity, target, &property.value)?;
                }
            }
        }

        Ok(())
    }

    fn apply_default(
        &self,
        entity: &mut dyn Entity,
        field: &FieldMapping,
        target: &PropertyInfo,
        default: &Value,
    ) -> SyncResult<()> {
        let current = entity.get(&target.name).unwrap_or(Value::Null);
        match field.field_type {
            Some(DataType::String) if current.is_blank() => self.assign(entity, target, default),
            Some(DataType::Integer) if current.is_zero_or_null() => {
                self.assign(entity, target, default)
            }
            Some(DataType::DateTime) if current.is_min_datetime_or_null() => {
                self.assign(entity, target, default)
            }
            Some(DataType::Boolean) => self.assign(entity, target, default),
            Some(DataType::DateTimeStamp) => {
                self.assign(entity, target, &Value::DateTime(Local::now().naive_local()))
            }
            _ => Ok(()),
        }
    }

    fn apply_inherited(
        &self,
        content: &dyn ContentService,
        document: &Document,
        entity: &mut dyn Entity,
        field: &FieldMapping,
        target: &PropertyInfo,
    ) -> SyncResult<()> {
        if field.alias == self.config.user_id_alias {
            if let Some(user) = self.principal.as_ref().and_then(|p| p.current_user_key()) {
                return self.assign(entity, target, &user);
            }
        }

        let resolver = AncestorResolver::new(content, self.config.max_ancestor_depth);
        match resolver.resolve(document, &field.alias)? {
            Some(value) => self.assign(entity, target, &value),
            None => Ok(()),
        }
    }

    /// Assigns one value, logging and counting recoverable failures instead
    /// of propagating them.
    fn assign(
        &self,
        entity: &mut dyn Entity,
        target: &PropertyInfo,
        value: &Value,
    ) -> SyncResult<()> {
        match accessor::assign(entity, target, value) {
            Ok(()) => {
                if !value.is_null() {
                    debug!(
                        entity = entity.type_name(),
                        property = %target.name,
                        "assigned {value:?}"
                    );
                }
                Ok(())
            }
            Err(err) if err.is_recoverable() => {
                warn!(entity = entity.type_name(), "skipped assignment: {err}");
                self.stats.write().field_errors += 1;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

impl<P: PersistenceProvider> fmt::Debug for SyncEngine<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("tables", &self.schema.tables.len())
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{DynamicEntity, PropertyType};
    use crate::memory::{MemoryContentStore, MemoryDatabase, StaticPrincipal};
    use docsync_mapping::FieldMapping;

    const PAGE: &str = "Site.Page";

    fn registry() -> EntityRegistry {
        let mut registry = EntityRegistry::new();
        registry.register_dynamic(
            PAGE,
            [
                PropertyInfo::new("Id", PropertyType::INTEGER),
                PropertyInfo::new("Title", PropertyType::TEXT),
                PropertyInfo::new("Views", PropertyType::INTEGER),
                PropertyInfo::new("Author", PropertyType::INTEGER.nullable()),
                PropertyInfo::new("Links", PropertyType::OTHER),
            ],
        );
        registry
    }

    fn schema(table: TableMapping) -> MappingSchema {
        MappingSchema {
            namespace: Some("Site".into()),
            tables: vec![table],
            ..MappingSchema::default()
        }
    }

    fn page_table() -> TableMapping {
        TableMapping::new("Page", "Site")
            .with_field(FieldMapping::new("Id").with_alias("pageId").as_key())
    }

    fn engine(table: TableMapping) -> SyncEngine<MemoryDatabase> {
        let db = MemoryDatabase::new().with_collection("Page", "Id");
        SyncEngine::new(schema(table), registry(), db, SyncConfig::default()).unwrap()
    }

    fn page(engine: &SyncEngine<MemoryDatabase>, key: i64) -> Box<dyn Entity> {
        engine.provider().get("Page", key).unwrap()
    }

    #[test]
    fn binding_failures_surface_from_new() {
        let table =
            TableMapping::new("Missing", "Site").with_field(FieldMapping::new("Id").as_key());
        let result = SyncEngine::new(
            schema(table),
            registry(),
            MemoryDatabase::new(),
            SyncConfig::default(),
        );
        assert!(matches!(result, Err(SyncError::Mapping(_))));
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncEngine<MemoryDatabase>>();
    }

    #[test]
    fn unmapped_content_type() {
        let engine = engine(page_table());
        let content = MemoryContentStore::new();
        let mut doc = Document::new(1, "Folder", "Stuff");
        assert_eq!(
            engine.on_document_saved(&content, &mut doc).unwrap(),
            SyncOutcome::NoMapping
        );
        assert_eq!(engine.stats().skipped, 1);
    }

    #[test]
    fn integer_default_only_fills_zero() {
        let table = page_table().with_field(
            FieldMapping::new("Views")
                .with_type(DataType::Integer)
                .with_default(10),
        );
        let engine = engine(table);
        let content = MemoryContentStore::new();

        let mut doc = Document::new(1, "Page", "Home").with_property("pageId", Value::Null);
        engine.on_document_saved(&content, &mut doc).unwrap();
        assert_eq!(page(&engine, 1).get("Views"), Some(Value::Integer(10)));

        let mut doc = Document::new(2, "Page", "About")
            .with_property("pageId", Value::Null)
            .with_property("Views", 3);
        engine.on_document_saved(&content, &mut doc).unwrap();
        assert_eq!(page(&engine, 2).get("Views"), Some(Value::Integer(3)));
    }

    #[test]
    fn coercion_failures_are_counted_not_fatal() {
        let table = page_table().with_field(FieldMapping::new("Views"));
        let engine = engine(table);
        let content = MemoryContentStore::new();

        let mut doc = Document::new(1, "Page", "Home")
            .with_property("pageId", "")
            .with_property("Views", "lots")
            .with_property("Title", "Home");
        let outcome = engine.on_document_saved(&content, &mut doc).unwrap();

        assert!(matches!(outcome, SyncOutcome::Created { key: 1, .. }));
        assert_eq!(engine.stats().field_errors, 1);
        assert_eq!(page(&engine, 1).get("Title"), Some(Value::text("Home")));
        assert_eq!(page(&engine, 1).get("Views"), Some(Value::Integer(0)));
    }

    #[test]
    fn auto_map_skips_non_scalar_properties() {
        let engine = engine(page_table());
        let content = MemoryContentStore::new();

        let mut doc = Document::new(1, "Page", "Home")
            .with_property("pageId", "")
            .with_property("links", "a,b");
        engine.on_document_saved(&content, &mut doc).unwrap();
        assert_eq!(engine.stats().field_errors, 0);
        assert_eq!(page(&engine, 1).get("Links"), Some(Value::Null));
    }

    #[test]
    fn user_id_prefers_the_principal() {
        let table = page_table()
            .with_field(FieldMapping::new("Author").with_alias("UserID").inherited());
        let content = MemoryContentStore::new();
        let root = Document::new(1, "Site", "Home").with_property("UserID", 5);
        content.insert(root.clone());

        let anonymous = engine(table.clone());
        let mut doc = Document::new(2, "Page", "News")
            .under(&root)
            .with_property("pageId", "");
        anonymous.on_document_saved(&content, &mut doc).unwrap();
        assert_eq!(page(&anonymous, 1).get("Author"), Some(Value::Integer(5)));

        let signed_in = engine(table).with_principal(StaticPrincipal::authenticated(42));
        let mut doc = Document::new(3, "Page", "Blog")
            .under(&root)
            .with_property("pageId", "");
        signed_in.on_document_saved(&content, &mut doc).unwrap();
        assert_eq!(page(&signed_in, 1).get("Author"), Some(Value::Integer(42)));
    }

    #[test]
    fn key_writeback_can_save_the_document() {
        let db = MemoryDatabase::new().with_collection("Page", "Id");
        let config = SyncConfig::new().save_document_after_key_writeback(true);
        let engine = SyncEngine::new(schema(page_table()), registry(), db, config).unwrap();
        let content = MemoryContentStore::new();

        let mut doc = Document::new(7, "Page", "Home").with_property("pageId", "");
        engine.on_document_saved(&content, &mut doc).unwrap();

        assert_eq!(content.save_count(), 1);
        assert_eq!(
            content.get(doc.id).unwrap().value("pageId"),
            Some(Value::Integer(1))
        );
    }

    #[test]
    fn failed_commit_propagates() {
        let engine = engine(page_table());
        let content = MemoryContentStore::new();
        engine.provider().fail_next_commit();

        let mut doc = Document::new(1, "Page", "Home").with_property("pageId", "");
        let err = engine.on_document_saved(&content, &mut doc).unwrap_err();
        assert!(matches!(err, SyncError::Persistence(_)));
        assert_eq!(doc.value("pageId"), Some(Value::text("")));
        assert_eq!(engine.stats().created, 0);
    }

    #[test]
    fn dynamic_entities_downcast() {
        let engine = engine(page_table());
        let content = MemoryContentStore::new();
        let mut doc = Document::new(1, "Page", "Home").with_property("pageId", "");
        engine.on_document_saved(&content, &mut doc).unwrap();
        assert!(page(&engine, 1).downcast_ref::<DynamicEntity>().is_some());
    }
}
