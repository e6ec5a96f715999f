//! In-memory implementations of the external collaborators.
//!
//! [`MemoryDatabase`] is a unit-of-work store with integer keys generated on
//! commit, [`MemoryContentStore`] a flat document tree, and
//! [`StaticPrincipal`] a fixed current user. They back the tests; hosts plug
//! their own stores in through the traits.

use crate::accessor;
use crate::document::{ContentService, Document, DocumentId};
use crate::engine::PrincipalProvider;
use crate::entity::Entity;
use crate::error::{SyncError, SyncResult};
use crate::persistence::{entity_ref, EntityRef, PersistenceProvider, Repository, Session};
use docsync_mapping::Value;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

struct MemoryTable {
    key_property: String,
    rows: BTreeMap<i64, Box<dyn Entity>>,
    next_key: i64,
}

/// Keys assigned to the entities added in one commit, computed before any
/// row is written.
struct KeyPlan {
    keys: Vec<i64>,
    next_key: i64,
}

impl MemoryTable {
    fn new(key_property: String) -> Self {
        Self {
            key_property,
            rows: BTreeMap::new(),
            next_key: 1,
        }
    }

    /// Picks keys for new rows without touching the table. An entity that
    /// already carries a positive key keeps it; the others get generated
    /// keys. Keys in `freed` are treated as unoccupied.
    fn plan(&self, entities: &[&dyn Entity], freed: &[i64]) -> SyncResult<KeyPlan> {
        let mut next_key = self.next_key;
        let mut keys: Vec<i64> = Vec::new();

        for &entity in entities {
            if accessor::find_property(entity, &self.key_property).is_none() {
                return Err(SyncError::Persistence(format!(
                    "{} has no key property '{}'",
                    entity.type_name(),
                    self.key_property
                )));
            }

            let explicit = accessor::get(entity, &self.key_property)
                .and_then(|v| v.as_key())
                .filter(|k| *k > 0);
            let key = explicit.unwrap_or(next_key);

            let occupied = self.rows.contains_key(&key) && !freed.contains(&key);
            if occupied || keys.contains(&key) {
                return Err(SyncError::Persistence(format!(
                    "duplicate key {key} for {}",
                    entity.type_name()
                )));
            }

            let after = key.checked_add(1).ok_or_else(|| {
                SyncError::Persistence(format!(
                    "key space of {} exhausted at {key}",
                    entity.type_name()
                ))
            })?;
            next_key = next_key.max(after);
            keys.push(key);
        }

        Ok(KeyPlan { keys, next_key })
    }

    /// Writes a row under a planned key.
    fn store(&mut self, entity: &mut dyn Entity, key: i64) -> SyncResult<()> {
        accessor::set(entity, &self.key_property, &Value::Integer(key))?;
        self.rows.insert(key, entity.clone_entity());
        Ok(())
    }
}

/// An in-memory relational store.
///
/// Collections are declared up front with the name of their key property.
/// Reads hand out copies; changes only become visible when a session
/// commits.
#[derive(Default)]
pub struct MemoryDatabase {
    tables: Mutex<HashMap<String, MemoryTable>>,
    commits: AtomicU64,
    fail_next_commit: AtomicBool,
}

impl MemoryDatabase {
    /// Creates a database without collections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a collection keyed by `key_property`.
    #[must_use]
    pub fn with_collection(self, name: impl Into<String>, key_property: impl Into<String>) -> Self {
        self.add_collection(name, key_property);
        self
    }

    /// Declares a collection keyed by `key_property`.
    pub fn add_collection(&self, name: impl Into<String>, key_property: impl Into<String>) {
        self.tables
            .lock()
            .entry(name.into())
            .or_insert_with(|| MemoryTable::new(key_property.into()));
    }

    /// Seeds a row outside of any session and returns its key.
    pub fn insert(&self, collection: &str, mut entity: Box<dyn Entity>) -> SyncResult<i64> {
        let mut tables = self.tables.lock();
        let table = tables
            .get_mut(collection)
            .ok_or_else(|| collection_not_found(collection))?;
        let plan = table.plan(&[&*entity], &[])?;
        let key = plan.keys[0];
        table.store(entity.as_mut(), key)?;
        table.next_key = plan.next_key;
        Ok(key)
    }

    /// Returns a copy of a committed row.
    pub fn get(&self, collection: &str, key: i64) -> Option<Box<dyn Entity>> {
        self.tables
            .lock()
            .get(collection)
            .and_then(|t| t.rows.get(&key))
            .map(|e| e.clone_entity())
    }

    /// Whether a committed row exists.
    pub fn contains(&self, collection: &str, key: i64) -> bool {
        self.tables
            .lock()
            .get(collection)
            .is_some_and(|t| t.rows.contains_key(&key))
    }

    /// Keys of the committed rows of a collection, ascending.
    pub fn keys(&self, collection: &str) -> Vec<i64> {
        self.tables
            .lock()
            .get(collection)
            .map(|t| t.rows.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Number of committed rows in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.tables
            .lock()
            .get(collection)
            .map_or(0, |t| t.rows.len())
    }

    /// Number of successful commits.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    /// Makes the next commit fail with a persistence error.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::Relaxed);
    }

    fn commit(&self, repositories: &mut HashMap<String, MemoryRepository<'_>>) -> SyncResult<()> {
        if self.fail_next_commit.swap(false, Ordering::Relaxed) {
            return Err(SyncError::Persistence("commit rejected".into()));
        }

        let mut tables = self.tables.lock();

        // Every check runs before the first write, so a rejected commit
        // leaves the tables untouched.
        let mut plans = HashMap::new();
        for (name, repository) in repositories.iter() {
            let table = tables.get(name).ok_or_else(|| collection_not_found(name))?;
            let guards: Vec<_> = repository.added.iter().map(|e| e.lock()).collect();
            let entities: Vec<&dyn Entity> = guards.iter().map(|g| &***g as &dyn Entity).collect();
            let plan = table.plan(&entities, &repository.removed)?;
            plans.insert(name.clone(), plan);
        }

        for (name, repository) in repositories.iter_mut() {
            let (Some(table), Some(plan)) = (tables.get_mut(name), plans.remove(name)) else {
                continue;
            };

            for (key, entity) in &repository.tracked {
                table.rows.insert(*key, entity.lock().clone_entity());
            }
            for key in repository.removed.drain(..) {
                table.rows.remove(&key);
            }
            for (entity, key) in repository.added.drain(..).zip(plan.keys) {
                table.store(entity.lock().as_mut(), key)?;
                repository.tracked.push((key, entity));
            }
            table.next_key = plan.next_key;
        }

        self.commits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl PersistenceProvider for MemoryDatabase {
    fn open_session(&self) -> SyncResult<Box<dyn Session + '_>> {
        Ok(Box::new(MemorySession {
            db: self,
            repositories: HashMap::new(),
        }))
    }
}

fn collection_not_found(name: &str) -> SyncError {
    SyncError::CollectionNotFound {
        name: name.to_string(),
    }
}

/// A unit of work over a [`MemoryDatabase`].
pub struct MemorySession<'a> {
    db: &'a MemoryDatabase,
    repositories: HashMap<String, MemoryRepository<'a>>,
}

impl Session for MemorySession<'_> {
    fn collection(&mut self, name: &str) -> SyncResult<&mut dyn Repository> {
        if !self.repositories.contains_key(name) {
            if !self.db.tables.lock().contains_key(name) {
                return Err(collection_not_found(name));
            }
            self.repositories.insert(
                name.to_string(),
                MemoryRepository {
                    name: name.to_string(),
                    db: self.db,
                    tracked: Vec::new(),
                    added: Vec::new(),
                    removed: Vec::new(),
                },
            );
        }

        self.repositories
            .get_mut(name)
            .map(|r| r as &mut dyn Repository)
            .ok_or_else(|| collection_not_found(name))
    }

    fn save_changes(&mut self) -> SyncResult<()> {
        self.db.commit(&mut self.repositories)?;
        debug!("committed {} collection(s)", self.repositories.len());
        Ok(())
    }
}

struct MemoryRepository<'a> {
    name: String,
    db: &'a MemoryDatabase,
    tracked: Vec<(i64, EntityRef)>,
    added: Vec<EntityRef>,
    removed: Vec<i64>,
}

impl Repository for MemoryRepository<'_> {
    fn find(&mut self, key: i64) -> SyncResult<Option<EntityRef>> {
        if let Some((_, entity)) = self.tracked.iter().find(|(k, _)| *k == key) {
            return Ok(Some(Arc::clone(entity)));
        }
        if self.removed.contains(&key) {
            return Ok(None);
        }

        let Some(entity) = self.db.get(&self.name, key) else {
            return Ok(None);
        };
        let entity = entity_ref(entity);
        self.tracked.push((key, Arc::clone(&entity)));
        Ok(Some(entity))
    }

    fn add(&mut self, entity: EntityRef) -> SyncResult<()> {
        self.added.push(entity);
        Ok(())
    }

    fn remove(&mut self, entity: &EntityRef) -> SyncResult<()> {
        if let Some(pos) = self.tracked.iter().position(|(_, e)| Arc::ptr_eq(e, entity)) {
            let (key, _) = self.tracked.remove(pos);
            self.removed.push(key);
            return Ok(());
        }
        if let Some(pos) = self.added.iter().position(|e| Arc::ptr_eq(e, entity)) {
            self.added.remove(pos);
            return Ok(());
        }
        Err(SyncError::Persistence(format!(
            "entity is not tracked by collection {}",
            self.name
        )))
    }
}

/// An in-memory document tree.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    documents: RwLock<BTreeMap<DocumentId, Document>>,
    saves: AtomicU64,
}

impl MemoryContentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a document.
    pub fn insert(&self, document: Document) {
        self.documents.write().insert(document.id, document);
    }

    /// Returns a copy of a stored document.
    pub fn get(&self, id: DocumentId) -> Option<Document> {
        self.documents.read().get(&id).cloned()
    }

    /// Whether a document is stored.
    pub fn contains(&self, id: DocumentId) -> bool {
        self.documents.read().contains_key(&id)
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Number of [`ContentService::save`] calls.
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::Relaxed)
    }
}

impl ContentService for MemoryContentStore {
    fn parent(&self, document: &Document) -> SyncResult<Option<Document>> {
        let Some(parent_id) = document.parent_id else {
            return Ok(None);
        };
        self.get(parent_id).map(Some).ok_or_else(|| {
            SyncError::ContentStore(format!(
                "parent {parent_id} of document {} not found",
                document.id
            ))
        })
    }

    fn save(&self, document: &Document) -> SyncResult<()> {
        self.insert(document.clone());
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn delete(&self, document: &Document) -> SyncResult<()> {
        self.documents
            .write()
            .remove(&document.id)
            .map(|_| ())
            .ok_or_else(|| SyncError::ContentStore(format!("document {} not found", document.id)))
    }
}

/// A principal whose key never changes.
#[derive(Debug, Clone, Default)]
pub struct StaticPrincipal {
    key: Option<Value>,
}

impl StaticPrincipal {
    /// An authenticated principal.
    pub fn authenticated(key: impl Into<Value>) -> Self {
        Self {
            key: Some(key.into()),
        }
    }

    /// No authenticated principal.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl PrincipalProvider for StaticPrincipal {
    fn current_user_key(&self) -> Option<Value> {
        self.key.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{DynamicEntity, PropertyInfo, PropertyType};

    fn tag(label: &str) -> Box<dyn Entity> {
        let mut entity = DynamicEntity::new(
            "Blog.Tag",
            [
                PropertyInfo::new("Id", PropertyType::INTEGER),
                PropertyInfo::new("Label", PropertyType::TEXT),
            ],
        );
        entity.put("Label", Value::text(label));
        Box::new(entity)
    }

    fn label(db: &MemoryDatabase, key: i64) -> Option<Value> {
        db.get("Tags", key).and_then(|e| e.get("Label"))
    }

    #[test]
    fn seeding_generates_keys() {
        let db = MemoryDatabase::new().with_collection("Tags", "Id");
        assert_eq!(db.insert("Tags", tag("a")).unwrap(), 1);
        assert_eq!(db.insert("Tags", tag("b")).unwrap(), 2);
        assert_eq!(db.keys("Tags"), vec![1, 2]);
        assert_eq!(db.get("Tags", 2).unwrap().get("Id"), Some(Value::Integer(2)));

        let err = db.insert("Missing", tag("c")).unwrap_err();
        assert!(matches!(err, SyncError::CollectionNotFound { .. }));
    }

    #[test]
    fn session_commit_assigns_key_to_tracked_instance() {
        let db = MemoryDatabase::new().with_collection("Tags", "Id");
        let entity = entity_ref(tag("fresh"));

        let mut session = db.open_session().unwrap();
        session.collection("Tags").unwrap().add(Arc::clone(&entity)).unwrap();
        assert_eq!(db.len("Tags"), 0);
        session.save_changes().unwrap();

        assert_eq!(entity.lock().get("Id"), Some(Value::Integer(1)));
        assert_eq!(label(&db, 1), Some(Value::text("fresh")));
        assert_eq!(db.commit_count(), 1);
    }

    #[test]
    fn updates_and_removals_apply_on_commit() {
        let db = MemoryDatabase::new().with_collection("Tags", "Id");
        db.insert("Tags", tag("one")).unwrap();
        db.insert("Tags", tag("two")).unwrap();

        let mut session = db.open_session().unwrap();
        let repo = session.collection("Tags").unwrap();
        let first = repo.find(1).unwrap().unwrap();
        first.lock().put("Label", Value::text("uno"));
        let second = repo.find(2).unwrap().unwrap();
        repo.remove(&second).unwrap();
        assert!(repo.find(2).unwrap().is_none());
        assert!(repo.find(3).unwrap().is_none());

        assert_eq!(label(&db, 1), Some(Value::text("one")));
        session.save_changes().unwrap();

        assert_eq!(label(&db, 1), Some(Value::text("uno")));
        assert!(!db.contains("Tags", 2));
    }

    #[test]
    fn dropping_a_session_discards_changes() {
        let db = MemoryDatabase::new().with_collection("Tags", "Id");
        db.insert("Tags", tag("one")).unwrap();
        {
            let mut session = db.open_session().unwrap();
            let repo = session.collection("Tags").unwrap();
            let entity = repo.find(1).unwrap().unwrap();
            entity.lock().put("Label", Value::text("lost"));
            repo.add(entity_ref(tag("lost too"))).unwrap();
        }
        assert_eq!(label(&db, 1), Some(Value::text("one")));
        assert_eq!(db.len("Tags"), 1);
        assert_eq!(db.commit_count(), 0);
    }

    #[test]
    fn failed_commit() {
        let db = MemoryDatabase::new().with_collection("Tags", "Id");
        db.fail_next_commit();

        let mut session = db.open_session().unwrap();
        session.collection("Tags").unwrap().add(entity_ref(tag("x"))).unwrap();
        assert!(matches!(session.save_changes(), Err(SyncError::Persistence(_))));
        assert_eq!(db.len("Tags"), 0);
    }

    #[test]
    fn last_possible_key_is_rejected_not_overflowed() {
        let db = MemoryDatabase::new().with_collection("Tags", "Id");
        let mut entity = tag("edge");
        entity.put("Id", Value::Integer(i64::MAX));

        let err = db.insert("Tags", entity).unwrap_err();
        assert!(matches!(err, SyncError::Persistence(_)));
        assert_eq!(db.len("Tags"), 0);
        assert_eq!(db.insert("Tags", tag("next")).unwrap(), 1);
    }

    #[test]
    fn rejected_commit_writes_nothing() {
        let db = MemoryDatabase::new().with_collection("Tags", "Id");
        db.insert("Tags", tag("one")).unwrap();

        let mut session = db.open_session().unwrap();
        let repo = session.collection("Tags").unwrap();
        let existing = repo.find(1).unwrap().unwrap();
        existing.lock().put("Label", Value::text("changed"));
        let clash = entity_ref(tag("clash"));
        clash.lock().put("Id", Value::Integer(1));
        repo.add(clash).unwrap();

        assert!(matches!(session.save_changes(), Err(SyncError::Persistence(_))));
        assert_eq!(label(&db, 1), Some(Value::text("one")));
        assert_eq!(db.len("Tags"), 1);
        assert_eq!(db.commit_count(), 0);
    }

    #[test]
    fn explicit_keys_move_the_generator_past_them() {
        let db = MemoryDatabase::new().with_collection("Tags", "Id");
        let mut entity = tag("ten");
        entity.put("Id", Value::Integer(10));
        assert_eq!(db.insert("Tags", entity).unwrap(), 10);

        let mut session = db.open_session().unwrap();
        let repo = session.collection("Tags").unwrap();
        repo.add(entity_ref(tag("a"))).unwrap();
        repo.add(entity_ref(tag("b"))).unwrap();
        session.save_changes().unwrap();
        assert_eq!(db.keys("Tags"), vec![10, 11, 12]);
    }

    #[test]
    fn unknown_collection() {
        let db = MemoryDatabase::new();
        let mut session = db.open_session().unwrap();
        assert!(matches!(
            session.collection("Nope"),
            Err(SyncError::CollectionNotFound { .. })
        ));
    }

    #[test]
    fn removing_untracked_entity_fails() {
        let db = MemoryDatabase::new().with_collection("Tags", "Id");
        let mut session = db.open_session().unwrap();
        let repo = session.collection("Tags").unwrap();
        assert!(repo.remove(&entity_ref(tag("stray"))).is_err());
    }

    #[test]
    fn content_store_parent_chain() {
        let store = MemoryContentStore::new();
        let root = Document::new(1, "Site", "Home");
        let child = Document::new(2, "News", "Launch").under(&root);
        let orphan = Document::new(3, "News", "Lost").under(&Document::new(99, "Site", "Gone"));
        store.insert(root.clone());
        store.insert(child.clone());

        assert_eq!(store.parent(&child).unwrap(), Some(root.clone()));
        assert_eq!(store.parent(&root).unwrap(), None);
        assert!(matches!(
            store.parent(&orphan),
            Err(SyncError::ContentStore(_))
        ));
    }

    #[test]
    fn content_store_save_and_delete() {
        let store = MemoryContentStore::new();
        let doc = Document::new(1, "News", "Launch");
        store.save(&doc).unwrap();
        assert_eq!(store.save_count(), 1);
        assert!(store.contains(doc.id));

        store.delete(&doc).unwrap();
        assert!(store.is_empty());
        assert!(store.delete(&doc).is_err());
    }

    #[test]
    fn static_principal() {
        assert_eq!(
            StaticPrincipal::authenticated(7).current_user_key(),
            Some(Value::Integer(7))
        );
        assert_eq!(StaticPrincipal::anonymous().current_user_key(), None);
    }
}
