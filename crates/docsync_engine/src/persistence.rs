//! Unit-of-work surface of the target store.

use crate::entity::Entity;
use crate::error::SyncResult;
use parking_lot::Mutex;
use std::sync::Arc;

/// An entity tracked by a session.
///
/// The engine mutates the instance in place; the session persists it on
/// [`Session::save_changes`] and assigns generated keys to added entities.
pub type EntityRef = Arc<Mutex<Box<dyn Entity>>>;

/// Wraps an entity for tracking.
pub fn entity_ref(entity: Box<dyn Entity>) -> EntityRef {
    Arc::new(Mutex::new(entity))
}

/// Opens transactional sessions against the target store.
pub trait PersistenceProvider: Send + Sync {
    /// Opens a session scoped to one document event.
    fn open_session(&self) -> SyncResult<Box<dyn Session + '_>>;
}

impl<T: PersistenceProvider + ?Sized> PersistenceProvider for Arc<T> {
    fn open_session(&self) -> SyncResult<Box<dyn Session + '_>> {
        (**self).open_session()
    }
}

/// A unit of work.
///
/// Dropping a session without calling [`save_changes`](Session::save_changes)
/// discards everything it tracked.
pub trait Session {
    /// Resolves a named collection.
    fn collection(&mut self, name: &str) -> SyncResult<&mut dyn Repository>;

    /// Commits every tracked change.
    fn save_changes(&mut self) -> SyncResult<()>;
}

/// A collection of entities keyed by integer.
pub trait Repository {
    /// Finds and starts tracking an entity.
    fn find(&mut self, key: i64) -> SyncResult<Option<EntityRef>>;

    /// Schedules a new entity for insertion.
    fn add(&mut self, entity: EntityRef) -> SyncResult<()>;

    /// Schedules a tracked entity for removal.
    fn remove(&mut self, entity: &EntityRef) -> SyncResult<()>;
}
