//! Entity type registry.

use crate::entity::{DynamicEntity, Entity, PropertyInfo};
use std::collections::HashMap;
use std::fmt;

/// Creates a fresh entity instance.
pub type EntityFactory = Box<dyn Fn() -> Box<dyn Entity> + Send + Sync>;

/// Maps fully qualified entity type names to factories.
///
/// The engine looks every table's `entity_type_full_name` up here when it
/// binds the schema; a table without a registered factory fails binding.
#[derive(Default)]
pub struct EntityRegistry {
    factories: HashMap<String, EntityFactory>,
}

impl EntityRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type constructed through `Default`.
    pub fn register<E: Entity + Default>(&mut self, type_name: impl Into<String>) -> &mut Self {
        self.register_with(type_name, || Box::new(E::default()) as Box<dyn Entity>)
    }

    /// Registers a factory function.
    pub fn register_with<F>(&mut self, type_name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Entity> + Send + Sync + 'static,
    {
        self.factories.insert(type_name.into(), Box::new(factory));
        self
    }

    /// Registers a runtime-declared type backed by [`DynamicEntity`].
    pub fn register_dynamic(
        &mut self,
        type_name: impl Into<String>,
        properties: impl IntoIterator<Item = PropertyInfo>,
    ) -> &mut Self {
        let type_name = type_name.into();
        let prototype = DynamicEntity::new(type_name.clone(), properties);
        self.register_with(type_name, move || Box::new(prototype.clone()) as Box<dyn Entity>)
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with<E: Entity + Default>(mut self, type_name: impl Into<String>) -> Self {
        self.register::<E>(type_name);
        self
    }

    /// Instantiates a registered type.
    pub fn create(&self, type_name: &str) -> Option<Box<dyn Entity>> {
        self.factories.get(type_name).map(|factory| factory())
    }

    /// Whether a type is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("EntityRegistry").field("types", &names).finish()
    }
}
