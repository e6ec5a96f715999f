//! # docsync engine
//!
//! One-way synchronization from a content tree into a relational store.
//!
//! The engine reacts to document events. For a saved document it finds the
//! table mapping for the document's content type, loads the entity named by
//! the document's key (or creates one), copies field values across and
//! commits. For a deleted document it clears the entity's enabled column or
//! removes the entity.
//!
//! ## Field rules
//!
//! For every explicit field, in declaration order:
//!
//! 1. A non-null document value is assigned and nothing else happens.
//! 2. Otherwise a typed default is applied: text only over a blank value,
//!    integers only over zero, timestamps only over an unset timestamp,
//!    booleans always, stamps always take the current time.
//! 3. Then, if the field inherits, the current user's key (for the user
//!    alias) or the nearest ancestor's value is assigned on top.
//!
//! Afterwards, when auto-mapping is on, every document property that no
//! explicit field covers and whose alias names a scalar entity property is
//! copied as well.
//!
//! ## Usage
//!
//! ```
//! use docsync_engine::{
//!     Document, EntityRegistry, MemoryContentStore, MemoryDatabase, PropertyInfo,
//!     PropertyType, SyncConfig, SyncEngine, SyncOutcome,
//! };
//! use docsync_mapping::{MappingSchema, Value};
//!
//! let schema = MappingSchema::from_xml(r#"
//!     <mappings namespace="Blog">
//!       <table name="News" documentType="News" entityTypeName="NewsItem">
//!         <field name="Id" alias="id" key="true" />
//!       </table>
//!     </mappings>"#).unwrap();
//!
//! let mut registry = EntityRegistry::new();
//! registry.register_dynamic("Blog.NewsItem", [
//!     PropertyInfo::new("Id", PropertyType::INTEGER),
//!     PropertyInfo::new("Title", PropertyType::TEXT),
//! ]);
//!
//! let db = MemoryDatabase::new().with_collection("News", "Id");
//! let engine = SyncEngine::new(schema, registry, db, SyncConfig::default()).unwrap();
//!
//! let content = MemoryContentStore::new();
//! let mut doc = Document::new(10, "News", "Launch")
//!     .with_property("id", "")
//!     .with_property("title", "Launch");
//!
//! let outcome = engine.on_document_saved(&content, &mut doc).unwrap();
//! assert!(matches!(outcome, SyncOutcome::Created { key: 1, .. }));
//! assert_eq!(doc.value("id"), Some(Value::Integer(1)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod accessor;
mod ancestor;
mod binding;
mod config;
mod document;
mod engine;
mod entity;
mod error;
pub mod memory;
mod persistence;
mod registry;

pub use ancestor::{resolve_ancestor_property, AncestorResolver};
pub use config::{SyncConfig, DEFAULT_MAX_ANCESTOR_DEPTH, DEFAULT_USER_ID_ALIAS};
pub use document::{ContentService, Document, DocumentId, Property, PropertyBag};
pub use engine::{PrincipalProvider, SyncEngine, SyncOutcome, SyncStats};
pub use entity::{DynamicEntity, Entity, PropertyInfo, PropertyKind, PropertyType};
pub use error::{SyncError, SyncResult};
pub use memory::{MemoryContentStore, MemoryDatabase, StaticPrincipal};
pub use persistence::{entity_ref, EntityRef, PersistenceProvider, Repository, Session};
pub use registry::{EntityFactory, EntityRegistry};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
