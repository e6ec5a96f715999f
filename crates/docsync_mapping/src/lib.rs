//! # docsync mapping
//!
//! Declarative mapping schema for docsync.
//!
//! A mapping definition binds document content types to entity types and
//! lists, per table, how document properties flow into entity properties:
//! which field is the key, which one is the soft-delete flag, which ones
//! inherit from ancestors and which ones carry typed defaults.
//!
//! ## Usage
//!
//! ```
//! use docsync_mapping::{DataType, MappingSchema, Value};
//!
//! let schema = MappingSchema::from_xml(r#"
//!     <mappings namespace="Blog" dataContext="Blog.BlogContext">
//!       <table name="News" documentType="News" entityTypeName="NewsItem">
//!         <field name="Id" alias="id" key="true" />
//!         <field name="Views" dataType="Integer" defaultValue="0" />
//!       </table>
//!     </mappings>"#).unwrap();
//!
//! let news = schema.table_for_document_type("news").unwrap();
//! assert_eq!(news.entity_type_full_name, "Blog.NewsItem");
//! assert_eq!(news.field_mappings[1].field_type, Some(DataType::Integer));
//! assert_eq!(news.field_mappings[1].default_value, Some(Value::Integer(0)));
//! ```
//!
//! ## Key Invariants
//!
//! - Schemas are immutable once loaded
//! - Loading the same definition twice yields equal schemas
//! - Default values are typed at load time, never at sync time

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod data_type;
mod error;
pub mod loader;
mod schema;
mod value;

pub use data_type::DataType;
pub use error::{MappingError, MappingResult};
pub use loader::{load_file, load_str};
pub use schema::{FieldMapping, MappingSchema, TableMapping};
pub use value::{is_unset_datetime, parse_bool, parse_datetime, Value};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
