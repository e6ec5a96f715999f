//! # docsync testkit
//!
//! Test utilities for docsync.
//!
//! This crate provides:
//! - Sample entity types and a mapping definition that covers every field
//!   rule
//! - A [`TestHost`] wiring the engine to in-memory stores
//! - Property-based generators for mapping schemas and document values
//!
//! ## Usage
//!
//! ```
//! use docsync_testkit::prelude::*;
//!
//! let host = TestHost::new();
//! let mut doc = documents::news(10, "Launch", "1");
//! host.save(&mut doc);
//! assert!(host.news_item(1).unwrap().published);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod entities;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::entities::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use entities::*;
pub use fixtures::*;
pub use generators::*;
