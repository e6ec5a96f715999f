//! Ancestor property lookup.

use crate::document::{ContentService, Document};
use crate::error::{SyncError, SyncResult};
use docsync_mapping::Value;
use std::borrow::Cow;
use std::collections::HashSet;

/// Walks a document's parent chain looking for a property.
pub struct AncestorResolver<'c> {
    content: &'c dyn ContentService,
    max_depth: usize,
}

impl<'c> AncestorResolver<'c> {
    /// Creates a resolver that visits at most `max_depth` ancestors.
    pub fn new(content: &'c dyn ContentService, max_depth: usize) -> Self {
        Self { content, max_depth }
    }

    /// Returns the value of the nearest node, starting with `document`
    /// itself, that has a property named `alias`.
    ///
    /// A property that exists but holds null still ends the walk, so the
    /// result may be `Some(Value::Null)`. `None` means no node up to the
    /// root has the property.
    pub fn resolve(&self, document: &Document, alias: &str) -> SyncResult<Option<Value>> {
        let mut visited = HashSet::new();
        let mut current = Cow::Borrowed(document);

        loop {
            if !visited.insert(current.id) {
                return Err(SyncError::invariant(format!(
                    "parent chain of document {} loops back to {}",
                    document.id, current.id
                )));
            }

            if let Some(property) = current.properties.get(alias) {
                return Ok(Some(property.value.clone()));
            }

            let Some(parent) = self.content.parent(&current)? else {
                return Ok(None);
            };
            // `visited` holds the document plus every ancestor walked so far.
            if visited.len() > self.max_depth {
                return Err(SyncError::invariant(format!(
                    "parent chain of document {} is deeper than {} levels",
                    document.id, self.max_depth
                )));
            }
            current = Cow::Owned(parent);
        }
    }
}

/// Convenience wrapper around [`AncestorResolver::resolve`].
pub fn resolve_ancestor_property(
    content: &dyn ContentService,
    document: &Document,
    alias: &str,
    max_depth: usize,
) -> SyncResult<Option<Value>> {
    AncestorResolver::new(content, max_depth).resolve(document, alias)
}
