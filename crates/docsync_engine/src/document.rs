//! Document model and the content store surface the engine consumes.

use crate::error::SyncResult;
use docsync_mapping::Value;
use std::fmt;

/// Identifier of a node in the content tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub i64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named property on a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Property alias.
    pub alias: String,
    /// Current value.
    pub value: Value,
}

/// Ordered property collection with case-insensitive alias lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyBag {
    properties: Vec<Property>,
}

impl PropertyBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds a property by alias.
    pub fn get(&self, alias: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.alias.eq_ignore_ascii_case(alias))
    }

    /// Whether a property with this alias exists (whatever its value).
    pub fn contains(&self, alias: &str) -> bool {
        self.get(alias).is_some()
    }

    /// Overwrites an existing property. Returns `false` if there is no
    /// property with this alias.
    pub fn set(&mut self, alias: &str, value: Value) -> bool {
        match self
            .properties
            .iter_mut()
            .find(|p| p.alias.eq_ignore_ascii_case(alias))
        {
            Some(property) => {
                property.value = value;
                true
            }
            None => false,
        }
    }

    /// Sets a property, adding it if missing.
    pub fn insert(&mut self, alias: impl Into<String>, value: impl Into<Value>) {
        let alias = alias.into();
        let value = value.into();
        if !self.set(&alias, value.clone()) {
            self.properties.push(Property { alias, value });
        }
    }

    /// Iterates over properties in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// A node in the content tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Node identifier.
    pub id: DocumentId,
    /// Parent node, `None` at the root.
    pub parent_id: Option<DocumentId>,
    /// Depth in the tree, 1 for top-level nodes.
    pub level: u32,
    /// Node name.
    pub name: String,
    /// Comma-separated ids from the root to this node.
    pub path: String,
    /// Content type identifier; selects the table mapping.
    pub content_type_alias: String,
    /// Property values.
    pub properties: PropertyBag,
}

impl Document {
    /// Creates a top-level document.
    pub fn new(id: i64, content_type_alias: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: DocumentId(id),
            parent_id: None,
            level: 1,
            name: name.into(),
            path: format!("-1,{id}"),
            content_type_alias: content_type_alias.into(),
            properties: PropertyBag::new(),
        }
    }

    /// Places the document below `parent`.
    #[must_use]
    pub fn under(mut self, parent: &Document) -> Self {
        self.parent_id = Some(parent.id);
        self.level = parent.level + 1;
        self.path = format!("{},{}", parent.path, self.id);
        self
    }

    /// Adds or replaces a property.
    #[must_use]
    pub fn with_property(mut self, alias: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(alias, value);
        self
    }

    /// Reads the value the engine sees for an alias.
    ///
    /// The aliases `Name` and `Path` (any case) read the node's name and
    /// path. Otherwise the property is looked up by alias; a missing
    /// property and a null value both read as `None`.
    pub fn value(&self, alias: &str) -> Option<Value> {
        if alias.eq_ignore_ascii_case("name") {
            return Some(Value::Text(self.name.clone()));
        }
        if alias.eq_ignore_ascii_case("path") {
            return Some(Value::Text(self.path.clone()));
        }
        self.properties
            .get(alias)
            .filter(|p| !p.value.is_null())
            .map(|p| p.value.clone())
    }
}

/// Document store operations the engine calls back into.
pub trait ContentService {
    /// Loads the parent of a document, `None` at the root.
    fn parent(&self, document: &Document) -> SyncResult<Option<Document>>;

    /// Persists a document.
    fn save(&self, document: &Document) -> SyncResult<()>;

    /// Permanently deletes a document.
    fn delete(&self, document: &Document) -> SyncResult<()>;
}
