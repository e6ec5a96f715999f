//! Target entity abstraction.
//!
//! Entities expose a static table of scalar properties plus typed get/put
//! by canonical property name. The engine never touches entity fields
//! directly: every read and write goes through the property accessor,
//! which resolves names case-insensitively and converts loosely typed
//! document values to the declared property type first.

use chrono::{NaiveDate, NaiveDateTime};
use docsync_mapping::Value;
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Scalar kind of an entity property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// Text.
    Text,
    /// Signed integer.
    Integer,
    /// Boolean.
    Boolean,
    /// Timestamp.
    DateTime,
    /// Anything that is not a scalar (navigation properties, collections).
    /// Never auto-mapped and never assignable.
    Other,
}

impl PropertyKind {
    /// Whether values of this kind can be assigned from a document.
    pub fn is_scalar(self) -> bool {
        !matches!(self, PropertyKind::Other)
    }

    /// Lower-case name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            PropertyKind::Text => "text",
            PropertyKind::Integer => "integer",
            PropertyKind::Boolean => "boolean",
            PropertyKind::DateTime => "datetime",
            PropertyKind::Other => "non-scalar",
        }
    }
}

/// Declared type of an entity property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyType {
    /// Underlying kind.
    pub kind: PropertyKind,
    /// Whether the property also accepts null (an `Option<T>` field).
    pub nullable: bool,
}

impl PropertyType {
    /// Non-nullable text.
    pub const TEXT: Self = Self::of(PropertyKind::Text);
    /// Non-nullable integer.
    pub const INTEGER: Self = Self::of(PropertyKind::Integer);
    /// Non-nullable boolean.
    pub const BOOLEAN: Self = Self::of(PropertyKind::Boolean);
    /// Non-nullable timestamp.
    pub const DATETIME: Self = Self::of(PropertyKind::DateTime);
    /// Non-scalar property.
    pub const OTHER: Self = Self::of(PropertyKind::Other);

    /// Non-nullable property of the given kind.
    pub const fn of(kind: PropertyKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    /// The nullable variant of this type.
    #[must_use]
    pub const fn nullable(self) -> Self {
        Self {
            kind: self.kind,
            nullable: true,
        }
    }

    /// Whether a value already matches this type exactly.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self.kind, value) {
            (_, Value::Null) => self.nullable,
            (PropertyKind::Text, Value::Text(_))
            | (PropertyKind::Integer, Value::Integer(_))
            | (PropertyKind::Boolean, Value::Bool(_))
            | (PropertyKind::DateTime, Value::DateTime(_)) => true,
            _ => false,
        }
    }

    /// Value a freshly constructed property of this type holds.
    pub fn initial_value(&self) -> Value {
        if self.nullable {
            return Value::Null;
        }
        match self.kind {
            PropertyKind::Text => Value::Text(String::new()),
            PropertyKind::Integer => Value::Integer(0),
            PropertyKind::Boolean => Value::Bool(false),
            PropertyKind::DateTime => NaiveDate::from_ymd_opt(1, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map_or(Value::DateTime(NaiveDateTime::MIN), Value::DateTime),
            PropertyKind::Other => Value::Null,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "optional {}", self.kind.name())
        } else {
            f.write_str(self.kind.name())
        }
    }
}

/// A named, typed entity property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyInfo {
    /// Canonical property name.
    pub name: Cow<'static, str>,
    /// Declared type.
    pub ty: PropertyType,
}

impl PropertyInfo {
    /// Creates a property with a static name, usable in `const` tables.
    pub const fn new(name: &'static str, ty: PropertyType) -> Self {
        Self {
            name: Cow::Borrowed(name),
            ty,
        }
    }

    /// Creates a property with a runtime name.
    pub fn owned(name: impl Into<String>, ty: PropertyType) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            ty,
        }
    }

    /// Case-insensitive name comparison.
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A record in the target store.
///
/// `get` and `put` use the canonical names from [`Entity::properties`];
/// `put` receives values that already match the declared type (or null for
/// nullable properties) and returns `false` if it cannot store them.
///
/// # Example
///
/// ```
/// use docsync_engine::{Entity, PropertyInfo, PropertyType};
/// use docsync_mapping::Value;
/// use std::any::Any;
///
/// #[derive(Debug, Clone, Default)]
/// struct Tag {
///     id: i64,
///     label: String,
/// }
///
/// const TAG_PROPERTIES: &[PropertyInfo] = &[
///     PropertyInfo::new("Id", PropertyType::INTEGER),
///     PropertyInfo::new("Label", PropertyType::TEXT),
/// ];
///
/// impl Entity for Tag {
///     fn type_name(&self) -> &str { "Blog.Tag" }
///     fn properties(&self) -> &[PropertyInfo] { TAG_PROPERTIES }
///     fn get(&self, property: &str) -> Option<Value> {
///         match property {
///             "Id" => Some(Value::Integer(self.id)),
///             "Label" => Some(Value::Text(self.label.clone())),
///             _ => None,
///         }
///     }
///     fn put(&mut self, property: &str, value: Value) -> bool {
///         match (property, value) {
///             ("Id", Value::Integer(n)) => self.id = n,
///             ("Label", Value::Text(s)) => self.label = s,
///             _ => return false,
///         }
///         true
///     }
///     fn clone_entity(&self) -> Box<dyn Entity> { Box::new(self.clone()) }
///     fn as_any(&self) -> &dyn Any { self }
/// }
/// ```
pub trait Entity: Any + Send + fmt::Debug {
    /// Fully qualified type name.
    fn type_name(&self) -> &str;

    /// Property table.
    fn properties(&self) -> &[PropertyInfo];

    /// Reads a property by canonical name.
    fn get(&self, property: &str) -> Option<Value>;

    /// Writes a property by canonical name.
    fn put(&mut self, property: &str, value: Value) -> bool;

    /// Clones the entity behind a fresh box.
    fn clone_entity(&self) -> Box<dyn Entity>;

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
}

impl dyn Entity {
    /// Downcasts to a concrete entity type.
    pub fn downcast_ref<T: Entity>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// Looks a property up case-insensitively.
    pub fn property(&self, name: &str) -> Option<&PropertyInfo> {
        self.properties().iter().find(|p| p.matches(name))
    }
}

impl Clone for Box<dyn Entity> {
    fn clone(&self) -> Self {
        self.clone_entity()
    }
}

/// An entity whose property table is declared at runtime.
///
/// Useful for hosts that have no compiled type per table, and for tests.
#[derive(Debug, Clone)]
pub struct DynamicEntity {
    type_name: String,
    properties: Arc<[PropertyInfo]>,
    values: Vec<Value>,
}

impl DynamicEntity {
    /// Creates an entity with every property at its initial value.
    pub fn new(
        type_name: impl Into<String>,
        properties: impl IntoIterator<Item = PropertyInfo>,
    ) -> Self {
        let properties: Arc<[PropertyInfo]> = properties.into_iter().collect();
        let values = properties.iter().map(|p| p.ty.initial_value()).collect();
        Self {
            type_name: type_name.into(),
            properties,
            values,
        }
    }

    /// Reads a value by canonical name.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.index_of(name).map(|i| &self.values[i])
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }
}

impl Entity for DynamicEntity {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn properties(&self) -> &[PropertyInfo] {
        &self.properties
    }

    fn get(&self, property: &str) -> Option<Value> {
        self.value(property).cloned()
    }

    fn put(&mut self, property: &str, value: Value) -> bool {
        let Some(index) = self.index_of(property) else {
            return false;
        };
        if !self.properties[index].ty.accepts(&value) {
            return false;
        }
        self.values[index] = value;
        true
    }

    fn clone_entity(&self) -> Box<dyn Entity> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
