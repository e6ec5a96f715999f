//! Sample entity types for the fixture mapping.

use chrono::NaiveDateTime;
use docsync_engine::{Entity, PropertyInfo, PropertyType};
use docsync_mapping::Value;
use std::any::Any;

fn optional_integer(value: Value) -> Option<Option<i64>> {
    match value {
        Value::Null => Some(None),
        Value::Integer(n) => Some(Some(n)),
        _ => None,
    }
}

/// A news item (`Blog.NewsItem`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsItem {
    /// Key.
    pub id: i64,
    /// Headline.
    pub title: String,
    /// Whether the item is live.
    pub published: bool,
    /// Body text, only ever auto-mapped.
    pub body: String,
}

const NEWS_ITEM_PROPERTIES: &[PropertyInfo] = &[
    PropertyInfo::new("Id", PropertyType::INTEGER),
    PropertyInfo::new("Title", PropertyType::TEXT),
    PropertyInfo::new("Published", PropertyType::BOOLEAN),
    PropertyInfo::new("Body", PropertyType::TEXT),
];

impl Entity for NewsItem {
    fn type_name(&self) -> &str {
        "Blog.NewsItem"
    }

    fn properties(&self) -> &[PropertyInfo] {
        NEWS_ITEM_PROPERTIES
    }

    fn get(&self, property: &str) -> Option<Value> {
        match property {
            "Id" => Some(Value::Integer(self.id)),
            "Title" => Some(Value::text(&self.title)),
            "Published" => Some(Value::Bool(self.published)),
            "Body" => Some(Value::text(&self.body)),
            _ => None,
        }
    }

    fn put(&mut self, property: &str, value: Value) -> bool {
        match (property, value) {
            ("Id", Value::Integer(n)) => self.id = n,
            ("Title", Value::Text(s)) => self.title = s,
            ("Published", Value::Bool(b)) => self.published = b,
            ("Body", Value::Text(s)) => self.body = s,
            _ => return false,
        }
        true
    }

    fn clone_entity(&self) -> Box<dyn Entity> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An article (`Blog.Article`) exercising defaults and inheritance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Article {
    /// Key.
    pub id: i64,
    /// Headline.
    pub title: String,
    /// Teaser, defaults to a placeholder.
    pub summary: String,
    /// View counter, defaults to a seed value.
    pub views: i64,
    /// Publication date, defaults to a fixed date.
    pub published_on: NaiveDateTime,
    /// Always reset to its default when the document has no value.
    pub featured: bool,
    /// Inherited from the nearest ancestor.
    pub region: String,
    /// Current user or nearest ancestor's `UserID`.
    pub author_id: Option<i64>,
    /// Stamped on every sync.
    pub stamp: Option<NaiveDateTime>,
    /// Same-named document property; not copied because auto-map is off.
    pub rating: Option<i64>,
}

const ARTICLE_PROPERTIES: &[PropertyInfo] = &[
    PropertyInfo::new("Id", PropertyType::INTEGER),
    PropertyInfo::new("Title", PropertyType::TEXT),
    PropertyInfo::new("Summary", PropertyType::TEXT),
    PropertyInfo::new("Views", PropertyType::INTEGER),
    PropertyInfo::new("PublishedOn", PropertyType::DATETIME),
    PropertyInfo::new("Featured", PropertyType::BOOLEAN),
    PropertyInfo::new("Region", PropertyType::TEXT),
    PropertyInfo::new("AuthorId", PropertyType::INTEGER.nullable()),
    PropertyInfo::new("Stamp", PropertyType::DATETIME.nullable()),
    PropertyInfo::new("Rating", PropertyType::INTEGER.nullable()),
];

impl Entity for Article {
    fn type_name(&self) -> &str {
        "Blog.Article"
    }

    fn properties(&self) -> &[PropertyInfo] {
        ARTICLE_PROPERTIES
    }

    fn get(&self, property: &str) -> Option<Value> {
        match property {
            "Id" => Some(Value::Integer(self.id)),
            "Title" => Some(Value::text(&self.title)),
            "Summary" => Some(Value::text(&self.summary)),
            "Views" => Some(Value::Integer(self.views)),
            "PublishedOn" => Some(Value::DateTime(self.published_on)),
            "Featured" => Some(Value::Bool(self.featured)),
            "Region" => Some(Value::text(&self.region)),
            "AuthorId" => Some(self.author_id.into()),
            "Stamp" => Some(self.stamp.into()),
            "Rating" => Some(self.rating.into()),
            _ => None,
        }
    }

    fn put(&mut self, property: &str, value: Value) -> bool {
        match (property, value) {
            ("Id", Value::Integer(n)) => self.id = n,
            ("Title", Value::Text(s)) => self.title = s,
            ("Summary", Value::Text(s)) => self.summary = s,
            ("Views", Value::Integer(n)) => self.views = n,
            ("PublishedOn", Value::DateTime(dt)) => self.published_on = dt,
            ("Featured", Value::Bool(b)) => self.featured = b,
            ("Region", Value::Text(s)) => self.region = s,
            ("AuthorId", value) => match optional_integer(value) {
                Some(n) => self.author_id = n,
                None => return false,
            },
            ("Stamp", Value::DateTime(dt)) => self.stamp = Some(dt),
            ("Stamp", Value::Null) => self.stamp = None,
            ("Rating", value) => match optional_integer(value) {
                Some(n) => self.rating = n,
                None => return false,
            },
            _ => return false,
        }
        true
    }

    fn clone_entity(&self) -> Box<dyn Entity> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A product (`Shop.Product`), soft deleted through `Active`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Product {
    /// Key.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Price in cents.
    pub price: i64,
    /// Enabled column.
    pub active: bool,
    /// Navigation data, never synced.
    pub tags: Vec<String>,
}

const PRODUCT_PROPERTIES: &[PropertyInfo] = &[
    PropertyInfo::new("Id", PropertyType::INTEGER),
    PropertyInfo::new("Name", PropertyType::TEXT),
    PropertyInfo::new("Price", PropertyType::INTEGER),
    PropertyInfo::new("Active", PropertyType::BOOLEAN),
    PropertyInfo::new("Tags", PropertyType::OTHER),
];

impl Entity for Product {
    fn type_name(&self) -> &str {
        "Shop.Product"
    }

    fn properties(&self) -> &[PropertyInfo] {
        PRODUCT_PROPERTIES
    }

    fn get(&self, property: &str) -> Option<Value> {
        match property {
            "Id" => Some(Value::Integer(self.id)),
            "Name" => Some(Value::text(&self.name)),
            "Price" => Some(Value::Integer(self.price)),
            "Active" => Some(Value::Bool(self.active)),
            _ => None,
        }
    }

    fn put(&mut self, property: &str, value: Value) -> bool {
        match (property, value) {
            ("Id", Value::Integer(n)) => self.id = n,
            ("Name", Value::Text(s)) => self.name = s,
            ("Price", Value::Integer(n)) => self.price = n,
            ("Active", Value::Bool(b)) => self.active = b,
            _ => return false,
        }
        true
    }

    fn clone_entity(&self) -> Box<dyn Entity> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
