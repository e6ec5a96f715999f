//! Test fixtures and host helpers.
//!
//! Provides a sample mapping definition, a registry for the sample entity
//! types and a [`TestHost`] wiring an engine to in-memory stores.

use crate::entities::{Article, NewsItem, Product};
use docsync_engine::{
    Document, Entity, EntityRegistry, MemoryContentStore, MemoryDatabase, PrincipalProvider,
    SyncConfig, SyncEngine, SyncOutcome,
};
use docsync_mapping::MappingSchema;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Sample mapping definition covering every field rule.
///
/// - `News` (auto-map on): key, plain text and a boolean flag.
/// - `Article` (auto-map off): typed defaults, inheritance and a stamp.
/// - `Product` (namespace `Shop`): soft delete through `Active`.
pub const SAMPLE_MAPPING: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<mappings assembly="Blog.Data" namespace="Blog" dataContext="Blog.BlogContext">
  <table name="News" documentType="News" entityTypeName="NewsItem">
    <field name="Id" alias="id" key="true" />
    <field name="Title" alias="title" />
    <field name="Published" alias="publishedFlag" dataType="Boolean" />
  </table>
  <table name="Articles" documentType="Article" entityTypeName="Article" autoMap="false">
    <field name="Id" alias="articleId" key="true" />
    <field name="Title" alias="title" />
    <field name="Summary" alias="summary" dataType="String" defaultValue="No summary" />
    <field name="Views" alias="views" dataType="Integer" defaultValue="100" />
    <field name="PublishedOn" alias="publishedOn" dataType="DateTime" defaultValue="2020-01-01" />
    <field name="Featured" alias="featured" dataType="Boolean" defaultValue="true" />
    <field name="Region" alias="region" inherit="true" dataType="String" defaultValue="global" />
    <field name="AuthorId" alias="UserID" inherit="true" />
    <field name="Stamp" alias="stamp" dataType="DateTimeStamp" defaultValue="now" />
  </table>
  <table name="Products" documentType="Product" entityTypeName="Product" namespace="Shop" allowDelete="true">
    <field name="Id" alias="productId" key="true" />
    <field name="Active" alias="active" isEnabledColumn="true" dataType="Boolean" defaultValue="true" />
  </table>
</mappings>
"#;

/// Parses [`SAMPLE_MAPPING`].
pub fn sample_schema() -> MappingSchema {
    MappingSchema::from_xml(SAMPLE_MAPPING).expect("sample mapping should load")
}

/// Registry with the sample entity types.
pub fn sample_registry() -> EntityRegistry {
    EntityRegistry::new()
        .with::<NewsItem>("Blog.NewsItem")
        .with::<Article>("Blog.Article")
        .with::<Product>("Shop.Product")
}

/// Database with one collection per sample table.
pub fn sample_database() -> MemoryDatabase {
    MemoryDatabase::new()
        .with_collection("News", "Id")
        .with_collection("Articles", "Id")
        .with_collection("Products", "Id")
}

/// File name hosts give their mapping definition.
pub const MAPPING_FILE_NAME: &str = "TableMappings.config";

/// A mapping definition written to a temporary host directory, removed on
/// drop.
///
/// The file lives at `<root>/config/TableMappings.config`, one level below
/// the root, the way hosts usually keep it.
pub struct MappingFile {
    path: PathBuf,
    temp_dir: TempDir,
}

impl MappingFile {
    /// Writes [`SAMPLE_MAPPING`].
    pub fn sample() -> Self {
        Self::with_contents(SAMPLE_MAPPING)
    }

    /// Writes arbitrary contents.
    pub fn with_contents(contents: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dir = temp_dir.path().join("config");
        fs::create_dir_all(&dir).expect("Failed to create config directory");
        let path = dir.join(MAPPING_FILE_NAME);
        fs::write(&path, contents).expect("Failed to write mapping file");
        Self { path, temp_dir }
    }

    /// Path of the mapping file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The temporary host directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }
}

/// An engine wired to in-memory stores.
pub struct TestHost {
    /// The engine under test.
    pub engine: SyncEngine<Arc<MemoryDatabase>>,
    /// Target store, shared with the engine.
    pub db: Arc<MemoryDatabase>,
    /// Document store.
    pub content: MemoryContentStore,
}

impl TestHost {
    /// Creates a host for the sample mapping with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    /// Creates a host for the sample mapping.
    pub fn with_config(config: SyncConfig) -> Self {
        let db = Arc::new(sample_database());
        let engine = SyncEngine::new(sample_schema(), sample_registry(), Arc::clone(&db), config)
            .expect("sample mapping should bind");
        Self {
            engine,
            db,
            content: MemoryContentStore::new(),
        }
    }

    /// Installs a principal provider.
    #[must_use]
    pub fn with_principal(mut self, principal: impl PrincipalProvider + 'static) -> Self {
        self.engine = self.engine.with_principal(principal);
        self
    }

    /// Stores a document in the content tree.
    pub fn add_document(&self, document: &Document) {
        self.content.insert(document.clone());
    }

    /// Syncs a saved document.
    pub fn save(&self, document: &mut Document) -> SyncOutcome {
        self.engine
            .on_document_saved(&self.content, document)
            .expect("sync should succeed")
    }

    /// Syncs a deleted document.
    pub fn delete(&self, document: &Document) -> SyncOutcome {
        self.engine
            .on_document_deleting(std::slice::from_ref(document))
            .expect("delete should succeed")
            .remove(0)
    }

    /// Committed news item.
    pub fn news_item(&self, key: i64) -> Option<NewsItem> {
        self.load("News", key)
    }

    /// Committed article.
    pub fn article(&self, key: i64) -> Option<Article> {
        self.load("Articles", key)
    }

    /// Committed product.
    pub fn product(&self, key: i64) -> Option<Product> {
        self.load("Products", key)
    }

    fn load<T: Entity + Clone>(&self, collection: &str, key: i64) -> Option<T> {
        let entity = self.db.get(collection, key)?;
        entity.downcast_ref::<T>().cloned()
    }
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestHost {
    type Target = SyncEngine<Arc<MemoryDatabase>>;

    fn deref(&self) -> &Self::Target {
        &self.engine
    }
}

/// Runs a test against a fresh [`TestHost`].
///
/// # Example
///
/// ```
/// use docsync_testkit::with_host;
///
/// with_host(|host| {
///     assert_eq!(host.db.len("News"), 0);
/// });
/// ```
pub fn with_host<F, R>(f: F) -> R
where
    F: FnOnce(&TestHost) -> R,
{
    let host = TestHost::new();
    f(&host)
}

/// Document builders for the sample mapping.
pub mod documents {
    use docsync_engine::Document;
    use docsync_mapping::Value;

    /// A new `News` document (empty key).
    pub fn news(id: i64, title: &str, published_flag: &str) -> Document {
        Document::new(id, "News", title)
            .with_property("id", "")
            .with_property("title", title)
            .with_property("publishedFlag", published_flag)
    }

    /// A new `Article` document with only a key and a title.
    pub fn article(id: i64, title: &str) -> Document {
        Document::new(id, "Article", title)
            .with_property("articleId", Value::Null)
            .with_property("title", title)
    }

    /// A new `Product` document.
    pub fn product(id: i64, name: &str, price: i64) -> Document {
        Document::new(id, "Product", name)
            .with_property("productId", "")
            .with_property("Name", name)
            .with_property("Price", price)
    }
}

/// Prepared scenarios.
pub mod scenarios {
    use super::*;

    /// A three-level tree below a site root.
    pub struct SiteTree {
        /// Level 1; carries `region` and `UserID`.
        pub site: Document,
        /// Level 2.
        pub section: Document,
        /// Level 3; parent for new documents.
        pub folder: Document,
    }

    /// Stores a site root (`region = "emea"`, `UserID = 7`), a section and a
    /// folder in the host's content tree.
    pub fn site_tree(host: &TestHost) -> SiteTree {
        let site = Document::new(1, "Site", "Home")
            .with_property("region", "emea")
            .with_property("UserID", 7);
        let section = Document::new(2, "Section", "Articles").under(&site);
        let folder = Document::new(3, "Folder", "2024").under(&section);
        for doc in [&site, &section, &folder] {
            host.add_document(doc);
        }
        SiteTree {
            site,
            section,
            folder,
        }
    }

    /// A host with `count` synced news items, keys `1..=count`.
    pub fn populated_host(count: usize) -> TestHost {
        let host = TestHost::new();
        for i in 0..count {
            let mut doc = documents::news(100 + i as i64, &format!("Item {i}"), "1");
            host.save(&mut doc);
        }
        host
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_mapping_binds() {
        let host = TestHost::new();
        assert_eq!(host.schema().tables.len(), 3);
        assert_eq!(
            host.schema().table("Products").unwrap().entity_type_full_name,
            "Shop.Product"
        );
    }

    #[test]
    fn populated_scenario() {
        let host = scenarios::populated_host(3);
        assert_eq!(host.db.keys("News"), vec![1, 2, 3]);
        assert_eq!(host.news_item(2).unwrap().title, "Item 1");
    }

    #[test]
    fn sample_file_loads_like_the_constant() {
        let file = MappingFile::sample();
        assert!(file.path().starts_with(file.root()));
        assert_eq!(
            docsync_mapping::load_file(file.path()).unwrap(),
            sample_schema()
        );
    }

    #[test]
    fn mapping_file_is_removed_on_drop() {
        let file = MappingFile::with_contents("<mappings />");
        let root = file.root().to_path_buf();
        assert!(root.exists());
        drop(file);
        assert!(!root.exists());
    }

    #[test]
    fn site_tree_is_stored() {
        let host = TestHost::new();
        let tree = scenarios::site_tree(&host);
        assert_eq!(tree.folder.level, 3);
        assert_eq!(host.content.len(), 3);
    }
}
