//! File-based loading tests.

use docsync_mapping::{load_file, MappingError, MappingSchema};
use proptest::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const DEFINITION: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<mappings assembly="Shop.Data" namespace="Shop" dataContext="Shop.ShopContext">
  <!-- products are soft deleted -->
  <table name="Product" documentType="product">
    <field name="ProductId" alias="productId" key="true" />
    <field name="Enabled" isEnabledColumn="true" dataType="Boolean" defaultValue="true" />
    <field name="Category" alias="category" inherit="true" />
  </table>
  <table name="Review" documentType="review" autoMap="false">
    <field name="Id" key="true" />
    <field name="Created" dataType="DateTimeStamp" />
  </table>
</mappings>
"#;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write");
    file
}

#[test]
fn load_from_file() {
    let file = write_temp(DEFINITION);
    let schema = load_file(file.path()).unwrap();

    assert_eq!(schema.tables.len(), 2);
    let product = schema.table_for_document_type("Product").unwrap();
    assert_eq!(product.entity_type_full_name, "Shop.Product");
    assert_eq!(product.enabled_column().unwrap().name, "Enabled");
    assert!(product.field_by_alias("category").unwrap().inherit);

    let review = schema.table("Review").unwrap();
    assert!(!review.auto_map_fields);
    assert_eq!(review.key_field().unwrap().alias, "Id");
}

#[test]
fn file_and_text_loading_agree() {
    let file = write_temp(DEFINITION);
    assert_eq!(
        load_file(file.path()).unwrap(),
        MappingSchema::from_xml(DEFINITION).unwrap()
    );
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_file(dir.path().join("TableMappings.config")).unwrap_err();
    assert!(matches!(err, MappingError::Io(_)));
}

fn identifier() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z0-9]{0,12}").expect("Invalid regex")
}

proptest! {
    #[test]
    fn loading_any_generated_definition_is_idempotent(
        names in prop::collection::hash_set(identifier(), 1..6),
        namespace in identifier(),
    ) {
        let mut xml = format!(r#"<mappings namespace="{namespace}">"#);
        for name in &names {
            xml.push_str(&format!(r#"<table name="{name}" documentType="{name}">"#));
            xml.push_str(&format!(
                r#"<field name="Id" key="true" /><field name="{name}Title" /></table>"#
            ));
        }
        xml.push_str("</mappings>");

        let first = MappingSchema::from_xml(&xml).unwrap();
        let second = MappingSchema::from_xml(&xml).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.tables.len(), names.len());
        for table in &first.tables {
            prop_assert_eq!(
                &table.entity_type_full_name,
                &format!("{}.{}", namespace, table.name)
            );
        }
    }
}
