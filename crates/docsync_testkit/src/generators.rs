//! Property-based test generators using proptest.
//!
//! Generated schemas satisfy every loader invariant: unique table names and
//! document types, exactly one key per table, and defaults only on typed
//! fields. [`to_xml`] renders them back to a definition the loader accepts.

use docsync_mapping::{DataType, FieldMapping, MappingSchema, TableMapping, Value};
use proptest::prelude::*;
use std::fmt::Write;

/// Strategy for identifiers that are unique regardless of case.
pub fn identifier_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z0-9]{0,12}").expect("Invalid regex")
}

/// Strategy for a typed default value and its data type.
pub fn typed_default_strategy() -> impl Strategy<Value = (DataType, Value)> {
    prop_oneof![
        prop::string::string_regex("[A-Za-z0-9]{1,12}")
            .expect("Invalid regex")
            .prop_map(|s| (DataType::String, Value::Text(s))),
        any::<i32>().prop_map(|n| (DataType::Integer, Value::Integer(i64::from(n)))),
        any::<bool>().prop_map(|b| (DataType::Boolean, Value::Bool(b))),
    ]
}

/// Strategy for a non-key field named `name`.
pub fn field_mapping_strategy(name: String) -> impl Strategy<Value = FieldMapping> {
    (
        prop::option::of(identifier_strategy()),
        any::<bool>(),
        prop::option::of(typed_default_strategy()),
    )
        .prop_map(move |(alias, inherit, default)| {
            let mut field = FieldMapping::new(name.clone());
            if let Some(alias) = alias {
                field = field.with_alias(format!("{alias}Alias"));
            }
            if inherit {
                field = field.inherited();
            }
            if let Some((data_type, value)) = default {
                field = field.with_type(data_type).with_default(value);
            }
            field
        })
}

/// Strategy for a table named `name` in `namespace`, with a key field first.
pub fn table_mapping_strategy(
    name: String,
    namespace: String,
) -> impl Strategy<Value = TableMapping> {
    let field_names = prop::collection::btree_set(identifier_strategy(), 0..6);
    (field_names, any::<bool>())
        .prop_flat_map(move |(names, auto_map)| {
            let fields: Vec<_> = names
                .into_iter()
                .map(|n| field_mapping_strategy(format!("{n}Field")))
                .collect();
            let name = name.clone();
            let namespace = namespace.clone();
            fields.prop_map(move |fields| {
                let mut table = TableMapping::new(name.clone(), namespace.clone())
                    .with_field(FieldMapping::new("Id").with_alias("id").as_key());
                table.auto_map_fields = auto_map;
                table.field_mappings.extend(fields);
                table
            })
        })
}

/// Strategy for a complete, valid schema.
pub fn mapping_schema_strategy() -> impl Strategy<Value = MappingSchema> {
    (
        identifier_strategy(),
        prop::collection::btree_set(identifier_strategy(), 1..5),
    )
        .prop_flat_map(|(namespace, names)| {
            let tables: Vec<_> = names
                .into_iter()
                .map(|name| table_mapping_strategy(name, namespace.clone()))
                .collect();
            tables.prop_map(move |tables| MappingSchema {
                namespace: Some(namespace.clone()),
                assembly: None,
                data_context: None,
                tables,
            })
        })
}

/// Strategy for loosely typed document values.
pub fn document_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        "[ -~]{0,16}".prop_map(Value::Text),
    ]
}

/// Renders a schema as a mapping definition.
///
/// Only the attributes the generators vary are written; everything else
/// is left to the loader's defaults.
pub fn to_xml(schema: &MappingSchema) -> String {
    let mut xml = String::from("<mappings");
    if let Some(namespace) = &schema.namespace {
        let _ = write!(xml, r#" namespace="{namespace}""#);
    }
    xml.push('>');

    for table in &schema.tables {
        let _ = write!(xml, r#"<table name="{}""#, table.name);
        if let Some(document_type) = &table.document_type {
            let _ = write!(xml, r#" documentType="{document_type}""#);
        }
        let _ = write!(xml, r#" autoMap="{}">"#, table.auto_map_fields);
        for field in &table.field_mappings {
            let _ = write!(
                xml,
                r#"<field name="{}" alias="{}" key="{}" inherit="{}""#,
                field.name, field.alias, field.key, field.inherit
            );
            if let Some(data_type) = field.field_type {
                let _ = write!(xml, r#" dataType="{data_type}""#);
            }
            if let Some(value) = &field.default_value {
                let _ = write!(xml, r#" defaultValue="{value}""#);
            }
            xml.push_str(" />");
        }
        xml.push_str("</table>");
    }

    xml.push_str("</mappings>");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_schemas_are_valid(schema in mapping_schema_strategy()) {
            prop_assert!(schema.validate().is_ok());
            for table in &schema.tables {
                prop_assert!(table.key_field().is_some());
            }
        }

        #[test]
        fn rendered_schemas_load_back(schema in mapping_schema_strategy()) {
            let loaded = MappingSchema::from_xml(&to_xml(&schema)).unwrap();
            prop_assert_eq!(loaded, schema);
        }
    }
}
