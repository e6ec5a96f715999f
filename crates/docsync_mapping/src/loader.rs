//! XML mapping definition loader.
//!
//! The definition looks like:
//!
//! ```xml
//! <mappings assembly="Blog.Data" namespace="Blog" dataContext="Blog.BlogContext">
//!   <table name="News" documentType="News" entityTypeName="NewsItem">
//!     <field name="Id" alias="id" key="true" />
//!     <field name="Title" alias="title" />
//!     <field name="Published" alias="publishedFlag" dataType="Boolean" />
//!   </table>
//! </mappings>
//! ```
//!
//! Attributes are copied verbatim, then normalized: missing namespace and
//! assembly fall back to the root's, the collection name defaults to the
//! table name, the entity type is qualified by the namespace and a missing
//! alias defaults to the field name. Default-value literals are parsed once
//! here so the engine only ever sees typed values.

use crate::data_type::DataType;
use crate::error::{MappingError, MappingResult};
use crate::schema::{FieldMapping, MappingSchema, TableMapping};
use crate::value::parse_bool;
use roxmltree::Node;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Name of the root element.
pub const ROOT_ELEMENT: &str = "mappings";
/// Name of a table element.
pub const TABLE_ELEMENT: &str = "table";
/// Name of a field element.
pub const FIELD_ELEMENT: &str = "field";

/// Parses a mapping definition from XML text.
pub fn load_str(xml: &str) -> MappingResult<MappingSchema> {
    let doc = roxmltree::Document::parse(xml)?;
    let root = doc.root_element();

    if !root.has_tag_name(ROOT_ELEMENT) {
        return Err(MappingError::malformed(format!(
            "root element must be <{ROOT_ELEMENT}>, found <{}>",
            root.tag_name().name()
        )));
    }

    let namespace = text_attr(root, "namespace");
    let assembly = text_attr(root, "assembly");
    let data_context = text_attr(root, "dataContext");

    let tables = root
        .descendants()
        .filter(|n| n.has_tag_name(TABLE_ELEMENT))
        .map(|table| read_table(table, namespace.as_deref(), assembly.as_deref()))
        .collect::<MappingResult<Vec<_>>>()?;

    let schema = MappingSchema {
        namespace,
        assembly,
        data_context,
        tables,
    };
    schema.validate()?;

    info!(tables = schema.tables.len(), "loaded mapping definition");
    Ok(schema)
}

/// Loads a mapping definition from a file.
pub fn load_file(path: impl AsRef<Path>) -> MappingResult<MappingSchema> {
    let path = path.as_ref();
    debug!(path = %path.display(), "reading mapping definition");
    let xml = fs::read_to_string(path)?;
    load_str(&xml)
}

fn read_table(
    node: Node<'_, '_>,
    default_namespace: Option<&str>,
    default_assembly: Option<&str>,
) -> MappingResult<TableMapping> {
    let name = node
        .attribute("name")
        .ok_or_else(|| MappingError::malformed("table attribute 'name' is required"))?
        .to_string();

    let namespace = text_attr(node, "namespace")
        .or_else(|| default_namespace.map(str::to_string))
        .ok_or_else(|| {
            MappingError::malformed(format!(
                "table '{name}' has no namespace and the mapping file declares no default"
            ))
        })?;
    let assembly = text_attr(node, "assembly").or_else(|| default_assembly.map(str::to_string));

    let type_name = text_attr(node, "entityTypeName").unwrap_or_else(|| name.clone());
    let entity_property_name =
        text_attr(node, "entityPropertyName").unwrap_or_else(|| name.clone());

    let mut table = TableMapping {
        document_type: text_attr(node, "documentType"),
        entity_type_full_name: format!("{namespace}.{type_name}"),
        entity_property_name,
        auto_map_fields: bool_attr(node, "autoMap")?.unwrap_or(true),
        allow_delete: bool_attr(node, "allowDelete")?.unwrap_or(false),
        assembly,
        namespace: Some(namespace),
        field_mappings: Vec::new(),
        name,
    };

    for field in node.descendants().filter(|n| n.has_tag_name(FIELD_ELEMENT)) {
        let field = read_field(field, &table.name)?;
        table.field_mappings.push(field);
    }

    debug!(
        table = %table.name,
        entity = %table.entity_type_full_name,
        fields = table.field_mappings.len(),
        "mapped table"
    );
    Ok(table)
}

fn read_field(node: Node<'_, '_>, table: &str) -> MappingResult<FieldMapping> {
    let name = text_attr(node, "name").ok_or_else(|| {
        MappingError::malformed(format!("field of table '{table}' has no 'name' attribute"))
    })?;

    let field_type = node
        .attribute("dataType")
        .map(str::parse::<DataType>)
        .transpose()?;

    let default_value = match node.attribute("defaultValue") {
        None => None,
        Some(literal) => {
            let data_type = field_type.ok_or_else(|| {
                MappingError::malformed(format!(
                    "field '{name}' of table '{table}' declares a default value without a data type"
                ))
            })?;
            let value = data_type
                .parse_literal(literal)
                .ok_or_else(|| MappingError::value_coercion(&name, literal, data_type))?;
            Some(value)
        }
    };

    Ok(FieldMapping {
        alias: text_attr(node, "alias").unwrap_or_else(|| name.clone()),
        key: bool_attr(node, "key")?.unwrap_or(false),
        is_enabled_column: bool_attr(node, "isEnabledColumn")?.unwrap_or(false),
        inherit: bool_attr(node, "inherit")?.unwrap_or(false),
        default_value,
        field_type,
        name,
    })
}

/// Reads an attribute, treating blank text as absent.
fn text_attr(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.attribute(name)
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}

fn bool_attr(node: Node<'_, '_>, name: &str) -> MappingResult<Option<bool>> {
    node.attribute(name)
        .map(|raw| {
            parse_bool(raw).ok_or_else(|| {
                MappingError::malformed(format!(
                    "attribute '{name}' on <{}> must be true or false, found {raw:?}",
                    node.tag_name().name()
                ))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    const NEWS: &str = r#"
        <mappings assembly="Blog.Data" namespace="Blog" dataContext="Blog.BlogContext">
          <table name="News" documentType="News" entityTypeName="NewsItem">
            <field name="Id" alias="id" key="true" />
            <field name="Title" alias="title" />
            <field name="Published" alias="publishedFlag" dataType="Boolean" />
          </table>
        </mappings>"#;

    #[test]
    fn loads_news_example() {
        let schema = load_str(NEWS).unwrap();
        assert_eq!(schema.namespace.as_deref(), Some("Blog"));
        assert_eq!(schema.assembly.as_deref(), Some("Blog.Data"));
        assert_eq!(schema.data_context.as_deref(), Some("Blog.BlogContext"));

        let table = &schema.tables[0];
        assert_eq!(table.name, "News");
        assert_eq!(table.document_type.as_deref(), Some("News"));
        assert_eq!(table.entity_type_full_name, "Blog.NewsItem");
        assert_eq!(table.entity_type_name(), "NewsItem");
        assert_eq!(table.entity_property_name, "News");
        assert_eq!(table.assembly.as_deref(), Some("Blog.Data"));
        assert!(table.auto_map_fields);

        let names: Vec<_> = table.field_mappings.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Id", "Title", "Published"]);
        assert!(table.field_mappings[0].key);
        assert_eq!(table.field_mappings[2].field_type, Some(DataType::Boolean));
    }

    #[test]
    fn table_overrides_document_defaults() {
        let xml = r#"
            <mappings assembly="Main" namespace="Root">
              <table name="Event" namespace="Calendar" assembly="Cal"
                     entityPropertyName="Events" autoMap="false" allowDelete="TRUE">
                <field name="Id" key="true" />
              </table>
            </mappings>"#;
        let table = load_str(xml).unwrap().tables.remove(0);
        assert_eq!(table.entity_type_full_name, "Calendar.Event");
        assert_eq!(table.assembly.as_deref(), Some("Cal"));
        assert_eq!(table.entity_property_name, "Events");
        assert!(!table.auto_map_fields);
        assert!(table.allow_delete);
        assert_eq!(table.document_type, None);
    }

    #[test]
    fn alias_defaults_to_name() {
        let xml = r#"
            <mappings namespace="N">
              <table name="T">
                <field name="Summary" alias="  " />
              </table>
            </mappings>"#;
        let schema = load_str(xml).unwrap();
        assert_eq!(schema.tables[0].field_mappings[0].alias, "Summary");
    }

    #[test]
    fn defaults_are_typed() {
        let xml = r#"
            <mappings namespace="N">
              <table name="T">
                <field name="Views" dataType="integer" defaultValue="10" />
                <field name="Featured" dataType="Boolean" defaultValue="false" />
                <field name="Author" dataType="String" defaultValue="staff" />
                <field name="Stamp" dataType="DateTimeStamp" defaultValue="now" />
              </table>
            </mappings>"#;
        let fields = load_str(xml).unwrap().tables.remove(0).field_mappings;
        assert_eq!(fields[0].default_value, Some(Value::Integer(10)));
        assert_eq!(fields[1].default_value, Some(Value::Bool(false)));
        assert_eq!(fields[2].default_value, Some(Value::text("staff")));
        assert_eq!(fields[3].default_value, Some(Value::text("now")));
    }

    #[test]
    fn missing_table_name_is_malformed() {
        let xml = r#"<mappings namespace="N"><table documentType="X" /></mappings>"#;
        let err = load_str(xml).unwrap_err();
        assert!(matches!(err, MappingError::MalformedMapping { .. }));
        assert!(err.to_string().contains("'name' is required"));
    }

    #[test]
    fn bad_default_is_value_coercion() {
        let xml = r#"
            <mappings namespace="N">
              <table name="T">
                <field name="Views" dataType="Integer" defaultValue="many" />
              </table>
            </mappings>"#;
        match load_str(xml).unwrap_err() {
            MappingError::ValueCoercion {
                field,
                literal,
                data_type,
            } => {
                assert_eq!(field, "Views");
                assert_eq!(literal, "many");
                assert_eq!(data_type, DataType::Integer);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn attribute_order_does_not_matter_for_defaults() {
        let xml = r#"
            <mappings namespace="N">
              <table name="T">
                <field defaultValue="5" name="Views" dataType="Integer" />
              </table>
            </mappings>"#;
        let schema = load_str(xml).unwrap();
        assert_eq!(
            schema.tables[0].field_mappings[0].default_value,
            Some(Value::Integer(5))
        );
    }

    #[test]
    fn invalid_boolean_attribute_is_malformed() {
        let xml = r#"
            <mappings namespace="N">
              <table name="T" autoMap="yes" />
            </mappings>"#;
        assert!(matches!(
            load_str(xml),
            Err(MappingError::MalformedMapping { .. })
        ));
    }

    #[test]
    fn unknown_data_type_is_malformed() {
        let xml = r#"
            <mappings namespace="N">
              <table name="T"><field name="Price" dataType="Money" /></table>
            </mappings>"#;
        assert!(matches!(
            load_str(xml),
            Err(MappingError::MalformedMapping { .. })
        ));
    }

    #[test]
    fn missing_namespace_is_malformed() {
        let xml = r#"<mappings><table name="T" /></mappings>"#;
        assert!(matches!(
            load_str(xml),
            Err(MappingError::MalformedMapping { .. })
        ));
    }

    #[test]
    fn wrong_root_is_malformed() {
        let xml = r#"<tables namespace="N"><table name="T" /></tables>"#;
        assert!(matches!(
            load_str(xml),
            Err(MappingError::MalformedMapping { .. })
        ));
    }

    #[test]
    fn broken_xml_is_reported() {
        assert!(matches!(
            load_str("<mappings><table name=\"T\">"),
            Err(MappingError::Xml(_))
        ));
    }

    #[test]
    fn empty_definition_is_valid() {
        let schema = load_str(r#"<mappings namespace="N" />"#).unwrap();
        assert!(schema.tables.is_empty());
    }

    #[test]
    fn loading_is_idempotent() {
        assert_eq!(load_str(NEWS).unwrap(), load_str(NEWS).unwrap());
    }
}
