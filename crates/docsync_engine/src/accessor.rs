//! Type-coerced property access on entities.
//!
//! Coercion precedence when assigning:
//!
//! 1. Boolean targets are true for `"1"` or any-case `"true"`, false for
//!    everything else.
//! 2. Nullable targets coerce to their inner type.
//! 3. Everything else uses standard parsing; failure is a
//!    [`SyncError::TypeCoercion`] for that one assignment.
//!
//! Null is never assigned.

use crate::entity::{Entity, PropertyInfo, PropertyKind, PropertyType};
use crate::error::{SyncError, SyncResult};
use docsync_mapping::{parse_datetime, Value};

/// Looks a property up by name, ignoring case.
pub fn find_property<'e>(entity: &'e dyn Entity, name: &str) -> Option<&'e PropertyInfo> {
    entity.properties().iter().find(|p| p.matches(name))
}

/// Reads a property by name, ignoring case.
pub fn get(entity: &dyn Entity, name: &str) -> Option<Value> {
    let property = find_property(entity, name)?;
    entity.get(&property.name)
}

/// Writes a property by name, ignoring case.
pub fn set(entity: &mut dyn Entity, name: &str, value: &Value) -> SyncResult<()> {
    let property = find_property(entity, name)
        .cloned()
        .ok_or_else(|| SyncError::property_not_found(entity.type_name(), name))?;
    assign(entity, &property, value)
}

/// Writes a property that has already been resolved against the entity's
/// property table.
pub fn assign(entity: &mut dyn Entity, property: &PropertyInfo, value: &Value) -> SyncResult<()> {
    if value.is_null() {
        return Ok(());
    }

    let coerced = coerce(value, property.ty, &property.name)?;
    if entity.put(&property.name, coerced) {
        Ok(())
    } else {
        Err(SyncError::invariant(format!(
            "{} rejected a {} value for its declared property '{}'",
            entity.type_name(),
            property.ty,
            property.name
        )))
    }
}

/// Converts a value to the given property type.
pub fn coerce(value: &Value, ty: PropertyType, property: &str) -> SyncResult<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let fail = || SyncError::type_coercion(property, value.to_string(), ty.kind.name());

    match ty.kind {
        PropertyKind::Boolean => {
            let text = value.to_string();
            Ok(Value::Bool(text == "1" || text.eq_ignore_ascii_case("true")))
        }
        PropertyKind::Text => Ok(Value::Text(value.to_string())),
        PropertyKind::Integer => match value {
            Value::Integer(n) => Ok(Value::Integer(*n)),
            Value::Bool(b) => Ok(Value::Integer(i64::from(*b))),
            Value::Text(s) => s.trim().parse().map(Value::Integer).map_err(|_| fail()),
            _ => Err(fail()),
        },
        PropertyKind::DateTime => match value {
            Value::DateTime(dt) => Ok(Value::DateTime(*dt)),
            Value::Text(s) => parse_datetime(s).map(Value::DateTime).ok_or_else(fail),
            _ => Err(fail()),
        },
        PropertyKind::Other => Err(fail()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::DynamicEntity;
    use chrono::NaiveDate;

    fn event() -> DynamicEntity {
        DynamicEntity::new(
            "Calendar.Event",
            [
                PropertyInfo::new("Id", PropertyType::INTEGER),
                PropertyInfo::new("Title", PropertyType::TEXT),
                PropertyInfo::new("Published", PropertyType::BOOLEAN),
                PropertyInfo::new("Capacity", PropertyType::INTEGER.nullable()),
                PropertyInfo::new("StartsAt", PropertyType::DATETIME),
                PropertyInfo::new("Venue", PropertyType::OTHER),
            ],
        )
    }

    #[test]
    fn names_are_case_insensitive() {
        let mut entity = event();
        set(&mut entity, "title", &Value::text("Launch")).unwrap();
        assert_eq!(get(&entity, "TITLE"), Some(Value::text("Launch")));
        assert_eq!(get(&entity, "nothing"), None);
    }

    #[test]
    fn boolean_rule() {
        let mut entity = event();
        for (raw, expected) in [
            (Value::text("1"), true),
            (Value::text("TRUE"), true),
            (Value::Bool(true), true),
            (Value::text("0"), false),
            (Value::text("yes"), false),
            (Value::Integer(1), true),
            (Value::Integer(2), false),
        ] {
            set(&mut entity, "Published", &raw).unwrap();
            assert_eq!(
                entity.value("Published"),
                Some(&Value::Bool(expected)),
                "raw value {raw:?}"
            );
        }
    }

    #[test]
    fn nullable_unwraps_to_inner_type() {
        let mut entity = event();
        set(&mut entity, "Capacity", &Value::text(" 120 ")).unwrap();
        assert_eq!(entity.value("Capacity"), Some(&Value::Integer(120)));
    }

    #[test]
    fn standard_parsing() {
        let mut entity = event();
        set(&mut entity, "Id", &Value::Bool(true)).unwrap();
        assert_eq!(entity.value("Id"), Some(&Value::Integer(1)));

        set(&mut entity, "Title", &Value::Integer(42)).unwrap();
        assert_eq!(entity.value("Title"), Some(&Value::text("42")));

        set(&mut entity, "StartsAt", &Value::text("2024-06-01 18:00:00")).unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap();
        assert_eq!(entity.value("StartsAt"), Some(&Value::DateTime(expected)));
    }

    #[test]
    fn coercion_failures() {
        let mut entity = event();
        let err = set(&mut entity, "Capacity", &Value::text("plenty")).unwrap_err();
        assert!(matches!(err, SyncError::TypeCoercion { .. }));
        assert!(err.is_recoverable());
        assert_eq!(entity.value("Capacity"), Some(&Value::Null));

        assert!(set(&mut entity, "StartsAt", &Value::Integer(5)).is_err());
        assert!(set(&mut entity, "Venue", &Value::text("Hall A")).is_err());
    }

    #[test]
    fn missing_property() {
        let mut entity = event();
        let err = set(&mut entity, "Body", &Value::text("x")).unwrap_err();
        assert!(matches!(err, SyncError::PropertyNotFound { .. }));
    }

    #[test]
    fn null_is_never_assigned() {
        let mut entity = event();
        set(&mut entity, "Title", &Value::text("Kept")).unwrap();
        set(&mut entity, "Title", &Value::Null).unwrap();
        assert_eq!(entity.value("Title"), Some(&Value::text("Kept")));
    }

    #[test]
    fn assignment_is_immediately_visible() {
        let mut entity = event();
        set(&mut entity, "Title", &Value::text("First")).unwrap();
        assert_eq!(get(&entity, "Title"), Some(Value::text("First")));
        set(&mut entity, "Title", &Value::text("Second")).unwrap();
        assert_eq!(get(&entity, "Title"), Some(Value::text("Second")));
    }
}
