//! Common field hooks and field definitions

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::validators::{format_time, StringValidator, TimeValidator};

use super::field::{Field, FieldHook};

/// Sets the field to the current time.
pub fn now() -> FieldHook {
    Arc::new(|_| Some(format_time(Utc::now())))
}

/// Generates a random id unless the field already has one.
pub fn new_id() -> FieldHook {
    Arc::new(|current| match current {
        Some(value) if !value.is_null() => None,
        _ => Some(Value::String(Uuid::new_v4().simple().to_string())),
    })
}

/// Read-only id, generated on create.
pub fn id_field() -> Field {
    Field::new()
        .with_description("The document's id")
        .required()
        .read_only()
        .filterable()
        .sortable()
        .with_on_init(new_id())
        .with_validator(StringValidator::new().with_regexp("^[0-9a-f]{32}$"))
}

/// Read-only creation time, set on create.
pub fn created_field() -> Field {
    Field::new()
        .with_description("The time at which the document was created")
        .required()
        .read_only()
        .filterable()
        .sortable()
        .with_on_init(now())
        .with_validator(TimeValidator::new())
}

/// Read-only modification time, set on create and on every update.
pub fn updated_field() -> Field {
    Field::new()
        .with_description("The time of the last modification")
        .required()
        .read_only()
        .filterable()
        .sortable()
        .with_on_init(now())
        .with_on_update(now())
        .with_validator(TimeValidator::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Document, NoReferences, Schema};
    use crate::validators::parse_time;
    use serde_json::json;

    #[test]
    fn test_new_id_keeps_existing() {
        let hook = new_id();
        assert_eq!(hook(Some(&json!("abc"))), None);
        let id = hook(None).unwrap();
        assert_eq!(id.as_str().map(str::len), Some(32));
        assert_ne!(hook(None), Some(id));
    }

    #[test]
    fn test_now_is_native_time() {
        let value = now()(None).unwrap();
        assert!(value.as_str().and_then(parse_time).is_some());
    }

    #[test]
    fn test_standard_fields_in_pipeline() {
        let s = Schema::new()
            .with_field("id", id_field())
            .with_field("created", created_field())
            .with_field("updated", updated_field())
            .into_compiled(&NoReferences)
            .unwrap();

        let created = s.admit(&Document::new(), None, false).unwrap();
        assert!(created.contains_key("id"));
        assert!(created.contains_key("created"));

        let updated = s.admit(&Document::new(), Some(&created), false).unwrap();
        assert_eq!(updated.get("id"), created.get("id"));
        assert_eq!(updated.get("created"), created.get("created"));
        assert!(updated.contains_key("updated"));

        let mut forged = Document::new();
        forged.insert("id".into(), json!("0123456789abcdef0123456789abcdef"));
        assert!(s.admit(&forged, Some(&created), false).is_err());
    }
}
