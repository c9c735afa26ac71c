//! Document pipeline: prepare, validate and serialize
//!
//! A write goes through two steps:
//! - `prepare` splits the client payload into `changes` (what the client
//!   asks to modify) and `base` (what is inherited: stored values, hook
//!   outputs, defaults)
//! - `validate` merges `changes` onto `base` and checks the result
//!
//! Keeping the two apart lets `validate` reject client writes to read-only
//! fields while accepting the same fields when they come from hooks.
//!
//! A `null` value means the field is unset: it is removed by the merge and
//! never reaches a validator.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::query::values_equal;

use super::compiler::CompiledSchema;
use super::errors::{ErrorMap, FieldIssue, ValidationError, ROOT_KEY};
use super::field::Document;
use super::types::Schema;

impl Schema {
    /// Splits a client payload into `(changes, base)`.
    ///
    /// - `original` is the stored document for updates, `None` on create
    /// - `replace` means the payload is the whole new document, so stored
    ///   fields missing from it are dropped unless hidden or read-only
    pub fn prepare(
        &self,
        payload: &Document,
        original: Option<&Document>,
        replace: bool,
    ) -> (Document, Document) {
        let mut changes = Document::new();
        let mut base = Document::new();

        match original {
            None => changes = payload.clone(),
            Some(original) => {
                base = original.clone();
                for (name, value) in payload {
                    let unchanged = original
                        .get(name)
                        .map_or(false, |stored| values_equal(stored, value));
                    if replace || !unchanged {
                        changes.insert(name.clone(), value.clone());
                    }
                }
                if replace {
                    base.retain(|name, _| {
                        payload.contains_key(name)
                            || self
                                .fields
                                .get(name)
                                .map_or(false, |f| f.hidden || f.read_only)
                    });
                }
            }
        }

        for (name, field) in self.sorted_fields() {
            let stored = original.and_then(|o| o.get(name));

            if let Some(sub) = &field.schema {
                if let Some(Value::Object(sub_payload)) = changes.get(name) {
                    let (sub_changes, sub_base) =
                        sub.prepare(sub_payload, stored.and_then(Value::as_object), replace);
                    changes.insert(name.clone(), Value::Object(sub_changes));
                    base.insert(name.clone(), Value::Object(sub_base));
                }
            }

            if field.read_only {
                let same = match (changes.get(name), stored) {
                    (Some(value), Some(stored)) => values_equal(value, stored),
                    _ => false,
                };
                if same {
                    if let Some(value) = changes.remove(name) {
                        base.insert(name.clone(), value);
                    }
                }
            }

            let hook = match original {
                None => field.on_init.as_ref(),
                Some(_) => field.on_update.as_ref(),
            };
            if let Some(hook) = hook {
                let current = changes.get(name).or_else(|| base.get(name));
                if let Some(value) = hook(current) {
                    let client_mutation = field.read_only && changes.contains_key(name);
                    if !client_mutation {
                        changes.remove(name);
                    }
                    base.insert(name.clone(), value);
                }
            }

            if let Some(default) = &field.default {
                if !changes.contains_key(name) && base.get(name).map_or(true, Value::is_null) {
                    base.insert(name.clone(), default.clone());
                }
            }
        }

        (changes, base)
    }

    /// Merges `changes` onto `base` and validates the result.
    ///
    /// All errors are collected; the document is returned only if there are
    /// none.
    ///
    /// Stored keys the schema does not declare are carried over unchecked;
    /// only undeclared keys sent by the client are rejected.
    pub fn validate(
        &self,
        changes: &Document,
        base: &Document,
    ) -> std::result::Result<Document, ErrorMap> {
        let mut errs = ErrorMap::new();
        let doc = self.validate_level(changes, base, BaseKeys::PassThrough, &mut errs);
        errs.merge(self.dependency_errors(changes, &doc, ""));

        if errs.is_empty() {
            Ok(doc)
        } else {
            Err(errs)
        }
    }

    /// Validates a whole embedded sub-document held as a field value.
    ///
    /// Unlike `validate`, undeclared keys are always "invalid field".
    pub(crate) fn validate_embedded(
        &self,
        doc: &Document,
    ) -> std::result::Result<Document, ErrorMap> {
        let mut errs = ErrorMap::new();
        let out = self.validate_level(&Document::new(), doc, BaseKeys::Strict, &mut errs);
        if errs.is_empty() {
            Ok(out)
        } else {
            Err(errs)
        }
    }

    fn validate_level(
        &self,
        changes: &Document,
        base: &Document,
        base_keys: BaseKeys,
        errs: &mut ErrorMap,
    ) -> Document {
        for name in changes.keys() {
            match self.fields.get(name) {
                None => errs.add(name.as_str(), "invalid field"),
                Some(field) if field.read_only => errs.add(name.as_str(), "read-only"),
                Some(_) => {}
            }
        }
        let mut extra = Document::new();
        for (name, value) in base {
            if self.fields.contains_key(name) || changes.contains_key(name) {
                continue;
            }
            match base_keys {
                BaseKeys::Strict => errs.add(name.as_str(), "invalid field"),
                BaseKeys::PassThrough => {
                    extra.insert(name.clone(), value.clone());
                }
            }
        }

        let mut doc = Document::new();
        for (name, field) in self.sorted_fields() {
            let change = changes.get(name);
            let stored = base.get(name);

            if let Some(sub) = &field.schema {
                match validate_sub_document(sub, change, stored) {
                    Ok(Some(sub_doc)) => {
                        doc.insert(name.clone(), Value::Object(sub_doc));
                    }
                    Ok(None) => {}
                    Err(issue) => errs.add(name.as_str(), issue),
                }
            } else if let Some(value) = change.or(stored).filter(|v| !v.is_null()) {
                match field.validate_value(value.clone()) {
                    Ok(value) => {
                        doc.insert(name.clone(), value);
                    }
                    Err(e) => errs.add(name.as_str(), e),
                }
            }

            if field.required && !doc.contains_key(name.as_str()) && !errs.contains(name) {
                errs.add(name.as_str(), "required");
            }
        }

        if doc.len() < self.min_len {
            errs.add(ROOT_KEY, format!("has fewer fields than {}", self.min_len));
        }
        if self.max_len > 0 && doc.len() > self.max_len {
            errs.add(ROOT_KEY, format!("has more fields than {}", self.max_len));
        }

        doc.extend(extra);
        doc
    }

    /// Checks the dependency of every changed field against the merged root
    /// document.
    fn dependency_errors(&self, changes: &Document, doc: &Document, prefix: &str) -> ErrorMap {
        let mut errs = ErrorMap::new();
        for (name, value) in changes {
            let path = format!("{}{}", prefix, name);
            let field = match self.get_field(&path) {
                Some(field) => field,
                None => continue,
            };
            if let Some(dep) = &field.dependency {
                if !dep.matches(doc) {
                    errs.add(
                        name.as_str(),
                        format!("does not match dependency: {}", dep.source()),
                    );
                }
            }
            if let (Value::Object(sub_changes), Some(_)) = (value, &field.schema) {
                let sub_errs = self.dependency_errors(sub_changes, doc, &format!("{}.", path));
                if !sub_errs.is_empty() {
                    errs.add(name.as_str(), FieldIssue::Nested(sub_errs));
                }
            }
        }
        errs
    }

    /// Converts a stored document into its representation form.
    ///
    /// Hidden fields are dropped and each validator's `serialize` applied.
    pub fn serialize(&self, doc: &Document) -> std::result::Result<Document, ErrorMap> {
        let mut errs = ErrorMap::new();
        let mut out = Document::new();

        for (name, value) in doc {
            let field = match self.fields.get(name) {
                Some(field) => field,
                None => {
                    out.insert(name.clone(), value.clone());
                    continue;
                }
            };
            if field.hidden {
                continue;
            }

            let serialized = match (&field.schema, &field.validator, value) {
                (Some(sub), _, Value::Object(sub_doc)) => sub
                    .serialize(sub_doc)
                    .map(Value::Object)
                    .map_err(ValidationError::Fields),
                (None, Some(validator), _) => validator.serialize(value.clone()),
                _ => Ok(value.clone()),
            };
            match serialized {
                Ok(value) => {
                    out.insert(name.clone(), value);
                }
                Err(e) => errs.add(name.as_str(), e),
            }
        }

        if errs.is_empty() {
            Ok(out)
        } else {
            Err(errs)
        }
    }
}

/// How `validate_level` treats inherited keys the schema does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BaseKeys {
    /// Reported as "invalid field".
    Strict,
    /// Copied into the result unchecked. Field-count bounds ignore them.
    PassThrough,
}

/// Validates a sub-document from its change and stored parts.
///
/// Returns `Ok(None)` when the field is unset.
fn validate_sub_document(
    sub: &Schema,
    change: Option<&Value>,
    stored: Option<&Value>,
) -> std::result::Result<Option<Document>, FieldIssue> {
    let empty = Document::new();
    let (sub_changes, sub_base) = match (change, stored) {
        (Some(Value::Null), _) | (None, None) | (None, Some(Value::Null)) => return Ok(None),
        (Some(Value::Object(c)), Some(Value::Object(b))) => (c, b),
        (Some(Value::Object(c)), _) => (c, &empty),
        (None, Some(Value::Object(b))) => (&empty, b),
        _ => return Err(FieldIssue::from("not a dict")),
    };

    let mut errs = ErrorMap::new();
    let doc = sub.validate_level(sub_changes, sub_base, BaseKeys::Strict, &mut errs);
    if errs.is_empty() {
        Ok(Some(doc))
    } else {
        Err(FieldIssue::Nested(errs))
    }
}

impl CompiledSchema {
    /// Runs `prepare` then `validate` on a client payload.
    pub fn admit(
        &self,
        payload: &Document,
        original: Option<&Document>,
        replace: bool,
    ) -> Result<Document> {
        let (changes, base) = self.prepare(payload, original, replace);
        self.validate(&changes, &base).map_err(Error::Document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, NoReferences};
    use crate::validators::{IntegerValidator, StringValidator};
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn users() -> Schema {
        Schema::new()
            .with_field(
                "id",
                Field::new()
                    .required()
                    .read_only()
                    .with_validator(StringValidator::new())
                    .on_init(|v| Some(v.cloned().unwrap_or_else(|| json!("generated")))),
            )
            .with_field(
                "name",
                Field::new().required().with_validator(StringValidator::new()),
            )
            .with_field(
                "age",
                Field::new().with_validator(IntegerValidator::new()),
            )
            .with_field(
                "status",
                Field::new()
                    .with_validator(StringValidator::new())
                    .with_default(json!("active")),
            )
            .with_field(
                "secret",
                Field::new().hidden().with_validator(StringValidator::new()),
            )
    }

    #[test]
    fn test_create_applies_hooks_and_defaults() {
        let s = users();
        let payload = doc(json!({"name": "ann", "age": 30}));
        let (changes, base) = s.prepare(&payload, None, false);

        assert_eq!(changes, payload);
        assert_eq!(base, doc(json!({"id": "generated", "status": "active"})));

        let out = s.validate(&changes, &base).unwrap();
        assert_eq!(
            out,
            doc(json!({"id": "generated", "name": "ann", "age": 30, "status": "active"}))
        );
    }

    #[test]
    fn test_required_and_unknown() {
        let s = users();
        let (changes, base) = s.prepare(&doc(json!({"foo": 1})), None, false);
        let errs = s.validate(&changes, &base).unwrap_err();
        assert!(errs.has_message("name", "required"));
        assert!(errs.has_message("foo", "invalid field"));
        assert!(!errs.contains("id"));
    }

    #[test]
    fn test_read_only_client_write() {
        let s = users();
        let original = doc(json!({"id": "a", "name": "ann"}));

        let payload = doc(json!({"id": "a", "name": "bob"}));
        let (changes, base) = s.prepare(&payload, Some(&original), false);
        assert!(!changes.contains_key("id"));
        assert!(s.validate(&changes, &base).is_ok());

        let (changes, base) = s.prepare(&doc(json!({"id": "b"})), Some(&original), false);
        let errs = s.validate(&changes, &base).unwrap_err();
        assert!(errs.has_message("id", "read-only"));
    }

    #[test]
    fn test_update_keeps_stored_fields() {
        let s = users();
        let original = doc(json!({"id": "a", "name": "ann", "age": 30, "status": "active"}));
        let (changes, base) = s.prepare(&doc(json!({"age": 31})), Some(&original), false);
        assert_eq!(changes, doc(json!({"age": 31})));

        let out = s.validate(&changes, &base).unwrap();
        assert_eq!(out.get("name"), Some(&json!("ann")));
        assert_eq!(out.get("age"), Some(&json!(31)));
    }

    #[test]
    fn test_update_carries_undeclared_stored_fields() {
        let s = users();
        let original = doc(json!({"id": "a", "name": "ann", "age": 1, "legacy": "x"}));
        let (changes, base) = s.prepare(&doc(json!({"age": 2})), Some(&original), false);

        let out = s.validate(&changes, &base).unwrap();
        assert_eq!(out.get("age"), Some(&json!(2)));
        assert_eq!(out.get("legacy"), Some(&json!("x")));

        let (changes, base) = s.prepare(&doc(json!({"legacy": "y"})), Some(&original), false);
        let errs = s.validate(&changes, &base).unwrap_err();
        assert!(errs.has_message("legacy", "invalid field"));
    }

    #[test]
    fn test_sub_document_rejects_undeclared_stored_fields() {
        let s = Schema::new().with_field(
            "address",
            Field::new().with_schema(Schema::new().with_field(
                "city",
                Field::new().with_validator(StringValidator::new()),
            )),
        );
        let base = doc(json!({"address": {"city": "Lyon", "zip": 1}}));
        let errs = s.validate(&Document::new(), &base).unwrap_err();
        assert!(errs.contains("address"));
    }

    #[test]
    fn test_replace_drops_missing_fields() {
        let s = users();
        let original =
            doc(json!({"id": "a", "name": "ann", "age": 30, "secret": "x", "status": "off"}));
        let (changes, base) = s.prepare(&doc(json!({"name": "bob"})), Some(&original), true);
        let out = s.validate(&changes, &base).unwrap();

        assert_eq!(out, doc(json!({"id": "a", "name": "bob", "secret": "x", "status": "active"})));
    }

    #[test]
    fn test_null_change_removes_field() {
        let s = users();
        let original = doc(json!({"id": "a", "name": "ann", "age": 30}));
        let (changes, base) = s.prepare(&doc(json!({"age": null})), Some(&original), false);
        let out = s.validate(&changes, &base).unwrap();
        assert!(!out.contains_key("age"));

        let (changes, base) = s.prepare(&doc(json!({"name": null})), Some(&original), false);
        let errs = s.validate(&changes, &base).unwrap_err();
        assert!(errs.has_message("name", "required"));
    }

    #[test]
    fn test_field_count_bounds() {
        let s = Schema::new()
            .with_field("a", Field::new().with_validator(IntegerValidator::new()))
            .with_field("b", Field::new().with_validator(IntegerValidator::new()))
            .with_min_len(1)
            .with_max_len(1);

        let errs = s.validate(&Document::new(), &Document::new()).unwrap_err();
        assert!(errs.has_message(ROOT_KEY, "has fewer fields than 1"));

        let errs = s.validate(&doc(json!({"a": 1, "b": 2})), &Document::new()).unwrap_err();
        assert!(errs.has_message(ROOT_KEY, "has more fields than 1"));
    }

    #[test]
    fn test_sub_schema_errors_are_nested() {
        let s = Schema::new().with_field(
            "address",
            Field::new().with_schema(
                Schema::new()
                    .with_field(
                        "city",
                        Field::new().required().with_validator(StringValidator::new()),
                    )
                    .with_field("zip", Field::new().with_validator(IntegerValidator::new())),
            ),
        );
        let errs = s
            .validate(&doc(json!({"address": {"zip": "x"}})), &Document::new())
            .unwrap_err();
        assert_eq!(errs.to_string(), "address is [{city is [required], zip is [not an integer]}]");

        let errs = s
            .validate(&doc(json!({"address": "x"})), &Document::new())
            .unwrap_err();
        assert!(errs.has_message("address", "not a dict"));
    }

    #[test]
    fn test_sub_document_update_merges_stored_sub_fields() {
        let s = Schema::new().with_field(
            "address",
            Field::new().with_schema(
                Schema::new()
                    .with_field(
                        "city",
                        Field::new().required().with_validator(StringValidator::new()),
                    )
                    .with_field("zip", Field::new().with_validator(IntegerValidator::new())),
            ),
        );
        let original = doc(json!({"address": {"city": "Paris", "zip": 75000}}));
        let payload = doc(json!({"address": {"zip": 75001}}));
        let (changes, base) = s.prepare(&payload, Some(&original), false);
        let out = s.validate(&changes, &base).unwrap();
        assert_eq!(out, doc(json!({"address": {"city": "Paris", "zip": 75001}})));
    }

    #[test]
    fn test_dependency() {
        let s = Schema::new()
            .with_field(
                "kind",
                Field::new().filterable().with_validator(StringValidator::new()),
            )
            .with_field(
                "detail",
                Field::new()
                    .with_validator(StringValidator::new())
                    .with_dependency(r#"{"kind": "extended"}"#),
            )
            .into_compiled(&NoReferences)
            .unwrap();

        assert!(s
            .admit(&doc(json!({"kind": "extended", "detail": "x"})), None, false)
            .is_ok());

        let err = s
            .admit(&doc(json!({"kind": "basic", "detail": "x"})), None, false)
            .unwrap_err();
        match err {
            Error::Document(errs) => assert!(errs.has_message(
                "detail",
                r#"does not match dependency: {"kind": "extended"}"#
            )),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_serialize_hides_fields() {
        let s = users();
        let stored = doc(json!({"id": "a", "name": "ann", "secret": "x", "extra": 1}));
        let out = s.serialize(&stored).unwrap();
        assert_eq!(out, doc(json!({"id": "a", "name": "ann", "extra": 1})));
    }
}
