//! Array validator
//!
//! Every item goes through the `values` field definition. Dotted paths
//! reach items by index (`tags.0`).

use serde_json::Value;

use crate::schema::{CompileResult, Field, ReferenceChecker, ValidationError, ValidationResult};

use super::Validator;

/// Validates arrays whose items all follow the same field definition.
#[derive(Debug, Clone, Default)]
pub struct ArrayValidator {
    /// Definition applied to every item
    pub values: Box<Field>,
    pub min_len: usize,
    /// 0 means unbounded
    pub max_len: usize,
}

impl ArrayValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Array whose items are checked by `validator`.
    pub fn of(validator: impl Into<Validator>) -> Self {
        Self::new().with_values(Field::new().with_validator(validator))
    }

    pub fn with_values(mut self, values: Field) -> Self {
        self.values = Box::new(values);
        self
    }

    pub fn with_min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub(crate) fn compile(&mut self, rc: &dyn ReferenceChecker) -> CompileResult<()> {
        self.values.compile(rc)
    }

    pub(crate) fn validate(&self, value: Value) -> ValidationResult<Value> {
        let items = match value {
            Value::Array(items) => items,
            _ => return Err(ValidationError::invalid("not an array")),
        };

        let items = if self.values.has_rules() {
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| {
                    self.values.validate_value(item).map_err(|e| {
                        ValidationError::invalid(format!("invalid value at #{}: {}", i + 1, e))
                    })
                })
                .collect::<ValidationResult<Vec<_>>>()?
        } else {
            items
        };

        if items.len() < self.min_len {
            return Err(ValidationError::invalid(format!(
                "has fewer items than {}",
                self.min_len
            )));
        }
        if self.max_len > 0 && items.len() > self.max_len {
            return Err(ValidationError::invalid(format!(
                "has more items than {}",
                self.max_len
            )));
        }

        Ok(Value::Array(items))
    }

    /// Accepts item indices (`"0"`, `"1"`, ...) optionally followed by a
    /// dotted sub-path.
    pub(crate) fn get_field(&self, name: &str) -> Option<&Field> {
        let (index, rest) = match name.split_once('.') {
            Some((index, rest)) => (index, Some(rest)),
            None => (name, None),
        };
        let index: usize = index.parse().ok()?;
        if self.max_len > 0 && index >= self.max_len {
            return None;
        }
        match rest {
            Some(rest) => self.values.get_sub_field(rest),
            None => Some(&self.values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{NoReferences, Schema};
    use crate::validators::{IntegerValidator, StringValidator};
    use serde_json::json;

    #[test]
    fn test_items_are_validated() {
        let v = ArrayValidator::of(IntegerValidator::new());
        assert_eq!(v.validate(json!([1, 2.0])), Ok(json!([1, 2])));
        assert_eq!(
            v.validate(json!([1, "b"])),
            Err(ValidationError::invalid("invalid value at #2: not an integer"))
        );
        assert_eq!(v.validate(json!({})), Err(ValidationError::invalid("not an array")));
    }

    #[test]
    fn test_untyped_items() {
        let v = ArrayValidator::new().with_max_len(2);
        assert_eq!(v.validate(json!([1, "a"])), Ok(json!([1, "a"])));
        assert_eq!(
            v.validate(json!([1, 2, 3])),
            Err(ValidationError::invalid("has more items than 2"))
        );

        let v = ArrayValidator::new().with_min_len(1);
        assert_eq!(
            v.validate(json!([])),
            Err(ValidationError::invalid("has fewer items than 1"))
        );
    }

    #[test]
    fn test_get_field_by_index() {
        let v = ArrayValidator::of(StringValidator::new()).with_max_len(2);
        assert!(v.get_field("0").is_some());
        assert!(v.get_field("1").is_some());
        assert!(v.get_field("2").is_none());
        assert!(v.get_field("foo").is_none());

        let unbounded = ArrayValidator::of(StringValidator::new());
        assert!(unbounded.get_field("100").is_some());
    }

    #[test]
    fn test_sub_schema_items() {
        let item = Schema::new().with_field(
            "name",
            Field::new().required().with_validator(StringValidator::new()),
        );
        let mut v = ArrayValidator::new().with_values(Field::new().with_schema(item));
        v.compile(&NoReferences).unwrap();

        assert!(v.get_field("0.name").is_some());
        assert!(v.validate(json!([{"name": "a"}])).is_ok());
        assert_eq!(
            v.validate(json!([{"name": "a"}, {}])),
            Err(ValidationError::invalid("invalid value at #2: name is [required]"))
        );
    }
}
