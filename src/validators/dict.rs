//! Dict validator for free-form key/value objects

use serde_json::{Map, Value};

use crate::schema::{CompileResult, Field, ReferenceChecker, ValidationError, ValidationResult};

use super::Validator;

/// Validates free-form objects: arbitrary keys, uniform values.
#[derive(Debug, Clone, Default)]
pub struct DictValidator {
    /// Validator applied to each key (as a string value)
    pub keys: Option<Box<Validator>>,
    /// Definition applied to each value
    pub values: Box<Field>,
    pub min_len: usize,
    pub max_len: usize,
}

impl DictValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys(mut self, keys: impl Into<Validator>) -> Self {
        self.keys = Some(Box::new(keys.into()));
        self
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
        if let Some(keys) = self.keys.as_mut() {
            keys.compile(rc)?;
        }
        self.values.compile(rc)
    }

    pub(crate) fn validate(&self, value: Value) -> ValidationResult<Value> {
        let dict = match value {
            Value::Object(dict) => dict,
            _ => return Err(ValidationError::invalid("not a dict")),
        };

        let mut out = Map::with_capacity(dict.len());
        for (key, value) in dict {
            let key = match &self.keys {
                Some(keys) => match keys.validate(Value::String(key.clone())) {
                    Ok(Value::String(k)) => k,
                    Ok(_) => {
                        return Err(ValidationError::invalid(
                            "key validator does not return string",
                        ))
                    }
                    Err(e) => {
                        return Err(ValidationError::invalid(format!(
                            "invalid key `{}': {}",
                            key, e
                        )))
                    }
                },
                None => key,
            };

            let value = if self.values.has_rules() {
                self.values.validate_value(value).map_err(|e| {
                    ValidationError::invalid(format!("invalid value for key `{}': {}", key, e))
                })?
            } else {
                value
            };
            out.insert(key, value);
        }

        if out.len() < self.min_len {
            return Err(ValidationError::invalid(format!(
                "has fewer properties than {}",
                self.min_len
            )));
        }
        if self.max_len > 0 && out.len() > self.max_len {
            return Err(ValidationError::invalid(format!(
                "has more properties than {}",
                self.max_len
            )));
        }

        Ok(Value::Object(out))
    }

    /// Any key accepted by the key validator maps to the value definition.
    pub(crate) fn get_field(&self, name: &str) -> Option<&Field> {
        let (key, rest) = match name.split_once('.') {
            Some((key, rest)) => (key, Some(rest)),
            None => (name, None),
        };
        if let Some(keys) = &self.keys {
            keys.validate(Value::String(key.to_string())).ok()?;
        }
        match rest {
            Some(rest) => self.values.get_sub_field(rest),
            None => Some(&self.values),
        }
    }
}
