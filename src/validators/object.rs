//! Object validator
//!
//! Embeds a whole schema; errors from the sub-document come back nested
//! under the field that holds it.

use serde_json::Value;

use crate::schema::{
    CompileError, CompileResult, Field, ReferenceChecker, Schema, ValidationError,
    ValidationResult,
};

/// Validates a sub-document against an embedded schema.
#[derive(Debug, Clone, Default)]
pub struct ObjectValidator {
    pub schema: Option<Box<Schema>>,
}

impl ObjectValidator {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema: Some(Box::new(schema)),
        }
    }

    /// Compiles the embedded schema, dependencies included.
    pub(crate) fn compile(&mut self, rc: &dyn ReferenceChecker) -> CompileResult<()> {
        match self.schema.as_mut() {
            Some(schema) => schema.compile(rc),
            None => Err(CompileError::MissingSchema),
        }
    }

    pub(crate) fn validate(&self, value: Value) -> ValidationResult<Value> {
        let dict = match value {
            Value::Object(dict) => dict,
            _ => return Err(ValidationError::invalid("not a dict")),
        };
        let schema = self
            .schema
            .as_ref()
            .ok_or_else(|| ValidationError::invalid("no schema defined for object"))?;

        schema
            .validate_embedded(&dict)
            .map(Value::Object)
            .map_err(ValidationError::Fields)
    }

    pub(crate) fn get_field(&self, name: &str) -> Option<&Field> {
        self.schema.as_ref()?.get_field(name)
    }
}
