//! Field definitions

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::query::Query;
use crate::validators::Validator;

use super::errors::{CompileResult, ErrorMap, ValidationError, ValidationResult};
use super::compiler::ReferenceChecker;
use super::types::Schema;

/// A JSON document.
pub type Document = Map<String, Value>;

/// Field definitions of a schema, keyed by field name.
pub type Fields = HashMap<String, Field>;

/// Value transform run on create (`on_init`) or update (`on_update`).
///
/// Receives the current value of the field, if any. Returning `None` leaves
/// the field untouched.
pub type FieldHook = Arc<dyn Fn(Option<&Value>) -> Option<Value> + Send + Sync>;

/// Transforms a field value according to validated parameters.
pub type ParamHandler = Arc<dyn Fn(&Value, &Document) -> ValidationResult<Value> + Send + Sync>;

/// Named parameters a field accepts when it is read, such as
/// `?fields=name(len:10)`, and the handler applying them.
#[derive(Clone, Default)]
pub struct Params {
    validators: HashMap<String, Validator>,
    handler: Option<ParamHandler>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, name: impl Into<String>, validator: impl Into<Validator>) -> Self {
        self.validators.insert(name.into(), validator.into());
        self
    }

    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Value, &Document) -> ValidationResult<Value> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub(crate) fn compile(&mut self, rc: &dyn ReferenceChecker) -> CompileResult<()> {
        for validator in self.validators.values_mut() {
            validator.compile(rc)?;
        }
        Ok(())
    }

    /// Validates parameter values; unknown parameters are rejected.
    pub fn validate(&self, params: &Document) -> Result<Document, ErrorMap> {
        let mut errs = ErrorMap::new();
        let mut out = Document::new();
        for (name, value) in params {
            match self.validators.get(name) {
                None => errs.add(name.as_str(), "unknown parameter"),
                Some(v) => match v.validate(value.clone()) {
                    Ok(value) => {
                        out.insert(name.clone(), value);
                    }
                    Err(e) => errs.add(name.as_str(), e),
                },
            }
        }
        if errs.is_empty() {
            Ok(out)
        } else {
            Err(errs)
        }
    }

    /// Validates `params` then runs the handler on `value`.
    pub fn apply(&self, value: &Value, params: &Document) -> ValidationResult<Value> {
        let params = self.validate(params).map_err(ValidationError::Fields)?;
        match &self.handler {
            Some(handler) => handler(value, &params),
            None => Ok(value.clone()),
        }
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Params")
            .field("validators", &self.validators)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// Query gating changes to a field.
///
/// A changed field whose dependency does not match the resulting document is
/// rejected. The query is parsed against the root schema at compile time.
#[derive(Debug, Clone)]
pub struct Dependency {
    source: String,
    query: Option<Query>,
}

impl Dependency {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            query: None,
        }
    }

    /// The query as written in the schema.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_compiled(&self) -> bool {
        self.query.is_some()
    }

    pub(crate) fn set_query(&mut self, query: Query) {
        self.query = Some(query);
    }

    /// An uncompiled dependency never matches.
    pub fn matches(&self, doc: &Document) -> bool {
        self.query.as_ref().map_or(false, |q| q.matches(doc))
    }
}

/// Definition of a single document field.
#[derive(Clone, Default)]
pub struct Field {
    pub description: String,
    pub required: bool,
    /// Set by hooks or defaults only; client changes are rejected
    pub read_only: bool,
    /// Never returned by `serialize`
    pub hidden: bool,
    pub default: Option<Value>,
    pub on_init: Option<FieldHook>,
    pub on_update: Option<FieldHook>,
    pub params: Option<Params>,
    pub filterable: bool,
    pub sortable: bool,
    pub validator: Option<Validator>,
    /// Sub-document definition; takes precedence over `validator`
    pub schema: Option<Schema>,
    pub dependency: Option<Dependency>,
}

impl Field {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_validator(mut self, validator: impl Into<Validator>) -> Self {
        self.validator = Some(validator.into());
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_dependency(mut self, query: impl Into<String>) -> Self {
        self.dependency = Some(Dependency::new(query));
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    pub fn on_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(Option<&Value>) -> Option<Value> + Send + Sync + 'static,
    {
        self.on_init = Some(Arc::new(hook));
        self
    }

    pub fn on_update<F>(mut self, hook: F) -> Self
    where
        F: Fn(Option<&Value>) -> Option<Value> + Send + Sync + 'static,
    {
        self.on_update = Some(Arc::new(hook));
        self
    }

    pub fn with_on_init(mut self, hook: FieldHook) -> Self {
        self.on_init = Some(hook);
        self
    }

    pub fn with_on_update(mut self, hook: FieldHook) -> Self {
        self.on_update = Some(hook);
        self
    }

    /// True if the field carries a validator or a sub-schema.
    pub fn has_rules(&self) -> bool {
        self.validator.is_some() || self.schema.is_some()
    }

    pub(crate) fn compile(&mut self, rc: &dyn ReferenceChecker) -> CompileResult<()> {
        if let Some(schema) = self.schema.as_mut() {
            schema.compile_fields(rc)?;
        } else if let Some(validator) = self.validator.as_mut() {
            validator.compile(rc)?;
        }
        if let Some(params) = self.params.as_mut() {
            params.compile(rc)?;
        }
        Ok(())
    }

    /// Validates a single value against this definition.
    pub fn validate_value(&self, value: Value) -> ValidationResult<Value> {
        if let Some(schema) = &self.schema {
            let dict = match value {
                Value::Object(dict) => dict,
                _ => return Err(ValidationError::invalid("not a dict")),
            };
            return schema
                .validate_embedded(&dict)
                .map(Value::Object)
                .map_err(ValidationError::Fields);
        }
        match &self.validator {
            Some(validator) => validator.validate(value),
            None => Err(ValidationError::invalid(
                "at least one of validator or schema should be set",
            )),
        }
    }

    /// Checks a value compared against this field in a query.
    pub fn validate_query_value(&self, value: Value) -> ValidationResult<Value> {
        match &self.validator {
            Some(validator) if self.schema.is_none() => validator.validate_query(value),
            _ => Ok(value),
        }
    }

    /// Applies read parameters to a stored value.
    pub fn apply_params(&self, value: &Value, params: &Document) -> ValidationResult<Value> {
        match &self.params {
            Some(p) => p.apply(value, params),
            None if params.is_empty() => Ok(value.clone()),
            None => Err(ValidationError::invalid("parameters not supported")),
        }
    }

    /// Resolves a dotted path below this field.
    pub fn get_sub_field(&self, path: &str) -> Option<&Field> {
        match &self.schema {
            Some(schema) => schema.get_field(path),
            None => self.validator.as_ref()?.get_field(path),
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("required", &self.required)
            .field("read_only", &self.read_only)
            .field("hidden", &self.hidden)
            .field("default", &self.default)
            .field("on_init", &self.on_init.is_some())
            .field("on_update", &self.on_update.is_some())
            .field("filterable", &self.filterable)
            .field("sortable", &self.sortable)
            .field("validator", &self.validator)
            .field("schema", &self.schema)
            .field("dependency", &self.dependency)
            .finish()
    }
}
