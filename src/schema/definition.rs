//! Declarative schema definitions
//!
//! JSON form of a schema, as read by `SchemaLoader`:
//!
//! ```json
//! {
//!   "description": "users",
//!   "fields": {
//!     "id": {"builtin": "id"},
//!     "name": {"required": true, "validator": {"type": "string", "max_len": 50}},
//!     "age": {"filterable": true, "validator": {"type": "integer", "min": 0}}
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::validators::{
    ArrayValidator, Boundaries, DictValidator, FloatValidator, IntegerValidator, IpValidator,
    ObjectValidator, PasswordValidator, ReferenceValidator, StringValidator, TimeLayout,
    TimeValidator, UrlValidator, Validator,
};

use super::field::Field;
use super::hooks;
use super::types::Schema;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDef {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDef>,
    #[serde(default)]
    pub min_len: usize,
    #[serde(default)]
    pub max_len: usize,
}

/// Predefined fields (`id`, `created`, `updated`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinField {
    Id,
    Created,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookDef {
    Now,
    NewId,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDef {
    /// Use a predefined field; other attributes are ignored
    pub builtin: Option<BuiltinField>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub sortable: bool,
    pub default: Option<Value>,
    pub on_init: Option<HookDef>,
    pub on_update: Option<HookDef>,
    pub dependency: Option<String>,
    pub validator: Option<ValidatorDef>,
    pub schema: Option<SchemaDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ValidatorDef {
    String {
        #[serde(default)]
        min_len: usize,
        #[serde(default)]
        max_len: usize,
        #[serde(default)]
        allowed: Vec<String>,
        regexp: Option<String>,
    },
    Integer {
        #[serde(default)]
        allowed: Vec<i64>,
        min: Option<f64>,
        max: Option<f64>,
    },
    Float {
        #[serde(default)]
        allowed: Vec<f64>,
        min: Option<f64>,
        max: Option<f64>,
    },
    Bool,
    Null,
    Time {
        layouts: Option<Vec<TimeLayout>>,
    },
    Array {
        values: Option<Box<FieldDef>>,
        #[serde(default)]
        min_len: usize,
        #[serde(default)]
        max_len: usize,
    },
    Dict {
        keys: Option<Box<ValidatorDef>>,
        values: Option<Box<FieldDef>>,
        #[serde(default)]
        min_len: usize,
        #[serde(default)]
        max_len: usize,
    },
    Object {
        schema: Option<SchemaDef>,
    },
    Reference {
        path: String,
    },
    AllOf {
        validators: Vec<ValidatorDef>,
    },
    AnyOf {
        validators: Vec<ValidatorDef>,
    },
    Password {
        #[serde(default)]
        min_len: usize,
        #[serde(default)]
        max_len: usize,
        #[serde(default)]
        show: bool,
    },
    Ip {
        #[serde(default)]
        store_binary: bool,
    },
    Url {
        #[serde(default)]
        allow_relative: bool,
        #[serde(default)]
        allow_locale: bool,
        #[serde(default)]
        allow_non_http: bool,
        #[serde(default)]
        allowed_schemes: Vec<String>,
    },
}

fn boundaries(min: Option<f64>, max: Option<f64>) -> Option<Boundaries> {
    if min.is_none() && max.is_none() {
        return None;
    }
    let open = Boundaries::default();
    Some(Boundaries::new(min.unwrap_or(open.min), max.unwrap_or(open.max)))
}

impl SchemaDef {
    /// Builds the schema; time and password settings come from `config`.
    pub fn build(&self, config: &EngineConfig) -> Schema {
        let mut schema = Schema::new()
            .with_description(self.description.clone())
            .with_min_len(self.min_len)
            .with_max_len(self.max_len);
        for (name, def) in &self.fields {
            schema = schema.with_field(name.clone(), def.build(config));
        }
        schema
    }
}

impl FieldDef {
    pub fn build(&self, config: &EngineConfig) -> Field {
        match self.builtin {
            Some(BuiltinField::Id) => return hooks::id_field(),
            Some(BuiltinField::Created) => return hooks::created_field(),
            Some(BuiltinField::Updated) => return hooks::updated_field(),
            None => {}
        }

        let mut field = Field::new().with_description(self.description.clone());
        field.required = self.required;
        field.read_only = self.read_only;
        field.hidden = self.hidden;
        field.filterable = self.filterable;
        field.sortable = self.sortable;
        field.default = self.default.clone();
        field.on_init = self.on_init.map(HookDef::build);
        field.on_update = self.on_update.map(HookDef::build);
        field.validator = self.validator.as_ref().map(|v| v.build(config));
        field.schema = self.schema.as_ref().map(|s| s.build(config));
        if let Some(dep) = &self.dependency {
            field = field.with_dependency(dep.clone());
        }
        field
    }
}

impl HookDef {
    fn build(self) -> super::field::FieldHook {
        match self {
            HookDef::Now => hooks::now(),
            HookDef::NewId => hooks::new_id(),
        }
    }
}

impl ValidatorDef {
    pub fn build(&self, config: &EngineConfig) -> Validator {
        match self {
            ValidatorDef::String {
                min_len,
                max_len,
                allowed,
                regexp,
            } => {
                let mut v = StringValidator::new()
                    .with_min_len(*min_len)
                    .with_max_len(*max_len)
                    .with_allowed(allowed.iter().cloned());
                if let Some(re) = regexp {
                    v = v.with_regexp(re.clone());
                }
                v.into()
            }
            ValidatorDef::Integer { allowed, min, max } => IntegerValidator {
                allowed: allowed.clone(),
                boundaries: boundaries(*min, *max),
            }
            .into(),
            ValidatorDef::Float { allowed, min, max } => FloatValidator {
                allowed: allowed.clone(),
                boundaries: boundaries(*min, *max),
            }
            .into(),
            ValidatorDef::Bool => Validator::Bool,
            ValidatorDef::Null => Validator::Null,
            ValidatorDef::Time { layouts } => TimeValidator::new()
                .with_layouts(layouts.clone().unwrap_or_else(|| config.time_layouts.clone()))
                .into(),
            ValidatorDef::Array {
                values,
                min_len,
                max_len,
            } => {
                let mut v = ArrayValidator::new()
                    .with_min_len(*min_len)
                    .with_max_len(*max_len);
                if let Some(values) = values {
                    v = v.with_values(values.build(config));
                }
                v.into()
            }
            ValidatorDef::Dict {
                keys,
                values,
                min_len,
                max_len,
            } => {
                let mut v = DictValidator::new()
                    .with_min_len(*min_len)
                    .with_max_len(*max_len);
                if let Some(keys) = keys {
                    v = v.with_keys(keys.build(config));
                }
                if let Some(values) = values {
                    v = v.with_values(values.build(config));
                }
                v.into()
            }
            ValidatorDef::Object { schema } => ObjectValidator {
                schema: schema.as_ref().map(|s| Box::new(s.build(config))),
            }
            .into(),
            ValidatorDef::Reference { path } => ReferenceValidator::new(path.clone()).into(),
            ValidatorDef::AllOf { validators } => {
                Validator::AllOf(validators.iter().map(|v| v.build(config)).collect())
            }
            ValidatorDef::AnyOf { validators } => {
                Validator::AnyOf(validators.iter().map(|v| v.build(config)).collect())
            }
            ValidatorDef::Password {
                min_len,
                max_len,
                show,
            } => PasswordValidator {
                min_len: *min_len,
                max_len: *max_len,
                show: *show,
                config: config.password,
            }
            .into(),
            ValidatorDef::Ip { store_binary } => IpValidator {
                store_binary: *store_binary,
            }
            .into(),
            ValidatorDef::Url {
                allow_relative,
                allow_locale,
                allow_non_http,
                allowed_schemes,
            } => UrlValidator {
                allow_relative: *allow_relative,
                allow_locale: *allow_locale,
                allow_non_http: *allow_non_http,
                allowed_schemes: allowed_schemes.clone(),
            }
            .into(),
        }
    }
}
