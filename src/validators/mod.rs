//! Field validators
//!
//! A `Validator` checks and normalizes a single JSON value. Built-in kinds are
//! variants of a closed enum; user code plugs in through `Custom` and the
//! `FieldValidator` trait.
//!
//! # Contract
//!
//! - `validate` returns the normalized value or a `ValidationError`
//! - validators are idempotent on their own output, since stored values are
//!   re-validated together with incoming changes
//! - `compile` must succeed before a validator tree is used

mod array;
mod dict;
mod ip;
mod numeric;
mod object;
mod password;
mod reference;
mod string;
mod time;
mod url;

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::schema::{CompileResult, Field, ReferenceChecker, ValidationError, ValidationResult};

pub use array::ArrayValidator;
pub use dict::DictValidator;
pub use ip::IpValidator;
pub use numeric::{Boundaries, FloatValidator, IntegerValidator};
pub use object::ObjectValidator;
pub use password::{
    hash_password, is_password_hash, verify_password, PasswordValidator, HIDDEN_PASSWORD,
};
pub use reference::ReferenceValidator;
pub use string::StringValidator;
pub use self::time::{format_time, parse_time, TimeLayout, TimeValidator};
pub use self::url::UrlValidator;

/// Strict "less than" used to order two values of the same field.
pub type LessFunc = fn(&Value, &Value) -> bool;

/// User-provided validator.
///
/// Only `validate` is mandatory. Implementations are shared between threads
/// once the schema is compiled.
pub trait FieldValidator: Send + Sync + fmt::Debug {
    /// Checks and normalizes a value.
    fn validate(&self, value: Value) -> ValidationResult<Value>;

    /// Checks a value used in a query. Defaults to `validate`.
    fn validate_query(&self, value: Value) -> ValidationResult<Value> {
        self.validate(value)
    }

    /// Schema-time check. Custom validators cannot mutate themselves here.
    fn compile(&self, _rc: &dyn ReferenceChecker) -> CompileResult<()> {
        Ok(())
    }

    /// Converts a stored value to its representation form.
    fn serialize(&self, value: Value) -> ValidationResult<Value> {
        Ok(value)
    }

    fn less_func(&self) -> Option<LessFunc> {
        None
    }

    /// Whether `serialize` does anything. Used by `AnyOf`.
    fn has_serializer(&self) -> bool {
        false
    }
}

/// A field validator.
#[derive(Debug, Clone)]
pub enum Validator {
    String(StringValidator),
    Integer(IntegerValidator),
    Float(FloatValidator),
    Bool,
    Time(TimeValidator),
    Array(ArrayValidator),
    Dict(DictValidator),
    Object(ObjectValidator),
    Reference(ReferenceValidator),
    /// Every sub-validator must accept the value, each one receiving the
    /// output of the previous one
    AllOf(Vec<Validator>),
    /// The first sub-validator accepting the original value wins
    AnyOf(Vec<Validator>),
    Null,
    Password(PasswordValidator),
    Ip(IpValidator),
    Url(UrlValidator),
    Custom(Arc<dyn FieldValidator>),
}

impl Validator {
    /// Wraps a user validator.
    pub fn custom<V: FieldValidator + 'static>(validator: V) -> Self {
        Validator::Custom(Arc::new(validator))
    }

    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Validator::String(_) => "string",
            Validator::Integer(_) => "integer",
            Validator::Float(_) => "float",
            Validator::Bool => "bool",
            Validator::Time(_) => "time",
            Validator::Array(_) => "array",
            Validator::Dict(_) => "dict",
            Validator::Object(_) => "object",
            Validator::Reference(_) => "reference",
            Validator::AllOf(_) => "all_of",
            Validator::AnyOf(_) => "any_of",
            Validator::Null => "null",
            Validator::Password(_) => "password",
            Validator::Ip(_) => "ip",
            Validator::Url(_) => "url",
            Validator::Custom(_) => "custom",
        }
    }

    /// Prepares the validator tree: compiles patterns and resolves references.
    pub fn compile(&mut self, rc: &dyn ReferenceChecker) -> CompileResult<()> {
        match self {
            Validator::String(v) => v.compile(),
            Validator::Time(v) => v.compile(),
            Validator::Array(v) => v.compile(rc),
            Validator::Dict(v) => v.compile(rc),
            Validator::Object(v) => v.compile(rc),
            Validator::Reference(v) => v.compile(rc),
            Validator::AllOf(validators) | Validator::AnyOf(validators) => {
                for v in validators.iter_mut() {
                    v.compile(rc)?;
                }
                Ok(())
            }
            Validator::Custom(v) => v.compile(rc),
            _ => Ok(()),
        }
    }

    /// Checks and normalizes a value.
    pub fn validate(&self, value: Value) -> ValidationResult<Value> {
        match self {
            Validator::String(v) => v.validate(value),
            Validator::Integer(v) => v.validate(value),
            Validator::Float(v) => v.validate(value),
            Validator::Bool => match value {
                Value::Bool(_) => Ok(value),
                _ => Err(ValidationError::invalid("not a Boolean")),
            },
            Validator::Time(v) => v.validate(value),
            Validator::Array(v) => v.validate(value),
            Validator::Dict(v) => v.validate(value),
            Validator::Object(v) => v.validate(value),
            Validator::Reference(v) => v.validate(value),
            Validator::AllOf(validators) => validators
                .iter()
                .try_fold(value, |current, v| v.validate(current)),
            Validator::AnyOf(validators) => first_accepting(validators, value, Validator::validate),
            Validator::Null => match value {
                Value::Null => Ok(value),
                _ => Err(ValidationError::invalid("not null")),
            },
            Validator::Password(v) => v.validate(value),
            Validator::Ip(v) => v.validate(value),
            Validator::Url(v) => v.validate(value),
            Validator::Custom(v) => v.validate(value),
        }
    }

    /// Checks a value found in a query expression.
    ///
    /// Lighter than `validate`: numeric bounds are not enforced and passwords
    /// are not hashed.
    pub fn validate_query(&self, value: Value) -> ValidationResult<Value> {
        match self {
            Validator::Integer(v) => v.validate_query(value),
            Validator::Float(v) => v.validate_query(value),
            Validator::Password(v) => v.validate_query(value),
            Validator::Reference(v) => v.validate_query(value),
            Validator::AllOf(validators) => validators
                .iter()
                .try_fold(value, |current, v| v.validate_query(current)),
            Validator::AnyOf(validators) => {
                first_accepting(validators, value, Validator::validate_query)
            }
            Validator::Custom(v) => v.validate_query(value),
            _ => self.validate(value),
        }
    }

    /// Converts a stored value into its representation form.
    pub fn serialize(&self, value: Value) -> ValidationResult<Value> {
        match self {
            Validator::Password(v) => Ok(v.serialize(value)),
            Validator::Ip(v) => v.serialize(value),
            Validator::Custom(v) => v.serialize(value),
            Validator::AllOf(validators) => validators
                .iter()
                .rev()
                .try_fold(value, |current, v| v.serialize(current)),
            Validator::AnyOf(validators) => {
                for v in validators.iter().filter(|v| v.has_serializer()) {
                    if let Ok(out) = v.serialize(value.clone()) {
                        return Ok(out);
                    }
                }
                Ok(value)
            }
            _ => Ok(value),
        }
    }

    fn has_serializer(&self) -> bool {
        match self {
            Validator::Password(_) | Validator::Ip(_) => true,
            Validator::AllOf(validators) | Validator::AnyOf(validators) => {
                validators.iter().any(Validator::has_serializer)
            }
            Validator::Custom(v) => v.has_serializer(),
            _ => false,
        }
    }

    /// Returns the sub-field definition for `name`, for validators holding
    /// sub-fields (Object, Array, Dict, AllOf, AnyOf).
    ///
    /// `AllOf` and `AnyOf` only consult their first sub-validator able to
    /// hold sub-fields.
    pub fn get_field(&self, name: &str) -> Option<&Field> {
        match self {
            Validator::Object(v) => v.get_field(name),
            Validator::Array(v) => v.get_field(name),
            Validator::Dict(v) => v.get_field(name),
            Validator::AllOf(validators) | Validator::AnyOf(validators) => validators
                .iter()
                .find(|v| v.is_field_getter())
                .and_then(|v| v.get_field(name)),
            _ => None,
        }
    }

    fn is_field_getter(&self) -> bool {
        matches!(
            self,
            Validator::Object(_)
                | Validator::Array(_)
                | Validator::Dict(_)
                | Validator::AllOf(_)
                | Validator::AnyOf(_)
        )
    }

    /// Ordering used when sorting on a field validated by this validator.
    pub fn less_func(&self) -> Option<LessFunc> {
        match self {
            Validator::String(_) => Some(less_string),
            Validator::Integer(_) | Validator::Float(_) => Some(less_number),
            Validator::Bool => Some(less_bool),
            Validator::Time(_) => Some(time::less_time),
            Validator::Reference(v) => v.delegate().and_then(Validator::less_func),
            Validator::AllOf(validators) | Validator::AnyOf(validators) => {
                validators.iter().find_map(Validator::less_func)
            }
            Validator::Custom(v) => v.less_func(),
            _ => None,
        }
    }

    /// Whether range operators (`$gt`, `$lte`, ...) apply to this field.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Validator::Integer(_) | Validator::Float(_))
    }
}

fn first_accepting(
    validators: &[Validator],
    value: Value,
    check: fn(&Validator, Value) -> ValidationResult<Value>,
) -> ValidationResult<Value> {
    for v in validators {
        if let Ok(out) = check(v, value.clone()) {
            return Ok(out);
        }
    }
    Err(ValidationError::invalid("invalid"))
}

fn less_string(a: &Value, b: &Value) -> bool {
    match (a.as_str(), b.as_str()) {
        (Some(a), Some(b)) => a < b,
        _ => false,
    }
}

fn less_number(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a.partial_cmp(&b) == Some(Ordering::Less),
        _ => false,
    }
}

/// `true` sorts before `false`.
fn less_bool(a: &Value, b: &Value) -> bool {
    matches!((a.as_bool(), b.as_bool()), (Some(true), Some(false)))
}

impl From<StringValidator> for Validator {
    fn from(v: StringValidator) -> Self {
        Validator::String(v)
    }
}

impl From<IntegerValidator> for Validator {
    fn from(v: IntegerValidator) -> Self {
        Validator::Integer(v)
    }
}

impl From<FloatValidator> for Validator {
    fn from(v: FloatValidator) -> Self {
        Validator::Float(v)
    }
}

impl From<TimeValidator> for Validator {
    fn from(v: TimeValidator) -> Self {
        Validator::Time(v)
    }
}

impl From<ArrayValidator> for Validator {
    fn from(v: ArrayValidator) -> Self {
        Validator::Array(v)
    }
}

impl From<DictValidator> for Validator {
    fn from(v: DictValidator) -> Self {
        Validator::Dict(v)
    }
}

impl From<ObjectValidator> for Validator {
    fn from(v: ObjectValidator) -> Self {
        Validator::Object(v)
    }
}

impl From<ReferenceValidator> for Validator {
    fn from(v: ReferenceValidator) -> Self {
        Validator::Reference(v)
    }
}

impl From<PasswordValidator> for Validator {
    fn from(v: PasswordValidator) -> Self {
        Validator::Password(v)
    }
}

impl From<IpValidator> for Validator {
    fn from(v: IpValidator) -> Self {
        Validator::Ip(v)
    }
}

impl From<UrlValidator> for Validator {
    fn from(v: UrlValidator) -> Self {
        Validator::Url(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::NoReferences;
    use serde_json::json;

    #[derive(Debug)]
    struct Uppercase;

    impl FieldValidator for Uppercase {
        fn validate(&self, value: Value) -> ValidationResult<Value> {
            match value {
                Value::String(s) => Ok(Value::String(s.to_uppercase())),
                _ => Err(ValidationError::invalid("not a string")),
            }
        }
    }

    #[test]
    fn test_bool_and_null() {
        assert_eq!(Validator::Bool.validate(json!(true)), Ok(json!(true)));
        assert_eq!(
            Validator::Bool.validate(json!("true")),
            Err(ValidationError::invalid("not a Boolean"))
        );
        assert_eq!(Validator::Null.validate(Value::Null), Ok(Value::Null));
        assert_eq!(
            Validator::Null.validate(json!(0)),
            Err(ValidationError::invalid("not null"))
        );
    }

    #[test]
    fn test_all_of_threads_and_fails_first() {
        let v = Validator::AllOf(vec![Validator::Bool, StringValidator::new().into()]);
        assert_eq!(v.validate(json!(true)), Err(ValidationError::invalid("not a string")));

        let v = Validator::AllOf(vec![
            Validator::custom(Uppercase),
            StringValidator::new().with_allowed(["FOO"]).into(),
        ]);
        assert_eq!(v.validate(json!("foo")), Ok(json!("FOO")));
    }

    #[test]
    fn test_any_of_first_success_wins() {
        let v = Validator::AnyOf(vec![Validator::Bool, StringValidator::new().into()]);
        assert_eq!(v.validate(json!("")), Ok(json!("")));
        assert_eq!(v.validate(json!(false)), Ok(json!(false)));
        assert_eq!(v.validate(json!(1)), Err(ValidationError::invalid("invalid")));
    }

    #[test]
    fn test_any_of_compiles_children() {
        let mut v = Validator::AnyOf(vec![
            Validator::Bool,
            StringValidator::new().with_regexp("[").into(),
        ]);
        assert!(v.compile(&NoReferences).is_err());
    }

    #[test]
    fn test_any_of_serializes_with_first_serializer() {
        let v = Validator::AnyOf(vec![
            Validator::Bool,
            IpValidator::new().store_binary().into(),
        ]);
        assert_eq!(v.serialize(json!([1, 2, 3, 4])), Ok(json!("1.2.3.4")));
        assert_eq!(v.serialize(json!(true)), Ok(json!(true)));
    }

    #[test]
    fn test_less_funcs() {
        let less = Validator::from(StringValidator::new()).less_func().unwrap();
        assert!(less(&json!("a"), &json!("b")));

        let less = Validator::from(IntegerValidator::default()).less_func().unwrap();
        assert!(less(&json!(1), &json!(2.5)));
        assert!(!less(&json!(2), &json!(2)));

        let less = Validator::Bool.less_func().unwrap();
        assert!(less(&json!(true), &json!(false)));
        assert!(!less(&json!(false), &json!(true)));

        assert!(Validator::Null.less_func().is_none());

        let any = Validator::AnyOf(vec![Validator::Null, Validator::Bool]);
        assert!(any.less_func().is_some());
    }

    #[test]
    fn test_custom_validator() {
        let v = Validator::custom(Uppercase);
        assert_eq!(v.kind(), "custom");
        assert_eq!(v.validate(json!("abc")), Ok(json!("ABC")));
        assert!(v.less_func().is_none());
        assert!(!v.is_numeric());
    }
}
