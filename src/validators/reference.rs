//! Reference validator
//!
//! Holds the name of another resource. Until compiled it rejects every
//! value with "not successfully compiled".

use serde_json::Value;

use crate::schema::{
    CompileError, CompileResult, ReferenceChecker, ValidationError, ValidationResult,
};

use super::Validator;

/// Validates a value as the id of a document in another resource.
///
/// The check is delegated to the target resource's id validator, resolved
/// through the `ReferenceChecker` at compile time.
#[derive(Debug, Clone)]
pub struct ReferenceValidator {
    path: String,
    state: ReferenceState,
}

#[derive(Debug, Clone)]
enum ReferenceState {
    Uncompiled,
    Compiled(Box<Validator>),
}

impl ReferenceValidator {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            state: ReferenceState::Uncompiled,
        }
    }

    /// Name of the referenced resource.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self.state, ReferenceState::Compiled(_))
    }

    pub(crate) fn delegate(&self) -> Option<&Validator> {
        match &self.state {
            ReferenceState::Compiled(v) => Some(v),
            ReferenceState::Uncompiled => None,
        }
    }

    pub(crate) fn compile(&mut self, rc: &dyn ReferenceChecker) -> CompileResult<()> {
        let mut delegate = rc
            .reference_checker(&self.path)
            .ok_or_else(|| CompileError::ResourceNotFound(self.path.clone()))?;
        if !matches!(delegate, Validator::Reference(_)) {
            delegate.compile(rc)?;
        }
        self.state = ReferenceState::Compiled(Box::new(delegate));
        Ok(())
    }

    pub(crate) fn validate(&self, value: Value) -> ValidationResult<Value> {
        self.require_delegate()?.validate(value)
    }

    pub(crate) fn validate_query(&self, value: Value) -> ValidationResult<Value> {
        self.require_delegate()?.validate_query(value)
    }

    fn require_delegate(&self) -> ValidationResult<&Validator> {
        self.delegate()
            .ok_or_else(|| ValidationError::invalid("not successfully compiled"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::StringValidator;
    use serde_json::json;

    fn checker(path: &str) -> Option<Validator> {
        match path {
            "users" => Some(StringValidator::new().with_regexp("^[a-f0-9]+$").into()),
            _ => None,
        }
    }

    #[test]
    fn test_unknown_resource() {
        let mut v = ReferenceValidator::new("foo");
        let err = v.compile(&checker).unwrap_err();
        assert_eq!(err.to_string(), "can't find resource 'foo'");
        assert!(!v.is_compiled());
    }

    #[test]
    fn test_validate_before_compile() {
        let v = ReferenceValidator::new("users");
        assert_eq!(
            v.validate(json!("abc")),
            Err(ValidationError::invalid("not successfully compiled"))
        );
    }

    #[test]
    fn test_delegates_to_target_id() {
        let mut v = ReferenceValidator::new("users");
        v.compile(&checker).unwrap();
        assert!(v.is_compiled());
        assert_eq!(v.path(), "users");
        assert_eq!(v.validate(json!("abc")), Ok(json!("abc")));
        assert_eq!(
            v.validate(json!("xyz")),
            Err(ValidationError::invalid("does not match ^[a-f0-9]+$"))
        );
        assert_eq!(
            v.validate(json!(1)),
            Err(ValidationError::invalid("not a string"))
        );
    }
}
