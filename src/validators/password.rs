//! Password validator
//!
//! Clear-text passwords are hashed with Argon2id on validation and stored as
//! PHC strings. A stored hash validates as itself, so re-validating a stored
//! document does not hash twice.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use serde_json::Value;

use crate::config::PasswordConfig;
use crate::schema::{ValidationError, ValidationResult};

/// Placeholder returned instead of the hash when serializing.
pub const HIDDEN_PASSWORD: &str = "$$hidden$$";

/// Validates and hashes passwords.
#[derive(Debug, Clone, Default)]
pub struct PasswordValidator {
    pub min_len: usize,
    pub max_len: usize,
    /// Serialize the hash instead of the placeholder
    pub show: bool,
    pub config: PasswordConfig,
}

impl PasswordValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn with_config(mut self, config: PasswordConfig) -> Self {
        self.config = config;
        self
    }

    pub fn show(mut self) -> Self {
        self.show = true;
        self
    }

    pub(crate) fn validate(&self, value: Value) -> ValidationResult<Value> {
        let clear = value
            .as_str()
            .ok_or_else(|| ValidationError::invalid("not a string"))?;

        if clear == HIDDEN_PASSWORD {
            return Err(ValidationError::invalid(format!(
                "passed {} field value back",
                HIDDEN_PASSWORD
            )));
        }
        if is_password_hash(clear) {
            return Ok(value);
        }

        if clear.len() < self.min_len {
            return Err(ValidationError::invalid(format!(
                "is shorter than {}",
                self.min_len
            )));
        }
        if self.max_len > 0 && clear.len() > self.max_len {
            return Err(ValidationError::invalid(format!(
                "is longer than {}",
                self.max_len
            )));
        }

        hash_password(clear, &self.config).map(Value::String)
    }

    pub(crate) fn validate_query(&self, value: Value) -> ValidationResult<Value> {
        match value {
            Value::String(_) => Ok(value),
            _ => Err(ValidationError::invalid("not a string")),
        }
    }

    pub(crate) fn serialize(&self, value: Value) -> Value {
        if self.show {
            value
        } else {
            Value::String(HIDDEN_PASSWORD.to_string())
        }
    }
}

/// Hashes a clear-text password into a PHC string.
pub fn hash_password(password: &str, config: &PasswordConfig) -> ValidationResult<String> {
    let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
        .map_err(|e| ValidationError::invalid(format!("invalid password parameters: {}", e)))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let salt = SaltString::generate(&mut OsRng);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ValidationError::invalid(format!("password hashing failed: {}", e)))
}

/// Returns true if `s` is an Argon2 PHC string.
pub fn is_password_hash(s: &str) -> bool {
    PasswordHash::new(s)
        .map(|hash| hash.algorithm.as_str().starts_with("argon2"))
        .unwrap_or(false)
}

/// Checks a clear-text password against a stored hash.
///
/// Returns false for anything that is not a valid hash.
pub fn verify_password(hash: &Value, password: &str) -> bool {
    let parsed = match hash.as_str().map(PasswordHash::new) {
        Some(Ok(parsed)) => parsed,
        _ => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fast() -> PasswordValidator {
        PasswordValidator::new().with_config(PasswordConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
    }

    #[test]
    fn test_hash_and_verify() {
        let v = fast();
        let hash = v.validate(json!("secret")).unwrap();
        assert_ne!(hash, json!("secret"));
        assert!(is_password_hash(hash.as_str().unwrap()));
        assert!(verify_password(&hash, "secret"));
        assert!(!verify_password(&hash, "wrong"));
        assert!(!verify_password(&json!("secret"), "secret"));
    }

    #[test]
    fn test_stored_hash_passes_through() {
        let v = fast();
        let hash = v.validate(json!("secret")).unwrap();
        assert_eq!(v.validate(hash.clone()), Ok(hash));
    }

    #[test]
    fn test_rejects_placeholder() {
        let v = fast();
        assert_eq!(
            v.validate(json!(HIDDEN_PASSWORD)),
            Err(ValidationError::invalid("passed $$hidden$$ field value back"))
        );
    }

    #[test]
    fn test_lengths_checked_on_clear_text() {
        let v = fast().with_min_len(4).with_max_len(8);
        assert_eq!(v.validate(json!("abc")), Err(ValidationError::invalid("is shorter than 4")));
        assert_eq!(
            v.validate(json!("abcdefghi")),
            Err(ValidationError::invalid("is longer than 8"))
        );
        assert_eq!(v.validate(json!(42)), Err(ValidationError::invalid("not a string")));
    }

    #[test]
    fn test_serialize_hides_hash() {
        let v = fast();
        assert_eq!(v.serialize(json!("$argon2id$...")), json!(HIDDEN_PASSWORD));
        let v = fast().show();
        assert_eq!(v.serialize(json!("$argon2id$...")), json!("$argon2id$..."));
    }
}
