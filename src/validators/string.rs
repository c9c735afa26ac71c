//! String validator

use regex::Regex;
use serde_json::Value;

use crate::schema::{CompileResult, ValidationError, ValidationResult};

/// Validates string values.
///
/// Lengths are counted in bytes; a `max_len` of 0 means unbounded.
#[derive(Debug, Clone, Default)]
pub struct StringValidator {
    pub min_len: usize,
    pub max_len: usize,
    pub allowed: Vec<String>,
    regexp: Option<Pattern>,
}

#[derive(Debug, Clone)]
struct Pattern {
    source: String,
    compiled: Option<Regex>,
}

impl StringValidator {
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

    /// Restricts the value to an enumeration.
    pub fn with_allowed<I, S>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = allowed.into_iter().map(Into::into).collect();
        self
    }

    /// Sets a pattern the value must match. Compiled by `compile`.
    pub fn with_regexp(mut self, pattern: impl Into<String>) -> Self {
        self.regexp = Some(Pattern {
            source: pattern.into(),
            compiled: None,
        });
        self
    }

    pub fn regexp(&self) -> Option<&str> {
        self.regexp.as_ref().map(|p| p.source.as_str())
    }

    pub(crate) fn compile(&mut self) -> CompileResult<()> {
        if let Some(pattern) = self.regexp.as_mut() {
            pattern.compiled = Some(Regex::new(&pattern.source)?);
        }
        Ok(())
    }

    pub(crate) fn validate(&self, value: Value) -> ValidationResult<Value> {
        let s = match value.as_str() {
            Some(s) => s,
            None => return Err(ValidationError::invalid("not a string")),
        };

        let len = s.len();
        if len < self.min_len {
            return Err(ValidationError::invalid(format!(
                "is shorter than {}",
                self.min_len
            )));
        }
        if self.max_len > 0 && len > self.max_len {
            return Err(ValidationError::invalid(format!(
                "is longer than {}",
                self.max_len
            )));
        }

        if !self.allowed.is_empty() && !self.allowed.iter().any(|a| a == s) {
            return Err(ValidationError::invalid(format!(
                "not one of [{}]",
                self.allowed.join(", ")
            )));
        }

        if let Some(pattern) = &self.regexp {
            let re = pattern
                .compiled
                .as_ref()
                .ok_or_else(|| ValidationError::invalid("not successfully compiled"))?;
            if !re.is_match(s) {
                return Err(ValidationError::invalid(format!(
                    "does not match {}",
                    pattern.source
                )));
            }
        }

        Ok(value)
    }
}
