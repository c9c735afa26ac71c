//! Schema error types
//!
//! Two families live here:
//! - `CompileError`: schema misconfiguration found while compiling (FATAL at startup)
//! - `ValidationError` / `ErrorMap`: per-field problems found in client documents (REJECT)

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::query::QueryError;

/// Key used in an `ErrorMap` for problems that concern the document as a whole.
pub const ROOT_KEY: &str = "$root";

/// A single problem reported for a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldIssue {
    /// Plain message, e.g. "required"
    Message(String),
    /// Errors of a sub-document, keyed by sub-field
    Nested(ErrorMap),
}

impl FieldIssue {
    /// Returns the message if this issue is a plain message.
    pub fn as_message(&self) -> Option<&str> {
        match self {
            FieldIssue::Message(m) => Some(m),
            FieldIssue::Nested(_) => None,
        }
    }

    /// Returns the nested map if this issue comes from a sub-document.
    pub fn as_nested(&self) -> Option<&ErrorMap> {
        match self {
            FieldIssue::Message(_) => None,
            FieldIssue::Nested(map) => Some(map),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldIssue::Message(m) => write!(f, "{}", m),
            FieldIssue::Nested(map) => write!(f, "{{{}}}", map),
        }
    }
}

impl From<&str> for FieldIssue {
    fn from(message: &str) -> Self {
        FieldIssue::Message(message.to_string())
    }
}

impl From<String> for FieldIssue {
    fn from(message: String) -> Self {
        FieldIssue::Message(message)
    }
}

impl From<ErrorMap> for FieldIssue {
    fn from(map: ErrorMap) -> Self {
        FieldIssue::Nested(map)
    }
}

impl From<ValidationError> for FieldIssue {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Invalid(m) => FieldIssue::Message(m),
            ValidationError::Fields(map) => FieldIssue::Nested(map),
        }
    }
}

/// Validation errors collected per field name.
///
/// Keys are kept sorted so the rendered message is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ErrorMap(BTreeMap<String, Vec<FieldIssue>>);

impl ErrorMap {
    /// Creates an empty error map.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Records an issue for a field.
    pub fn add(&mut self, field: impl Into<String>, issue: impl Into<FieldIssue>) {
        self.0.entry(field.into()).or_default().push(issue.into());
    }

    /// Copies all issues from `other` into this map.
    pub fn merge(&mut self, other: ErrorMap) {
        for (field, issues) in other.0 {
            self.0.entry(field).or_default().extend(issues);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields with at least one issue.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Returns the issues recorded for a field.
    pub fn get(&self, field: &str) -> Option<&[FieldIssue]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Returns true if `field` carries a plain message equal to `message`.
    pub fn has_message(&self, field: &str, message: &str) -> bool {
        self.get(field)
            .map(|issues| issues.iter().any(|i| i.as_message() == Some(message)))
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FieldIssue])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl fmt::Display for ErrorMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, issues)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} is [", field)?;
            for (j, issue) in issues.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", issue)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorMap {}

/// Error returned by a single field validator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The value is rejected with a message
    #[error("{0}")]
    Invalid(String),

    /// The value is a sub-document with per-field errors
    #[error("{0}")]
    Fields(ErrorMap),
}

impl ValidationError {
    /// Create a plain validation error
    pub fn invalid(message: impl Into<String>) -> Self {
        ValidationError::Invalid(message.into())
    }
}

/// Result type for field validation
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Schema misconfiguration detected at compile time.
///
/// These are programming errors in a schema definition and must stop startup.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    /// String pattern does not compile
    #[error("invalid regexp: {0}")]
    InvalidRegexp(#[from] regex::Error),

    /// Reference points to a resource the checker does not know
    #[error("can't find resource '{0}'")]
    ResourceNotFound(String),

    /// Time layout with an unknown or dangling strftime specifier
    #[error("invalid time layout: {0}")]
    InvalidTimeLayout(String),

    /// Object validator without a schema
    #[error("no schema defined for object")]
    MissingSchema,

    /// Field dependency query does not parse against the schema
    #[error("invalid dependency `{query}': {source}")]
    Dependency {
        query: String,
        #[source]
        source: QueryError,
    },

    /// Reported by a custom validator
    #[error("{0}")]
    Custom(String),

    /// Error located on a (dotted) field path
    #[error("{path}: {source}")]
    Field {
        path: String,
        #[source]
        source: Box<CompileError>,
    },
}

impl CompileError {
    /// Wraps an error with the name of the field it was found in.
    ///
    /// Nested wrapping produces a dotted path: `parent.child: cause`.
    pub fn in_field(name: &str, err: CompileError) -> Self {
        match err {
            CompileError::Field { path, source } => CompileError::Field {
                path: format!("{}.{}", name, path),
                source,
            },
            other => CompileError::Field {
                path: name.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Returns the innermost error, stripping field paths.
    pub fn root_cause(&self) -> &CompileError {
        match self {
            CompileError::Field { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result type for compile operations
pub type CompileResult<T> = Result<T, CompileError>;
