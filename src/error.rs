//! Crate-level error type
//!
//! Error codes:
//! - SCHEMA_COMPILE_FAILED (FATAL severity)
//! - SCHEMA_LOAD_FAILED (FATAL severity)
//! - DOCUMENT_INVALID (REJECT severity)
//! - QUERY_INVALID (REJECT severity)

use std::fmt;

use thiserror::Error;

use crate::query::QueryError;
use crate::schema::{CompileError, ErrorMap, LoaderError};

/// How an error affects the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The request is rejected, the engine keeps serving
    Reject,
    /// The schema set is unusable; startup must stop
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("schema compilation failed: {0}")]
    Compile(#[from] CompileError),

    #[error("schema loading failed: {0}")]
    Load(#[from] LoaderError),

    #[error("document is invalid: {0}")]
    Document(#[source] ErrorMap),

    #[error("invalid query: {0}")]
    Query(#[from] QueryError),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::Compile(_) => "SCHEMA_COMPILE_FAILED",
            Error::Load(_) => "SCHEMA_LOAD_FAILED",
            Error::Document(_) => "DOCUMENT_INVALID",
            Error::Query(_) => "QUERY_INVALID",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Error::Compile(_) | Error::Load(_) => Severity::Fatal,
            Error::Document(_) | Error::Query(_) => Severity::Reject,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// Per-field issues of a rejected document.
    pub fn field_errors(&self) -> Option<&ErrorMap> {
        match self {
            Error::Document(errs) => Some(errs),
            _ => None,
        }
    }
}

impl From<ErrorMap> for Error {
    fn from(errs: ErrorMap) -> Self {
        Error::Document(errs)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_severity() {
        let err = Error::from(CompileError::MissingSchema);
        assert_eq!(err.code(), "SCHEMA_COMPILE_FAILED");
        assert!(err.is_fatal());
        assert_eq!(err.severity().to_string(), "FATAL");

        let err = Error::from(QueryError::InvalidJson);
        assert_eq!(err.code(), "QUERY_INVALID");
        assert_eq!(err.severity(), Severity::Reject);
        assert_eq!(err.to_string(), "invalid query: must be valid JSON");

        let err = Error::from(LoaderError::DuplicateResource("users".into()));
        assert_eq!(err.code(), "SCHEMA_LOAD_FAILED");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_document_error() {
        let mut errs = ErrorMap::new();
        errs.add("name", "required");
        let err = Error::from(errs);
        assert_eq!(err.code(), "DOCUMENT_INVALID");
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "document is invalid: name is [required]");
        assert!(err.field_errors().unwrap().has_message("name", "required"));
    }
}
