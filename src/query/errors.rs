//! Query error types
//!
//! Every variant is a client error: the query or sort string is rejected,
//! nothing else is affected.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("must be valid JSON")]
    InvalidJson,

    #[error("must be a JSON object")]
    NotAnObject,

    #[error("unknown query field: {0}")]
    UnknownField(String),

    #[error("field is not filterable: {0}")]
    NotFilterable(String),

    /// Field operator used without a field
    #[error("{0} can't be at first level")]
    TopLevelOperator(String),

    /// Field name nested under another field
    #[error("{0}: invalid expression")]
    InvalidExpression(String),

    #[error("invalid query expression for field `{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("invalid query expression ({value}) for field `{field}': {reason}")]
    InvalidListValue {
        value: String,
        field: String,
        reason: String,
    },

    #[error("{field}: value for {op} must be a number")]
    NotANumber { field: String, op: String },

    #[error("{field}: cannot apply {op} operation on a non numerical field")]
    NonNumericField { field: String, op: String },

    #[error("{field}: value for {op} can't be a dict")]
    DictNotAllowed { field: String, op: String },

    #[error("{field}: value for {op} must be a string")]
    NotAString { field: String, op: String },

    #[error("{field}: value for {op} must be a dict")]
    NotADict { field: String, op: String },

    #[error("{0}: is not an array")]
    NotAnArray(String),

    #[error("{0}: array elements are not objects")]
    ElementsNotObjects(String),

    #[error("value for {0} must be an array of dicts")]
    NotAnArrayOfDicts(String),

    #[error("{0} must contain at least two elements")]
    TooFewClauses(String),

    #[error("$exists can only get Boolean as value")]
    ExistsNotBoolean,

    #[error("$regex: invalid regex: {0}")]
    InvalidRegex(String),

    #[error("empty sort field")]
    EmptySortField,

    #[error("{0}: unknown sort field")]
    UnknownSortField(String),

    #[error("{0}: field is not sortable")]
    NotSortable(String),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
