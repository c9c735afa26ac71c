//! Query language
//!
//! A small MongoDB-like filter language resolved against a `Schema`:
//! - `parse_query` turns a JSON filter into a `Query`
//! - `Query::matches` evaluates it against a document
//! - `Sort` orders documents using validator-provided orderings
//! - `Lookup` combines fixed fields, filter, sort and a window
//!
//! Supported operators: `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`, `$nin`,
//! `$exists`, `$regex`, `$elemMatch`, `$or`, `$and`.

mod ast;
mod errors;
mod filters;
mod lookup;
mod parser;
mod sort;

pub use ast::{Expression, Query};
pub use errors::{QueryError, QueryResult};
pub use filters::{lookup_path, values_equal};
pub use lookup::{Lookup, LookupResult, Window};
pub use parser::parse_query;
pub use sort::{compare_values, Sort, SortField};
