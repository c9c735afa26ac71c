//! docschema - Declarative document schemas with a small query language
//!
//! - `schema`: fields, schemas, compilation and the write pipeline
//! - `validators`: built-in value validators and the custom validator trait
//! - `query`: filter parsing, matching, sorting and lookups
//! - `config`: engine settings passed to the loader and validators

pub mod config;
pub mod error;
pub mod query;
pub mod schema;
pub mod validators;

pub use config::{EngineConfig, PasswordConfig};
pub use error::{Error, Result, Severity};
pub use query::{parse_query, Lookup, Query, Sort};
pub use schema::{CompiledSchema, Document, ErrorMap, Field, Schema, SchemaLoader};
pub use validators::{FieldValidator, Validator};
