//! Document schemas
//!
//! A `Schema` describes the fields a document may carry. It is compiled once
//! at startup, then used concurrently to:
//! - prepare and validate client writes (`Schema::prepare`, `Schema::validate`)
//! - render stored documents (`Schema::serialize`)
//! - resolve fields for the query language (`Schema::get_field`)
//!
//! # Design Principles
//!
//! - Compile errors are fatal, validation errors reject a single write
//! - Validation never stops at the first error
//! - Compiled schemas are immutable

mod compiler;
mod definition;
mod errors;
mod field;
pub mod hooks;
mod loader;
mod types;
mod validator;

pub use compiler::{CompiledSchema, NoReferences, ReferenceChecker};
pub use definition::{BuiltinField, FieldDef, HookDef, SchemaDef, ValidatorDef};
pub use errors::{
    CompileError, CompileResult, ErrorMap, FieldIssue, ValidationError, ValidationResult, ROOT_KEY,
};
pub use field::{Dependency, Document, Field, FieldHook, Fields, ParamHandler, Params};
pub use loader::{LoaderError, LoaderResult, SchemaLoader, ID_FIELD};
pub use types::Schema;
