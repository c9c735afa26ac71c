//! Schema compilation
//!
//! Compilation runs once at startup, before any document is validated:
//! - string patterns are compiled
//! - references are resolved through a `ReferenceChecker`
//! - field dependencies are parsed into queries
//!
//! Any error here is a schema bug and must abort startup.

use std::ops::Deref;
use std::sync::Arc;

use crate::query::{parse_query, Query};
use crate::validators::Validator;

use super::errors::{CompileError, CompileResult};
use super::field::Field;
use super::types::Schema;

/// Resolves a resource name to the validator of its `id` field.
pub trait ReferenceChecker {
    fn reference_checker(&self, path: &str) -> Option<Validator>;
}

impl<F> ReferenceChecker for F
where
    F: Fn(&str) -> Option<Validator>,
{
    fn reference_checker(&self, path: &str) -> Option<Validator> {
        self(path)
    }
}

/// Checker for schemas without references.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReferences;

impl ReferenceChecker for NoReferences {
    fn reference_checker(&self, _path: &str) -> Option<Validator> {
        None
    }
}

/// A compiled, immutable schema.
///
/// Cheap to clone and safe to share between threads.
#[derive(Debug, Clone)]
pub struct CompiledSchema(Arc<Schema>);

impl CompiledSchema {
    pub(crate) fn new(schema: Schema) -> Self {
        Self(Arc::new(schema))
    }

    pub fn schema(&self) -> &Schema {
        &self.0
    }
}

impl Deref for CompiledSchema {
    type Target = Schema;

    fn deref(&self) -> &Schema {
        &self.0
    }
}

/// Parses every dependency of `schema` (sub-schemas included) against
/// `schema` itself.
pub(crate) fn compile_dependencies(schema: &mut Schema) -> CompileResult<()> {
    let mut parsed = Vec::new();
    let root: &Schema = schema;
    collect_dependencies(root, root, "", &mut parsed)?;

    for (path, query) in parsed {
        if let Some(dep) = field_by_path_mut(schema, &path).and_then(|f| f.dependency.as_mut()) {
            dep.set_query(query);
        }
    }
    Ok(())
}

fn collect_dependencies(
    root: &Schema,
    current: &Schema,
    prefix: &str,
    out: &mut Vec<(String, Query)>,
) -> CompileResult<()> {
    for (name, field) in current.sorted_fields() {
        let path = format!("{}{}", prefix, name);
        if let Some(dep) = &field.dependency {
            let query = parse_query(dep.source(), root).map_err(|source| {
                CompileError::in_field(
                    &path,
                    CompileError::Dependency {
                        query: dep.source().to_string(),
                        source,
                    },
                )
            })?;
            out.push((path.clone(), query));
        }
        if let Some(sub) = &field.schema {
            collect_dependencies(root, sub, &format!("{}.", path), out)?;
        }
    }
    Ok(())
}

fn field_by_path_mut<'a>(schema: &'a mut Schema, path: &str) -> Option<&'a mut Field> {
    match path.split_once('.') {
        None => schema.fields.get_mut(path),
        Some((name, rest)) => {
            let sub = schema.fields.get_mut(name)?.schema.as_mut()?;
            field_by_path_mut(sub, rest)
        }
    }
}
