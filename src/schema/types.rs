//! Schema type definitions

use log::debug;

use super::compiler::{compile_dependencies, CompiledSchema, ReferenceChecker};
use super::errors::{CompileError, CompileResult};
use super::field::{Field, Fields};

/// A document schema: the set of fields a document may carry.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub description: String,
    pub fields: Fields,
    /// Minimum number of fields in a valid document
    pub min_len: usize,
    /// Maximum number of fields in a valid document, 0 means unbounded
    pub max_len: usize,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    pub fn with_min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Returns a top level field.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Resolves a dotted path (`address.city`, `tags.0`) through sub-schemas
    /// and validators holding sub-fields.
    pub fn get_field(&self, path: &str) -> Option<&Field> {
        match path.split_once('.') {
            None => self.fields.get(path),
            Some((name, rest)) => self.fields.get(name)?.get_sub_field(rest),
        }
    }

    /// Field names in lexical order.
    pub(crate) fn sorted_fields(&self) -> Vec<(&String, &Field)> {
        let mut fields: Vec<_> = self.fields.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        fields
    }

    /// Compiles every field, then parses field dependencies against this
    /// schema.
    pub fn compile(&mut self, rc: &dyn ReferenceChecker) -> CompileResult<()> {
        self.compile_fields(rc)?;
        compile_dependencies(self)?;
        debug!("compiled schema with {} fields", self.fields.len());
        Ok(())
    }

    /// Compiles fields only. Sub-schemas share the dependencies pass of their
    /// root.
    pub(crate) fn compile_fields(&mut self, rc: &dyn ReferenceChecker) -> CompileResult<()> {
        let mut fields: Vec<_> = self.fields.iter_mut().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        for (name, field) in fields {
            field
                .compile(rc)
                .map_err(|e| CompileError::in_field(name, e))?;
        }
        Ok(())
    }

    /// Compiles the schema and freezes it.
    pub fn into_compiled(mut self, rc: &dyn ReferenceChecker) -> CompileResult<CompiledSchema> {
        self.compile(rc)?;
        Ok(CompiledSchema::new(self))
    }
}
