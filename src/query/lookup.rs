//! Resource lookup
//!
//! A `Lookup` gathers everything that selects documents for a request:
//! fixed equality fields (typically from the route, such as a parent id),
//! the client filter and the sort. Storage backends use it to select
//! documents; `find` evaluates it over an in-memory set.
//!
//! Evaluation order:
//! 1. Keep documents matching the fixed fields and the filter
//! 2. Sort (stable)
//! 3. Apply the window

use log::trace;
use serde_json::Value;

use crate::schema::{Document, Schema};

use super::ast::{Expression, Query};
use super::errors::QueryResult;
use super::filters::values_equal;
use super::parser::parse_query;
use super::sort::Sort;

/// Offset / limit pagination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub offset: usize,
    /// `None` means no limit
    pub limit: Option<usize>,
}

impl Window {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }

    /// Window for a 1-based page of `per_page` documents.
    ///
    /// Page 0 reads as page 1; an offset past `usize::MAX` saturates.
    pub fn page(page: usize, per_page: usize) -> Self {
        Self::new(page.saturating_sub(1).saturating_mul(per_page), per_page)
    }
}

/// Result of `Lookup::find`.
#[derive(Debug, Clone)]
pub struct LookupResult {
    /// Number of matching documents before the window is applied
    pub total: usize,
    /// Matching documents in sort order, windowed
    pub documents: Vec<Document>,
}

/// Selection criteria for a resource.
#[derive(Debug, Clone, Default)]
pub struct Lookup {
    fields: Document,
    filter: Query,
    sort: Sort,
}

impl Lookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fixed equality constraint.
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Parses a client filter and adds it to the current one.
    pub fn set_filter(&mut self, text: &str, schema: &Schema) -> QueryResult<()> {
        let query = parse_query(text, schema)?;
        self.filter.extend(query);
        Ok(())
    }

    /// Adds an already parsed query.
    pub fn add_query(&mut self, query: Query) {
        self.filter.extend(query);
    }

    /// Parses and validates a sort string, replacing the current sort.
    pub fn set_sort(&mut self, text: &str, schema: &Schema) -> QueryResult<()> {
        self.sort = Sort::parse_and_validate(text, schema)?;
        Ok(())
    }

    pub fn fields(&self) -> &Document {
        &self.fields
    }

    pub fn filter(&self) -> &Query {
        &self.filter
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    /// The fixed fields and the filter as a single query.
    pub fn to_query(&self) -> Query {
        let mut query = Query::from_expressions(
            self.fields
                .iter()
                .map(|(k, v)| Expression::eq(k.clone(), v.clone()))
                .collect(),
        );
        query.extend(self.filter.clone());
        query
    }

    /// Checks a document against the fixed fields and the filter.
    pub fn matches(&self, doc: &Document) -> bool {
        self.fields
            .iter()
            .all(|(k, v)| doc.get(k).map_or(false, |actual| values_equal(actual, v)))
            && self.filter.matches(doc)
    }

    /// Copies the fixed fields into a document about to be stored.
    pub fn apply_fields(&self, doc: &mut Document) {
        for (k, v) in &self.fields {
            doc.insert(k.clone(), v.clone());
        }
    }

    /// Selects, sorts and windows documents.
    pub fn find(&self, documents: &[Document], schema: &Schema, window: Window) -> LookupResult {
        let mut matching: Vec<Document> = documents
            .iter()
            .filter(|d| self.matches(d))
            .cloned()
            .collect();
        let total = matching.len();
        trace!("lookup matched {} of {} documents", total, documents.len());

        self.sort.sort_documents(&mut matching, schema);

        let limit = window.limit.unwrap_or(usize::MAX);
        let documents = matching
            .into_iter()
            .skip(window.offset)
            .take(limit)
            .collect();

        LookupResult { total, documents }
    }
}
