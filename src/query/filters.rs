//! Query evaluation against documents
//!
//! - Equality is deep; numbers compare by value (`1 == 1.0`)
//! - A missing field reads as `null` for equality and membership
//! - Range operators only match numbers
//! - `$regex` only matches strings
//! - `$elemMatch` only looks at object items of an array

use std::cmp::Ordering;

use serde_json::{Number, Value};

use crate::schema::Document;

use super::ast::{Expression, Query};

impl Query {
    /// Checks if a document matches all expressions.
    pub fn matches(&self, doc: &Document) -> bool {
        self.expressions().iter().all(|e| e.matches(doc))
    }
}

impl Expression {
    /// Checks if a document matches this expression.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Expression::And(exprs) => exprs.iter().all(|e| e.matches(doc)),
            Expression::Or(exprs) => exprs.iter().any(|e| e.matches(doc)),
            Expression::Equal { field, value } => values_equal(field_or_null(doc, field), value),
            Expression::NotEqual { field, value } => {
                !values_equal(field_or_null(doc, field), value)
            }
            Expression::In { field, values } => {
                let actual = field_or_null(doc, field);
                values.iter().any(|v| values_equal(actual, v))
            }
            Expression::NotIn { field, values } => {
                let actual = field_or_null(doc, field);
                !values.iter().any(|v| values_equal(actual, v))
            }
            Expression::Exist { field } => lookup_path(doc, field).is_some(),
            Expression::NotExist { field } => lookup_path(doc, field).is_none(),
            Expression::GreaterThan { field, value } => {
                compare_number(doc, field, *value, |o| o == Ordering::Greater)
            }
            Expression::GreaterOrEqual { field, value } => {
                compare_number(doc, field, *value, |o| o != Ordering::Less)
            }
            Expression::LowerThan { field, value } => {
                compare_number(doc, field, *value, |o| o == Ordering::Less)
            }
            Expression::LowerOrEqual { field, value } => {
                compare_number(doc, field, *value, |o| o != Ordering::Greater)
            }
            Expression::Regex { field, regex } => lookup_path(doc, field)
                .and_then(Value::as_str)
                .map_or(false, |s| regex.is_match(s)),
            Expression::ElemMatch { field, query } => match lookup_path(doc, field) {
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(Value::as_object)
                    .any(|item| query.matches(item)),
                _ => false,
            },
        }
    }
}

static NULL: Value = Value::Null;

fn field_or_null<'a>(doc: &'a Document, path: &str) -> &'a Value {
    lookup_path(doc, path).unwrap_or(&NULL)
}

fn compare_number(doc: &Document, path: &str, bound: f64, accept: fn(Ordering) -> bool) -> bool {
    lookup_path(doc, path)
        .and_then(Value::as_f64)
        .and_then(|n| n.partial_cmp(&bound))
        .map_or(false, accept)
}

/// Reads a dotted path (`a.b.0.c`) through objects and array indices.
pub fn lookup_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Deep equality with numbers compared by value.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).map_or(false, |w| values_equal(v, w)))
        }
        _ => a == b,
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
        return x == y;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
