//! Result ordering
//!
//! A sort string lists fields separated by commas. A leading `-` reverses
//! the order for that field: `"-created,name"`.
//!
//! Ordering rules:
//! - A missing value sorts before any present value
//! - Fields with a validator less func use it
//! - Otherwise null < bool < number < string < array < object
//! - Sorting is stable

use std::cmp::Ordering;

use serde_json::Value;

use crate::schema::{Document, Schema};
use crate::validators::LessFunc;

use super::errors::{QueryError, QueryResult};
use super::filters::lookup_path;

/// One key of a sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub name: String,
    pub reversed: bool,
}

impl SortField {
    pub fn asc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reversed: false,
        }
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reversed: true,
        }
    }
}

/// Ordered list of sort keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sort(Vec<SortField>);

impl Sort {
    pub fn new(fields: Vec<SortField>) -> Self {
        Self(fields)
    }

    /// Parses `a,-b,c.d`. Spaces around fields are ignored; a blank string
    /// is an empty sort.
    pub fn parse(text: &str) -> QueryResult<Sort> {
        if text.trim_matches(' ').is_empty() {
            return Ok(Sort::default());
        }
        text.split(',')
            .map(|part| {
                let part = part.trim_matches(' ');
                let (name, reversed) = match part.strip_prefix('-') {
                    Some(name) => (name, true),
                    None => (part, false),
                };
                if name.is_empty() {
                    return Err(QueryError::EmptySortField);
                }
                Ok(SortField {
                    name: name.to_string(),
                    reversed,
                })
            })
            .collect::<QueryResult<Vec<_>>>()
            .map(Sort)
    }

    /// Checks every key names a sortable field.
    pub fn validate(&self, schema: &Schema) -> QueryResult<()> {
        for field in &self.0 {
            let def = schema
                .get_field(&field.name)
                .ok_or_else(|| QueryError::UnknownSortField(field.name.clone()))?;
            if !def.sortable {
                return Err(QueryError::NotSortable(field.name.clone()));
            }
        }
        Ok(())
    }

    pub fn parse_and_validate(text: &str, schema: &Schema) -> QueryResult<Sort> {
        let sort = Sort::parse(text)?;
        sort.validate(schema)?;
        Ok(sort)
    }

    pub fn fields(&self) -> &[SortField] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compares two documents key by key.
    pub fn compare(&self, a: &Document, b: &Document, schema: &Schema) -> Ordering {
        for field in &self.0 {
            let less = schema
                .get_field(&field.name)
                .and_then(|f| f.validator.as_ref())
                .and_then(|v| v.less_func());
            let ordering = compare_present(
                lookup_path(a, &field.name),
                lookup_path(b, &field.name),
                less,
            );
            let ordering = if field.reversed {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Sorts documents in place, keeping the input order of equal documents.
    pub fn sort_documents(&self, documents: &mut [Document], schema: &Schema) {
        if self.is_empty() {
            return;
        }
        documents.sort_by(|a, b| self.compare(a, b, schema));
    }
}

fn compare_present(a: Option<&Value>, b: Option<&Value>, less: Option<LessFunc>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match less {
            Some(less) if less(a, b) => Ordering::Less,
            Some(less) if less(b, a) => Ordering::Greater,
            Some(_) => Ordering::Equal,
            None => compare_values(a, b),
        },
    }
}

/// Generic JSON ordering used when no validator provides one.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    let rank = |v: &Value| -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    };

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y)
            .map(|(x, y)| compare_values(x, y))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, NoReferences};
    use crate::validators::{IntegerValidator, StringValidator, TimeValidator, Validator};
    use serde_json::json;

    fn schema() -> Schema {
        let mut s = Schema::new()
            .with_field("id", Field::new().sortable().with_validator(StringValidator::new()))
            .with_field("age", Field::new().sortable().with_validator(IntegerValidator::new()))
            .with_field("name", Field::new().sortable().with_validator(StringValidator::new()))
            .with_field("active", Field::new().sortable().with_validator(Validator::Bool))
            .with_field("at", Field::new().sortable().with_validator(TimeValidator::default()))
            .with_field("meta", Field::new().sortable())
            .with_field("secret", Field::new().with_validator(StringValidator::new()));
        s.compile(&NoReferences).unwrap();
        s
    }

    fn make_doc(id: &str, body: Value) -> Document {
        let mut doc = match body {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        };
        doc.insert("id".to_string(), json!(id));
        doc
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d["id"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_parse() {
        let sort = Sort::parse("a,-b,c.d").unwrap();
        assert_eq!(
            sort.fields(),
            &[SortField::asc("a"), SortField::desc("b"), SortField::asc("c.d")]
        );
        assert!(Sort::parse("").unwrap().is_empty());
        assert!(Sort::parse("   ").unwrap().is_empty());
        assert_eq!(
            Sort::parse(" age , -name").unwrap().fields(),
            &[SortField::asc("age"), SortField::desc("name")]
        );
        assert_eq!(Sort::parse("a, ,b"), Err(QueryError::EmptySortField));
        assert_eq!(Sort::parse("a,,b"), Err(QueryError::EmptySortField));
        assert_eq!(Sort::parse("-"), Err(QueryError::EmptySortField));
    }

    #[test]
    fn test_validate() {
        let s = schema();
        assert!(Sort::parse_and_validate("-age,name", &s).is_ok());
        assert!(Sort::parse_and_validate("age, -name", &s).is_ok());
        assert_eq!(
            Sort::parse_and_validate("nope", &s).unwrap_err().to_string(),
            "nope: unknown sort field"
        );
        assert_eq!(
            Sort::parse_and_validate("secret", &s).unwrap_err().to_string(),
            "secret: field is not sortable"
        );
    }

    #[test]
    fn test_sort_ascending_and_descending() {
        let s = schema();
        let mut docs = vec![
            make_doc("c", json!({"age": 30})),
            make_doc("a", json!({"age": 10})),
            make_doc("b", json!({"age": 20})),
        ];
        Sort::parse("age").unwrap().sort_documents(&mut docs, &s);
        assert_eq!(ids(&docs), vec!["a", "b", "c"]);

        Sort::parse("-age").unwrap().sort_documents(&mut docs, &s);
        assert_eq!(ids(&docs), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_sort_stable_multi_key() {
        let s = schema();
        let mut docs = vec![
            make_doc("1", json!({"age": 25, "name": "bob"})),
            make_doc("2", json!({"age": 25, "name": "alice"})),
            make_doc("3", json!({"age": 20, "name": "zed"})),
            make_doc("4", json!({"age": 25, "name": "alice"})),
        ];
        Sort::parse("-age,name").unwrap().sort_documents(&mut docs, &s);
        assert_eq!(ids(&docs), vec!["2", "4", "1", "3"]);
    }

    #[test]
    fn test_missing_values_first() {
        let s = schema();
        let mut docs = vec![
            make_doc("a", json!({"age": 1})),
            make_doc("b", json!({})),
        ];
        Sort::parse("age").unwrap().sort_documents(&mut docs, &s);
        assert_eq!(ids(&docs), vec!["b", "a"]);
    }

    #[test]
    fn test_validator_less_funcs() {
        let s = schema();
        let mut docs = vec![
            make_doc("f", json!({"active": false})),
            make_doc("t", json!({"active": true})),
        ];
        Sort::parse("active").unwrap().sort_documents(&mut docs, &s);
        assert_eq!(ids(&docs), vec!["t", "f"]);

        let mut docs = vec![
            make_doc("late", json!({"at": "2024-01-01T10:00:00Z"})),
            make_doc("early", json!({"at": "2024-01-01T11:00:00+02:00"})),
        ];
        Sort::parse("at").unwrap().sort_documents(&mut docs, &s);
        assert_eq!(ids(&docs), vec!["early", "late"]);
    }

    #[test]
    fn test_generic_ordering_fallback() {
        let s = schema();
        let mut docs = vec![
            make_doc("obj", json!({"meta": {"a": 1}})),
            make_doc("str", json!({"meta": "x"})),
            make_doc("num", json!({"meta": 3})),
            make_doc("null", json!({"meta": null})),
            make_doc("arr", json!({"meta": [1]})),
            make_doc("bool", json!({"meta": true})),
        ];
        Sort::parse("meta").unwrap().sort_documents(&mut docs, &s);
        assert_eq!(ids(&docs), vec!["null", "bool", "num", "str", "arr", "obj"]);
    }

    #[test]
    fn test_compare_values_arrays() {
        assert_eq!(compare_values(&json!([1, 2]), &json!([1, 3])), Ordering::Less);
        assert_eq!(compare_values(&json!([1]), &json!([1, 0])), Ordering::Less);
        assert_eq!(compare_values(&json!(2), &json!(2.0)), Ordering::Equal);
    }
}
