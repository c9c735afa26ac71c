//! Query parser
//!
//! Parses a MongoDB-like JSON filter against a schema:
//!
//! ```json
//! {"age": {"$gte": 18}, "$or": [{"role": "admin"}, {"role": "owner"}]}
//! ```
//!
//! Every field must exist in the schema and be filterable. Values are checked
//! and normalized with the field validator's `validate_query`.

use log::trace;
use regex::Regex;
use serde_json::{Map, Value};

use crate::schema::{Field, Schema};
use crate::validators::{ObjectValidator, Validator};

use super::ast::{Expression, Query};
use super::errors::{QueryError, QueryResult};

/// Parses a JSON filter string.
pub fn parse_query(text: &str, schema: &Schema) -> QueryResult<Query> {
    let value: Value = serde_json::from_str(text).map_err(|_| QueryError::InvalidJson)?;
    let map = match value {
        Value::Object(map) => map,
        _ => return Err(QueryError::NotAnObject),
    };
    let query = Query::new(&map, schema)?;
    trace!("parsed query with {} expressions", query.len());
    Ok(query)
}

impl Query {
    /// Builds a query from an already decoded JSON object.
    pub fn new(map: &Map<String, Value>, schema: &Schema) -> QueryResult<Query> {
        parse_expressions(map, schema, None).map(Query::from_expressions)
    }
}

fn parse_expressions(
    map: &Map<String, Value>,
    schema: &Schema,
    parent: Option<&str>,
) -> QueryResult<Vec<Expression>> {
    let mut expressions = Vec::with_capacity(map.len());

    for (key, exp) in map {
        let expression = match key.as_str() {
            "$exists" => {
                let field = parent.ok_or_else(|| QueryError::TopLevelOperator(key.clone()))?;
                match exp {
                    Value::Bool(true) => Expression::exists(field),
                    Value::Bool(false) => Expression::not_exists(field),
                    _ => return Err(QueryError::ExistsNotBoolean),
                }
            }
            "$ne" => {
                let (name, field) = parent_field(key, parent, schema)?;
                let value = field
                    .validate_query_value(exp.clone())
                    .map_err(|e| QueryError::InvalidValue {
                        field: name.to_string(),
                        reason: e.to_string(),
                    })?;
                Expression::ne(name, value)
            }
            "$gt" | "$gte" | "$lt" | "$lte" => {
                let (name, field) = parent_field(key, parent, schema)?;
                let n = exp.as_f64().ok_or_else(|| QueryError::NotANumber {
                    field: name.to_string(),
                    op: key.clone(),
                })?;
                if !field.validator.as_ref().map_or(false, |v| v.is_numeric()) {
                    return Err(QueryError::NonNumericField {
                        field: name.to_string(),
                        op: key.clone(),
                    });
                }
                field
                    .validate_query_value(exp.clone())
                    .map_err(|e| QueryError::InvalidValue {
                        field: name.to_string(),
                        reason: e.to_string(),
                    })?;
                match key.as_str() {
                    "$gt" => Expression::gt(name, n),
                    "$gte" => Expression::gte(name, n),
                    "$lt" => Expression::lt(name, n),
                    _ => Expression::lte(name, n),
                }
            }
            "$in" | "$nin" => {
                let (name, field) = parent_field(key, parent, schema)?;
                let items = match exp {
                    Value::Object(_) => {
                        return Err(QueryError::DictNotAllowed {
                            field: name.to_string(),
                            op: key.clone(),
                        })
                    }
                    Value::Array(items) => items.clone(),
                    other => vec![other.clone()],
                };
                let values = items
                    .into_iter()
                    .map(|item| {
                        let shown = item.to_string();
                        field
                            .validate_query_value(item)
                            .map_err(|e| QueryError::InvalidListValue {
                                value: shown,
                                field: name.to_string(),
                                reason: e.to_string(),
                            })
                    })
                    .collect::<QueryResult<Vec<_>>>()?;
                if key == "$in" {
                    Expression::in_values(name, values)
                } else {
                    Expression::not_in(name, values)
                }
            }
            "$regex" => {
                let (name, _) = parent_field(key, parent, schema)?;
                let pattern = exp.as_str().ok_or_else(|| QueryError::NotAString {
                    field: name.to_string(),
                    op: key.clone(),
                })?;
                let regex =
                    Regex::new(pattern).map_err(|e| QueryError::InvalidRegex(e.to_string()))?;
                Expression::regex(name, regex)
            }
            "$elemMatch" => {
                let (name, field) = parent_field(key, parent, schema)?;
                let item_schema = element_schema(name, field)?;
                let sub = exp.as_object().ok_or_else(|| QueryError::NotADict {
                    field: name.to_string(),
                    op: key.clone(),
                })?;
                let exprs = parse_expressions(sub, item_schema, None)?;
                Expression::elem_match(name, Query::from_expressions(exprs))
            }
            "$or" | "$and" => {
                let clauses = match exp {
                    Value::Array(clauses) => clauses,
                    _ => return Err(QueryError::NotAnArrayOfDicts(key.clone())),
                };
                if clauses.len() < 2 {
                    return Err(QueryError::TooFewClauses(key.clone()));
                }
                let mut sub = Vec::with_capacity(clauses.len());
                for clause in clauses {
                    let clause = clause
                        .as_object()
                        .ok_or_else(|| QueryError::NotAnArrayOfDicts(key.clone()))?;
                    let mut exprs = parse_expressions(clause, schema, None)?;
                    sub.push(if exprs.len() == 1 {
                        exprs.remove(0)
                    } else {
                        Expression::And(exprs)
                    });
                }
                if key == "$or" {
                    Expression::Or(sub)
                } else {
                    Expression::And(sub)
                }
            }
            _ => {
                if let Some(parent) = parent {
                    return Err(QueryError::InvalidExpression(parent.to_string()));
                }
                let field = filterable_field(key, schema)?;
                match exp {
                    Value::Object(ops) => {
                        expressions.extend(parse_expressions(ops, schema, Some(key.as_str()))?);
                        continue;
                    }
                    _ => {
                        let value = field.validate_query_value(exp.clone()).map_err(|e| {
                            QueryError::InvalidValue {
                                field: key.clone(),
                                reason: e.to_string(),
                            }
                        })?;
                        Expression::eq(key.clone(), value)
                    }
                }
            }
        };
        expressions.push(expression);
    }

    Ok(expressions)
}

/// Resolves the field an operator applies to.
fn parent_field<'a, 'p>(
    op: &str,
    parent: Option<&'p str>,
    schema: &'a Schema,
) -> QueryResult<(&'p str, &'a Field)> {
    let name = parent.ok_or_else(|| QueryError::TopLevelOperator(op.to_string()))?;
    Ok((name, filterable_field(name, schema)?))
}

/// Schema of the object items held by an array field.
fn element_schema<'a>(name: &str, field: &'a Field) -> QueryResult<&'a Schema> {
    let array = match &field.validator {
        Some(Validator::Array(array)) => array,
        _ => return Err(QueryError::NotAnArray(name.to_string())),
    };
    if let Some(schema) = &array.values.schema {
        return Ok(schema);
    }
    match &array.values.validator {
        Some(Validator::Object(ObjectValidator {
            schema: Some(schema),
        })) => Ok(&**schema),
        _ => Err(QueryError::ElementsNotObjects(name.to_string())),
    }
}

fn filterable_field<'a>(name: &str, schema: &'a Schema) -> QueryResult<&'a Field> {
    let field = schema
        .get_field(name)
        .ok_or_else(|| QueryError::UnknownField(name.to_string()))?;
    if !field.filterable {
        return Err(QueryError::NotFilterable(name.to_string()));
    }
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Document, NoReferences};
    use crate::validators::{ArrayValidator, FloatValidator, IntegerValidator, StringValidator};
    use serde_json::json;

    fn schema() -> Schema {
        let mut s = Schema::new()
            .with_field("foo", Field::new().filterable().with_validator(StringValidator::new()))
            .with_field("bar", Field::new().filterable().with_validator(IntegerValidator::new()))
            .with_field("baz", Field::new().filterable().with_validator(FloatValidator::new()))
            .with_field("flag", Field::new().filterable().with_validator(Validator::Bool))
            .with_field("hidden", Field::new().with_validator(StringValidator::new()))
            .with_field(
                "sub",
                Field::new().with_schema(Schema::new().with_field(
                    "name",
                    Field::new().filterable().with_validator(StringValidator::new()),
                )),
            )
            .with_field(
                "items",
                Field::new().filterable().with_validator(ArrayValidator::of(ObjectValidator::new(
                    Schema::new()
                        .with_field(
                            "name",
                            Field::new().filterable().with_validator(StringValidator::new()),
                        )
                        .with_field(
                            "qty",
                            Field::new().filterable().with_validator(IntegerValidator::new()),
                        )
                        .with_field("note", Field::new().with_validator(StringValidator::new())),
                ))),
            )
            .with_field(
                "words",
                Field::new()
                    .filterable()
                    .with_validator(ArrayValidator::of(StringValidator::new())),
            );
        s.compile(&NoReferences).unwrap();
        s
    }

    fn err(q: &str) -> String {
        parse_query(q, &schema()).unwrap_err().to_string()
    }

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(err("{"), "must be valid JSON");
        assert_eq!(err("[]"), "must be a JSON object");
    }

    #[test]
    fn test_field_errors() {
        assert_eq!(err(r#"{"unknown": 1}"#), "unknown query field: unknown");
        assert_eq!(err(r#"{"hidden": "x"}"#), "field is not filterable: hidden");
        assert_eq!(err(r#"{"foo": {"bar": 1}}"#), "foo: invalid expression");
        assert_eq!(err(r#"{"$ne": 1}"#), "$ne can't be at first level");
        assert_eq!(err(r#"{"$exists": true}"#), "$exists can't be at first level");
    }

    #[test]
    fn test_value_errors() {
        assert_eq!(
            err(r#"{"foo": 1}"#),
            "invalid query expression for field `foo': not a string"
        );
        assert_eq!(
            err(r#"{"foo": {"$ne": 1}}"#),
            "invalid query expression for field `foo': not a string"
        );
        assert_eq!(
            err(r#"{"bar": {"$gt": "1"}}"#),
            "bar: value for $gt must be a number"
        );
        assert_eq!(
            err(r#"{"foo": {"$gt": 1}}"#),
            "foo: cannot apply $gt operation on a non numerical field"
        );
        assert_eq!(
            err(r#"{"bar": {"$gte": 1.5}}"#),
            "invalid query expression for field `bar': not an integer"
        );
        assert_eq!(
            err(r#"{"bar": {"$in": {"a": 1}}}"#),
            "bar: value for $in can't be a dict"
        );
        assert_eq!(
            err(r#"{"bar": {"$nin": [1, "a"]}}"#),
            "invalid query expression (\"a\") for field `bar': not an integer"
        );
        assert_eq!(
            err(r#"{"flag": {"$exists": 1}}"#),
            "$exists can only get Boolean as value"
        );
        assert_eq!(
            err(r#"{"foo": {"$regex": "("}}"#).split(':').next(),
            Some("$regex")
        );
        assert_eq!(
            err(r#"{"foo": {"$regex": 1}}"#),
            "foo: value for $regex must be a string"
        );
    }

    #[test]
    fn test_or_errors() {
        assert_eq!(err(r#"{"$or": "x"}"#), "value for $or must be an array of dicts");
        assert_eq!(err(r#"{"$or": [1, 2]}"#), "value for $or must be an array of dicts");
        assert_eq!(err(r#"{"$or": [{"foo": "a"}]}"#), "$or must contain at least two elements");
        assert_eq!(err(r#"{"$and": []}"#), "$and must contain at least two elements");
        assert_eq!(
            err(r#"{"$or": [{"foo": "a"}, {"nope": 1}]}"#),
            "unknown query field: nope"
        );
    }

    #[test]
    fn test_parse_and_match() {
        let s = schema();
        let q = parse_query(r#"{"bar": {"$gt": 18}}"#, &s).unwrap();
        assert!(q.matches(&doc(json!({"bar": 20}))));
        assert!(!q.matches(&doc(json!({"bar": 10}))));

        let q = parse_query(r#"{"foo": "a", "bar": {"$gte": 1, "$lt": 3}}"#, &s).unwrap();
        assert_eq!(q.len(), 3);
        assert!(q.matches(&doc(json!({"foo": "a", "bar": 2}))));
        assert!(!q.matches(&doc(json!({"foo": "a", "bar": 3}))));
    }

    #[test]
    fn test_values_are_normalized() {
        let s = schema();
        let q = parse_query(r#"{"bar": 2.0, "baz": {"$in": [1, 2]}}"#, &s).unwrap();
        assert!(q.matches(&doc(json!({"bar": 2, "baz": 2.0}))));
    }

    #[test]
    fn test_or_with_multi_field_clause() {
        let s = schema();
        let q = parse_query(
            r#"{"$or": [{"foo": "a", "bar": 1}, {"flag": true}]}"#,
            &s,
        )
        .unwrap();
        assert!(q.matches(&doc(json!({"foo": "a", "bar": 1}))));
        assert!(!q.matches(&doc(json!({"foo": "a", "bar": 2}))));
        assert!(q.matches(&doc(json!({"flag": true}))));
    }

    #[test]
    fn test_exists_and_regex() {
        let s = schema();
        let q = parse_query(r#"{"foo": {"$exists": false}}"#, &s).unwrap();
        assert!(q.matches(&doc(json!({"bar": 1}))));

        let q = parse_query(r#"{"foo": {"$regex": "^ab+c$"}}"#, &s).unwrap();
        assert!(q.matches(&doc(json!({"foo": "abbc"}))));
        assert!(!q.matches(&doc(json!({"foo": "ac"}))));
    }

    #[test]
    fn test_elem_match() {
        let s = schema();
        let q = parse_query(r#"{"items": {"$elemMatch": {"name": "b", "qty": {"$gte": 2}}}}"#, &s)
            .unwrap();
        assert_eq!(q.expressions()[0].op_name(), "$elemMatch");
        assert!(q.matches(&doc(json!({"items": [{"name": "a"}, {"name": "b", "qty": 2}]}))));
        assert!(!q.matches(&doc(json!({"items": [{"name": "b", "qty": 1}, {"qty": 3}]}))));
    }

    #[test]
    fn test_elem_match_errors() {
        assert_eq!(err(r#"{"foo": {"$elemMatch": {"name": "a"}}}"#), "foo: is not an array");
        assert_eq!(
            err(r#"{"words": {"$elemMatch": {"name": "a"}}}"#),
            "words: array elements are not objects"
        );
        assert_eq!(
            err(r#"{"items": {"$elemMatch": ["a"]}}"#),
            "items: value for $elemMatch must be a dict"
        );
        assert_eq!(
            err(r#"{"items": {"$elemMatch": {"nope": 1}}}"#),
            "unknown query field: nope"
        );
        assert_eq!(
            err(r#"{"items": {"$elemMatch": {"note": "x"}}}"#),
            "field is not filterable: note"
        );
        assert_eq!(
            err(r#"{"items": {"$elemMatch": {"qty": "x"}}}"#),
            "invalid query expression for field `qty': not an integer"
        );
        assert_eq!(err(r#"{"$elemMatch": {}}"#), "$elemMatch can't be at first level");
    }

    #[test]
    fn test_dotted_sub_field() {
        let s = schema();
        let q = parse_query(r#"{"sub.name": "x"}"#, &s).unwrap();
        assert!(q.matches(&doc(json!({"sub": {"name": "x"}}))));
        assert_eq!(err(r#"{"sub": "x"}"#), "field is not filterable: sub");
    }
}
