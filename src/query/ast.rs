//! Query AST
//!
//! A `Query` is a list of expressions joined by an implicit AND. Values held
//! by expressions are already normalized by the field validators, so they
//! compare directly with stored values.

use regex::Regex;
use serde_json::Value;

/// A single filter expression.
#[derive(Debug, Clone)]
pub enum Expression {
    /// All sub-expressions match (`$and`)
    And(Vec<Expression>),
    /// At least one sub-expression matches (`$or`)
    Or(Vec<Expression>),
    Equal { field: String, value: Value },
    NotEqual { field: String, value: Value },
    In { field: String, values: Vec<Value> },
    NotIn { field: String, values: Vec<Value> },
    Exist { field: String },
    NotExist { field: String },
    GreaterThan { field: String, value: f64 },
    GreaterOrEqual { field: String, value: f64 },
    LowerThan { field: String, value: f64 },
    LowerOrEqual { field: String, value: f64 },
    Regex { field: String, regex: Regex },
    /// Some object item of an array matches every expression of `query`
    ElemMatch { field: String, query: Query },
}

impl Expression {
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Expression::Equal {
            field: field.into(),
            value,
        }
    }

    pub fn ne(field: impl Into<String>, value: Value) -> Self {
        Expression::NotEqual {
            field: field.into(),
            value,
        }
    }

    pub fn in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        Expression::In {
            field: field.into(),
            values,
        }
    }

    pub fn not_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Expression::NotIn {
            field: field.into(),
            values,
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Expression::Exist {
            field: field.into(),
        }
    }

    pub fn not_exists(field: impl Into<String>) -> Self {
        Expression::NotExist {
            field: field.into(),
        }
    }

    pub fn gt(field: impl Into<String>, value: f64) -> Self {
        Expression::GreaterThan {
            field: field.into(),
            value,
        }
    }

    pub fn gte(field: impl Into<String>, value: f64) -> Self {
        Expression::GreaterOrEqual {
            field: field.into(),
            value,
        }
    }

    pub fn lt(field: impl Into<String>, value: f64) -> Self {
        Expression::LowerThan {
            field: field.into(),
            value,
        }
    }

    pub fn lte(field: impl Into<String>, value: f64) -> Self {
        Expression::LowerOrEqual {
            field: field.into(),
            value,
        }
    }

    pub fn regex(field: impl Into<String>, regex: Regex) -> Self {
        Expression::Regex {
            field: field.into(),
            regex,
        }
    }

    pub fn elem_match(field: impl Into<String>, query: Query) -> Self {
        Expression::ElemMatch {
            field: field.into(),
            query,
        }
    }

    /// Field the expression applies to; `None` for `And` / `Or`.
    pub fn field(&self) -> Option<&str> {
        match self {
            Expression::And(_) | Expression::Or(_) => None,
            Expression::Equal { field, .. }
            | Expression::NotEqual { field, .. }
            | Expression::In { field, .. }
            | Expression::NotIn { field, .. }
            | Expression::Exist { field }
            | Expression::NotExist { field }
            | Expression::GreaterThan { field, .. }
            | Expression::GreaterOrEqual { field, .. }
            | Expression::LowerThan { field, .. }
            | Expression::LowerOrEqual { field, .. }
            | Expression::Regex { field, .. }
            | Expression::ElemMatch { field, .. } => Some(field),
        }
    }

    /// Operator name as written in a query.
    pub fn op_name(&self) -> &'static str {
        match self {
            Expression::And(_) => "$and",
            Expression::Or(_) => "$or",
            Expression::Equal { .. } => "$eq",
            Expression::NotEqual { .. } => "$ne",
            Expression::In { .. } => "$in",
            Expression::NotIn { .. } => "$nin",
            Expression::Exist { .. } => "$exists",
            Expression::NotExist { .. } => "$exists",
            Expression::GreaterThan { .. } => "$gt",
            Expression::GreaterOrEqual { .. } => "$gte",
            Expression::LowerThan { .. } => "$lt",
            Expression::LowerOrEqual { .. } => "$lte",
            Expression::Regex { .. } => "$regex",
            Expression::ElemMatch { .. } => "$elemMatch",
        }
    }
}

/// A filter: expressions joined by AND.
#[derive(Debug, Clone, Default)]
pub struct Query(Vec<Expression>);

impl Query {
    /// Builds a query from already validated expressions.
    pub fn from_expressions(expressions: Vec<Expression>) -> Self {
        Self(expressions)
    }

    pub fn with_expression(mut self, expression: Expression) -> Self {
        self.0.push(expression);
        self
    }

    /// Appends the expressions of `other`.
    pub fn extend(&mut self, other: Query) {
        self.0.extend(other.0);
    }

    pub fn expressions(&self) -> &[Expression] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expression_accessors() {
        let e = Expression::gt("age", 18.0);
        assert_eq!(e.field(), Some("age"));
        assert_eq!(e.op_name(), "$gt");

        let e = Expression::Or(vec![Expression::eq("a", json!(1)), Expression::exists("b")]);
        assert_eq!(e.field(), None);
        assert_eq!(e.op_name(), "$or");

        let sub = Query::default().with_expression(Expression::eq("name", json!("x")));
        let e = Expression::elem_match("items", sub);
        assert_eq!(e.field(), Some("items"));
        assert_eq!(e.op_name(), "$elemMatch");
    }

    #[test]
    fn test_query_builder() {
        let q = Query::default()
            .with_expression(Expression::eq("a", json!(1)))
            .with_expression(Expression::not_exists("b"));
        assert_eq!(q.len(), 2);

        let mut all = Query::from_expressions(vec![Expression::lt("c", 3.0)]);
        all.extend(q);
        assert_eq!(all.expressions().len(), 3);
        assert!(!all.is_empty());
    }
}
