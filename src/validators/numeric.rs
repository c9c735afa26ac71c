//! Integer and Float validators

use serde_json::{Number, Value};

use crate::schema::{ValidationError, ValidationResult};

/// Inclusive numeric range.
///
/// A bound that is NaN or infinite means "no bound" in that direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundaries {
    pub min: f64,
    pub max: f64,
}

impl Default for Boundaries {
    fn default() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }
}

impl Boundaries {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn at_least(min: f64) -> Self {
        Self {
            min,
            ..Self::default()
        }
    }

    pub fn at_most(max: f64) -> Self {
        Self {
            max,
            ..Self::default()
        }
    }

    fn below_min(&self, n: f64) -> bool {
        self.min.is_finite() && n < self.min
    }

    fn above_max(&self, n: f64) -> bool {
        self.max.is_finite() && n > self.max
    }
}

/// Validates integers. Whole-valued floats are accepted and normalized.
#[derive(Debug, Clone, Default)]
pub struct IntegerValidator {
    pub allowed: Vec<i64>,
    pub boundaries: Option<Boundaries>,
}

impl IntegerValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_boundaries(mut self, boundaries: Boundaries) -> Self {
        self.boundaries = Some(boundaries);
        self
    }

    pub fn with_allowed(mut self, allowed: impl IntoIterator<Item = i64>) -> Self {
        self.allowed = allowed.into_iter().collect();
        self
    }

    pub(crate) fn validate(&self, value: Value) -> ValidationResult<Value> {
        let i = self.parse(&value)?;

        if let Some(b) = &self.boundaries {
            let n = i as f64;
            if b.below_min(n) {
                return Err(ValidationError::invalid(format!("is lower than {:.0}", b.min)));
            }
            if b.above_max(n) {
                return Err(ValidationError::invalid(format!("is greater than {:.0}", b.max)));
            }
        }

        if !self.allowed.is_empty() && !self.allowed.contains(&i) {
            return Err(ValidationError::invalid("not one of the allowed values"));
        }

        Ok(Value::from(i))
    }

    pub(crate) fn validate_query(&self, value: Value) -> ValidationResult<Value> {
        self.parse(&value).map(Value::from)
    }

    fn parse(&self, value: &Value) -> ValidationResult<i64> {
        match value {
            Value::Number(n) => as_integer(n),
            _ => None,
        }
        .ok_or_else(|| ValidationError::invalid("not an integer"))
    }
}

fn as_integer(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    if n.is_u64() {
        return None;
    }
    let f = n.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Validates floating point numbers. Integers are accepted and normalized.
#[derive(Debug, Clone, Default)]
pub struct FloatValidator {
    pub allowed: Vec<f64>,
    pub boundaries: Option<Boundaries>,
}

impl FloatValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_boundaries(mut self, boundaries: Boundaries) -> Self {
        self.boundaries = Some(boundaries);
        self
    }

    pub fn with_allowed(mut self, allowed: impl IntoIterator<Item = f64>) -> Self {
        self.allowed = allowed.into_iter().collect();
        self
    }

    pub(crate) fn validate(&self, value: Value) -> ValidationResult<Value> {
        let f = self.parse(&value)?;

        if let Some(b) = &self.boundaries {
            if b.below_min(f) {
                return Err(ValidationError::invalid(format!("is lower than {:.2}", b.min)));
            }
            if b.above_max(f) {
                return Err(ValidationError::invalid(format!("is greater than {:.2}", b.max)));
            }
        }

        if !self.allowed.is_empty() && !self.allowed.contains(&f) {
            return Err(ValidationError::invalid("not one of the allowed values"));
        }

        Ok(Value::from(f))
    }

    pub(crate) fn validate_query(&self, value: Value) -> ValidationResult<Value> {
        self.parse(&value).map(Value::from)
    }

    fn parse(&self, value: &Value) -> ValidationResult<f64> {
        value
            .as_f64()
            .ok_or_else(|| ValidationError::invalid("not a float"))
    }
}
