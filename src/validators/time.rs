//! Time validator
//!
//! The native form of a time value is an RFC 3339 string in UTC. Other
//! representations are parsed against an ordered list of layouts and
//! normalized to that form.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{CompileError, CompileResult, ValidationError, ValidationResult};

/// A time layout accepted by `TimeValidator`.
///
/// Deserializes from `"rfc3339"`, `"rfc2822"` or `{"format": "<strftime>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeLayout {
    Rfc3339,
    Rfc2822,
    /// chrono strftime pattern; a pattern without offset is read as UTC
    Format(String),
}

impl TimeLayout {
    /// Layouts used when none are configured.
    pub fn defaults() -> Vec<TimeLayout> {
        vec![
            TimeLayout::Rfc3339,
            TimeLayout::Rfc2822,
            TimeLayout::Format("%a %b %e %H:%M:%S %Y".to_string()),
            TimeLayout::Format("%Y-%m-%d %H:%M:%S".to_string()),
            TimeLayout::Format("%Y-%m-%dT%H:%M:%S".to_string()),
        ]
    }

    pub fn parse(&self, s: &str) -> Option<DateTime<Utc>> {
        match self {
            TimeLayout::Rfc3339 => parse_time(s),
            TimeLayout::Rfc2822 => DateTime::parse_from_rfc2822(s)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            TimeLayout::Format(format) => DateTime::parse_from_str(s, format)
                .map(|t| t.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, format)
                        .ok()
                        .map(|naive| Utc.from_utc_datetime(&naive))
                }),
        }
    }
}

/// Parses a value in native form.
pub fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Renders a time in native form.
pub fn format_time(t: DateTime<Utc>) -> Value {
    Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Validates time values.
#[derive(Debug, Clone)]
pub struct TimeValidator {
    layouts: Vec<TimeLayout>,
}

impl Default for TimeValidator {
    fn default() -> Self {
        Self {
            layouts: TimeLayout::defaults(),
        }
    }
}

impl TimeValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the accepted layouts. Tried in order, first match wins.
    pub fn with_layouts(mut self, layouts: Vec<TimeLayout>) -> Self {
        self.layouts = layouts;
        self
    }

    pub fn layouts(&self) -> &[TimeLayout] {
        &self.layouts
    }

    /// Rejects strftime layouts chrono cannot read.
    pub(crate) fn compile(&self) -> CompileResult<()> {
        for layout in &self.layouts {
            if let TimeLayout::Format(format) = layout {
                if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                    return Err(CompileError::InvalidTimeLayout(format.clone()));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn validate(&self, value: Value) -> ValidationResult<Value> {
        let s = value
            .as_str()
            .ok_or_else(|| ValidationError::invalid("not a time"))?;

        parse_time(s)
            .or_else(|| self.layouts.iter().find_map(|layout| layout.parse(s)))
            .map(format_time)
            .ok_or_else(|| ValidationError::invalid("not a time"))
    }
}

pub(crate) fn less_time(a: &Value, b: &Value) -> bool {
    match (a.as_str().and_then(parse_time), b.as_str().and_then(parse_time)) {
        (Some(a), Some(b)) => a < b,
        _ => false,
    }
}
