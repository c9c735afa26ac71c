//! URL validator

use serde_json::Value;
use url::{ParseError, Url};

use crate::schema::{ValidationError, ValidationResult};

/// Validates URLs.
///
/// By default only absolute `http`/`https` URLs whose host contains a dot are
/// accepted.
#[derive(Debug, Clone, Default)]
pub struct UrlValidator {
    pub allow_relative: bool,
    /// Accept hosts without a dot, such as `localhost`
    pub allow_locale: bool,
    pub allow_non_http: bool,
    /// When non-empty, overrides `allow_non_http`
    pub allowed_schemes: Vec<String>,
}

impl UrlValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_relative(mut self) -> Self {
        self.allow_relative = true;
        self
    }

    pub fn allow_locale(mut self) -> Self {
        self.allow_locale = true;
        self
    }

    pub fn allow_non_http(mut self) -> Self {
        self.allow_non_http = true;
        self
    }

    pub fn with_allowed_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_schemes = schemes.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn validate(&self, value: Value) -> ValidationResult<Value> {
        let s = value
            .as_str()
            .ok_or_else(|| ValidationError::invalid("invalid type"))?;

        let url = match Url::parse(s) {
            Ok(url) => url,
            Err(ParseError::RelativeUrlWithoutBase) => {
                if !self.allow_relative {
                    return Err(ValidationError::invalid("is relative URL"));
                }
                return Ok(value);
            }
            Err(e) => return Err(ValidationError::invalid(format!("invalid URL: {}", e))),
        };

        if !self.allow_locale && !url.host_str().map_or(false, |h| h.contains('.')) {
            return Err(ValidationError::invalid("invalid domain"));
        }

        let scheme = url.scheme();
        let scheme_ok = if self.allowed_schemes.is_empty() {
            self.allow_non_http || scheme == "http" || scheme == "https"
        } else {
            self.allowed_schemes.iter().any(|s| s == scheme)
        };
        if !scheme_ok {
            return Err(ValidationError::invalid("invalid scheme"));
        }

        Ok(Value::String(url.to_string()))
    }
}
