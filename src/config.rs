//! Engine configuration
//!
//! Settings that shape built-in validators. Passed explicitly to the loader
//! and validator builders; there is no global configuration.

use serde::{Deserialize, Serialize};

use crate::validators::{PasswordValidator, TimeLayout, TimeValidator};

/// Argon2 cost parameters for password hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordConfig {
    /// Memory cost in KiB (default: 19456)
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,

    /// Number of passes (default: 2)
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Degree of parallelism (default: 1)
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

fn default_memory_kib() -> u32 {
    19456
}

fn default_iterations() -> u32 {
    2
}

fn default_parallelism() -> u32 {
    1
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Layouts accepted by time fields that do not list their own
    /// (default: rfc3339, rfc2822 and a few common formats)
    #[serde(default = "TimeLayout::defaults")]
    pub time_layouts: Vec<TimeLayout>,

    #[serde(default)]
    pub password: PasswordConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            time_layouts: TimeLayout::defaults(),
            password: PasswordConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses a JSON configuration; missing keys take their defaults.
    ///
    /// The top level must be an object.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if !value.is_object() {
            return Err(serde::de::Error::custom("configuration must be a JSON object"));
        }
        serde_json::from_value(value)
    }

    /// Time validator using the configured layouts.
    pub fn time_validator(&self) -> TimeValidator {
        TimeValidator::default().with_layouts(self.time_layouts.clone())
    }

    /// Password validator using the configured hashing cost.
    pub fn password_validator(&self) -> PasswordValidator {
        PasswordValidator::new().with_config(self.password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.time_layouts[..2], [TimeLayout::Rfc3339, TimeLayout::Rfc2822]);
        assert_eq!(config.password.memory_kib, 19456);
        assert_eq!(config.password.iterations, 2);
    }

    #[test]
    fn test_partial_json() {
        let config =
            EngineConfig::from_json_str(r#"{"password": {"iterations": 3}}"#).unwrap();
        assert_eq!(config.password.iterations, 3);
        assert_eq!(config.password.parallelism, 1);
        assert_eq!(config.time_layouts, TimeLayout::defaults());

        let config = EngineConfig::from_json_str(r#"{"time_layouts": [{"format": "%Y-%m-%d"}]}"#)
            .unwrap();
        assert_eq!(config.time_layouts, vec![TimeLayout::Format("%Y-%m-%d".into())]);
        assert_eq!(config.time_validator().layouts(), config.time_layouts.as_slice());
    }

    #[test]
    fn test_rejects_malformed() {
        let err = EngineConfig::from_json_str("[]").unwrap_err();
        assert_eq!(err.to_string(), "configuration must be a JSON object");
        assert!(EngineConfig::from_json_str("3").is_err());
        assert!(EngineConfig::from_json_str("{}").is_ok());
        assert!(EngineConfig::from_json_str(r#"{"time_layouts": ["iso"]}"#).is_err());
    }
}
