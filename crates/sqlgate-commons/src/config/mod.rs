//! Gateway configuration.
//!
//! Configuration is a plain serde tree loaded from a TOML file. Every field
//! has a default so a missing section falls back to shipped values;
//! `validate` catches the combinations that would make the gateway unsafe
//! (zero refill rates, inverted length bounds).

mod defaults;
mod types;

pub use types::{
    ExecutionSettings, GatewayConfig, LimitsSettings, PolicySettings, RateLimitSettings,
};

use std::path::Path;
use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl GatewayConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: GatewayConfig =
            toml::from_str(&raw).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the serde defaults alone cannot enforce.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_row_limit == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_row_limit must be positive".to_string(),
            ));
        }
        if self.limits.default_row_limit > self.limits.max_row_limit {
            return Err(ConfigError::Invalid(
                "limits.default_row_limit cannot exceed limits.max_row_limit".to_string(),
            ));
        }
        let rates = [
            ("rate_limit.global_refill_per_sec", self.rate_limit.global_refill_per_sec),
            ("rate_limit.generate_refill_per_sec", self.rate_limit.generate_refill_per_sec),
            ("rate_limit.execute_refill_per_sec", self.rate_limit.execute_refill_per_sec),
            ("rate_limit.table_refill_per_sec", self.rate_limit.table_refill_per_sec),
        ];
        for (name, rate) in rates {
            if rate <= 0.0 {
                return Err(ConfigError::Invalid(format!("{} must be positive", name)));
            }
        }
        if self.policy.min_question_length > self.policy.max_question_length {
            return Err(ConfigError::Invalid(
                "policy.min_question_length cannot exceed policy.max_question_length".to_string(),
            ));
        }
        if self.execution.max_concurrent_queries == 0 {
            return Err(ConfigError::Invalid(
                "execution.max_concurrent_queries must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.limits.max_row_limit, 5000);
        assert_eq!(config.rate_limit.global_capacity, 60);
    }

    #[test]
    fn test_load_partial_toml_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[limits]
max_row_limit = 2000

[policy]
table_allowlist = ["sales", "inventory"]
"#
        )
        .unwrap();

        let config = GatewayConfig::load(file.path()).unwrap();
        assert_eq!(config.limits.max_row_limit, 2000);
        assert_eq!(config.limits.default_row_limit, 1000);
        assert_eq!(config.policy.table_allowlist.len(), 2);
        assert!(config.rate_limit.execute_capacity == 20);
    }

    #[test]
    fn test_validate_rejects_zero_refill() {
        let mut config = GatewayConfig::default();
        config.rate_limit.global_refill_per_sec = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_inverted_row_limits() {
        let mut config = GatewayConfig::default();
        config.limits.default_row_limit = 9000;
        assert!(config.validate().is_err());
    }
}
