// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as known origin names, positive rate caps, and
//! complete station assignments.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::GuicheConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &GuicheConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Validate log level is one of the tracing levels
    let level = config.service.log_level.trim();
    if !LOG_LEVELS.contains(&level) {
        errors.push(ConfigError::Validation {
            message: format!(
                "service.log_level must be one of trace, debug, info, warn, error; got `{level}`"
            ),
        });
    }

    // Validate database_path is not empty
    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    // Validate origins: at least one, all known, no duplicates
    if config.counters.origins.is_empty() {
        errors.push(ConfigError::Validation {
            message: "counters.origins must list at least one origin".to_string(),
        });
    }
    let mut seen_origins = HashSet::new();
    for name in &config.counters.origins {
        if name.parse::<guiche_core::types::Origin>().is_err() {
            errors.push(ConfigError::Validation {
                message: format!(
                    "counters.origins has unknown origin `{name}` (expected estadual or municipal)"
                ),
            });
        }
        if !seen_origins.insert(name.as_str()) {
            errors.push(ConfigError::Validation {
                message: format!("duplicate origin `{name}` in counters.origins"),
            });
        }
    }

    // Validate rate caps and batch ceiling are usable
    if config.counters.daily_cap == 0 {
        errors.push(ConfigError::Validation {
            message: "counters.daily_cap must be at least 1".to_string(),
        });
    }
    if config.counters.shift_cap == 0 {
        errors.push(ConfigError::Validation {
            message: "counters.shift_cap must be at least 1".to_string(),
        });
    }
    if config.counters.max_batch == 0 {
        errors.push(ConfigError::Validation {
            message: "counters.max_batch must be at least 1".to_string(),
        });
    }

    // Validate rate scope names a known policy
    if config.counters.scope().is_err() {
        errors.push(ConfigError::Validation {
            message: format!(
                "counters.rate_scope must be `global` or `per-origin`, got `{}`",
                config.counters.rate_scope
            ),
        });
    }

    // Validate gateway host is not empty and looks like an IP or hostname
    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.gateway.bus_capacity == 0 {
        errors.push(ConfigError::Validation {
            message: "gateway.bus_capacity must be at least 1".to_string(),
        });
    }

    if config.gateway.receipt_ttl_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "gateway.receipt_ttl_secs must be at least 1".to_string(),
        });
    }

    // Validate station assignments are complete
    for (operator, station) in &config.stations {
        if operator.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "stations has an entry with an empty operator id".to_string(),
            });
        }
        if station.room.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("stations.{operator}.room must not be empty"),
            });
        }
        if station.desk.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("stations.{operator}.desk must not be empty"),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = GuicheConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = GuicheConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))));
    }

    #[test]
    fn unknown_origin_fails_validation() {
        let mut config = GuicheConfig::default();
        config.counters.origins = vec!["federal".to_string()];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("federal"))));
    }

    #[test]
    fn duplicate_origin_fails_validation() {
        let mut config = GuicheConfig::default();
        config.counters.origins = vec!["estadual".to_string(), "estadual".to_string()];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("duplicate origin"))));
    }

    #[test]
    fn zero_caps_fail_validation() {
        let mut config = GuicheConfig::default();
        config.counters.daily_cap = 0;
        config.counters.shift_cap = 0;
        config.counters.max_batch = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors
                .iter()
                .filter(|e| matches!(e, ConfigError::Validation { message } if message.contains("at least 1")))
                .count(),
            3
        );
    }

    #[test]
    fn bad_rate_scope_fails_validation() {
        let mut config = GuicheConfig::default();
        config.counters.rate_scope = "per-desk".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("rate_scope"))));
    }

    #[test]
    fn bad_log_level_fails_validation() {
        let mut config = GuicheConfig::default();
        config.service.log_level = "verbose".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("log_level"))));
    }

    #[test]
    fn incomplete_station_fails_validation() {
        let toml_str = r#"
[stations.op1]
room = "3"
desk = ""
"#;
        let config: GuicheConfig = toml::from_str(toml_str).unwrap();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("stations.op1.desk"))));
    }

    #[test]
    fn stations_deserialize_as_map() {
        let toml_str = r#"
[stations.op1]
room = "3"
desk = "2"

[stations.op2]
room = "1"
desk = "5"
"#;
        let config: GuicheConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.stations.len(), 2);
        assert_eq!(config.stations["op1"].room, "3");
        assert_eq!(config.stations["op2"].desk, "5");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn stations_deny_unknown_fields() {
        let toml_str = r#"
[stations.op1]
room = "3"
desk = "2"
floor = "9"
"#;
        let result = toml::from_str::<GuicheConfig>(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn valid_custom_config_passes() {
        let mut config = GuicheConfig::default();
        config.gateway.host = "0.0.0.0".to_string();
        config.storage.database_path = "/tmp/test.db".to_string();
        config.counters.origins = vec!["municipal".to_string()];
        config.counters.rate_scope = "per-origin".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
