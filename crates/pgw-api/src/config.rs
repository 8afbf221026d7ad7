//! # Service Configuration
//!
//! Read from environment variables, each with a default. Command-line flags
//! in the binary override individual values after loading.
//!
//! | Variable               | Default                  |
//! |------------------------|--------------------------|
//! | `APP_PORT`             | `3000`                   |
//! | `PGW_CONTRACTS`        | `contracts/profile.yaml` |
//! | `PGW_MATCH_POLICY`     | `first-pass-wins`        |
//! | `PGW_BODY_LIMIT_BYTES` | `2097152`                |
//! | `PGW_METRICS_ENABLED`  | `true`                   |
//! | `PGW_LOG_FORMAT`       | `text`                   |

use std::path::PathBuf;
use std::str::FromStr;

use pgw_gateway::MatchPolicy;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CONTRACTS: &str = "contracts/profile.yaml";
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err("expected 'text' or 'json'".to_string()),
        }
    }
}

/// An environment variable held a value that cannot be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{key} lists no contract files")]
    NoContracts { key: &'static str },
}

/// Runtime configuration of the gateway service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    /// Contract files in registration order.
    pub contracts: Vec<PathBuf>,
    pub match_policy: MatchPolicy,
    pub body_limit: usize,
    pub metrics_enabled: bool,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            contracts: vec![PathBuf::from(DEFAULT_CONTRACTS)],
            match_policy: MatchPolicy::default(),
            body_limit: DEFAULT_BODY_LIMIT,
            metrics_enabled: true,
            log_format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Unset and blank values take the default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let contracts = match get("PGW_CONTRACTS") {
            Some(list) => parse_contract_list("PGW_CONTRACTS", &list)?,
            None => defaults.contracts,
        };

        Ok(Self {
            port: parse_or("APP_PORT", get("APP_PORT"), defaults.port, |v| {
                v.parse::<u16>().map_err(|e| e.to_string())
            })?,
            contracts,
            match_policy: parse_or("PGW_MATCH_POLICY", get("PGW_MATCH_POLICY"), defaults.match_policy, |v| {
                v.parse::<MatchPolicy>().map_err(|e| e.to_string())
            })?,
            body_limit: parse_or("PGW_BODY_LIMIT_BYTES", get("PGW_BODY_LIMIT_BYTES"), defaults.body_limit, |v| {
                match v.parse::<usize>() {
                    Ok(0) => Err("must be greater than zero".to_string()),
                    Ok(n) => Ok(n),
                    Err(e) => Err(e.to_string()),
                }
            })?,
            metrics_enabled: parse_or(
                "PGW_METRICS_ENABLED",
                get("PGW_METRICS_ENABLED"),
                defaults.metrics_enabled,
                parse_bool,
            )?,
            log_format: parse_or("PGW_LOG_FORMAT", get("PGW_LOG_FORMAT"), defaults.log_format, |v| v.parse())?,
        })
    }
}

/// Split a comma-separated list of contract files, ignoring blank entries.
pub fn parse_contract_list(key: &'static str, raw: &str) -> Result<Vec<PathBuf>, ConfigError> {
    let files: Vec<PathBuf> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect();
    if files.is_empty() {
        return Err(ConfigError::NoContracts { key });
    }
    Ok(files)
}

fn parse_or<T, F>(key: &'static str, raw: Option<String>, default: T, parse: F) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Result<T, String>,
{
    match raw {
        None => Ok(default),
        Some(value) => parse(value.trim()).map_err(|reason| ConfigError::Invalid { key, value, reason }),
    }
}

fn parse_bool(v: &str) -> Result<bool, String> {
    match v.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err("expected true or false".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        assert_eq!(load(&[]).unwrap(), AppConfig::default());
        let config = AppConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.contracts, vec![PathBuf::from("contracts/profile.yaml")]);
        assert_eq!(config.match_policy, MatchPolicy::FirstPassWins);
        assert!(config.metrics_enabled);
    }

    #[test]
    fn values_are_read_from_lookup() {
        let config = load(&[
            ("APP_PORT", "8088"),
            ("PGW_CONTRACTS", "a.yaml, b.json,,"),
            ("PGW_MATCH_POLICY", "reject-on-first-match"),
            ("PGW_BODY_LIMIT_BYTES", "1024"),
            ("PGW_METRICS_ENABLED", "false"),
            ("PGW_LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(config.port, 8088);
        assert_eq!(config.contracts, vec![PathBuf::from("a.yaml"), PathBuf::from("b.json")]);
        assert_eq!(config.match_policy, MatchPolicy::RejectOnFirstMatch);
        assert_eq!(config.body_limit, 1024);
        assert!(!config.metrics_enabled);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn blank_values_take_defaults() {
        assert_eq!(load(&[("APP_PORT", "  ")]).unwrap().port, 3000);
    }

    #[test]
    fn invalid_port_is_an_error() {
        let err = load(&[("APP_PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "APP_PORT", .. }), "got: {err}");
    }

    #[test]
    fn invalid_policy_and_bool_are_errors() {
        assert!(load(&[("PGW_MATCH_POLICY", "random")]).is_err());
        assert!(load(&[("PGW_METRICS_ENABLED", "maybe")]).is_err());
        assert!(load(&[("PGW_BODY_LIMIT_BYTES", "0")]).is_err());
        assert!(load(&[("PGW_LOG_FORMAT", "xml")]).is_err());
    }

    #[test]
    fn contract_list_of_only_separators_is_an_error() {
        let err = load(&[("PGW_CONTRACTS", " , ,")]).unwrap_err();
        assert_eq!(err, ConfigError::NoContracts { key: "PGW_CONTRACTS" });
    }
}
