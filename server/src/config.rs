use std::time::Duration;

use holdem_engine::table::TableConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    InvalidValue(String),
}

/// Process-wide settings for the table server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origin allowed to call the API across origins. `None` allows any
    /// origin, which is only appropriate for development.
    pub client_origin: Option<String>,
    /// How often the reaper sweeps for empty tables.
    pub reap_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            client_origin: None,
            reap_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl ServerConfig {
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            ..Self::default()
        }
    }
}

/// Per-table overrides accepted on table creation. Anything left out
/// falls back to the standard five-seat table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOptions {
    #[serde(default)]
    pub small_blind: Option<u32>,
    #[serde(default)]
    pub big_blind: Option<u32>,
    #[serde(default)]
    pub starting_stack: Option<u32>,
}

/// Build and validate a table configuration from client overrides.
pub fn table_config_from(options: &TableOptions) -> Result<TableConfig, ConfigError> {
    let mut config = TableConfig::default();
    if let Some(small_blind) = options.small_blind {
        config.small_blind = small_blind;
    }
    if let Some(big_blind) = options.big_blind {
        config.big_blind = big_blind;
    }
    if let Some(starting_stack) = options.starting_stack {
        config.starting_stack = starting_stack;
    }
    validate_table_config(&config)?;
    Ok(config)
}

pub fn validate_table_config(config: &TableConfig) -> Result<(), ConfigError> {
    if config.small_blind == 0 {
        return Err(ConfigError::InvalidValue(
            "small_blind must be greater than 0".to_string(),
        ));
    }
    if config.big_blind <= config.small_blind {
        return Err(ConfigError::InvalidValue(
            "big_blind must exceed small_blind".to_string(),
        ));
    }
    if config.starting_stack < config.big_blind {
        return Err(ConfigError::InvalidValue(
            "starting_stack must cover at least one big blind".to_string(),
        ));
    }
    if !(2..=9).contains(&config.max_players) {
        return Err(ConfigError::InvalidValue(
            "max_players must be between 2 and 9".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_the_standard_table() {
        let config = table_config_from(&TableOptions::default()).unwrap();
        assert_eq!(config.max_players, 5);
        assert_eq!(config.small_blind, 5);
        assert_eq!(config.big_blind, 10);
        assert_eq!(config.starting_stack, 1000);
        assert_eq!(config.action_timeout, Duration::from_secs(20));
        assert_eq!(config.payout_display, Duration::from_secs(3));
        assert_eq!(config.inter_hand_delay, Duration::from_secs(2));
    }

    #[test]
    fn overrides_are_applied_and_validated() {
        let options = TableOptions {
            small_blind: Some(25),
            big_blind: Some(50),
            starting_stack: Some(5000),
        };
        let config = table_config_from(&options).unwrap();
        assert_eq!(config.small_blind, 25);
        assert_eq!(config.big_blind, 50);
        assert_eq!(config.starting_stack, 5000);
    }

    #[test]
    fn inverted_blinds_are_rejected() {
        let options = TableOptions {
            small_blind: Some(50),
            big_blind: Some(10),
            ..TableOptions::default()
        };
        assert!(table_config_from(&options).is_err());
    }

    #[test]
    fn zero_small_blind_is_rejected() {
        let options = TableOptions {
            small_blind: Some(0),
            ..TableOptions::default()
        };
        assert!(table_config_from(&options).is_err());
    }
}
