//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{AppConfig, PersistenceBackend};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `listener.bind_address`.
pub const ENV_BIND_ADDRESS: &str = "DICE_BIND_ADDRESS";
/// Environment variable overriding `observability.log_level`.
pub const ENV_LOG_LEVEL: &str = "DICE_LOG_LEVEL";
/// Environment variable overriding `persistence.backend`.
pub const ENV_PERSISTENCE_BACKEND: &str = "DICE_PERSISTENCE_BACKEND";
/// Environment variable overriding `persistence.path`.
pub const ENV_PERSISTENCE_PATH: &str = "DICE_PERSISTENCE_PATH";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: '{value}'")]
    Override { var: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file plus the process environment.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    load_config_with_env(path, std::env::vars())
}

/// Load configuration from an optional TOML file plus the given variables.
///
/// Order of precedence: defaults, then file, then variables. The merged
/// result is validated before it is returned.
pub fn load_config_with_env<I>(path: Option<&Path>, vars: I) -> Result<AppConfig, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut config, vars)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply recognised `DICE_*` variables to the configuration.
pub fn apply_env_overrides<I>(config: &mut AppConfig, vars: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        match key.as_str() {
            ENV_BIND_ADDRESS => config.listener.bind_address = value,
            ENV_LOG_LEVEL => config.observability.log_level = value,
            ENV_PERSISTENCE_PATH => config.persistence.path = Some(value),
            ENV_PERSISTENCE_BACKEND => {
                config.persistence.backend = match value.to_ascii_lowercase().as_str() {
                    "memory" => PersistenceBackend::Memory,
                    "file" => PersistenceBackend::File,
                    _ => {
                        return Err(ConfigError::Override {
                            var: ENV_PERSISTENCE_BACKEND,
                            value,
                        })
                    }
                };
            }
            _ => {}
        }
    }
    Ok(())
}
