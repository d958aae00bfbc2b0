//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

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

/// Parse TOML text without validating it.
pub fn parse_config(content: &str) -> Result<RelayConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load a TOML file. Validation runs after command-line overrides are applied.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

pub fn validated(config: RelayConfig) -> Result<RelayConfig, ConfigError> {
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\ncapacity = 128").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.cache.capacity, 128);
    }

    #[test]
    fn distinguishes_failures() {
        assert!(matches!(
            load_config(Path::new("/nonexistent/relay.toml")),
            Err(ConfigError::Io(_))
        ));
        assert!(matches!(parse_config("listener = 3"), Err(ConfigError::Parse(_))));

        let mut config = RelayConfig::default();
        config.listener.port = 0;
        config.listener.host = String::new();
        let err = validated(config).unwrap_err();
        assert!(err.to_string().starts_with("Validation failed: listener.host"));
    }
}
