//! Command-line flags. Any flag given overrides the config file.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{load_config, validated, ConfigError};
use crate::config::schema::RelayConfig;

#[derive(Debug, Default, Parser)]
#[command(
    name = "concrete-relay",
    version,
    about = "HTTP relay for Concrete fetch and search services"
)]
pub struct CliArgs {
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Host interface to listen on [default: localhost]
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on [default: 8080]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// [default: localhost]
    #[arg(long)]
    pub fetch_host: Option<String>,

    /// [default: 9092]
    #[arg(long)]
    pub fetch_port: Option<u16>,

    /// [default: localhost]
    #[arg(long)]
    pub search_host: Option<String>,

    /// [default: 9090]
    #[arg(long)]
    pub search_port: Option<u16>,

    /// Logging verbosity level threshold (to stderr) [default: info]
    #[arg(short = 'l', long = "loglevel", visible_alias = "log-level")]
    pub log_level: Option<String>,

    /// Path where HTML files are stored [default: ui]
    #[arg(long)]
    pub static_path: Option<String>,

    /// Size of LRU Communication cache; 0 disables the cache [default: 0]
    #[arg(long)]
    pub lru_cache_size: Option<usize>,
}

impl CliArgs {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut RelayConfig) {
        if let Some(host) = &self.host {
            config.listener.host = host.clone();
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(host) = &self.fetch_host {
            config.fetch_backend.host = host.clone();
        }
        if let Some(port) = self.fetch_port {
            config.fetch_backend.port = port;
        }
        if let Some(host) = &self.search_host {
            config.search_backend.host = host.clone();
        }
        if let Some(port) = self.search_port {
            config.search_backend.port = port;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
        if let Some(path) = &self.static_path {
            config.static_files.root = path.clone();
        }
        if let Some(size) = self.lru_cache_size {
            config.cache.capacity = size;
        }
    }

    /// Load the config file if one was named, apply overrides, validate.
    pub fn into_config(self) -> Result<RelayConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => RelayConfig::default(),
        };
        self.apply(&mut config);
        validated(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = CliArgs::try_parse_from([
            "concrete-relay",
            "-p",
            "9000",
            "--fetch-port",
            "1234",
            "--log-level",
            "WARNING",
            "--lru-cache-size",
            "10",
        ])
        .unwrap();
        let config = args.into_config().unwrap();
        assert_eq!(config.listener.port, 9000);
        assert_eq!(config.fetch_backend.port, 1234);
        assert_eq!(config.search_backend.port, 9090);
        assert_eq!(config.observability.log_level, "WARNING");
        assert_eq!(config.cache.capacity, 10);
    }

    #[test]
    fn short_loglevel_flag() {
        let args = CliArgs::try_parse_from(["concrete-relay", "-l", "debug"]).unwrap();
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn invalid_override_fails_validation() {
        let args = CliArgs::try_parse_from(["concrete-relay", "--search-port", "0"]).unwrap();
        assert!(matches!(args.into_config(), Err(ConfigError::Validation(_))));
    }
}
