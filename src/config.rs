//! Configuration module for the cgicc-hello responder.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values. With neither,
//! the server listens on all interfaces, port 8888.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the responder
#[derive(Parser, Debug)]
#[command(name = "cgicc-hello")]
#[command(author = "cgicc-hello authors")]
#[command(version = "0.1.0")]
#[command(about = "Prints each request and replies with a fixed HTML page", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to (e.g., 0.0.0.0)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// What to do when a single connection fails
    #[arg(long, value_enum)]
    pub on_error: Option<FailurePolicy>,

    /// Receive timeout in seconds (0 or unset = wait forever)
    #[arg(long)]
    pub read_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Handling of per-connection failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop serving and return the error.
    #[default]
    Propagate,
    /// Log the error, drop the connection and keep serving.
    Isolate,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub on_error: FailurePolicy,
    /// Receive timeout in seconds (0 = wait forever)
    pub read_timeout: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            on_error: FailurePolicy::default(),
            read_timeout: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8888
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub on_error: FailurePolicy,
    pub read_timeout: Option<Duration>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let toml_config = TomlConfig::default();
        Config {
            host: toml_config.server.host,
            port: toml_config.server.port,
            on_error: toml_config.server.on_error,
            read_timeout: None,
            log_level: toml_config.logging.level,
        }
    }
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Ok(Self::merge(cli, toml_config))
    }

    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        Config {
            host: cli.host.unwrap_or(toml_config.server.host),
            port: cli.port.unwrap_or(toml_config.server.port),
            on_error: cli.on_error.unwrap_or(toml_config.server.on_error),
            read_timeout: cli
                .read_timeout
                .or(toml_config.server.read_timeout)
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs),
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        }
    }

    /// The `host:port` string the listener binds to.
    pub fn listen_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8888);
        assert_eq!(config.on_error, FailurePolicy::Propagate);
        assert_eq!(config.read_timeout, None);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.listen_addr(), "0.0.0.0:8888");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            host = "127.0.0.1"
            port = 9000
            on_error = "isolate"
            read_timeout = 2

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.on_error, FailurePolicy::Isolate);
        assert_eq!(config.server.read_timeout, Some(2));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_toml_rejects_unknown_policy() {
        let toml_str = r#"
            [server]
            on_error = "retry"
        "#;
        assert!(toml::from_str::<TomlConfig>(toml_str).is_err());
    }

    #[test]
    fn test_cli_overrides_toml() {
        let cli = CliArgs::parse_from([
            "cgicc-hello",
            "--port",
            "7000",
            "--on-error",
            "isolate",
            "--log-level",
            "trace",
        ]);
        let toml_config: TomlConfig = toml::from_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000
            read_timeout = 5
        "#,
        )
        .unwrap();

        let config = Config::merge(cli, toml_config);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 7000);
        assert_eq!(config.on_error, FailurePolicy::Isolate);
        assert_eq!(config.read_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn test_zero_read_timeout_waits_forever() {
        let cli = CliArgs::parse_from(["cgicc-hello", "--read-timeout", "0"]);
        let config = Config::merge(cli, TomlConfig::default());
        assert_eq!(config.read_timeout, None);

        let toml_config: TomlConfig = toml::from_str(
            r#"
            [server]
            read_timeout = 0
        "#,
        )
        .unwrap();
        let cli = CliArgs::parse_from(["cgicc-hello"]);
        let config = Config::merge(cli, toml_config);
        assert_eq!(config.read_timeout, None);
    }

    #[test]
    fn test_ipv6_listen_addr() {
        let config = Config {
            host: "::1".to_string(),
            ..Config::default()
        };
        assert_eq!(config.listen_addr(), "[::1]:8888");
    }
}
