//! Configuration module for the linecast servers.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;

use crate::chat::{DEFAULT_QUEUE_CAPACITY, WELCOME_LINE};
use crate::line::DEFAULT_MAX_LINE_LENGTH;

/// Which server the process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    /// Broadcast every received line to all connected clients
    #[default]
    Chat,
    /// Reply to each line on the same connection
    Echo,
}

/// Command-line arguments for the server
#[derive(Parser, Debug)]
#[command(name = "linecast")]
#[command(author = "linecast authors")]
#[command(version = "0.1.0")]
#[command(about = "Line-oriented TCP chat and echo server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., localhost:3000)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Server to run
    #[arg(long, value_enum)]
    pub mode: Option<ServerMode>,

    /// Number of pending broadcast entries before readers block
    #[arg(short = 'q', long)]
    pub queue_capacity: Option<usize>,

    /// Longest accepted line in bytes, terminator included
    #[arg(long)]
    pub max_line_length: Option<usize>,

    /// Log level (trace, debug, info, warn, error) [default: info]
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Server to run
    #[serde(default)]
    pub mode: ServerMode,
    /// Longest accepted line in bytes
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            mode: ServerMode::default(),
            max_line_length: default_max_line_length(),
        }
    }
}

/// Chat server configuration
#[derive(Debug, Deserialize)]
pub struct ChatConfig {
    /// Bounded queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Line sent to every client right after it connects
    #[serde(default = "default_welcome")]
    pub welcome: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            welcome: default_welcome(),
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

fn default_listen() -> String {
    "localhost:3000".to_string()
}

fn default_max_line_length() -> usize {
    DEFAULT_MAX_LINE_LENGTH
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_welcome() -> String {
    WELCOME_LINE.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub mode: ServerMode,
    pub queue_capacity: usize,
    pub max_line_length: usize,
    pub welcome: String,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::merge(
            CliArgs {
                config: None,
                listen: None,
                mode: None,
                queue_capacity: None,
                max_line_length: None,
                log_level: None,
            },
            TomlConfig::default(),
        )
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

        let config = Self::merge(cli, toml_config);
        config.validate()?;
        Ok(config)
    }

    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        Config {
            listen: cli.listen.unwrap_or(toml_config.server.listen),
            mode: cli.mode.unwrap_or(toml_config.server.mode),
            queue_capacity: cli
                .queue_capacity
                .unwrap_or(toml_config.chat.queue_capacity),
            max_line_length: cli
                .max_line_length
                .unwrap_or(toml_config.server.max_line_length),
            welcome: toml_config.chat.welcome,
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_line_length == 0 {
            return Err(ConfigError::Invalid(
                "max_line_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    Invalid(String),
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
            ConfigError::Invalid(reason) => write!(f, "Invalid configuration: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.listen, "localhost:3000");
        assert_eq!(config.server.mode, ServerMode::Chat);
        assert_eq!(config.chat.queue_capacity, 10);
        assert_eq!(config.chat.welcome, "Welcome to the server\n");
        assert_eq!(config.server.max_line_length, 64 * 1024);
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            listen = "0.0.0.0:4000"
            mode = "echo"
            max_line_length = 512

            [chat]
            queue_capacity = 32
            welcome = "hello\n"

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:4000");
        assert_eq!(config.server.mode, ServerMode::Echo);
        assert_eq!(config.server.max_line_length, 512);
        assert_eq!(config.chat.queue_capacity, 32);
        assert_eq!(config.chat.welcome, "hello\n");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_overrides_toml() {
        let cli = CliArgs::parse_from([
            "linecast",
            "--listen",
            "127.0.0.1:9000",
            "--mode",
            "echo",
            "-q",
            "4",
            "--log-level",
            "trace",
        ]);
        let toml_config: TomlConfig = toml::from_str(
            r#"
            [server]
            listen = "0.0.0.0:4000"
            [chat]
            queue_capacity = 32
            [logging]
            level = "debug"
        "#,
        )
        .unwrap();

        let config = Config::merge(cli, toml_config);
        assert_eq!(config.listen, "127.0.0.1:9000");
        assert_eq!(config.mode, ServerMode::Echo);
        assert_eq!(config.queue_capacity, 4);
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn test_zero_queue_capacity_rejected() {
        let config = Config {
            queue_capacity: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_max_line_length_rejected() {
        let config = Config {
            max_line_length: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_explicit_info_log_level_overrides_toml() {
        let cli = CliArgs::parse_from(["linecast", "--log-level", "info"]);
        let toml_config: TomlConfig = toml::from_str(
            r#"
            [logging]
            level = "debug"
        "#,
        )
        .unwrap();

        assert_eq!(Config::merge(cli, toml_config).log_level, "info");
    }

    #[test]
    fn test_toml_log_level_used_without_cli_flag() {
        let cli = CliArgs::parse_from(["linecast"]);
        let toml_config: TomlConfig = toml::from_str(
            r#"
            [logging]
            level = "warn"
        "#,
        )
        .unwrap();

        let config = Config::merge(cli, toml_config);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.max_line_length, DEFAULT_MAX_LINE_LENGTH);
    }
}
