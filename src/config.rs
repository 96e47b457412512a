//! Configuration for the echo-schema tools
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (echo-schema.toml)
//! - Environment variables (ECHO_SCHEMA__*)
//!
//! ## Example config file (echo-schema.toml):
//! ```toml
//! [codec]
//! schema_uri = "http://json-schema.org/draft-07/schema#"
//! output_format = "pretty"
//!
//! [logging]
//! filter = "echo_schema=debug"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::codec::{ExportOptions, JSON_SCHEMA_DRAFT_07};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EchoConfig {
    /// Codec settings
    #[serde(default)]
    pub codec: CodecConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Codec configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecConfig {
    /// `$schema` of exported documents; empty to omit it
    #[serde(default = "default_schema_uri")]
    pub schema_uri: String,

    /// Output format (pretty or compact)
    #[serde(default)]
    pub output_format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_schema_uri() -> String {
    JSON_SCHEMA_DRAFT_07.to_string()
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            schema_uri: default_schema_uri(),
            output_format: OutputFormat::Pretty,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl EchoConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, with an optional required file on top of the
    /// default locations
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["echo-schema.toml", ".echo-schema.toml", "config/echo-schema.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(dirs) = directories::ProjectDirs::from("org", "echo", "echo-schema") {
            let xdg_config = dirs.config_dir().join("echo-schema.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // ECHO_SCHEMA__CODEC__OUTPUT_FORMAT=compact
        builder = builder.add_source(
            Environment::with_prefix("ECHO_SCHEMA")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Export options for the codec
    pub fn export_options(&self) -> ExportOptions {
        let uri = self.codec.schema_uri.trim();
        ExportOptions {
            schema_uri: (!uri.is_empty()).then(|| uri.to_string()),
        }
    }

    /// Render a document in the configured output format
    pub fn render(&self, document: &serde_json::Value) -> serde_json::Result<String> {
        match self.codec.output_format {
            OutputFormat::Pretty => serde_json::to_string_pretty(document),
            OutputFormat::Compact => serde_json::to_string(document),
        }
    }
}
