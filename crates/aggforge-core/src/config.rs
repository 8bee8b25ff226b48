//! Configuration management for AggForge
//!
//! Settings are layered: built-in defaults, then an optional file (TOML, YAML
//! or JSON, picked by extension), then `AGGFORGE__<SECTION>__<KEY>`
//! environment variables.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "AGGFORGE";

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Compiler configuration
    pub compiler: CompilerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = ::config::Config::builder()
            .add_source(::config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(path).required(true));
        }

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

/// Query compiler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Bucket count of plain `terms` facets, backend default when unset
    pub default_facet_size: Option<u32>,
    /// Lowest HTTP status counted as an error
    pub error_status_from: u16,
    /// Indent documents printed with `--format json`; text output is always indented
    pub pretty: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            default_facet_size: None,
            error_status_from: 400,
            pretty: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.compiler, CompilerConfig::default());
        assert_eq!(config.compiler.error_status_from, 400);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Config::load(Some("/nonexistent/aggforge.toml")).is_err());
    }
}
