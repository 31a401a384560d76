use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::constants::{
    DEFAULT_CONFIG_FILE, DEFAULT_LOG_LEVEL, DEFAULT_MAX_OCCURRENCES, DEFAULT_TOLERANCE_SECONDS,
    ENV_PREFIX,
};
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub expansion: ExpansionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpansionConfig {
    /// Seconds either side of a requested timestamp that still match an occurrence.
    pub tolerance_seconds: i64,
    pub max_occurrences: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            expansion: ExpansionConfig::default(),
            logging: LoggingConfig {
                level: DEFAULT_LOG_LEVEL.to_string(),
            },
        }
    }
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            tolerance_seconds: DEFAULT_TOLERANCE_SECONDS,
            max_occurrences: DEFAULT_MAX_OCCURRENCES,
        }
    }
}

impl Settings {
    /// ## Summary
    /// Loads configuration from environment variables and `config.toml` (if present).
    /// File values take precedence over environment variables.
    ///
    /// ## Errors
    /// Returns an error if building, deserializing or validating the configuration fails.
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// ## Summary
    /// Loads configuration using `path` as the optional TOML file source.
    ///
    /// ## Errors
    /// Returns an error if building, deserializing or validating the configuration fails.
    pub fn load_from(path: &str) -> Result<Self> {
        Self::load_with(path, Self::environment())
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .ignore_empty(true)
            .try_parsing(true)
    }

    fn load_with(path: &str, environment: config::Environment) -> Result<Self> {
        let settings = Config::builder()
            .set_default("expansion.tolerance_seconds", DEFAULT_TOLERANCE_SECONDS)?
            .set_default(
                "expansion.max_occurrences",
                u64::try_from(DEFAULT_MAX_OCCURRENCES)?,
            )?
            .set_default("logging.level", DEFAULT_LOG_LEVEL)?
            // Env vars
            .add_source(environment)
            // TOML file
            .add_source(config::File::with_name(path).required(false))
            .build()?
            .try_deserialize::<Settings>()?;

        settings.validate()?;
        Ok(settings)
    }

    /// ## Summary
    /// Rejects values the expansion engine cannot work with.
    ///
    /// ## Errors
    /// Returns `CoreError::InvalidConfiguration` for a negative tolerance or a zero occurrence limit.
    pub fn validate(&self) -> CoreResult<()> {
        if self.expansion.tolerance_seconds < 0 {
            return Err(CoreError::InvalidConfiguration(format!(
                "expansion.tolerance_seconds must not be negative (got {})",
                self.expansion.tolerance_seconds
            )));
        }
        if self.expansion.max_occurrences == 0 {
            return Err(CoreError::InvalidConfiguration(
                "expansion.max_occurrences must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// ## Summary
/// Loads configuration from environment variables, `.env` and `config.toml`.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    tracing::debug!(settings = ?settings, "Configuration loaded");
    Ok(settings)
}
