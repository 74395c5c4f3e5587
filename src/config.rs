//! Configuration system for the traffic reset service.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. Environment variables (highest priority)
//! 2. `config.toml` file
//! 3. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `TRAFFIC_RESET_DATABASE_TYPE` - Database type (sqlite, postgres)
//! - `TRAFFIC_RESET_DATABASE_URL` - Database connection URL
//! - `TRAFFIC_RESET_LOGGING_ENABLED` - Enable the log subscriber
//! - `TRAFFIC_RESET_LOG_LEVEL` - Log level (trace, debug, info, warn, error)
//! - `TRAFFIC_RESET_JOB_ENABLED` - Schedule the traffic reset job
//! - `TRAFFIC_RESET_CRON` - Cron expression for the traffic reset job
//! - `TRAFFIC_RESET_ALL_OR_NOTHING` - Roll back the whole run on any failed update

use config::Config;
use serde::Deserialize;
use std::env;
use std::sync::OnceLock;

use crate::errors::{ResetError, ResetResult};

/// Global configuration singleton.
static CONFIG: OnceLock<ResetConfig> = OnceLock::new();

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResetConfig {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Background job configuration
    pub jobs: JobsConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database type: "sqlite" or "postgres"
    pub db_type: String,
    /// SQLite connection URL
    pub sqlite_url: String,
    /// PostgreSQL connection URL
    pub postgres_url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: "sqlite".to_string(),
            sqlite_url: "sqlite://s-ui.db".to_string(),
            postgres_url: "postgres://localhost/s-ui".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Enable logging
    pub enabled: bool,
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
        }
    }
}

/// Background job configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Whether the traffic reset job is scheduled
    pub traffic_reset_enabled: bool,
    /// Cron expression (with seconds) for the traffic reset job
    pub traffic_reset_cron: String,
    /// Roll back the whole run if any single client update fails
    pub traffic_reset_all_or_nothing: bool,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            traffic_reset_enabled: true,
            // Daily at midnight
            traffic_reset_cron: "0 0 0 * * *".to_string(),
            traffic_reset_all_or_nothing: false,
        }
    }
}

fn config_err(e: config::ConfigError) -> ResetError {
    ResetError::ConfigError(e.to_string())
}

impl ResetConfig {
    /// Load configuration from file and environment.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. `config.toml` file (optional)
    /// 3. Environment variables
    pub fn load() -> ResetResult<Self> {
        let defaults = ResetConfig::default();

        let builder = Config::builder()
            .set_default("database.db_type", defaults.database.db_type)
            .map_err(config_err)?
            .set_default("database.sqlite_url", defaults.database.sqlite_url)
            .map_err(config_err)?
            .set_default("database.postgres_url", defaults.database.postgres_url)
            .map_err(config_err)?
            .set_default("logging.enabled", defaults.logging.enabled)
            .map_err(config_err)?
            .set_default("logging.level", defaults.logging.level)
            .map_err(config_err)?
            .set_default("jobs.traffic_reset_enabled", defaults.jobs.traffic_reset_enabled)
            .map_err(config_err)?
            .set_default("jobs.traffic_reset_cron", defaults.jobs.traffic_reset_cron)
            .map_err(config_err)?
            .set_default(
                "jobs.traffic_reset_all_or_nothing",
                defaults.jobs.traffic_reset_all_or_nothing,
            )
            .map_err(config_err)?
            // Load from config.toml (optional)
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables
            .set_override_option(
                "database.db_type",
                env::var("TRAFFIC_RESET_DATABASE_TYPE").ok(),
            )
            .map_err(config_err)?
            .set_override_option(
                "database.sqlite_url",
                env::var("TRAFFIC_RESET_DATABASE_URL")
                    .ok()
                    .filter(|url| url.starts_with("sqlite")),
            )
            .map_err(config_err)?
            .set_override_option(
                "database.postgres_url",
                env::var("TRAFFIC_RESET_DATABASE_URL")
                    .ok()
                    .filter(|url| url.starts_with("postgres")),
            )
            .map_err(config_err)?
            .set_override_option(
                "logging.enabled",
                env::var("TRAFFIC_RESET_LOGGING_ENABLED")
                    .ok()
                    .and_then(|v| v.parse::<bool>().ok()),
            )
            .map_err(config_err)?
            .set_override_option("logging.level", env::var("TRAFFIC_RESET_LOG_LEVEL").ok())
            .map_err(config_err)?
            .set_override_option(
                "jobs.traffic_reset_enabled",
                env::var("TRAFFIC_RESET_JOB_ENABLED")
                    .ok()
                    .and_then(|v| v.parse::<bool>().ok()),
            )
            .map_err(config_err)?
            .set_override_option("jobs.traffic_reset_cron", env::var("TRAFFIC_RESET_CRON").ok())
            .map_err(config_err)?
            .set_override_option(
                "jobs.traffic_reset_all_or_nothing",
                env::var("TRAFFIC_RESET_ALL_OR_NOTHING")
                    .ok()
                    .and_then(|v| v.parse::<bool>().ok()),
            )
            .map_err(config_err)?;

        let settings = builder
            .build()
            .map_err(|e| ResetError::ConfigError(format!("failed to build config: {e}")))?;

        settings
            .try_deserialize()
            .map_err(|e| ResetError::ConfigError(format!("failed to deserialize config: {e}")))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ResetResult<()> {
        match self.database.db_type.as_str() {
            "sqlite" | "postgres" => {}
            other => {
                return Err(ResetError::ConfigError(format!(
                    "database.db_type must be 'sqlite' or 'postgres', got '{other}'"
                )));
            }
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ResetError::ConfigError(format!(
                    "logging.level must be one of: trace, debug, info, warn, error. Got '{other}'"
                )));
            }
        }

        if self.jobs.traffic_reset_enabled && self.jobs.traffic_reset_cron.trim().is_empty() {
            return Err(ResetError::ConfigError(
                "jobs.traffic_reset_cron is required when jobs.traffic_reset_enabled is true"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

/// Get the global configuration.
///
/// This loads the configuration on first access and caches it.
/// Returns an error if configuration loading or validation fails.
pub fn get_config() -> ResetResult<&'static ResetConfig> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    let config = ResetConfig::load()?;
    config.validate()?;

    // Another thread may have won the race; either value is valid
    Ok(CONFIG.get_or_init(|| config))
}

/// Initialize configuration explicitly.
///
/// Call this early in your application to catch configuration errors.
pub fn init_config() -> ResetResult<&'static ResetConfig> {
    get_config()
}
