//! Runtime Settings
//!
//! Layered configuration: built-in defaults, then an optional
//! `sensor-station.{toml,yaml,json}` file in the working directory, then
//! `SENSOR_STATION__<SECTION>__<KEY>` environment variables.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use storage::StoreOptions;

/// Base name of the optional settings file
pub const SETTINGS_FILE: &str = "sensor-station";

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "SENSOR_STATION";

/// Root settings structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub retrieval: RetrievalSettings,
    pub logging: LoggingSettings,
    pub metrics: MetricsSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    /// `host:port` string suitable for binding
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file location
    pub path: PathBuf,
    pub max_connections: u32,
    /// Lock wait bound for a single statement (ms)
    pub busy_timeout_ms: u64,
}

impl DatabaseSettings {
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            path: self.path.clone(),
            max_connections: self.max_connections,
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
            read_only: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalSettings {
    /// Number of most recent readings served by `/readings`
    pub window: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// One of trace, debug, info, warn, error
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// Install the Prometheus recorder and serve `/metrics`
    pub enabled: bool,
}

impl Settings {
    /// Load from the default file and environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_builder(
            defaults()?
                .add_source(File::with_name(SETTINGS_FILE).required(false))
                .add_source(Environment::with_prefix(ENV_PREFIX).separator("__")),
        )
    }

    /// Finish a builder and check cross-field constraints.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;

        if settings.retrieval.window == 0 {
            return Err(ConfigError::Message(
                "retrieval.window must be at least 1".to_string(),
            ));
        }
        if settings.database.max_connections == 0 {
            return Err(ConfigError::Message(
                "database.max_connections must be at least 1".to_string(),
            ));
        }

        Ok(settings)
    }
}

/// Builder pre-populated with the built-in defaults
pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 9999_i64)?
        .set_default("database.path", "sensor_data.db")?
        .set_default("database.max_connections", 5_i64)?
        .set_default("database.busy_timeout_ms", 5000_i64)?
        .set_default("retrieval.window", 100_i64)?
        .set_default("logging.level", "info")?
        .set_default("logging.json", false)?
        .set_default("metrics.enabled", true)
}
