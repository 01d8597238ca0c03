//! # vestige-config
//!
//! Layered configuration loading for Vestige using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`VESTIGE_*` prefix, `__` as separator)
//! 2. Project-level `.vestige/config.toml`
//! 3. User-level `~/.config/vestige/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! `VESTIGE_DATABASE__PATH` -> `database.path`,
//! `VESTIGE_AUDIT__CAPTURE_DEPTH` -> `audit.capture_depth`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use vestige_config::VestigeConfig;
//!
//! let config = VestigeConfig::load_with_dotenv().expect("config");
//! if config.schema.is_configured() {
//!     println!("schema: {}", config.schema.path);
//! }
//! ```

mod audit;
mod database;
mod error;
mod schema;

pub use audit::AuditConfig;
pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use schema::SchemaConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VestigeConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
}

impl VestigeConfig {
    /// Load configuration from TOML files and environment variables.
    ///
    /// Does NOT call `dotenvy`; use [`load_with_dotenv`](Self::load_with_dotenv)
    /// for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` if a source is malformed, or
    /// `ConfigError::InvalidValue` if a loaded value fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration after reading `.env` from the current directory.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests and the CLI can merge extra providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".vestige/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment.merge(Env::prefixed("VESTIGE_").split("__"))
    }

    /// Reject values that deserialize but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "database.path".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.audit.max_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "audit.max_depth".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vestige").join("config.toml"))
    }
}
