//! Errors raised while loading or checking vestige configuration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A TOML file or `VESTIGE_*` variable could not be merged or
    /// deserialized into [`VestigeConfig`](crate::VestigeConfig).
    #[error("failed to load vestige config: {0}")]
    Figment(#[from] figment::Error),

    /// An optional section a command depends on has no `path` set.
    ///
    /// Only `schema` is optional today; `database.path` always has a default.
    #[error(
        "config section '{section}' is not configured: set `{section}.path` or VESTIGE_{}__PATH",
        .section.to_uppercase()
    )]
    NotConfigured { section: String },

    /// A value deserialized but cannot be used, e.g. `audit.max_depth = 0`.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
