//! libSQL database configuration.

use serde::{Deserialize, Serialize};

fn default_path() -> String {
    ".vestige/vestige.db".to_string()
}

const fn default_foreign_keys() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Local database file, or `:memory:`.
    #[serde(default = "default_path")]
    pub path: String,

    /// Run `PRAGMA foreign_keys = ON` on open. Cascades only fire when on.
    #[serde(default = "default_foreign_keys")]
    pub foreign_keys: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            foreign_keys: default_foreign_keys(),
        }
    }
}

impl DatabaseConfig {
    /// Whether the database lives only in memory.
    pub fn is_in_memory(&self) -> bool {
        self.path == ":memory:"
    }
}
