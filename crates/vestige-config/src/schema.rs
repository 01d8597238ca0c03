//! Schema descriptor location.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SchemaConfig {
    /// Path to the TOML schema descriptor.
    #[serde(default)]
    pub path: String,
}

impl SchemaConfig {
    pub fn is_configured(&self) -> bool {
        !self.path.is_empty()
    }
}
