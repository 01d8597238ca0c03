//! Deletion audit configuration.

use serde::{Deserialize, Serialize};
use vestige_core::audit::CaptureDepth;

const fn default_enabled() -> bool {
    true
}

/// Default recursion guard for transitive capture.
const fn default_max_depth() -> usize {
    8
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditConfig {
    /// When false, deletes pass straight through with no capture or audit.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// `direct` (one cascade level) or `transitive`.
    #[serde(default)]
    pub capture_depth: CaptureDepth,

    /// Maximum cascade levels followed in `transitive` mode.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            capture_depth: CaptureDepth::default(),
            max_depth: default_max_depth(),
        }
    }
}
