use std::path::Path;

use serde::{Deserialize, Serialize};

/// Engine construction-time options. There is deliberately no process-wide
/// state: every mode flag the matcher honors lives here and is handed to
/// [`crate::engine::MatchEngine::new`] once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Minimum score (exclusive) a pair must reach to be reported, 0..=100.
    pub threshold: u8,

    /// Report every scored candidate regardless of `threshold`.
    pub display_all: bool,

    /// Suppress self-matches when the query set equals the known set,
    /// using `(raw, match_file)` identity.
    pub pretty: bool,

    /// Route accepted matches into the cluster manager instead of the
    /// match handler.
    pub cluster: bool,

    /// Formatting hint for the handler; the engine itself is
    /// format-agnostic and only passes this through.
    pub csv: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: 0,
            display_all: false,
            pretty: false,
            cluster: false,
            csv: false,
        }
    }
}

/// Load a [`MatchConfig`] from a JSON file. A missing or malformed file
/// yields the defaults, so callers without a config file never special-case
/// it.
pub fn load_config(path: &Path) -> MatchConfig {
    let Ok(text) = std::fs::read_to_string(path) else {
        return MatchConfig::default();
    };
    serde_json::from_str::<MatchConfig>(&text).unwrap_or_else(|_| MatchConfig::default())
}
