//! stagegate.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default paths for CLI runs; every field is overridable by a flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    pub state_name: Option<String>,
    pub store_root: Option<String>,
    pub node_file: Option<String>,
    pub peers_file: Option<String>,
}

impl CliConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CliConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the config if the file exists; empty defaults otherwise.
    pub fn load_optional(path: &Path) -> anyhow::Result<Self> {
        if path.is_file() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }
}
