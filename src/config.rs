//! Settings for the bundled CLI harness. Not consulted by the library's
//! `remember`/`recall`/`forget` entry points — those take an injected
//! [`crate::host::Host`]; this only configures the harness's own
//! [`crate::host::FileHost`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Attempt to create the FTS5 virtual table. When false, the storage
    /// backend skips FTS5 entirely and ranking falls back to
    /// substring/cosine/fuzzy scoring only.
    #[serde(default = "default_true")]
    pub fts5_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            fts5_enabled: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".memory-store")
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        let dir = dirs::home_dir()
            .context("could not determine home directory")?
            .join(".memory-store");
        Ok(dir.join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config at {}", path.display()))?;
            toml::from_str(&contents).context("failed to parse config.toml")?
        } else {
            Self::default()
        };
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("failed to create data dir {}", config.data_dir.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;
        Ok(())
    }
}
