//! Shadow comment configuration.
//!
//! ## Learning: Serde for Serialization
//!
//! `#[serde(default)]` uses `Default::default()` for missing fields, so an
//! empty or partial `config.toml` is still a valid configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Color used when none is configured.
pub const DEFAULT_COLOR: &str = "#7f8487";

/// Name of the only recognized option.
pub const COLOR_OPTION: &str = "color";

/// User configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ghost text color, `#rgb` or `#rrggbb`
    pub color: String,
}

impl Config {
    /// Loads config from the default location, falling back to defaults.
    pub fn load() -> Self {
        match Self::load_from_default_path() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Using default config: {}", e);
                Self::default()
            }
        }
    }

    /// Loads config from a file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    fn load_from_default_path() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default config file path.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("umbra").join("config.toml"))
    }

    /// Returns the names of the options whose values differ from `previous`.
    pub fn changed_options(&self, previous: &Config) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.color != previous.color {
            changed.push(COLOR_OPTION);
        }
        changed
    }

    /// Returns true if switching from `previous` to this config touches `option`.
    pub fn affects(&self, previous: &Config, option: &str) -> bool {
        self.changed_options(previous).contains(&option)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            color: DEFAULT_COLOR.to_string(),
        }
    }
}

/// Returns where the annotations of `workspace` are stored by default.
///
/// State is kept in the user's local data directory, one file per workspace,
/// so it never lands inside the project tree.
pub fn default_state_path(workspace: &Path) -> Result<PathBuf, ConfigError> {
    let data_dir = dirs::data_local_dir().ok_or(ConfigError::NoDataDir)?;
    let slug: String = workspace
        .to_string_lossy()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    Ok(data_dir
        .join("umbra")
        .join("workspaces")
        .join(slug)
        .join("state.json"))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config directory not found")]
    NoConfigDir,

    #[error("Data directory not found")]
    NoDataDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
