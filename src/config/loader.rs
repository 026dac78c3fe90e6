// Configuration loader
// Loads settings from an explicit path, ./sdg-analytics.toml, or the user config dir

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::constants::{DATA_DIR_ENV, LOCAL_CONFIG_FILE};
use super::settings::Config;

/// Load configuration, falling back to defaults when no file exists
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = match config_path(explicit)? {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading configuration");
            read_config(&path)?
        }
        None => {
            tracing::debug!("No configuration file found, using defaults");
            Config::default()
        }
    };

    if let Ok(data_dir) = std::env::var(DATA_DIR_ENV) {
        if !data_dir.is_empty() {
            config.storage.data_dir = PathBuf::from(data_dir);
        }
    }

    config
        .validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

/// Parse a TOML config file
pub fn read_config(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;

    Ok(config)
}

fn config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("Configuration file not found: {}", path.display());
        }
        return Ok(Some(path.to_path_buf()));
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Ok(Some(local));
    }

    Ok(dirs::config_dir()
        .map(|dir| dir.join("sdg-analytics").join("config.toml"))
        .filter(|path| path.exists()))
}
