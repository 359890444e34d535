//! Configuration loading from disk.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::validation::{Settings, validate_config};
use super::Config;

/// Default location of the configuration file.
pub fn get_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().context("Could not determine config directory")?;
    Ok(config_dir.join("huebert").join("huebert.toml"))
}

/// Load and validate the configuration, from `custom` when given.
pub fn load(custom: Option<&Path>) -> Result<Settings> {
    let path = match custom {
        Some(path) => path.to_path_buf(),
        None => get_config_path()?,
    };
    load_from_path(&path)
}

/// Load and validate the configuration at `path`.
pub fn load_from_path(path: &Path) -> Result<Settings> {
    if !path.exists() {
        anyhow::bail!("Configuration file not found at {}", private_path(path));
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", private_path(path)))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", private_path(path)))?;

    validate_config(&config)
        .with_context(|| format!("Invalid configuration in {}", private_path(path)))
}

/// Display a path with the home directory shortened to `~`.
pub fn private_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(relative) = path.strip_prefix(&home)
    {
        return format!("~/{}", relative.display());
    }
    path.display().to_string()
}
