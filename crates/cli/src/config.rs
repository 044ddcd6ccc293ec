//! Optional user configuration, read from `~/.config/codepulse/config.toml`.
//! Command-line flags always win over config values.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[cfg(windows)]
pub fn config_dir() -> PathBuf {
    std::env::var("APPDATA")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("codepulse")
}

#[cfg(not(windows))]
pub fn config_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".config")
        .join("codepulse")
}

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Directory of per-dimension rule files.
    #[serde(default)]
    pub rules_dir: Option<PathBuf>,
    /// Release-gate policy file.
    #[serde(default)]
    pub policies_file: Option<PathBuf>,
    /// Default JSONL store for audit history.
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = config_dir().join("config.toml");
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}
