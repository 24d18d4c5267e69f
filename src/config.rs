//! # Configuration Module
//!
//! This module handles configuration for dfmuse: where the gamelog and rule
//! file live, the default season, and timing knobs for the watch loop.
//!
//! ## Lookup Order
//!
//! 1. The file passed with `--config`
//! 2. `config.json` in the platform config directory, if it exists:
//!    - Linux: `~/.config/dfmuse/config.json`
//!    - macOS: `~/Library/Application Support/dfmuse/config.json`
//!    - Windows: `%APPDATA%\dfmuse\config.json`
//! 3. Built-in defaults
//!
//! Command-line flags override whatever was loaded. Relative paths inside a
//! config file (`gamelog`, `rules` and `default_season`) are taken relative
//! to that file's directory.
//!
//! ## Example
//!
//! ```json
//! {
//!   "gamelog": "../Dwarf Fortress/gamelog.txt",
//!   "rules": "music.cfg",
//!   "default_season": "music/explore",
//!   "poll_interval_ms": 500
//! }
//! ```

use anyhow::{Context, Result};
use log::debug;
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime settings for the watch loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodConfig {
    /// Gamelog to follow.
    pub gamelog: PathBuf,
    /// Rule file (`pattern;target;priority` per line).
    pub rules: PathBuf,
    /// Season used when no session has been saved yet.
    pub default_season: String,
    /// Longest wait for gamelog growth per loop cycle.
    pub poll_interval_ms: u64,
    /// Bytes before the end of the gamelog to start from on a fresh session.
    pub cushion_bytes: u64,
    /// Fade length for ambient effects.
    pub effect_fade_ms: u64,
    /// Apply every backlog line at startup instead of only the last one.
    pub replay_backlog: bool,
    /// Refuse a rule file with any malformed record.
    pub strict_rules: bool,
}

impl Default for MoodConfig {
    fn default() -> Self {
        Self {
            gamelog: PathBuf::from("gamelog.txt"),
            rules: PathBuf::from("music.cfg"),
            default_season: "music/explore".to_string(),
            poll_interval_ms: 500,
            cushion_bytes: 0,
            effect_fade_ms: 2000,
            replay_backlog: false,
            strict_rules: false,
        }
    }
}

impl MoodConfig {
    /// Reads a JSON config file, resolving its relative paths against its directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.gamelog = resolve(&config.gamelog, base)?;
        config.rules = resolve(&config.rules, base)?;
        config.default_season = resolve(Path::new(&config.default_season), base)?
            .display()
            .to_string();
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn effect_fade(&self) -> Duration {
        Duration::from_millis(self.effect_fade_ms)
    }
}

fn resolve(path: &Path, base: &Path) -> Result<PathBuf> {
    let resolved = path
        .absolutize_from(base)
        .with_context(|| format!("Cannot resolve {}", path.display()))?;
    Ok(resolved.into_owned())
}

/// Returns the platform-appropriate config directory for dfmuse.
///
/// # Returns
///
/// * `Ok(PathBuf)` - Path to the dfmuse config directory
/// * `Err(anyhow::Error)` - If the platform has no config directory
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| anyhow::anyhow!(
        "Could not determine system config directory. Please pass --config explicitly."
    ))?;
    Ok(config_dir.join("dfmuse"))
}

/// Loads the configuration following the lookup order above.
pub fn load_config(explicit: Option<&Path>) -> Result<MoodConfig> {
    if let Some(path) = explicit {
        return MoodConfig::from_file(path);
    }

    match get_config_dir() {
        Ok(dir) if dir.join("config.json").is_file() => MoodConfig::from_file(&dir.join("config.json")),
        _ => {
            debug!("No config file found, using defaults");
            Ok(MoodConfig::default())
        }
    }
}
