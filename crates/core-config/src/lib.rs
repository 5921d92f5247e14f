//! Configuration loading and parsing.
//!
//! Parses `pathweld.toml` (or an override path provided by the binary)
//! extracting the `[clean]` table of policy defaults. Every field defaults to
//! off, matching the engine; the binary layers CLI flags on top. Unknown
//! fields are ignored (TOML deserialization tolerance) to allow forward
//! evolution without immediate warnings.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Default, Clone, Copy)]
pub struct CleanConfig {
    #[serde(default)]
    pub remove_boxes: bool,
    #[serde(default)]
    pub group_soft: bool,
    #[serde(default)]
    pub combine_areas: bool,
    #[serde(default)]
    pub dash_linecap: bool,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub clean: CleanConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
}

/// Best-effort config path following platform conventions (XDG / AppData
/// Roaming). A `pathweld.toml` in the working directory wins.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("pathweld.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("pathweld").join("pathweld.toml");
    }
    // Final fallback relative filename.
    PathBuf::from("pathweld.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    if let Ok(content) = fs::read_to_string(&path) {
        match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => Ok(Config {
                raw: Some(content),
                file,
            }),
            Err(e) => {
                info!(target: "config", error = %e, "config parse failed; using defaults");
                Ok(Config::default())
            }
        }
    } else {
        // Absent file is the common case; defaults apply.
        Ok(Config::default())
    }
}
