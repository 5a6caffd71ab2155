use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::keymap::{Compression, Layout};

/// Settings file, e.g.
///
/// ```toml
/// layout = "instrument"
///
/// [compression]
/// min_pitch = 36
/// max_pitch = 84
/// priority_keys = ["f", "g", "h"]
///
/// [playback]
/// tempo_scale = 1.5
/// tap = true
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub layout: Layout,
    pub compression: Compression,
    pub playback: PlaybackConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub tempo_scale: f64,
    /// Unset means "tap on the instrument layout, hold on the piano layout".
    pub tap: Option<bool>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            tempo_scale: 1.0,
            tap: None,
        }
    }
}

pub fn load(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
}

pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => load(path),
        None => Ok(Config::default()),
    }
}
