use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub project_path: String,
    /// Metric units per surface pixel.
    pub surface_scale: f64,
    pub keep_right_angles: bool,
    /// Pick radius for corners and walls, in screen pixels.
    pub hit_radius: f64,
    pub history_limit: usize,
    pub show_angles: bool,
    pub show_lengths: bool,
    pub raster_pixels_per_unit: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_path: "project.json".to_string(),
            surface_scale: 0.01,
            keep_right_angles: true,
            hit_radius: 8.0,
            history_limit: crate::history::DEFAULT_LIMIT,
            show_angles: true,
            show_lengths: true,
            raster_pixels_per_unit: 1.0,
        }
    }
}

/// First existing settings file: the user config, then the working
/// directory. `None` when there is nothing on disk yet.
pub fn config_path() -> Option<PathBuf> {
    if let Some(home) = std::env::var_os("HOME") {
        let path = PathBuf::from(home).join(".config").join("surface-tiler.toml");
        if path.exists() {
            return Some(path);
        }
    }
    ["settings.toml", "settings.json"]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn is_toml(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "toml")
}

pub fn parse_settings(text: &str, toml_first: bool) -> Option<Settings> {
    let from_toml = || toml::from_str::<Settings>(text).ok();
    let from_json = || serde_json::from_str::<Settings>(text).ok();
    if toml_first {
        from_toml().or_else(from_json)
    } else {
        from_json().or_else(from_toml)
    }
}

pub fn load_settings(path: &Path) -> Option<Settings> {
    let text = std::fs::read_to_string(path).ok()?;
    let parsed = parse_settings(&text, is_toml(path));
    if parsed.is_none() {
        warn!(path = %path.display(), "settings unreadable, using defaults");
    }
    parsed
}

/// Settings from [`config_path`], or defaults.
pub fn load_or_default() -> (PathBuf, Settings) {
    let path = config_path().unwrap_or_else(|| PathBuf::from("settings.toml"));
    let settings = load_settings(&path).unwrap_or_default();
    (path, settings)
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    let text = if is_toml(path) {
        toml::to_string_pretty(settings)?
    } else {
        serde_json::to_string_pretty(settings)?
    };
    std::fs::write(path, text)?;
    Ok(())
}
