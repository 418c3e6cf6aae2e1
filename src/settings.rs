//! # Settings
//!
//! Application-wide defaults that every plot inherits:
//!
//! - **theme**: `light` (black on white) or `dark` (white on dark gray)
//! - **plot_defaults**: a [`PlotOptions`] record merged under per-plot options
//! - **active_overlays**: overlay files drawn on every `map_2d` heatmap
//! - **overlay_dir** / **colorbar_dir**: where overlay and `.pal` files live
//! - **width** / **height**: raster size for PNG and SVG snapshots
//!
//! Settings come from a JSON or YAML file, then `NCPLOT_*` environment
//! variables override individual fields.
//!
//! ```rust
//! use ncplot::settings::{PlotOptions, Settings, Theme};
//!
//! let yaml = "theme: dark\nactive_overlays: [coast.geojson]\n";
//! let settings = Settings::from_yaml(yaml)?;
//! assert_eq!(settings.theme, Theme::Dark);
//!
//! let explicit = PlotOptions { cmap: Some("viridis".into()), ..Default::default() };
//! let merged = explicit.merged_over(&settings.plot_defaults);
//! assert_eq!(merged.cmap.as_deref(), Some("viridis"));
//! # Ok::<(), ncplot::error::PlotError>(())
//! ```

use crate::error::{PlotError, PlotResult};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_OVERLAY_DIR: &str = "resources/overlays";
pub const DEFAULT_COLORBAR_DIR: &str = "resources/colorbars";
pub const DEFAULT_CMAP: &str = "jet";
pub const DEFAULT_FONT_FAMILY: &str = "Arial";
pub const DEFAULT_FONT_SIZE: f64 = 12.0;
pub const DEFAULT_TITLE_FONT_SIZE: f64 = 16.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn font_color(&self) -> &'static str {
        match self {
            Theme::Light => "black",
            Theme::Dark => "white",
        }
    }

    pub fn background(&self) -> &'static str {
        match self {
            Theme::Light => "#ffffff",
            Theme::Dark => "#111111",
        }
    }

    pub fn plot_background(&self) -> &'static str {
        match self {
            Theme::Light => "#ffffff",
            Theme::Dark => "#222222",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

impl FromStr for Theme {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" | "white" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(PlotError::Config(format!("Unknown theme: {}", other))),
        }
    }
}

/// Per-plot presentation options. Unset fields fall back to settings
/// defaults, then to built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xlabel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ylabel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colorbar_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmap: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vmin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vmax: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_scale: Option<bool>,
    /// Overrides the branch default for x-axis reversal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse_x: Option<bool>,
    /// Overrides the branch default for y-axis reversal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse_y: Option<bool>,
    /// strftime-style format for decoded time labels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
}

impl PlotOptions {
    /// `self` with every unset field taken from `defaults`.
    pub fn merged_over(&self, defaults: &PlotOptions) -> PlotOptions {
        PlotOptions {
            title: self.title.clone().or_else(|| defaults.title.clone()),
            xlabel: self.xlabel.clone().or_else(|| defaults.xlabel.clone()),
            ylabel: self.ylabel.clone().or_else(|| defaults.ylabel.clone()),
            colorbar_label: self
                .colorbar_label
                .clone()
                .or_else(|| defaults.colorbar_label.clone()),
            cmap: self.cmap.clone().or_else(|| defaults.cmap.clone()),
            vmin: self.vmin.or(defaults.vmin),
            vmax: self.vmax.or(defaults.vmax),
            grid: self.grid.or(defaults.grid),
            log_scale: self.log_scale.or(defaults.log_scale),
            reverse_x: self.reverse_x.or(defaults.reverse_x),
            reverse_y: self.reverse_y.or(defaults.reverse_y),
            time_format: self.time_format.clone().or_else(|| defaults.time_format.clone()),
            font_family: self.font_family.clone().or_else(|| defaults.font_family.clone()),
            font_size: self.font_size.or(defaults.font_size),
            title_font_family: self
                .title_font_family
                .clone()
                .or_else(|| defaults.title_font_family.clone()),
            title_font_size: self.title_font_size.or(defaults.title_font_size),
            theme: self.theme.or(defaults.theme),
        }
    }

    pub fn cmap_or_default(&self) -> &str {
        self.cmap.as_deref().unwrap_or(DEFAULT_CMAP)
    }

    pub fn grid_or_default(&self) -> bool {
        self.grid.unwrap_or(true)
    }

    pub fn log_scale_or_default(&self) -> bool {
        self.log_scale.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: Theme,
    pub plot_defaults: PlotOptions,
    pub active_overlays: Vec<String>,
    pub overlay_dir: PathBuf,
    pub colorbar_dir: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            theme: Theme::Light,
            plot_defaults: PlotOptions::default(),
            active_overlays: Vec::new(),
            overlay_dir: PathBuf::from(DEFAULT_OVERLAY_DIR),
            colorbar_dir: PathBuf::from(DEFAULT_COLORBAR_DIR),
            width: 1024,
            height: 768,
        }
    }
}

impl Settings {
    /// Loads settings from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> PlotResult<Self> {
        let path = path.as_ref();
        debug!("Loading settings from {}", path.display());
        let content = fs::read_to_string(path)?;
        match extension_of(path).as_str() {
            "yaml" | "yml" => Settings::from_yaml(&content),
            "json" => Settings::from_json(&content),
            other => Err(PlotError::Config(format!(
                "Unsupported settings format '{}' (expected json, yaml or yml)",
                other
            ))),
        }
    }

    pub fn from_json(json: &str) -> PlotResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml(yaml: &str) -> PlotResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Applies `NCPLOT_THEME`, `NCPLOT_OVERLAYS` (comma separated),
    /// `NCPLOT_OVERLAY_DIR` and `NCPLOT_COLORBAR_DIR` from the process
    /// environment.
    pub fn with_env_overrides(self) -> PlotResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Same as [`Settings::with_env_overrides`] with an arbitrary lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> PlotResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(theme) = lookup("NCPLOT_THEME") {
            self.theme = theme.parse()?;
        }
        if let Some(overlays) = lookup("NCPLOT_OVERLAYS") {
            self.active_overlays = overlays
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(dir) = lookup("NCPLOT_OVERLAY_DIR") {
            self.overlay_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("NCPLOT_COLORBAR_DIR") {
            self.colorbar_dir = PathBuf::from(dir);
        }
        Ok(self)
    }

    /// Theme for a plot: the per-plot override, else the settings theme.
    pub fn theme_for(&self, options: &PlotOptions) -> Theme {
        options
            .theme
            .or(self.plot_defaults.theme)
            .unwrap_or(self.theme)
    }

    pub fn to_json_pretty(&self) -> PlotResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml(&self) -> PlotResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

pub(crate) fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.theme, Theme::Light);
        assert_eq!(settings.overlay_dir, PathBuf::from(DEFAULT_OVERLAY_DIR));
        assert!(settings.active_overlays.is_empty());
        assert_eq!(settings.plot_defaults.cmap_or_default(), "jet");
        assert!(settings.plot_defaults.grid_or_default());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = Settings::from_json(
            r#"{"theme": "dark", "plot_defaults": {"cmap": "jet", "font_size": 14}}"#,
        )
        .unwrap();
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.plot_defaults.cmap.as_deref(), Some("jet"));
        assert_eq!(settings.plot_defaults.font_size, Some(14.0));
        assert_eq!(settings.width, 1024);
    }

    #[test]
    fn test_explicit_options_win() {
        let defaults = PlotOptions {
            cmap: Some("jet".into()),
            grid: Some(false),
            title: Some("default".into()),
            ..Default::default()
        };
        let explicit = PlotOptions {
            title: Some("mine".into()),
            grid: Some(true),
            ..Default::default()
        };
        let merged = explicit.merged_over(&defaults);
        assert_eq!(merged.title.as_deref(), Some("mine"));
        assert_eq!(merged.grid, Some(true));
        assert_eq!(merged.cmap.as_deref(), Some("jet"));
        assert_eq!(merged.vmin, None);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("NCPLOT_THEME", "dark"),
            ("NCPLOT_OVERLAYS", "coast.geojson, track.csv,"),
            ("NCPLOT_COLORBAR_DIR", "/opt/pal"),
        ]
        .into_iter()
        .collect();
        let settings = Settings::default()
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.active_overlays, vec!["coast.geojson", "track.csv"]);
        assert_eq!(settings.colorbar_dir, PathBuf::from("/opt/pal"));
        assert_eq!(settings.overlay_dir, PathBuf::from(DEFAULT_OVERLAY_DIR));

        let bad = Settings::default().with_overrides(|k| {
            (k == "NCPLOT_THEME").then(|| "neon".to_string())
        });
        assert!(matches!(bad, Err(PlotError::Config(_))));
    }

    #[test]
    fn test_theme_precedence() {
        let settings = Settings {
            theme: Theme::Dark,
            ..Default::default()
        };
        assert_eq!(settings.theme_for(&PlotOptions::default()), Theme::Dark);
        let light = PlotOptions {
            theme: Some(Theme::Light),
            ..Default::default()
        };
        assert_eq!(settings.theme_for(&light), Theme::Light);
    }

    #[test]
    fn test_settings_file_formats() {
        let dir = tempfile::TempDir::new().unwrap();
        let yaml = dir.path().join("settings.yaml");
        fs::write(&yaml, "width: 800\nheight: 600\n").unwrap();
        let settings = Settings::from_file(&yaml).unwrap();
        assert_eq!((settings.width, settings.height), (800, 600));

        let toml = dir.path().join("settings.toml");
        fs::write(&toml, "width = 800").unwrap();
        assert!(matches!(Settings::from_file(&toml), Err(PlotError::Config(_))));
    }
}
