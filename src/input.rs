//! # Plot Job Module
//!
//! This module provides parsing for ncplot job files. A job file describes one
//! plot: the NetCDF input, the variable, an optional plot type hint, the
//! display options and every export destination.
//!
//! ## Job Structure
//!
//! A job file specifies:
//! - **input**: Path to the input NetCDF file
//! - **variable**: Name of the variable to plot
//! - **plot_type**: Optional plot type hint (`map_2d`, `3D_time_map`, ...)
//! - **options**: Display options (title, colormap, value range, ...)
//! - **outputs**: Export destinations; the format follows the extension
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use ncplot::input::PlotJob;
//!
//! // Load from file (JSON or YAML, by extension)
//! let job = PlotJob::from_file("sst_map.yaml")?;
//!
//! // Load from JSON string
//! let json = r#"
//! {
//!   "input": "ocean.nc",
//!   "variable": "sst",
//!   "outputs": ["sst.html"]
//! }"#;
//! let job = PlotJob::from_json(json)?;
//! # Ok::<(), ncplot::error::PlotError>(())
//! ```

use crate::classify::PlotKind;
use crate::error::{PlotError, PlotResult};
use crate::settings::{extension_of, PlotOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A single plot request with its export destinations.
///
/// # Examples
///
/// ```rust
/// use ncplot::classify::PlotKind;
/// use ncplot::input::PlotJob;
/// use ncplot::settings::PlotOptions;
///
/// let job = PlotJob {
///     input: "ocean.nc".to_string(),
///     variable: "temp".to_string(),
///     plot_type: Some(PlotKind::TimeMap3d),
///     options: PlotOptions {
///         cmap: Some("jet".to_string()),
///         ..PlotOptions::default()
///     },
///     outputs: vec!["temp.html".to_string()],
/// };
/// assert!(job.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotJob {
    /// Path to the input NetCDF file
    pub input: String,
    /// Name of the variable to plot
    pub variable: String,
    /// Plot type hint; inferred from the axis roles when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot_type: Option<PlotKind>,
    /// Display options for this plot
    #[serde(default)]
    pub options: PlotOptions,
    /// Export destinations (`.html`, `.json`, `.png`, `.svg`, `.csv` or `-`)
    #[serde(default)]
    pub outputs: Vec<String>,
}

impl PlotJob {
    /// Loads a job from a `.json`, `.yaml` or `.yml` file.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use ncplot::input::PlotJob;
    ///
    /// let job = PlotJob::from_file("temperature_job.json")?;
    /// println!("Plotting variable: {}", job.variable);
    /// # Ok::<(), ncplot::error::PlotError>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> PlotResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        match extension_of(path).as_str() {
            "yaml" | "yml" => PlotJob::from_yaml(&content),
            "json" => PlotJob::from_json(&content),
            other => Err(PlotError::Config(format!(
                "Unsupported job file format '{}' (expected json, yaml or yml)",
                other
            ))),
        }
    }

    /// Parses a job from a JSON string.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ncplot::input::PlotJob;
    ///
    /// let json = r#"
    /// {
    ///   "input": "data.nc",
    ///   "variable": "temperature",
    ///   "plot_type": "1D_profile",
    ///   "outputs": ["profile.svg"]
    /// }"#;
    /// let job = PlotJob::from_json(json)?;
    /// assert_eq!(job.outputs.len(), 1);
    /// # Ok::<(), ncplot::error::PlotError>(())
    /// ```
    pub fn from_json(json: &str) -> PlotResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses a job from a YAML string.
    pub fn from_yaml(yaml: &str) -> PlotResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Checks that the input and variable are present.
    ///
    /// # Errors
    ///
    /// `MissingInput` naming the first empty field.
    pub fn validate(&self) -> PlotResult<()> {
        if self.input.trim().is_empty() {
            return Err(PlotError::MissingInput("no input file given".to_string()));
        }
        if self.variable.trim().is_empty() {
            return Err(PlotError::MissingInput("no variable given".to_string()));
        }
        Ok(())
    }

    /// Example job used by `ncplot template job`.
    pub fn template() -> Self {
        PlotJob {
            input: "ocean.nc".to_string(),
            variable: "sst".to_string(),
            plot_type: Some(PlotKind::Map2d),
            options: PlotOptions {
                title: Some("Sea surface temperature".to_string()),
                cmap: Some("jet".to_string()),
                vmin: Some(-2.0),
                vmax: Some(32.0),
                ..PlotOptions::default()
            },
            outputs: vec!["sst.html".to_string(), "sst.png".to_string()],
        }
    }

    pub fn to_json_pretty(&self) -> PlotResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml(&self) -> PlotResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_json_job() {
        let job = PlotJob::from_json(r#"{"input": "a.nc", "variable": "sst"}"#).unwrap();
        assert_eq!(job.plot_type, None);
        assert!(job.outputs.is_empty());
        assert_eq!(job.options, PlotOptions::default());
    }

    #[test]
    fn test_yaml_job_with_alias_plot_type() {
        let yaml = r#"
input: ocean.nc
variable: temp
plot_type: 2D_section
options:
  cmap: jet
  log_scale: true
outputs:
  - temp.svg
  - "-"
"#;
        let job = PlotJob::from_yaml(yaml).unwrap();
        assert_eq!(job.plot_type, Some(PlotKind::TimeDepthHeatmap));
        assert_eq!(job.options.cmap.as_deref(), Some("jet"));
        assert_eq!(job.options.log_scale, Some(true));
        assert_eq!(job.outputs, vec!["temp.svg", "-"]);
    }

    #[test]
    fn test_validate() {
        let mut job = PlotJob::template();
        assert!(job.validate().is_ok());
        job.variable = " ".to_string();
        assert!(matches!(job.validate(), Err(PlotError::MissingInput(_))));
    }

    #[test]
    fn test_from_file_by_extension() {
        let dir = tempfile::TempDir::new().unwrap();
        let template = PlotJob::template();

        let yaml_path = dir.path().join("job.yml");
        fs::write(&yaml_path, template.to_yaml().unwrap()).unwrap();
        assert_eq!(PlotJob::from_file(&yaml_path).unwrap(), template);

        let json_path = dir.path().join("job.json");
        fs::write(&json_path, template.to_json_pretty().unwrap()).unwrap();
        assert_eq!(PlotJob::from_file(&json_path).unwrap(), template);

        let toml_path = dir.path().join("job.toml");
        fs::write(&toml_path, "input = 'a.nc'").unwrap();
        assert!(matches!(PlotJob::from_file(&toml_path), Err(PlotError::Config(_))));
    }
}
