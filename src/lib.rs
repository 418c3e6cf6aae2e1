//! # ncplot
//!
//! A Rust library for plotting oceanographic NetCDF variables. The dimensions
//! of a variable are classified into axis roles, the roles resolve to a plot
//! type, and the plot type selects the figure builder.
//!
//! ## Features
//!
//! - **Axis detection**: latitude, longitude, depth and time from names,
//!   units, `standard_name` and `long_name`
//! - **Plot types**: time series, profiles, maps, sections and animated 3-D
//!   slices with a frame slider
//! - **Exports**: interactive HTML (plotly.js), figure JSON, PNG, SVG and CSV
//! - **Pluggable sources**: anything implementing [`DatasetSource`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ncplot::{run_plot_job, input::PlotJob, settings::Settings};
//!
//! let job = PlotJob::from_file("job.yaml").expect("Failed to load job");
//! run_plot_job(&job, &Settings::default()).expect("Failed to plot");
//! ```
//!
//! ## Job Example
//!
//! ```yaml
//! input: ocean.nc
//! variable: sst
//! plot_type: map_2d
//! options:
//!   cmap: jet
//!   vmin: -2
//!   vmax: 32
//! outputs:
//!   - sst.html
//!   - sst.png
//! ```

pub mod builder;
pub mod classify;
pub mod cli;
pub mod colormap;
pub mod dataset;
pub mod error;
pub mod export;
pub mod figure;
pub mod info;
pub mod input;
pub mod log;
pub mod overlay;
pub mod render;
pub mod settings;
pub mod time;

#[cfg(test)]
mod tests;

use crate::builder::{build_figure, FigureContext};
use crate::classify::{dimension_roles, resolve_plot_kind, PlotKind};
use crate::dataset::{DataArray, DatasetSource, NetCdfDataset};
use crate::error::{PlotError, PlotResult};
use crate::export::{export_csv, export_figure, ExportFormat};
use crate::figure::Figure;
use crate::input::PlotJob;
use crate::settings::Settings;
use ::log::{debug, error};
use std::path::Path;

/// A resolved plot: the kind, the loaded data and the built figure.
#[derive(Debug, Clone)]
pub struct PreparedPlot {
    pub kind: PlotKind,
    pub data: DataArray,
    pub figure: Figure,
}

/// Classifies, loads and builds the figure for `job` from `source`.
///
/// # Errors
///
/// - `MissingInput` when the variable does not exist in `source`
/// - the construction errors of [`resolve_plot_kind`] and [`build_figure`],
///   with the variable name filled in
pub fn prepare_plot(
    source: &dyn DatasetSource,
    job: &PlotJob,
    settings: &Settings,
) -> PlotResult<PreparedPlot> {
    let descriptor = source.describe(&job.variable)?;
    let roles = dimension_roles(source, &descriptor);
    debug!("Axis roles for '{}': {:?}", descriptor.name, roles);

    let kind = resolve_plot_kind(&roles, job.plot_type).map_err(|e| match e {
        PlotError::InsufficientDimensions {
            kind, found, needed, ..
        } => PlotError::InsufficientDimensions {
            variable: descriptor.name.clone(),
            kind,
            found,
            needed,
        },
        other => other,
    })?;
    debug!("Resolved '{}' as {}", descriptor.name, kind);

    let data = source.load(&job.variable)?;
    let ctx = FigureContext::from_settings(&job.options, settings, source.path(), kind);
    let figure = build_figure(kind, &data, &ctx)?;

    Ok(PreparedPlot { kind, data, figure })
}

/// Writes `plot` to `output`; the format comes from the extension (`-` is
/// CSV to standard output).
pub fn export_plot(plot: &PreparedPlot, output: &str, settings: &Settings) -> PlotResult<()> {
    match ExportFormat::from_path(output)? {
        ExportFormat::Csv => export_csv(&plot.data, output),
        format => export_figure(
            &plot.figure,
            Path::new(output),
            format,
            (settings.width, settings.height),
        ),
    }
}

/// Output used when a job names none.
pub fn default_output(job: &PlotJob) -> String {
    format!("{}.html", job.variable)
}

/// Runs a whole job against a NetCDF file: opens the dataset, builds the
/// figure and writes every output. Returns the written outputs.
///
/// # Errors
///
/// Stops at the first failing step; every failure is logged before it is
/// returned.
pub fn run_plot_job(job: &PlotJob, settings: &Settings) -> PlotResult<Vec<String>> {
    job.validate()?;
    let dataset = NetCdfDataset::open(&job.input)?;
    let plot = prepare_plot(&dataset, job, settings).inspect_err(|e| {
        error!("Failed to plot '{}' from {}: {}", job.variable, job.input, e);
    })?;
    dataset.close()?;

    let outputs = if job.outputs.is_empty() {
        vec![default_output(job)]
    } else {
        job.outputs.clone()
    };
    for output in &outputs {
        export_plot(&plot, output, settings).inspect_err(|e| {
            error!("Failed to export {}: {}", output, e);
        })?;
    }
    Ok(outputs)
}
