//! # Error Types
//!
//! Every failure in the plotting pipeline is reported through [`PlotError`].
//! The variants fall into three groups:
//!
//! - **Missing input**: no file or variable selected, or the variable is absent
//! - **Plot construction**: the variable cannot be drawn as the requested kind
//! - **I/O and library failures**: dataset access, export, rendering, configuration
//!
//! None of them is fatal to the process; callers report the message and move on.

use thiserror::Error;

/// Errors that can occur while classifying, building or exporting a plot
#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Variable '{variable}' has {found} dimension(s), but plot type '{kind}' needs at least {needed}")]
    InsufficientDimensions {
        variable: String,
        kind: String,
        found: usize,
        needed: usize,
    },

    #[error("Could not determine a slice dimension for '{variable}' (plot type '{kind}')")]
    NoSliceDimension { variable: String, kind: String },

    #[error("Could not create any animation frame for '{0}'")]
    NoFrames(String),

    #[error("Plot type '{kind}' cannot render variable '{variable}'")]
    CannotRender { variable: String, kind: String },

    #[error("Failed to plot '{variable}': unsupported dimensions {dimensions:?}")]
    UnsupportedDimensions {
        variable: String,
        dimensions: Vec<String>,
    },

    #[error("Unknown plot type: {0}")]
    UnknownPlotKind(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl PlotError {
    /// True for failures where the plot simply could not be constructed
    /// from the variable, as opposed to I/O or configuration failures.
    pub fn is_construction_failure(&self) -> bool {
        matches!(
            self,
            PlotError::InsufficientDimensions { .. }
                | PlotError::NoSliceDimension { .. }
                | PlotError::NoFrames(_)
                | PlotError::CannotRender { .. }
                | PlotError::UnsupportedDimensions { .. }
                | PlotError::UnknownPlotKind(_)
        )
    }
}

/// Result type for plotting operations
pub type PlotResult<T> = Result<T, PlotError>;
