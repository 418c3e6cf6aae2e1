//! # Export
//!
//! Writes a built [`Figure`] or the underlying [`DataArray`] to disk:
//!
//! | format | content                                                      |
//! |--------|--------------------------------------------------------------|
//! | `html` | standalone plotly page with the animation frames and slider  |
//! | `json` | the plotly figure JSON                                       |
//! | `pdf`  | plotly's own static export, through a WebDriver session      |
//! | `png`  | raster snapshot of the first frame                           |
//! | `svg`  | vector snapshot of the first frame                           |
//! | `csv`  | one row per element: coordinate columns plus the value       |
//!
//! The CSV target `-` writes to standard output. PDF export needs
//! `chromedriver` on the `PATH` or in `WEBDRIVER_PATH`.

use crate::classify::AxisRole;
use crate::dataset::DataArray;
use crate::error::{PlotError, PlotResult};
use crate::figure::Figure;
use crate::render;
use crate::settings::extension_of;
use crate::time::time_labels;
use log::{debug, info};
use plotly_static::{ImageFormat, StaticExporterBuilder};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;

const CSV_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Html,
    Json,
    Pdf,
    Png,
    Svg,
    Csv,
}

impl ExportFormat {
    /// Format implied by the file extension.
    pub fn from_path(path: &str) -> PlotResult<Self> {
        if path == "-" {
            return Ok(ExportFormat::Csv);
        }
        let ext = extension_of(Path::new(path));
        ext.parse().map_err(|_| {
            PlotError::Export(format!(
                "Cannot infer export format from '{}' (use .html, .json, .pdf, .png, .svg or .csv)",
                path
            ))
        })
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Json => "json",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Png => "png",
            ExportFormat::Svg => "svg",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "html" | "htm" => Ok(ExportFormat::Html),
            "json" => Ok(ExportFormat::Json),
            "png" => Ok(ExportFormat::Png),
            "svg" => Ok(ExportFormat::Svg),
            "csv" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(PlotError::Export(format!("Unknown export format: {}", other))),
        }
    }
}

/// Writes `figure` to `path` in `format`. CSV needs the data and goes
/// through [`export_csv`] instead.
pub fn export_figure(
    figure: &Figure,
    path: &Path,
    format: ExportFormat,
    size: (u32, u32),
) -> PlotResult<()> {
    debug!("Exporting figure as {} to {}", format, path.display());
    match format {
        ExportFormat::Html => std::fs::write(path, figure.to_html())?,
        ExportFormat::Json => std::fs::write(path, figure.to_json_pretty()?)?,
        ExportFormat::Pdf => export_pdf(figure, path, size)?,
        ExportFormat::Png => render::render_png(figure, path, size)?,
        ExportFormat::Svg => render::render_svg(figure, path, size)?,
        ExportFormat::Csv => {
            return Err(PlotError::Export(
                "CSV export needs the data array, not the figure".to_string(),
            ));
        }
    }
    info!("Exported {} to {}", format, path.display());
    Ok(())
}

/// Renders `figure` to PDF with plotly.js in a headless browser.
fn export_pdf(figure: &Figure, path: &Path, size: (u32, u32)) -> PlotResult<()> {
    let mut exporter = StaticExporterBuilder::default()
        .build()
        .map_err(|e| PlotError::Export(format!("Failed to start static exporter: {}", e)))?;
    exporter
        .write_fig(
            path,
            &figure.to_value()?,
            ImageFormat::PDF,
            size.0 as usize,
            size.1 as usize,
            1.0,
        )
        .map_err(|e| PlotError::Export(format!("PDF export failed: {}", e)))
}

/// One row per element of `array`: a column per dimension holding the
/// coordinate value (decoded time text for CF time coordinates, the index
/// when there is no coordinate), then the value column.
pub fn to_data_frame(array: &DataArray) -> PlotResult<DataFrame> {
    let shape = array.shape();
    let total = array.values.len();
    let mut columns: Vec<Column> = Vec::with_capacity(shape.len() + 1);

    for (axis, dim) in array.dimensions().iter().enumerate() {
        let repeat: usize = shape[axis + 1..].iter().product();
        let len = shape[axis];
        let index_of = |row: usize| (row / repeat.max(1)) % len.max(1);

        let labels = array
            .coordinate(axis)
            .filter(|c| AxisRole::classify(Some(&c.descriptor)) == AxisRole::Time)
            .and_then(|c| time_labels(c, CSV_TIME_FORMAT));

        let column: Column = match labels {
            Some(labels) => {
                let values: Vec<String> = (0..total).map(|r| labels[index_of(r)].clone()).collect();
                Series::new(dim.as_str().into(), values).into()
            }
            None => {
                let coords = array.axis_values(axis);
                let values: Vec<f64> = (0..total).map(|r| coords[index_of(r)]).collect();
                Series::new(dim.as_str().into(), values).into()
            }
        };
        columns.push(column);
    }

    let value_name = if array.dimensions().iter().any(|d| d == array.name()) {
        format!("{}_value", array.name())
    } else {
        array.name().to_string()
    };
    columns.push(Series::new(value_name.as_str().into(), array.values.clone()).into());

    Ok(DataFrame::new(columns)?)
}

pub fn write_csv<W: Write>(array: &DataArray, writer: W) -> PlotResult<()> {
    let mut df = to_data_frame(array)?;
    debug!("CSV frame shape: {:?}", df.shape());
    CsvWriter::new(writer).include_header(true).finish(&mut df)?;
    Ok(())
}

/// Writes the CSV dump of `array` to `path`, or to standard output for `-`.
pub fn export_csv(array: &DataArray, path: &str) -> PlotResult<()> {
    if path == "-" {
        let stdout = io::stdout();
        write_csv(array, stdout.lock())?;
        debug!("Wrote CSV for '{}' to stdout", array.name());
        return Ok(());
    }
    let file = File::create(path)?;
    write_csv(array, file)?;
    info!("Exported data for '{}' as CSV to {}", array.name(), path);
    Ok(())
}
