//! # Figure
//!
//! A built chart wraps a [`plotly::Plot`]: traces, layout and animation
//! frames. HTML pages and PDF documents come straight from the plot; the JSON
//! form (`{"data": [...], "layout": {...}, "frames": [...]}`) feeds the static
//! PNG/SVG renderer and the tests.
//!
//! Gaps in numeric series are NaN and serialize to `null`, which is how
//! plotly.js expects missing values.

use crate::error::PlotResult;
use plotly::Plot;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

#[derive(Clone)]
pub struct Figure {
    plot: Plot,
}

impl Figure {
    pub fn new(plot: Plot) -> Self {
        Figure { plot }
    }

    pub fn plot(&self) -> &Plot {
        &self.plot
    }

    pub fn trace_count(&self) -> usize {
        self.plot.data().len()
    }

    pub fn frame_count(&self) -> usize {
        self.plot.frame_count()
    }

    /// The plotly.js figure object.
    pub fn to_value(&self) -> PlotResult<Value> {
        Ok(serde_json::to_value(&self.plot)?)
    }

    pub fn to_json_pretty(&self) -> PlotResult<String> {
        Ok(serde_json::to_string_pretty(&self.plot)?)
    }

    /// Standalone page drawing the figure, frames and slider included.
    pub fn to_html(&self) -> String {
        self.plot.to_html()
    }
}

impl fmt::Debug for Figure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Figure")
            .field("traces", &self.trace_count())
            .field("frames", &self.frame_count())
            .finish()
    }
}

/// One value along a chart axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AxisPoint {
    Number(f64),
    Label(String),
}

/// Values along a chart axis: numbers, or preformatted labels (decoded times).
#[derive(Debug, Clone, PartialEq)]
pub enum AxisValues {
    Numeric(Vec<f64>),
    Labels(Vec<String>),
}

impl AxisValues {
    pub fn len(&self) -> usize {
        match self {
            AxisValues::Numeric(v) => v.len(),
            AxisValues::Labels(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `None` for label axes.
    pub fn as_numbers(&self) -> Option<&[f64]> {
        match self {
            AxisValues::Numeric(v) => Some(v),
            AxisValues::Labels(_) => None,
        }
    }

    pub fn points(&self) -> Vec<AxisPoint> {
        match self {
            AxisValues::Numeric(v) => v.iter().map(|v| AxisPoint::Number(*v)).collect(),
            AxisValues::Labels(l) => l.iter().map(|l| AxisPoint::Label(l.clone())).collect(),
        }
    }

    /// Positions on the chart: the numbers themselves, or label indices, as
    /// plotly.js places category values.
    pub fn positions(&self) -> Vec<f64> {
        match self {
            AxisValues::Numeric(v) => v.clone(),
            AxisValues::Labels(l) => (0..l.len()).map(|i| i as f64).collect(),
        }
    }
}

// Readers for the figure JSON.

/// Traces of plotly type `kind` (`"heatmap"`, `"scatter"`) in `data`, the
/// `data` array of a figure or a frame.
pub fn traces_of<'a>(data: &'a Value, kind: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
    data.as_array()
        .into_iter()
        .flatten()
        .filter(move |t| t["type"] == kind)
}

/// Numeric array with `null` and non-numbers as NaN.
pub fn numbers(value: &Value) -> Vec<f64> {
    value
        .as_array()
        .map(|a| a.iter().map(|v| v.as_f64().unwrap_or(f64::NAN)).collect())
        .unwrap_or_default()
}

/// Axis values of a trace field: labels when any entry is a string.
pub fn axis_values(value: &Value) -> AxisValues {
    let entries = value.as_array().map(Vec::as_slice).unwrap_or_default();
    if entries.iter().any(Value::is_string) {
        AxisValues::Labels(
            entries
                .iter()
                .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                .collect(),
        )
    } else {
        AxisValues::Numeric(numbers(value))
    }
}

/// `z` matrix of a heatmap, rows following y.
pub fn matrix(value: &Value) -> Vec<Vec<f64>> {
    value
        .as_array()
        .map(|rows| rows.iter().map(numbers).collect())
        .unwrap_or_default()
}

/// `title.text` of a layout, axis or colorbar.
pub fn title_text(value: &Value) -> Option<&str> {
    value["title"]["text"].as_str()
}

/// Explicit `[start, end]` range of an axis, in axis units.
pub fn axis_range(axis: &Value) -> Option<(f64, f64)> {
    match numbers(&axis["range"]).as_slice() {
        [a, b] if a.is_finite() && b.is_finite() => Some((*a, *b)),
        _ => None,
    }
}

/// Reversed axes carry a descending range.
pub fn axis_is_reversed(axis: &Value) -> bool {
    axis_range(axis).is_some_and(|(a, b)| a > b)
}

pub fn axis_is_log(axis: &Value) -> bool {
    axis["type"] == "log"
}

/// Cell boundaries around `centers`, halfway between neighbours.
pub fn cell_edges(centers: &[f64]) -> Vec<f64> {
    match centers {
        [] => Vec::new(),
        [only] => vec![only - 0.5, only + 0.5],
        _ => {
            let n = centers.len();
            let mut edges = Vec::with_capacity(n + 1);
            edges.push(centers[0] - (centers[1] - centers[0]) / 2.0);
            for pair in centers.windows(2) {
                edges.push((pair[0] + pair[1]) / 2.0);
            }
            edges.push(centers[n - 1] + (centers[n - 1] - centers[n - 2]) / 2.0);
            edges
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plotly::common::Mode;
    use plotly::layout::{Axis, AxisRange, AxisType};
    use plotly::{HeatMap, Layout, Scatter};

    #[test]
    fn test_axis_points_serialize_untagged() {
        let labels = AxisValues::Labels(vec!["2020-01-01".into(), "2020-01-02".into()]);
        let numbers = AxisValues::Numeric(vec![1.5, f64::NAN]);
        assert_eq!(
            serde_json::to_value(labels.points()).unwrap(),
            serde_json::json!(["2020-01-01", "2020-01-02"])
        );
        assert_eq!(
            serde_json::to_value(numbers.points()).unwrap(),
            serde_json::json!([1.5, null])
        );
        assert_eq!(labels.positions(), vec![0.0, 1.0]);
        assert!(labels.as_numbers().is_none());
    }

    #[test]
    fn test_cell_edges() {
        assert_eq!(cell_edges(&[0.0, 1.0, 2.0]), vec![-0.5, 0.5, 1.5, 2.5]);
        assert_eq!(cell_edges(&[5.0]), vec![4.5, 5.5]);
        assert!(cell_edges(&[]).is_empty());
    }

    #[test]
    fn test_figure_json_readers() {
        let mut plot = Plot::new();
        plot.add_trace(
            HeatMap::new(
                vec![0.0, 1.0],
                vec![5.0],
                vec![vec![1.0, f64::NAN]],
            )
            .name("sst"),
        );
        plot.add_trace(
            Scatter::new(vec!["a".to_string(), "b".to_string()], vec![2.0, 3.0]).mode(Mode::Lines),
        );
        plot.set_layout(
            Layout::new()
                .title("T")
                .y_axis(Axis::new().range(AxisRange::new(10.0, -10.0)))
                .x_axis(Axis::new().type_(AxisType::Log)),
        );
        let figure = Figure::new(plot);
        assert_eq!(format!("{:?}", figure), "Figure { traces: 2, frames: 0 }");

        let json = figure.to_value().unwrap();
        let heatmap = traces_of(&json["data"], "heatmap").next().unwrap();
        assert_eq!(heatmap["name"], "sst");
        let z = matrix(&heatmap["z"]);
        assert_eq!(z[0][0], 1.0);
        assert!(z[0][1].is_nan());

        let scatter = traces_of(&json["data"], "scatter").next().unwrap();
        assert_eq!(
            axis_values(&scatter["x"]),
            AxisValues::Labels(vec!["a".into(), "b".into()])
        );
        assert_eq!(scatter["mode"], "lines");

        let layout = &json["layout"];
        assert_eq!(title_text(layout), Some("T"));
        assert!(axis_is_reversed(&layout["yaxis"]));
        assert_eq!(axis_range(&layout["yaxis"]), Some((10.0, -10.0)));
        assert!(axis_is_log(&layout["xaxis"]));
        assert!(!axis_is_reversed(&layout["xaxis"]));
    }
}
