//! Static snapshots (PNG and SVG) of a [`Figure`] drawn with `plotters`.
//!
//! The snapshot is drawn from the plotly figure JSON, so it shows exactly the
//! traces and layout the HTML page shows. Only the first animation frame is
//! drawn. Reversed axes are drawn by negating coordinates and negating tick
//! labels back; log axes are drawn in log10 space with labels converted back
//! to data values.

use crate::colormap::{parse_hex, sample, ColorStop};
use crate::dataset::finite_range;
use crate::error::{PlotError, PlotResult};
use crate::figure::{
    axis_is_log, axis_is_reversed, axis_range, axis_values, cell_edges, matrix, numbers,
    title_text, AxisValues, Figure,
};
use log::debug;
use plotters::coord::Shift;
use plotters::prelude::*;
use serde_json::Value;
use std::path::Path;

const DEFAULT_TRACE_COLOR: RGBColor = RGBColor(31, 119, 180);

fn render_err<E: std::fmt::Display>(e: E) -> PlotError {
    PlotError::Render(e.to_string())
}

pub fn render_png(figure: &Figure, path: &Path, size: (u32, u32)) -> PlotResult<()> {
    debug!("Rendering PNG snapshot to {}", path.display());
    let json = figure.to_value()?;
    let root = BitMapBackend::new(path, size).into_drawing_area();
    draw_figure(&root, &json)?;
    root.present().map_err(render_err)?;
    Ok(())
}

pub fn render_svg(figure: &Figure, path: &Path, size: (u32, u32)) -> PlotResult<()> {
    debug!("Rendering SVG snapshot to {}", path.display());
    let json = figure.to_value()?;
    let root = SVGBackend::new(path, size).into_drawing_area();
    draw_figure(&root, &json)?;
    root.present().map_err(render_err)?;
    Ok(())
}

/// Maps data values to chart coordinates along one axis.
#[derive(Debug, Clone, Default)]
struct AxisMap {
    log: bool,
    reversed: bool,
    /// Category labels; positions are label indices.
    labels: Option<Vec<String>>,
}

impl AxisMap {
    fn new(axis: &Value, labels: Option<Vec<String>>) -> Self {
        AxisMap {
            log: axis_is_log(axis) && labels.is_none(),
            reversed: axis_is_reversed(axis),
            labels,
        }
    }

    fn forward(&self, v: f64) -> Option<f64> {
        let v = if self.log {
            if v > 0.0 { v.log10() } else { return None }
        } else {
            v
        };
        if !v.is_finite() {
            return None;
        }
        Some(if self.reversed { -v } else { v })
    }

    fn positions(&self, values: &AxisValues) -> Vec<Option<f64>> {
        match values {
            AxisValues::Numeric(v) => v.iter().map(|v| self.forward(*v)).collect(),
            AxisValues::Labels(l) => (0..l.len())
                .map(|i| Some(if self.reversed { -(i as f64) } else { i as f64 }))
                .collect(),
        }
    }

    /// Layout range in chart coordinates. Log ranges are already log10.
    fn range(&self, axis: &Value) -> Option<(f64, f64)> {
        let (a, b) = axis_range(axis)?;
        let (a, b) = if self.reversed { (-a, -b) } else { (a, b) };
        Some((a.min(b), a.max(b)))
    }

    fn label(&self, position: f64) -> String {
        let v = if self.reversed { -position } else { position };
        if let Some(labels) = &self.labels {
            let idx = v.round();
            if (v - idx).abs() < 1e-6 && idx >= 0.0 {
                return labels.get(idx as usize).cloned().unwrap_or_default();
            }
            return String::new();
        }
        let v = if self.log { 10f64.powf(v) } else { v };
        format_tick(v)
    }
}

fn format_tick(v: f64) -> String {
    if v == 0.0 {
        "0".to_string()
    } else if v.abs() >= 1e5 || v.abs() < 1e-3 {
        format!("{:.2e}", v)
    } else {
        let s = format!("{:.3}", v);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

fn named_color(color: &str) -> RGBColor {
    match color {
        "black" => RGBColor(0, 0, 0),
        "white" => RGBColor(255, 255, 255),
        "blue" => RGBColor(0, 0, 255),
        "green" => RGBColor(0, 128, 0),
        "red" => RGBColor(255, 0, 0),
        other => parse_hex(other)
            .map(|(r, g, b)| RGBColor(r, g, b))
            .unwrap_or(DEFAULT_TRACE_COLOR),
    }
}

/// `[[fraction, "color"], ...]` colorscale of a trace or marker.
fn color_stops(value: &Value) -> Vec<ColorStop> {
    value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|stop| Some(ColorStop(stop[0].as_f64()?, stop[1].as_str()?.to_string())))
        .collect()
}

/// Color range from explicit bounds, falling back to the finite data range.
fn color_range(lo: Option<f64>, hi: Option<f64>, values: &[f64]) -> Option<(f64, f64)> {
    match (lo, hi, finite_range(values)) {
        (Some(lo), Some(hi), _) => Some((lo, hi)),
        (lo, hi, Some(range)) => Some((lo.unwrap_or(range.0), hi.unwrap_or(range.1))),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Mark {
    Path(Vec<(f64, f64)>, RGBColor),
    Dot((f64, f64), RGBColor),
    Cell([(f64, f64); 2], RGBColor),
}

/// Labels of the first trace whose `field` holds strings.
fn first_labels(data: &Value, field: &str) -> Option<Vec<String>> {
    data.as_array()?.iter().find_map(|t| match axis_values(&t[field]) {
        AxisValues::Labels(l) => Some(l),
        AxisValues::Numeric(_) => None,
    })
}

fn scatter_marks(trace: &Value, xmap: &AxisMap, ymap: &AxisMap, marks: &mut Vec<Mark>) {
    let mode = trace["mode"].as_str().unwrap_or("lines");
    let color = trace["line"]["color"]
        .as_str()
        .map_or(DEFAULT_TRACE_COLOR, named_color);
    let xs = xmap.positions(&axis_values(&trace["x"]));
    let ys = ymap.positions(&axis_values(&trace["y"]));

    if mode.contains("lines") {
        let mut segment = Vec::new();
        for point in xs.iter().zip(ys.iter()) {
            match point {
                (Some(x), Some(y)) => segment.push((*x, *y)),
                _ if !segment.is_empty() => {
                    marks.push(Mark::Path(std::mem::take(&mut segment), color))
                }
                _ => {}
            }
        }
        if !segment.is_empty() {
            marks.push(Mark::Path(segment, color));
        }
    }

    if mode.contains("markers") {
        let marker = &trace["marker"];
        let values = numbers(&marker["color"]);
        let scale = color_stops(&marker["colorscale"]);
        let range = color_range(marker["cmin"].as_f64(), marker["cmax"].as_f64(), &values);
        for (i, point) in xs.iter().zip(ys.iter()).enumerate() {
            let (Some(x), Some(y)) = point else { continue };
            let dot = match (values.get(i), range) {
                (Some(v), Some((lo, hi))) if v.is_finite() && !scale.is_empty() => {
                    let span = if hi > lo { hi - lo } else { 1.0 };
                    let (r, g, b) = sample(&scale, (v - lo) / span);
                    RGBColor(r, g, b)
                }
                (Some(v), _) if !v.is_finite() => continue,
                _ => color,
            };
            marks.push(Mark::Dot((*x, *y), dot));
        }
    }
}

fn heatmap_marks(trace: &Value, xmap: &AxisMap, ymap: &AxisMap, marks: &mut Vec<Mark>) {
    let x_edges = cell_edges(&flatten(&xmap.positions(&axis_values(&trace["x"]))));
    let y_edges = cell_edges(&flatten(&ymap.positions(&axis_values(&trace["y"]))));
    let z = matrix(&trace["z"]);
    let scale = color_stops(&trace["colorscale"]);
    let all: Vec<f64> = z.iter().flatten().copied().collect();
    let Some((lo, hi)) = color_range(trace["zmin"].as_f64(), trace["zmax"].as_f64(), &all) else {
        return;
    };
    let span = if hi > lo { hi - lo } else { 1.0 };
    for (j, row) in z.iter().enumerate() {
        for (i, v) in row.iter().enumerate() {
            if !v.is_finite() || i + 1 >= x_edges.len() || j + 1 >= y_edges.len() {
                continue;
            }
            let (r, g, b) = sample(&scale, (v - lo) / span);
            marks.push(Mark::Cell(
                [(x_edges[i], y_edges[j]), (x_edges[i + 1], y_edges[j + 1])],
                RGBColor(r, g, b),
            ));
        }
    }
}

fn collect_marks(data: &Value, xmap: &AxisMap, ymap: &AxisMap) -> Vec<Mark> {
    let mut marks = Vec::new();
    for trace in data.as_array().into_iter().flatten() {
        match trace["type"].as_str() {
            Some("heatmap") => heatmap_marks(trace, xmap, ymap, &mut marks),
            Some("scatter") => scatter_marks(trace, xmap, ymap, &mut marks),
            other => debug!("Skipping trace type {:?} in snapshot", other),
        }
    }
    marks
}

fn flatten(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().map(|v| v.unwrap_or(f64::NAN)).collect()
}

fn bounds(marks: &[Mark]) -> ((f64, f64), (f64, f64)) {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for mark in marks {
        match mark {
            Mark::Path(points, _) => points.iter().for_each(|(x, y)| {
                xs.push(*x);
                ys.push(*y);
            }),
            Mark::Dot((x, y), _) => {
                xs.push(*x);
                ys.push(*y);
            }
            Mark::Cell([(x0, y0), (x1, y1)], _) => {
                xs.extend([*x0, *x1]);
                ys.extend([*y0, *y1]);
            }
        }
    }
    (padded(finite_range(&xs)), padded(finite_range(&ys)))
}

fn padded(range: Option<(f64, f64)>) -> (f64, f64) {
    match range {
        Some((lo, hi)) if hi > lo => (lo, hi),
        Some((v, _)) => (v - 0.5, v + 0.5),
        None => (0.0, 1.0),
    }
}

fn draw_figure<DB>(root: &DrawingArea<DB, Shift>, json: &Value) -> PlotResult<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let layout = &json["layout"];
    let (xaxis, yaxis) = (&layout["xaxis"], &layout["yaxis"]);
    let background = layout["paper_bgcolor"]
        .as_str()
        .map_or(RGBColor(255, 255, 255), named_color);
    let foreground = layout["font"]["color"]
        .as_str()
        .map_or(RGBColor(0, 0, 0), named_color);
    let font_size = layout["font"]["size"].as_f64().unwrap_or(12.0);
    let title_size = layout["title"]["font"]["size"].as_f64().unwrap_or(16.0);

    root.fill(&background).map_err(render_err)?;

    let data = &json["data"];
    let xmap = AxisMap::new(xaxis, first_labels(data, "x"));
    let ymap = AxisMap::new(yaxis, first_labels(data, "y"));
    let marks = collect_marks(data, &xmap, &ymap);
    let (auto_x, auto_y) = bounds(&marks);
    let (x0, x1) = xmap.range(xaxis).unwrap_or(auto_x);
    let (y0, y1) = ymap.range(yaxis).unwrap_or(auto_y);

    let title = title_text(layout).unwrap_or_default();
    let x_desc = title_text(xaxis).unwrap_or_default();
    let y_desc = title_text(yaxis).unwrap_or_default();

    let mut chart = ChartBuilder::on(root)
        .caption(
            title,
            ("sans-serif", title_size as u32).into_font().color(&foreground),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(render_err)?;

    let x_fmt = |v: &f64| xmap.label(*v);
    let y_fmt = |v: &f64| ymap.label(*v);
    let label_style = ("sans-serif", font_size as u32).into_font().color(&foreground);
    let mut mesh = chart.configure_mesh();
    mesh.x_desc(x_desc)
        .y_desc(y_desc)
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .label_style(label_style.clone())
        .axis_desc_style(label_style)
        .axis_style(&foreground);
    let grid = |axis: &Value| axis["showgrid"].as_bool().unwrap_or(true);
    if !grid(xaxis) || !grid(yaxis) {
        mesh.disable_mesh();
    }
    mesh.draw().map_err(render_err)?;

    chart
        .draw_series(marks.iter().filter_map(|m| match m {
            Mark::Cell(corners, color) => Some(Rectangle::new(*corners, color.filled())),
            _ => None,
        }))
        .map_err(render_err)?;
    for mark in &marks {
        if let Mark::Path(points, color) = mark {
            chart
                .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(1)))
                .map_err(render_err)?;
        }
    }
    chart
        .draw_series(marks.iter().filter_map(|m| match m {
            Mark::Dot(point, color) => Some(Circle::new(*point, 3, color.filled())),
            _ => None,
        }))
        .map_err(render_err)?;

    Ok(())
}
