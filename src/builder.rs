//! # Figure Builder
//!
//! Turns a loaded [`DataArray`] into a [`Figure`] for a resolved
//! [`PlotKind`]. Every kind has its own builder function returning a
//! [`Panel`]; [`finish`] then applies the common layout (title, axis titles,
//! grid, fonts, theme) and assembles the plotly plot.
//!
//! Axis conventions:
//!
//! - line plots put coordinates on x and values on y, except profiles, which
//!   put values on x and depth on a reversed y axis
//! - heatmaps use the first dimension for x and the second for y; `z` rows
//!   always follow y
//! - maps use longitude for x and latitude for y, with y reversed
//!
//! Explicit `reverse_x` / `reverse_y` options override those defaults.
//! plotly axes have no "reversed" flag of their own, so a reversed axis gets
//! a descending range over the drawn extent.

use crate::classify::{resolve_slice_dimension, AxisRole, PlotKind};
use crate::colormap::{self, ColorStop};
use crate::dataset::{finite_range, DataArray};
use crate::error::{PlotError, PlotResult};
use crate::figure::{cell_edges, AxisPoint, AxisValues, Figure};
use crate::overlay::{load_overlays, OverlayPath};
use crate::settings::{
    PlotOptions, Settings, Theme, DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, DEFAULT_TITLE_FONT_SIZE,
};
use crate::time::{time_labels, DEFAULT_TIME_FORMAT};
use log::debug;
use plotly::common::{ColorBar, Font, Marker, Mode, Title};
use plotly::layout::{
    Animation, AnimationMode, AnimationOptions, Axis, AxisType, Frame, FrameSettings, HoverMode,
    Slider, SliderCurrentValue, SliderCurrentValueXAnchor, SliderStep, SliderStepBuilder,
    TransitionSettings,
};
use plotly::{HeatMap, Layout, Plot, Scatter, Trace, Traces};
use std::path::Path;

/// Maximum number of animation frames for 3-D plots.
pub const MAX_FRAMES: usize = 50;

/// Everything the builder needs besides the data.
#[derive(Debug, Clone)]
pub struct FigureContext {
    /// Options with settings defaults already merged in.
    pub options: PlotOptions,
    pub colorscale: Vec<ColorStop>,
    pub overlays: Vec<OverlayPath>,
    pub theme: Theme,
    /// File name used in the default title.
    pub source_name: String,
}

impl FigureContext {
    /// Context with the fallback colorscale, no overlays and the light theme.
    pub fn new(options: PlotOptions) -> Self {
        let theme = options.theme.unwrap_or_default();
        FigureContext {
            options,
            colorscale: colormap::evenly_spaced(&[]),
            overlays: Vec::new(),
            theme,
            source_name: String::new(),
        }
    }

    /// Resolves options, colorscale, overlays and theme against `settings`.
    /// Overlays are only read for `map_2d`.
    pub fn from_settings(
        options: &PlotOptions,
        settings: &Settings,
        source_path: &str,
        kind: PlotKind,
    ) -> Self {
        let options = options.merged_over(&settings.plot_defaults);
        let colorscale = colormap::lookup(options.cmap_or_default(), &settings.colorbar_dir);
        let overlays = if kind == PlotKind::Map2d {
            load_overlays(&settings.active_overlays, &settings.overlay_dir)
        } else {
            Vec::new()
        };
        let theme = settings.theme_for(&options);
        let source_name = Path::new(source_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source_path.to_string());

        FigureContext {
            options,
            colorscale,
            overlays,
            theme,
            source_name,
        }
    }

    fn time_format(&self) -> &str {
        self.options.time_format.as_deref().unwrap_or(DEFAULT_TIME_FORMAT)
    }

    fn log_scale(&self) -> bool {
        self.options.log_scale_or_default()
    }
}

/// One chart axis as a branch lays it out. Ranges are in axis units, log10
/// on log axes.
#[derive(Debug, Clone, Default)]
struct AxisPlan {
    title: String,
    log: bool,
    /// Range from vmin/vmax.
    range: Option<(f64, f64)>,
    /// What the traces cover; becomes the range of a reversed axis.
    extent: Option<(f64, f64)>,
    reversed: bool,
}

impl AxisPlan {
    fn new(title: String, extent: Option<(f64, f64)>) -> Self {
        AxisPlan {
            title,
            extent,
            ..Default::default()
        }
    }

    fn reversed(mut self, reversed: bool) -> Self {
        self.reversed = reversed;
        self
    }

    /// Value axis of a line plot: log scale and vmin/vmax apply.
    fn values(title: String, values: &[f64], ctx: &FigureContext) -> Self {
        let log = ctx.log_scale();
        AxisPlan {
            title,
            log,
            range: value_range(values, ctx).and_then(|r| axis_units(r, log)),
            extent: line_extent(&AxisValues::Numeric(values.to_vec()), log),
            reversed: false,
        }
    }

    fn into_axis(self, title: Option<&String>, reverse: Option<bool>, grid: bool) -> Axis {
        let reversed = reverse.unwrap_or(self.reversed);
        let mut axis = Axis::new()
            .title(title.cloned().unwrap_or(self.title))
            .show_grid(grid);
        if self.log {
            axis = axis.type_(AxisType::Log);
        }
        let range = self.range.or(if reversed { self.extent } else { None });
        if let Some((a, b)) = range {
            let (lo, hi) = (a.min(b), a.max(b));
            axis = axis.range(if reversed { vec![hi, lo] } else { vec![lo, hi] });
        }
        axis
    }
}

/// Traces, axes and animation produced by one branch.
struct Panel {
    traces: Vec<Box<dyn Trace>>,
    x: AxisPlan,
    y: AxisPlan,
    frames: Vec<Frame>,
    slider: Option<Slider>,
}

impl Panel {
    fn new(traces: Vec<Box<dyn Trace>>, x: AxisPlan, y: AxisPlan) -> Self {
        Panel {
            traces,
            x,
            y,
            frames: Vec::new(),
            slider: None,
        }
    }
}

/// Builds the figure for `kind`.
///
/// # Errors
///
/// - `CannotRender` for `scalar`
/// - `UnsupportedDimensions` when the array shape does not fit the branch
/// - `InsufficientDimensions`, `NoSliceDimension` or `NoFrames` for 3-D kinds
pub fn build_figure(kind: PlotKind, array: &DataArray, ctx: &FigureContext) -> PlotResult<Figure> {
    debug!("Building '{}' figure for '{}'", kind, array.name());
    let panel = match kind {
        PlotKind::Scalar => {
            return Err(PlotError::CannotRender {
                variable: array.name().to_string(),
                kind: kind.label().to_string(),
            });
        }
        PlotKind::TimeSeries | PlotKind::Generic1d => build_line(array, ctx)?,
        PlotKind::Profile => build_profile(array, ctx)?,
        PlotKind::Map2d => build_map(array, ctx)?,
        PlotKind::Heatmap2d | PlotKind::TimeDepthHeatmap | PlotKind::Generic2d => {
            build_heatmap(array, ctx)?
        }
        PlotKind::TimeMap3d
        | PlotKind::DepthMap3d
        | PlotKind::TimeSection3d
        | PlotKind::Generic3d => build_animated(kind, array, ctx)?,
    };
    Ok(finish(panel, array, ctx))
}

fn unsupported(array: &DataArray) -> PlotError {
    PlotError::UnsupportedDimensions {
        variable: array.name().to_string(),
        dimensions: array.dimensions().to_vec(),
    }
}

fn role_of(array: &DataArray, axis: usize) -> AxisRole {
    match array.coordinate(axis) {
        Some(coord) => AxisRole::classify(Some(&coord.descriptor)),
        None => AxisRole::from_metadata(&array.dimensions()[axis], &Default::default()),
    }
}

fn suggests_depth(name: &str) -> bool {
    let name = name.to_lowercase();
    name.contains("depth") || name.contains("pressure")
}

/// Coordinate values along `axis`, with CF times decoded to labels.
fn axis_values(array: &DataArray, axis: usize, ctx: &FigureContext) -> AxisValues {
    if let Some(coord) = array.coordinate(axis) {
        if AxisRole::classify(Some(&coord.descriptor)) == AxisRole::Time {
            if let Some(labels) = time_labels(coord, ctx.time_format()) {
                return AxisValues::Labels(labels);
            }
        }
    }
    AxisValues::Numeric(array.axis_values(axis))
}

/// Explicit label, else the variable's units, else its long name or name.
fn colorbar_title(array: &DataArray, ctx: &FigureContext) -> String {
    let label = ctx.options.colorbar_label.clone().unwrap_or_else(|| {
        let attr = |name: &str| array.descriptor.attribute(name).filter(|v| !v.trim().is_empty());
        attr("units")
            .or_else(|| attr("long_name"))
            .unwrap_or(array.name())
            .to_string()
    });
    if ctx.log_scale() {
        format!("{} (log10)", label)
    } else {
        label
    }
}

/// Value range from vmin/vmax, completed from the data when only one is set.
fn value_range(values: &[f64], ctx: &FigureContext) -> Option<(f64, f64)> {
    let (vmin, vmax) = (ctx.options.vmin, ctx.options.vmax);
    if vmin.is_none() && vmax.is_none() {
        return None;
    }
    let data = finite_range(values);
    Some((
        vmin.or(data.map(|d| d.0))?,
        vmax.or(data.map(|d| d.1))?,
    ))
}

fn log10_or_none(v: f64) -> Option<f64> {
    if v.is_finite() && v > 0.0 { Some(v.log10()) } else { None }
}

fn axis_units((lo, hi): (f64, f64), log: bool) -> Option<(f64, f64)> {
    if log {
        Some((log10_or_none(lo)?, log10_or_none(hi)?))
    } else {
        Some((lo, hi))
    }
}

/// Category axes place labels at 0, 1, ...
fn label_extent(count: usize) -> Option<(f64, f64)> {
    (count > 0).then(|| (-0.5, count as f64 - 0.5))
}

/// Extent of line or marker data, padded by 5% like plotly's autorange.
fn line_extent(values: &AxisValues, log: bool) -> Option<(f64, f64)> {
    let positions: Vec<f64> = match values {
        AxisValues::Labels(labels) => return label_extent(labels.len()),
        AxisValues::Numeric(v) if log => v.iter().filter_map(|v| log10_or_none(*v)).collect(),
        AxisValues::Numeric(v) => v.clone(),
    };
    let (lo, hi) = finite_range(&positions)?;
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 0.5 };
    Some((lo - pad, hi + pad))
}

/// Extent of heatmap cells centred on `values`.
fn cell_extent(values: &AxisValues) -> Option<(f64, f64)> {
    match values {
        AxisValues::Labels(labels) => label_extent(labels.len()),
        AxisValues::Numeric(v) => finite_range(&cell_edges(v)),
    }
}

fn line_trace(x: &AxisValues, y: &AxisValues, name: &str) -> Box<dyn Trace> {
    Scatter::new(x.points(), y.points())
        .mode(Mode::LinesMarkers)
        .name(name)
}

fn build_line(array: &DataArray, ctx: &FigureContext) -> PlotResult<Panel> {
    if array.ndim() != 1 {
        return Err(unsupported(array));
    }
    let x = axis_values(array, 0, ctx);
    let y = AxisValues::Numeric(array.values.clone());
    let trace = line_trace(&x, &y, array.name());

    Ok(Panel::new(
        vec![trace],
        AxisPlan::new(array.axis_label(0), line_extent(&x, false)),
        AxisPlan::values(array.descriptor.label(), &array.values, ctx),
    ))
}

fn build_profile(array: &DataArray, ctx: &FigureContext) -> PlotResult<Panel> {
    if array.ndim() != 1 {
        return Err(unsupported(array));
    }
    let x = AxisValues::Numeric(array.values.clone());
    let y = AxisValues::Numeric(array.axis_values(0));
    let trace = line_trace(&x, &y, array.name());

    Ok(Panel::new(
        vec![trace],
        AxisPlan::values(array.descriptor.label(), &array.values, ctx),
        AxisPlan::new(array.axis_label(0), line_extent(&y, false)).reversed(true),
    ))
}

/// A heatmap trace and the axis values it was built over.
struct Grid {
    trace: Box<HeatMap<AxisPoint, AxisPoint, Vec<f64>>>,
    x: AxisValues,
    y: AxisValues,
}

/// Heatmap of a 2-D array with `x_axis` on x and the other axis on y.
fn grid_heatmap(
    array: &DataArray,
    x_axis: usize,
    ctx: &FigureContext,
    color_range: Option<(f64, f64)>,
) -> PlotResult<Grid> {
    if array.ndim() != 2 {
        return Err(unsupported(array));
    }
    let y_axis = 1 - x_axis;
    let rows = if y_axis == 0 {
        array.rows()?
    } else {
        array.transposed_rows()?
    };

    let log = ctx.log_scale();
    let z: Vec<Vec<f64>> = if log {
        rows.iter()
            .map(|row| row.iter().map(|v| log10_or_none(*v).unwrap_or(f64::NAN)).collect())
            .collect()
    } else {
        rows
    };

    let x = axis_values(array, x_axis, ctx);
    let y = axis_values(array, y_axis, ctx);
    let mut trace = HeatMap::new(x.points(), y.points(), z)
        .color_scale(colormap::color_scale(&ctx.colorscale))
        .color_bar(ColorBar::new().title(colorbar_title(array, ctx)))
        .name(array.name());
    if let Some((zmin, zmax)) = color_range.and_then(|r| axis_units(r, log)) {
        trace = trace.zmin(zmin).zmax(zmax);
    }
    Ok(Grid { trace, x, y })
}

fn build_heatmap(array: &DataArray, ctx: &FigureContext) -> PlotResult<Panel> {
    let grid = grid_heatmap(array, 0, ctx, value_range(&array.values, ctx))?;
    let x = AxisPlan::new(array.axis_label(0), cell_extent(&grid.x));
    let y = AxisPlan::new(array.axis_label(1), cell_extent(&grid.y))
        .reversed(suggests_depth(&array.dimensions()[1]));
    let trace: Box<dyn Trace> = grid.trace;
    Ok(Panel::new(vec![trace], x, y))
}

/// Latitude and longitude auxiliary coordinates matching a 1-D array.
fn station_coordinates(array: &DataArray) -> Option<(&[f64], &[f64])> {
    if array.ndim() != 1 {
        return None;
    }
    let find = |role: AxisRole| {
        array
            .auxiliary
            .iter()
            .find(|c| {
                AxisRole::classify(Some(&c.descriptor)) == role && c.values.len() == array.values.len()
            })
            .map(|c| c.values.as_slice())
    };
    Some((find(AxisRole::Latitude)?, find(AxisRole::Longitude)?))
}

/// Axes of a 2-D array holding (longitude, latitude), in that order.
fn horizontal_axes(array: &DataArray) -> Option<(usize, usize)> {
    let roles: Vec<AxisRole> = (0..array.ndim()).map(|a| role_of(array, a)).collect();
    let lat = roles.iter().position(|r| *r == AxisRole::Latitude);
    let lon = roles.iter().position(|r| *r == AxisRole::Longitude);
    match (lon, lat) {
        (Some(lon), Some(lat)) => Some((lon, lat)),
        _ => None,
    }
}

/// Station values as markers at (longitude, latitude), colored by value.
fn station_markers(array: &DataArray, lat: &[f64], lon: &[f64], ctx: &FigureContext) -> Panel {
    let mut marker = Marker::new()
        .color_array(array.values.clone())
        .color_scale(colormap::color_scale(&ctx.colorscale))
        .show_scale(true)
        .color_bar(ColorBar::new().title(colorbar_title(array, ctx)))
        .size(8);
    if let Some((cmin, cmax)) = value_range(&array.values, ctx).or_else(|| array.value_range()) {
        marker = marker.cmin(cmin).cmax(cmax);
    }
    let trace: Box<dyn Trace> = Scatter::new(lon.to_vec(), lat.to_vec())
        .mode(Mode::Markers)
        .marker(marker)
        .name(array.name());

    Panel::new(
        vec![trace],
        AxisPlan::new(
            "Longitude".to_string(),
            line_extent(&AxisValues::Numeric(lon.to_vec()), false),
        ),
        AxisPlan::new(
            "Latitude".to_string(),
            line_extent(&AxisValues::Numeric(lat.to_vec()), false),
        ),
    )
}

fn build_map(array: &DataArray, ctx: &FigureContext) -> PlotResult<Panel> {
    if let Some((lat, lon)) = station_coordinates(array) {
        return Ok(station_markers(array, lat, lon, ctx));
    }
    if array.ndim() < 2 {
        return Err(unsupported(array));
    }

    // Reduce everything except the two horizontal axes at index 0.
    let (mut lon_axis, mut lat_axis) = horizontal_axes(array).unwrap_or((1, 0));
    let mut grid = array.clone();
    for axis in (0..array.ndim()).rev() {
        if axis != lon_axis && axis != lat_axis {
            grid = grid.select(axis, 0)?;
            if axis < lon_axis {
                lon_axis -= 1;
            }
            if axis < lat_axis {
                lat_axis -= 1;
            }
        }
    }
    if grid.ndim() != 2 {
        return Err(unsupported(array));
    }

    let heatmap = grid_heatmap(&grid, lon_axis, ctx, value_range(&grid.values, ctx))?;
    let x = AxisPlan::new(grid.axis_label(lon_axis), cell_extent(&heatmap.x));
    let y = AxisPlan::new(grid.axis_label(lat_axis), cell_extent(&heatmap.y)).reversed(true);

    let mut traces: Vec<Box<dyn Trace>> = Vec::with_capacity(ctx.overlays.len() + 1);
    traces.push(heatmap.trace);
    for overlay in &ctx.overlays {
        traces.push(overlay.to_trace());
    }
    Ok(Panel::new(traces, x, y))
}

fn slice_labels(array: &DataArray, axis: usize, ctx: &FigureContext) -> Vec<String> {
    match axis_values(array, axis, ctx) {
        AxisValues::Labels(labels) => labels,
        AxisValues::Numeric(values) => values
            .iter()
            .map(|v| if v.is_finite() { v.to_string() } else { "NaN".to_string() })
            .collect(),
    }
}

/// Slider step that jumps to `frame` without transition.
fn slider_step(frame: &str, label: &str) -> PlotResult<SliderStep> {
    let animation = Animation::frames(vec![frame.to_string()]).options(
        AnimationOptions::new()
            .mode(AnimationMode::Immediate)
            .frame(FrameSettings::new().duration(0).redraw(true))
            .transition(TransitionSettings::new().duration(0)),
    );
    SliderStepBuilder::new()
        .label(label)
        .value(label)
        .animation(animation)
        .build()
        .map_err(|e| PlotError::Render(format!("Slider step for frame '{}': {}", frame, e)))
}

fn build_animated(kind: PlotKind, array: &DataArray, ctx: &FigureContext) -> PlotResult<Panel> {
    if array.ndim() < 3 {
        return Err(PlotError::InsufficientDimensions {
            variable: array.name().to_string(),
            kind: kind.label().to_string(),
            found: array.ndim(),
            needed: 3,
        });
    }

    let slice_axis = resolve_slice_dimension(kind, array.dimensions()).map_err(|_| {
        PlotError::NoSliceDimension {
            variable: array.name().to_string(),
            kind: kind.label().to_string(),
        }
    })?;
    let slice_name = array.dimensions()[slice_axis].clone();
    let labels = slice_labels(array, slice_axis, ctx);
    let color_range = value_range(&array.values, ctx).or_else(|| array.value_range());
    let count = array.shape()[slice_axis].min(MAX_FRAMES);

    let mut frames = Vec::new();
    let mut steps = Vec::new();
    let mut first: Option<(Grid, DataArray, usize)> = None;
    for i in 0..count {
        let frame = array.select(slice_axis, i)?;
        if frame.ndim() != 2 {
            debug!("Skipping frame {} of '{}': {} dimensions", i, array.name(), frame.ndim());
            continue;
        }
        let x_axis = match kind {
            PlotKind::TimeMap3d | PlotKind::DepthMap3d => {
                horizontal_axes(&frame).map_or(0, |(lon, _)| lon)
            }
            _ => 0,
        };
        let grid = grid_heatmap(&frame, x_axis, ctx, color_range)?;
        let name = format!("{}={}", slice_name, labels[i]);
        steps.push(slider_step(&name, &labels[i])?);

        let mut data = Traces::new();
        data.push(grid.trace.clone());
        frames.push(Frame::new().name(&name).data(data));
        if first.is_none() {
            first = Some((grid, frame, x_axis));
        }
    }

    let Some((grid, frame, x_axis)) = first else {
        return Err(PlotError::NoFrames(array.name().to_string()));
    };

    let y_axis = 1 - x_axis;
    let x = AxisPlan::new(frame.axis_label(x_axis), cell_extent(&grid.x));
    let y = AxisPlan::new(frame.axis_label(y_axis), cell_extent(&grid.y))
        .reversed(suggests_depth(&frame.dimensions()[y_axis]));
    let slider = Slider::new()
        .active(0)
        .steps(steps)
        .x(0.1)
        .length(0.9)
        .current_value(
            SliderCurrentValue::new()
                .prefix(format!("{}: ", slice_name))
                .visible(true)
                .x_anchor(SliderCurrentValueXAnchor::Right),
        );

    let trace: Box<dyn Trace> = grid.trace;
    let mut panel = Panel::new(vec![trace], x, y);
    panel.frames = frames;
    panel.slider = Some(slider);
    Ok(panel)
}

/// Title, axis titles, grid, reversal, fonts and theme colors, then the plot.
fn finish(panel: Panel, array: &DataArray, ctx: &FigureContext) -> Figure {
    let options = &ctx.options;

    let title = options.title.clone().unwrap_or_else(|| {
        if ctx.source_name.is_empty() {
            array.name().to_string()
        } else {
            format!("{} - {}", ctx.source_name, array.name())
        }
    });
    let title_font = Font::new()
        .family(options.title_font_family.as_deref().unwrap_or(DEFAULT_FONT_FAMILY))
        .size(options.title_font_size.unwrap_or(DEFAULT_TITLE_FONT_SIZE).round() as usize);
    let font = Font::new()
        .family(options.font_family.as_deref().unwrap_or(DEFAULT_FONT_FAMILY))
        .size(options.font_size.unwrap_or(DEFAULT_FONT_SIZE).round() as usize)
        .color(ctx.theme.font_color());

    let grid = options.grid_or_default();
    let mut layout = Layout::new()
        .title(Title::with_text(title).font(title_font))
        .font(font)
        .paper_background_color(ctx.theme.background())
        .plot_background_color(ctx.theme.plot_background())
        .hover_mode(HoverMode::Closest)
        .x_axis(panel.x.into_axis(options.xlabel.as_ref(), options.reverse_x, grid))
        .y_axis(panel.y.into_axis(options.ylabel.as_ref(), options.reverse_y, grid));
    if let Some(slider) = panel.slider {
        layout = layout.sliders(vec![slider]);
    }

    let mut plot = Plot::new();
    plot.add_traces(panel.traces);
    plot.set_layout(layout);
    if !panel.frames.is_empty() {
        plot.add_frames(&panel.frames);
    }
    Figure::new(plot)
}
