//! Color tables.
//!
//! A colormap name resolves, in order, to a Panoply-style `.pal` file in the
//! colorbar directory, a built-in table, or the blue/green/red fallback. The
//! result is never empty.

use log::{debug, warn};
use plotly::common::{ColorScale, ColorScaleElement};
use std::fs;
use std::path::Path;

pub const FALLBACK_COLORS: [&str; 3] = ["#0000ff", "#00ff00", "#ff0000"];

const VIRIDIS: [&str; 9] = [
    "#440154", "#472d7b", "#3b528b", "#2c728e", "#21918c", "#28ae80", "#5ec962", "#addc30",
    "#fde725",
];

const JET: [&str; 9] = [
    "#00007f", "#0000ff", "#007fff", "#00ffff", "#7fff7f", "#ffff00", "#ff7f00", "#ff0000",
    "#7f0000",
];

const GRAYS: [&str; 2] = ["#000000", "#ffffff"];

/// One colorscale stop: fraction in `[0, 1]` and a CSS color.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorStop(pub f64, pub String);

/// The stops as a plotly colorscale.
pub fn color_scale(stops: &[ColorStop]) -> ColorScale {
    ColorScale::Vector(
        stops
            .iter()
            .map(|ColorStop(at, color)| ColorScaleElement(*at, color.clone()))
            .collect(),
    )
}

/// Resolves `name` to evenly spaced color stops.
pub fn lookup(name: &str, colorbar_dir: &Path) -> Vec<ColorStop> {
    let file_name = if name.ends_with(".pal") {
        name.to_string()
    } else {
        format!("{}.pal", name)
    };
    let path = colorbar_dir.join(&file_name);

    let colors = match fs::read_to_string(&path) {
        Ok(text) => {
            let colors = parse_pal(&text);
            if colors.is_empty() {
                warn!("Color table {} has no colors", path.display());
            }
            colors
        }
        Err(e) => {
            debug!("No color table at {}: {}", path.display(), e);
            Vec::new()
        }
    };

    let colors = if colors.is_empty() {
        builtin(name.trim_end_matches(".pal"))
            .map(|table| table.iter().map(|c| c.to_string()).collect())
            .unwrap_or_else(|| FALLBACK_COLORS.iter().map(|c| c.to_string()).collect())
    } else {
        colors
    };

    evenly_spaced(&colors)
}

fn builtin(name: &str) -> Option<&'static [&'static str]> {
    match name.to_lowercase().as_str() {
        "viridis" => Some(&VIRIDIS),
        "jet" => Some(&JET),
        "gray" | "grays" | "greys" => Some(&GRAYS),
        _ => None,
    }
}

/// Parses `r g b` lines into hex colors. `#` lines and malformed lines are skipped.
pub fn parse_pal(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let parts: Vec<u8> = line
                .split_whitespace()
                .map(|p| p.parse::<u8>())
                .collect::<Result<_, _>>()
                .ok()?;
            match parts.as_slice() {
                [r, g, b] => Some(format!("#{:02x}{:02x}{:02x}", r, g, b)),
                _ => None,
            }
        })
        .collect()
}

/// Pairs colors with fractions `i / (n - 1)`. A single color covers both ends.
pub fn evenly_spaced(colors: &[String]) -> Vec<ColorStop> {
    match colors {
        [] => evenly_spaced(
            &FALLBACK_COLORS
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>(),
        ),
        [only] => vec![ColorStop(0.0, only.clone()), ColorStop(1.0, only.clone())],
        _ => {
            let last = (colors.len() - 1) as f64;
            colors
                .iter()
                .enumerate()
                .map(|(i, c)| ColorStop(i as f64 / last, c.clone()))
                .collect()
        }
    }
}

pub fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Linearly interpolated color at `t` in `[0, 1]`.
pub fn sample(scale: &[ColorStop], t: f64) -> (u8, u8, u8) {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let rgb = |stop: &ColorStop| parse_hex(&stop.1).unwrap_or((0, 0, 0));

    let Some(first) = scale.first() else {
        return (0, 0, 0);
    };
    for pair in scale.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if t <= b.0 {
            let span = b.0 - a.0;
            let f = if span > 0.0 { (t - a.0) / span } else { 0.0 };
            let (ar, ag, ab) = rgb(a);
            let (br, bg, bb) = rgb(b);
            let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * f).round() as u8;
            return (mix(ar, br), mix(ag, bg), mix(ab, bb));
        }
    }
    scale.last().map(rgb).unwrap_or_else(|| rgb(first))
}
