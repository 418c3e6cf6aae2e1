//! Map overlays.
//!
//! Overlays are coastlines, boundaries or tracks drawn over `map_2d`
//! heatmaps. Two file kinds are understood:
//!
//! - GeoJSON (`.geojson`, `.json`): `Polygon` and `MultiPolygon` exterior
//!   rings in black, `LineString` and `MultiLineString` in blue
//! - text (`.txt`, `.csv`): one path per line, `lat,lon,lat,lon,...`, in green
//!
//! Loading never fails: unreadable files yield no paths and a warning.

use log::{info, warn};
use plotly::common::{HoverInfo, Line, Mode};
use plotly::Scatter;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// A polyline in geographic coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPath {
    pub name: String,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub color: String,
}

impl OverlayPath {
    /// Line trace on cartesian axes (x = longitude, y = latitude).
    pub fn to_trace(&self) -> Box<Scatter<f64, f64>> {
        Scatter::new(self.lon.clone(), self.lat.clone())
            .mode(Mode::Lines)
            .name(&self.name)
            .line(Line::new().width(1.0).color(self.color.clone()))
            .hover_info(HoverInfo::Text)
            .text(&self.name)
            .show_legend(false)
    }
}

/// Loads every overlay in `names` from `overlay_dir`.
pub fn load_overlays(names: &[String], overlay_dir: &Path) -> Vec<OverlayPath> {
    names
        .iter()
        .flat_map(|name| load_overlay(name, overlay_dir))
        .collect()
}

/// Loads one overlay file. Any failure yields an empty list.
pub fn load_overlay(file_name: &str, overlay_dir: &Path) -> Vec<OverlayPath> {
    let path = overlay_dir.join(file_name);
    if !path.exists() {
        warn!("Overlay file does not exist: {}", path.display());
        return Vec::new();
    }

    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to read overlay {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let lower = file_name.to_lowercase();
    let paths = if lower.ends_with(".geojson") || lower.ends_with(".json") {
        match serde_json::from_str::<Value>(&text) {
            Ok(geo) => parse_geojson(&geo, file_name),
            Err(e) => {
                warn!("Invalid GeoJSON in overlay {}: {}", path.display(), e);
                return Vec::new();
            }
        }
    } else if lower.ends_with(".txt") || lower.ends_with(".csv") {
        parse_text(&text, file_name)
    } else {
        warn!("Unsupported overlay format: {}", file_name);
        return Vec::new();
    };

    info!("Loaded {} overlay path(s) from {}", paths.len(), file_name);
    paths
}

/// Paths from a GeoJSON `FeatureCollection`.
pub fn parse_geojson(geo: &Value, default_name: &str) -> Vec<OverlayPath> {
    let Some(features) = geo.get("features").and_then(Value::as_array) else {
        warn!("Overlay {} has no features", default_name);
        return Vec::new();
    };

    let mut paths = Vec::new();
    for feature in features {
        let name = feature
            .pointer("/properties/name")
            .and_then(Value::as_str)
            .unwrap_or(default_name)
            .to_string();
        let Some(geometry) = feature.get("geometry") else {
            continue;
        };
        let coords = geometry.get("coordinates").unwrap_or(&Value::Null);
        let geometry_type = geometry.get("type").and_then(Value::as_str).unwrap_or("");

        // Polygon rings: only the exterior ring (index 0) is drawn.
        let (lines, color): (Vec<&Value>, &str) = match geometry_type {
            "Polygon" => (as_items(coords).into_iter().take(1).collect(), "black"),
            "MultiPolygon" => (
                as_items(coords)
                    .into_iter()
                    .filter_map(|polygon| as_items(polygon).into_iter().next())
                    .collect(),
                "black",
            ),
            "LineString" => (vec![coords], "blue"),
            "MultiLineString" => (as_items(coords), "blue"),
            other => {
                warn!("Skipping unsupported geometry '{}' in {}", other, default_name);
                continue;
            }
        };

        for line in lines {
            if let Some((lon, lat)) = positions(line) {
                paths.push(OverlayPath {
                    name: name.clone(),
                    lat,
                    lon,
                    color: color.to_string(),
                });
            }
        }
    }
    paths
}

fn as_items(value: &Value) -> Vec<&Value> {
    value.as_array().map(|a| a.iter().collect()).unwrap_or_default()
}

/// `[[lon, lat], ...]` into separate longitude and latitude vectors.
fn positions(line: &Value) -> Option<(Vec<f64>, Vec<f64>)> {
    let mut lon = Vec::new();
    let mut lat = Vec::new();
    for position in line.as_array()? {
        let pair = position.as_array()?;
        lon.push(pair.first()?.as_f64()?);
        lat.push(pair.get(1)?.as_f64()?);
    }
    if lon.is_empty() { None } else { Some((lon, lat)) }
}

/// Paths from `lat,lon,lat,lon,...` lines.
pub fn parse_text(text: &str, file_name: &str) -> Vec<OverlayPath> {
    let mut paths = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() % 2 != 0 {
            warn!("Line {} of overlay '{}' has an odd number of values", i + 1, file_name);
            continue;
        }

        let mut lat = Vec::new();
        let mut lon = Vec::new();
        for pair in parts.chunks(2) {
            match (pair[0].parse::<f64>(), pair[1].parse::<f64>()) {
                (Ok(la), Ok(lo)) => {
                    lat.push(la);
                    lon.push(lo);
                }
                _ => warn!("Line {} of overlay '{}' has a non-numeric pair", i + 1, file_name),
            }
        }

        if !lat.is_empty() {
            paths.push(OverlayPath {
                name: format!("{}_line_{}", file_name, i + 1),
                lat,
                lon,
                color: "green".to_string(),
            });
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const GEOJSON: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"name": "island"},
             "geometry": {"type": "Polygon", "coordinates": [
                [[0, 0], [1, 0], [1, 1], [0, 0]],
                [[0.2, 0.2], [0.3, 0.2], [0.2, 0.2]]
             ]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "MultiLineString", "coordinates": [
                [[10, 20], [11, 21]],
                [[12, 22], [13, 23]]
             ]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "Point", "coordinates": [5, 5]}}
        ]
    }"#;

    #[test]
    fn test_geojson_features() {
        let geo: Value = serde_json::from_str(GEOJSON).unwrap();
        let paths = parse_geojson(&geo, "coast.geojson");
        assert_eq!(paths.len(), 3);

        assert_eq!(paths[0].name, "island");
        assert_eq!(paths[0].color, "black");
        assert_eq!(paths[0].lon, vec![0.0, 1.0, 1.0, 0.0]);
        assert_eq!(paths[0].lat, vec![0.0, 0.0, 1.0, 0.0]);

        assert_eq!(paths[1].name, "coast.geojson");
        assert_eq!(paths[1].color, "blue");
        assert_eq!(paths[2].lat, vec![22.0, 23.0]);
    }

    #[test]
    fn test_text_overlay_skips_odd_lines() {
        let paths = parse_text("# track\n10,100,11,101\n1,2,3\n\n12,102\n", "track.txt");
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].lat, vec![10.0, 11.0]);
        assert_eq!(paths[0].lon, vec![100.0, 101.0]);
        assert_eq!(paths[0].color, "green");
        assert_eq!(paths[1].name, "track.txt_line_5");
    }

    #[test]
    fn test_load_failures_yield_empty() {
        let dir = TempDir::new().unwrap();
        assert!(load_overlay("missing.geojson", dir.path()).is_empty());

        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        assert!(load_overlay("broken.json", dir.path()).is_empty());

        fs::write(dir.path().join("shape.shp"), "binary").unwrap();
        assert!(load_overlay("shape.shp", dir.path()).is_empty());
    }

    #[test]
    fn test_load_overlays_from_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("coast.geojson"), GEOJSON).unwrap();
        fs::write(dir.path().join("track.csv"), "1,2,3,4\n").unwrap();

        let names = vec!["coast.geojson".to_string(), "track.csv".to_string()];
        let paths = load_overlays(&names, dir.path());
        assert_eq!(paths.len(), 4);

        let trace = serde_json::to_value(paths[3].to_trace()).unwrap();
        assert_eq!(trace["type"], "scatter");
        assert_eq!(trace["mode"], "lines");
        assert_eq!(trace["x"], serde_json::json!([2.0, 4.0]));
        assert_eq!(trace["y"], serde_json::json!([1.0, 3.0]));
        assert_eq!(trace["showlegend"], false);
    }
}
