//! # Axis Roles and Plot Kinds
//!
//! Classification runs in two steps:
//!
//! 1. every dimension of a variable gets an [`AxisRole`] from the metadata of
//!    its coordinate variable (name, `units`, `standard_name`, `long_name`)
//! 2. the combination of roles resolves to a [`PlotKind`]
//!
//! Both steps are pure functions; nothing is cached between calls.
//!
//! ## Examples
//!
//! ```rust
//! use ncplot::classify::{resolve_plot_kind, AxisRole, PlotKind};
//!
//! let kind = resolve_plot_kind(&[AxisRole::Latitude, AxisRole::Longitude], None).unwrap();
//! assert_eq!(kind, PlotKind::Map2d);
//!
//! let kind = resolve_plot_kind(&[AxisRole::Depth], None).unwrap();
//! assert_eq!(kind, PlotKind::Profile);
//! ```

use crate::dataset::{DatasetSource, VariableDescriptor};
use crate::error::{PlotError, PlotResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

const LATITUDE_UNITS: &[&str] = &["degrees_north", "degree_north", "degree_n", "degrees_n"];
const LONGITUDE_UNITS: &[&str] = &["degrees_east", "degree_east", "degree_e", "degrees_e"];
const LENGTH_UNITS: &[&str] = &[
    "m", "meter", "meters", "metre", "metres", "km", "cm", "decibar", "pa", "hpa",
];

/// Semantic role of a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisRole {
    Latitude,
    Longitude,
    Depth,
    Time,
    Unknown,
}

impl AxisRole {
    /// Order in which roles are tested. The first match wins.
    pub const PRIORITY: [AxisRole; 4] = [
        AxisRole::Latitude,
        AxisRole::Longitude,
        AxisRole::Depth,
        AxisRole::Time,
    ];

    /// Role of a dimension described by `descriptor`. `None` yields `Unknown`.
    pub fn classify(descriptor: Option<&VariableDescriptor>) -> AxisRole {
        match descriptor {
            Some(d) => AxisRole::from_metadata(&d.name, &d.attributes),
            None => AxisRole::Unknown,
        }
    }

    /// Role from a name and its attributes.
    ///
    /// ```rust
    /// use ncplot::classify::AxisRole;
    /// use std::collections::HashMap;
    ///
    /// let mut attrs = HashMap::new();
    /// attrs.insert("units".to_string(), "degrees_north".to_string());
    /// assert_eq!(AxisRole::from_metadata("y", &attrs), AxisRole::Latitude);
    /// assert_eq!(AxisRole::from_metadata("depth_m", &HashMap::new()), AxisRole::Depth);
    /// ```
    pub fn from_metadata(name: &str, attributes: &HashMap<String, String>) -> AxisRole {
        let meta = Metadata::new(name, attributes);
        AxisRole::PRIORITY
            .into_iter()
            .find(|role| role.matches_metadata(&meta))
            .unwrap_or(AxisRole::Unknown)
    }

    /// Whether `name`/`attributes` satisfy this role's rule, ignoring priority.
    pub fn matches(self, name: &str, attributes: &HashMap<String, String>) -> bool {
        self.matches_metadata(&Metadata::new(name, attributes))
    }

    fn matches_metadata(self, meta: &Metadata) -> bool {
        match self {
            AxisRole::Latitude => {
                meta.name.contains("lat")
                    || LATITUDE_UNITS.contains(&meta.units.as_str())
                    || meta.described_as("latitude")
            }
            AxisRole::Longitude => {
                meta.name.contains("lon")
                    || LONGITUDE_UNITS.contains(&meta.units.as_str())
                    || meta.described_as("longitude")
            }
            AxisRole::Depth => {
                ["depth", "pressure", "altitude"]
                    .iter()
                    .any(|t| meta.name.contains(t))
                    || meta.units.contains("dbar")
                    || LENGTH_UNITS.contains(&meta.units.as_str())
                    || meta.described_as("pressure")
                    || meta.described_as("depth")
            }
            AxisRole::Time => {
                meta.name.contains("time")
                    || meta.described_as("time")
                    || meta.units.contains(" since ")
            }
            AxisRole::Unknown => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AxisRole::Latitude => "latitude",
            AxisRole::Longitude => "longitude",
            AxisRole::Depth => "depth",
            AxisRole::Time => "time",
            AxisRole::Unknown => "unknown",
        }
    }

    fn is_horizontal(self) -> bool {
        matches!(self, AxisRole::Latitude | AxisRole::Longitude)
    }
}

impl fmt::Display for AxisRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercased view of the fields the rules look at.
struct Metadata {
    name: String,
    units: String,
    standard_name: String,
    long_name: String,
}

impl Metadata {
    fn new(name: &str, attributes: &HashMap<String, String>) -> Self {
        let attr = |key: &str| {
            attributes
                .get(key)
                .map(|v| v.trim().to_lowercase())
                .unwrap_or_default()
        };
        Metadata {
            name: name.to_lowercase(),
            units: attr("units"),
            standard_name: attr("standard_name"),
            long_name: attr("long_name"),
        }
    }

    fn described_as(&self, token: &str) -> bool {
        self.standard_name.contains(token) || self.long_name.contains(token)
    }
}

/// Roles of every dimension of `descriptor`, in dimension order.
pub fn dimension_roles(source: &dyn DatasetSource, descriptor: &VariableDescriptor) -> Vec<AxisRole> {
    descriptor
        .dimensions
        .iter()
        .map(|dim| match source.describe_dimension(dim) {
            Some(coord) => AxisRole::classify(Some(&coord)),
            // A dimension without a coordinate variable is classified by name alone.
            None => AxisRole::from_metadata(dim, &HashMap::new()),
        })
        .collect()
}

/// Roles and inferred plot kind of one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub variable: String,
    pub dimensions: Vec<String>,
    pub roles: Vec<AxisRole>,
    /// `None` when the variable cannot be plotted with the requested hint.
    pub plot_kind: Option<PlotKind>,
}

/// Classifies `variable` from `source`.
///
/// # Errors
///
/// `MissingInput` when the variable does not exist.
pub fn classify_variable(
    source: &dyn DatasetSource,
    variable: &str,
    hint: Option<PlotKind>,
) -> PlotResult<Classification> {
    let descriptor = source.describe(variable)?;
    let roles = dimension_roles(source, &descriptor);
    let plot_kind = resolve_plot_kind(&roles, hint).ok();
    Ok(Classification {
        variable: descriptor.name,
        dimensions: descriptor.dimensions,
        roles,
        plot_kind,
    })
}

/// Plot types, one rendering branch each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlotKind {
    #[serde(rename = "scalar")]
    Scalar,
    #[serde(rename = "time_series", alias = "1D_time_series")]
    TimeSeries,
    #[serde(rename = "profile", alias = "1D_profile")]
    Profile,
    #[serde(rename = "1d_generic", alias = "1D_generic")]
    Generic1d,
    #[serde(rename = "time_depth_heatmap", alias = "2D_section")]
    TimeDepthHeatmap,
    #[serde(rename = "map_2d", alias = "2D_map")]
    Map2d,
    #[serde(rename = "2d_heatmap")]
    Heatmap2d,
    #[serde(rename = "2d_generic", alias = "2D_generic")]
    Generic2d,
    #[serde(rename = "3D_time_map")]
    TimeMap3d,
    #[serde(rename = "3D_depth_map")]
    DepthMap3d,
    #[serde(rename = "3D_time_section")]
    TimeSection3d,
    #[serde(rename = "3D_generic")]
    Generic3d,
}

impl PlotKind {
    pub const ALL: [PlotKind; 12] = [
        PlotKind::Scalar,
        PlotKind::TimeSeries,
        PlotKind::Profile,
        PlotKind::Generic1d,
        PlotKind::TimeDepthHeatmap,
        PlotKind::Map2d,
        PlotKind::Heatmap2d,
        PlotKind::Generic2d,
        PlotKind::TimeMap3d,
        PlotKind::DepthMap3d,
        PlotKind::TimeSection3d,
        PlotKind::Generic3d,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PlotKind::Scalar => "scalar",
            PlotKind::TimeSeries => "time_series",
            PlotKind::Profile => "profile",
            PlotKind::Generic1d => "1d_generic",
            PlotKind::TimeDepthHeatmap => "time_depth_heatmap",
            PlotKind::Map2d => "map_2d",
            PlotKind::Heatmap2d => "2d_heatmap",
            PlotKind::Generic2d => "2d_generic",
            PlotKind::TimeMap3d => "3D_time_map",
            PlotKind::DepthMap3d => "3D_depth_map",
            PlotKind::TimeSection3d => "3D_time_section",
            PlotKind::Generic3d => "3D_generic",
        }
    }

    pub fn is_animated(&self) -> bool {
        matches!(
            self,
            PlotKind::TimeMap3d | PlotKind::DepthMap3d | PlotKind::TimeSection3d | PlotKind::Generic3d
        )
    }
}

impl fmt::Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PlotKind {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim() {
            "scalar" => PlotKind::Scalar,
            "time_series" | "1D_time_series" => PlotKind::TimeSeries,
            "profile" | "1D_profile" => PlotKind::Profile,
            "1d_generic" | "1D_generic" => PlotKind::Generic1d,
            "time_depth_heatmap" | "2D_section" => PlotKind::TimeDepthHeatmap,
            "map_2d" | "2D_map" => PlotKind::Map2d,
            "2d_heatmap" => PlotKind::Heatmap2d,
            "2d_generic" | "2D_generic" => PlotKind::Generic2d,
            "3D_time_map" => PlotKind::TimeMap3d,
            "3D_depth_map" => PlotKind::DepthMap3d,
            "3D_time_section" => PlotKind::TimeSection3d,
            "3D_generic" => PlotKind::Generic3d,
            other => return Err(PlotError::UnknownPlotKind(other.to_string())),
        };
        Ok(kind)
    }
}

/// Resolves the plot kind for a variable whose dimensions have `roles`.
///
/// A `hint` overrides inference. An animated hint still needs at least three
/// dimensions.
///
/// # Errors
///
/// `InsufficientDimensions` when an animated hint is given for a variable
/// with fewer than three dimensions.
pub fn resolve_plot_kind(roles: &[AxisRole], hint: Option<PlotKind>) -> PlotResult<PlotKind> {
    if let Some(kind) = hint {
        if kind.is_animated() && roles.len() < 3 {
            return Err(PlotError::InsufficientDimensions {
                variable: String::new(),
                kind: kind.label().to_string(),
                found: roles.len(),
                needed: 3,
            });
        }
        return Ok(kind);
    }

    let has = |role: AxisRole| roles.contains(&role);
    let kind = match roles {
        [] => PlotKind::Scalar,
        [AxisRole::Time] => PlotKind::TimeSeries,
        [AxisRole::Depth] => PlotKind::Profile,
        [_] => PlotKind::Generic1d,
        [AxisRole::Time, AxisRole::Depth] | [AxisRole::Depth, AxisRole::Time] => {
            PlotKind::TimeDepthHeatmap
        }
        [a, b] if a.is_horizontal() && b.is_horizontal() => PlotKind::Map2d,
        [_, _] => PlotKind::Heatmap2d,
        _ if has(AxisRole::Time) && has(AxisRole::Latitude) && has(AxisRole::Longitude) => {
            PlotKind::TimeMap3d
        }
        _ if has(AxisRole::Time) => PlotKind::TimeSection3d,
        _ if has(AxisRole::Depth) => PlotKind::DepthMap3d,
        _ => PlotKind::Generic3d,
    };
    Ok(kind)
}

/// Index of the dimension an animated plot is sliced along. Only dimension
/// names count: `time` for time maps and sections, `depth` or `pressure` for
/// depth maps, the first dimension for `3D_generic`.
///
/// # Errors
///
/// `NoSliceDimension` when no dimension fits `kind`, or `kind` is not animated.
pub fn resolve_slice_dimension(kind: PlotKind, dimensions: &[String]) -> PlotResult<usize> {
    let by_name = |names: &[&str]| {
        dimensions
            .iter()
            .position(|d| names.contains(&d.to_lowercase().as_str()))
    };

    let found = match kind {
        PlotKind::TimeMap3d | PlotKind::TimeSection3d => by_name(&["time"]),
        PlotKind::DepthMap3d => by_name(&["depth", "pressure"]),
        PlotKind::Generic3d if !dimensions.is_empty() => Some(0),
        _ => None,
    };

    found.ok_or_else(|| PlotError::NoSliceDimension {
        variable: String::new(),
        kind: kind.label().to_string(),
    })
}
