//! # Dataset Access
//!
//! This module is the only place that touches NetCDF files. It turns a file
//! path and a variable name into two things the rest of the crate works with:
//!
//! - [`VariableDescriptor`]: name, dimensions, shape, type tag and attributes
//! - [`DataArray`]: the decoded values plus one coordinate per dimension
//!
//! Sources implement [`DatasetSource`]. [`NetCdfDataset`] reads real files
//! through the `netcdf` crate, [`MemoryDataset`] holds variables in memory.
//!
//! Values are decoded the way CF readers do on load: `_FillValue` and
//! `missing_value` become NaN, then `scale_factor` and `add_offset` apply.

use crate::error::{PlotError, PlotResult};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata of a single NetCDF variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDescriptor {
    pub name: String,
    pub dimensions: Vec<String>,
    pub shape: Vec<usize>,
    pub data_type: String,
    pub attributes: HashMap<String, String>,
}

impl VariableDescriptor {
    /// Creates a descriptor without attributes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ncplot::dataset::VariableDescriptor;
    ///
    /// let sst = VariableDescriptor::new("sst", &["lat", "lon"], &[180, 360])
    ///     .with_attribute("units", "degC");
    /// assert_eq!(sst.ndim(), 2);
    /// assert_eq!(sst.attribute("units"), Some("degC"));
    /// ```
    pub fn new(name: &str, dimensions: &[&str], shape: &[usize]) -> Self {
        VariableDescriptor {
            name: name.to_string(),
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            shape: shape.to_vec(),
            data_type: "Double".to_string(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|s| s.as_str())
    }

    fn numeric_attribute(&self, key: &str) -> Option<f64> {
        self.attribute(key).and_then(|v| v.trim().parse::<f64>().ok())
    }

    pub fn ndim(&self) -> usize {
        self.dimensions.len()
    }

    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn units(&self) -> Option<&str> {
        self.attribute("units")
    }

    /// Human label: `long_name` (or the variable name) followed by the units.
    pub fn label(&self) -> String {
        let mut label = self
            .attribute("long_name")
            .unwrap_or(self.name.as_str())
            .to_string();
        if let Some(units) = self.units() {
            label.push_str(&format!(" ({})", units));
        }
        label
    }

    /// Names listed in the CF `coordinates` attribute.
    pub fn auxiliary_coordinate_names(&self) -> Vec<String> {
        self.attribute("coordinates")
            .map(|c| c.split_whitespace().map(|s| s.to_string()).collect())
            .unwrap_or_default()
    }
}

/// A coordinate variable together with its decoded values.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinate {
    pub descriptor: VariableDescriptor,
    pub values: Vec<f64>,
}

impl Coordinate {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

/// A loaded variable: decoded values in row-major order plus coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    pub descriptor: VariableDescriptor,
    pub values: Vec<f64>,
    /// One entry per dimension; `None` when the dimension has no coordinate variable.
    pub coordinates: Vec<Option<Coordinate>>,
    /// Variables named by the `coordinates` attribute.
    pub auxiliary: Vec<Coordinate>,
}

impl DataArray {
    pub fn new(descriptor: VariableDescriptor, values: Vec<f64>) -> PlotResult<Self> {
        if values.len() != descriptor.len() {
            return Err(PlotError::Dataset(format!(
                "Variable '{}' has shape {:?} but {} values were supplied",
                descriptor.name,
                descriptor.shape,
                values.len()
            )));
        }
        let coordinates = vec![None; descriptor.ndim()];
        Ok(DataArray {
            descriptor,
            values,
            coordinates,
            auxiliary: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn dimensions(&self) -> &[String] {
        &self.descriptor.dimensions
    }

    pub fn shape(&self) -> &[usize] {
        &self.descriptor.shape
    }

    pub fn ndim(&self) -> usize {
        self.descriptor.ndim()
    }

    pub fn coordinate(&self, axis: usize) -> Option<&Coordinate> {
        self.coordinates.get(axis).and_then(|c| c.as_ref())
    }

    pub fn axis_of(&self, dimension: &str) -> Option<usize> {
        self.descriptor.dimensions.iter().position(|d| d == dimension)
    }

    /// Coordinate values along `axis`, or `0..len` when there is no coordinate.
    pub fn axis_values(&self, axis: usize) -> Vec<f64> {
        match self.coordinate(axis) {
            Some(coord) => coord.values.clone(),
            None => (0..self.shape()[axis]).map(|i| i as f64).collect(),
        }
    }

    /// Axis title for `axis`: the coordinate label, or the bare dimension name.
    pub fn axis_label(&self, axis: usize) -> String {
        match self.coordinate(axis) {
            Some(coord) => coord.descriptor.label(),
            None => self.descriptor.dimensions[axis].clone(),
        }
    }

    /// Drops `axis` by selecting `index` along it.
    pub fn select(&self, axis: usize, index: usize) -> PlotResult<DataArray> {
        let shape = self.shape();
        if axis >= shape.len() || index >= shape[axis] {
            return Err(PlotError::Dataset(format!(
                "Index {} out of range for axis {} of '{}' (shape {:?})",
                index,
                axis,
                self.name(),
                shape
            )));
        }

        let outer: usize = shape[..axis].iter().product();
        let inner: usize = shape[axis + 1..].iter().product();
        let len = shape[axis];

        let mut values = Vec::with_capacity(outer * inner);
        for o in 0..outer {
            let start = (o * len + index) * inner;
            values.extend_from_slice(&self.values[start..start + inner]);
        }

        let mut descriptor = self.descriptor.clone();
        descriptor.dimensions.remove(axis);
        descriptor.shape.remove(axis);

        let mut coordinates = self.coordinates.clone();
        coordinates.remove(axis);

        Ok(DataArray {
            descriptor,
            values,
            coordinates,
            auxiliary: self.auxiliary.clone(),
        })
    }

    /// Rows of a 2-D array, `rows[i][j] = value[i, j]`.
    pub fn rows(&self) -> PlotResult<Vec<Vec<f64>>> {
        self.require_2d()?;
        let cols = self.shape()[1];
        Ok(self.values.chunks(cols.max(1)).map(|c| c.to_vec()).collect())
    }

    /// Rows of the transposed 2-D array, `rows[j][i] = value[i, j]`.
    pub fn transposed_rows(&self) -> PlotResult<Vec<Vec<f64>>> {
        self.require_2d()?;
        let (n0, n1) = (self.shape()[0], self.shape()[1]);
        Ok((0..n1)
            .map(|j| (0..n0).map(|i| self.values[i * n1 + j]).collect())
            .collect())
    }

    fn require_2d(&self) -> PlotResult<()> {
        if self.ndim() != 2 {
            return Err(PlotError::UnsupportedDimensions {
                variable: self.name().to_string(),
                dimensions: self.dimensions().to_vec(),
            });
        }
        Ok(())
    }

    /// Finite minimum and maximum, ignoring NaN.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        finite_range(&self.values)
    }
}

pub(crate) fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Applies CF packing and missing-value conventions in place.
pub fn decode_values(descriptor: &VariableDescriptor, values: &mut [f64]) {
    let fill_values: Vec<f64> = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|key| descriptor.numeric_attribute(key))
        .collect();
    let scale = descriptor.numeric_attribute("scale_factor").unwrap_or(1.0);
    let offset = descriptor.numeric_attribute("add_offset").unwrap_or(0.0);

    for v in values.iter_mut() {
        if fill_values.iter().any(|f| *f == *v) {
            *v = f64::NAN;
        } else {
            *v = *v * scale + offset;
        }
    }
}

/// A provider of variable metadata and values.
///
/// Implementors only supply raw access; [`DatasetSource::load`] assembles a
/// decoded [`DataArray`] with coordinates on top of it.
pub trait DatasetSource {
    /// Identifier of the underlying dataset (usually a file path).
    fn path(&self) -> &str;

    /// Names of all variables, in file order.
    fn variable_names(&self) -> Vec<String>;

    /// Descriptor for `variable`; `MissingInput` when it does not exist.
    fn describe(&self, variable: &str) -> PlotResult<VariableDescriptor>;

    /// Raw (undecoded) values of `variable` in row-major order.
    fn read_raw(&self, variable: &str) -> PlotResult<Vec<f64>>;

    /// Descriptor of the coordinate variable named after `dimension`, if any.
    fn describe_dimension(&self, dimension: &str) -> Option<VariableDescriptor> {
        self.describe(dimension)
            .ok()
            .filter(|d| d.dimensions.len() == 1 && d.dimensions[0] == dimension)
    }

    /// Loads `variable` with decoded values, dimension coordinates and
    /// auxiliary coordinates.
    fn load(&self, variable: &str) -> PlotResult<DataArray> {
        let descriptor = self.describe(variable)?;
        let mut values = self.read_raw(variable)?;
        decode_values(&descriptor, &mut values);
        let mut array = DataArray::new(descriptor, values)?;

        for (axis, dim) in array.descriptor.dimensions.clone().iter().enumerate() {
            if dim == variable {
                continue;
            }
            if let Some(coord_desc) = self.describe_dimension(dim) {
                match self.read_decoded(&coord_desc) {
                    Ok(values) if values.len() == array.shape()[axis] => {
                        array.coordinates[axis] = Some(Coordinate {
                            descriptor: coord_desc,
                            values,
                        });
                    }
                    Ok(_) => debug!("Coordinate '{}' length does not match its dimension", dim),
                    Err(e) => debug!("Skipping coordinate '{}': {}", dim, e),
                }
            }
        }
        if array.descriptor.dimensions.len() == 1 && array.descriptor.dimensions[0] == variable {
            // A coordinate variable is its own coordinate.
            array.coordinates[0] = Some(Coordinate {
                descriptor: array.descriptor.clone(),
                values: array.values.clone(),
            });
        }

        for name in array.descriptor.auxiliary_coordinate_names() {
            let Ok(aux_desc) = self.describe(&name) else {
                debug!("Auxiliary coordinate '{}' not found", name);
                continue;
            };
            match self.read_decoded(&aux_desc) {
                Ok(values) => array.auxiliary.push(Coordinate {
                    descriptor: aux_desc,
                    values,
                }),
                Err(e) => debug!("Skipping auxiliary coordinate '{}': {}", name, e),
            }
        }

        debug!(
            "Loaded '{}' with shape {:?} from {}",
            variable,
            array.shape(),
            self.path()
        );
        Ok(array)
    }

    #[doc(hidden)]
    fn read_decoded(&self, descriptor: &VariableDescriptor) -> PlotResult<Vec<f64>> {
        let mut values = self.read_raw(&descriptor.name)?;
        decode_values(descriptor, &mut values);
        Ok(values)
    }
}

/// A NetCDF file opened for reading. The handle is released on drop or
/// through [`NetCdfDataset::close`].
pub struct NetCdfDataset {
    path: String,
    file: netcdf::File,
}

impl NetCdfDataset {
    /// Opens a NetCDF file.
    ///
    /// # Errors
    ///
    /// `MissingInput` for an empty path, `NetCdf` when the file cannot be opened.
    pub fn open(path: &str) -> PlotResult<Self> {
        if path.trim().is_empty() {
            return Err(PlotError::MissingInput("no file selected".to_string()));
        }
        debug!("Opening NetCDF file: {}", path);
        let file = netcdf::open(path)?;
        Ok(NetCdfDataset {
            path: path.to_string(),
            file,
        })
    }

    pub fn close(self) -> PlotResult<()> {
        debug!("Closing NetCDF file: {}", self.path);
        self.file.close()?;
        Ok(())
    }

    pub fn file(&self) -> &netcdf::File {
        &self.file
    }
}

/// Descriptor of an open NetCDF variable.
pub fn describe_netcdf_variable(var: &netcdf::Variable) -> VariableDescriptor {
    let mut attributes = HashMap::new();
    for attr in var.attributes() {
        if let Ok(value) = attr.value() {
            attributes.insert(attr.name().to_string(), format_attribute_value(&value));
        }
    }

    VariableDescriptor {
        name: var.name().to_string(),
        dimensions: var
            .dimensions()
            .iter()
            .map(|d| d.name().to_string())
            .collect(),
        shape: var.dimensions().iter().map(|d| d.len()).collect(),
        data_type: format!("{:?}", var.vartype()),
        attributes,
    }
}

/// Text form of an attribute value.
///
/// Floats are widened to `f64` before formatting so a fill value compares
/// equal to data read as `f64`.
pub fn format_attribute_value(value: &netcdf::AttributeValue) -> String {
    match value {
        netcdf::AttributeValue::Str(s) => s.clone(),
        netcdf::AttributeValue::Strs(v) => v.join(" "),
        netcdf::AttributeValue::Double(d) => d.to_string(),
        netcdf::AttributeValue::Float(f) => (*f as f64).to_string(),
        netcdf::AttributeValue::Int(i) => i.to_string(),
        netcdf::AttributeValue::Short(s) => s.to_string(),
        other => format!("{:?}", other),
    }
}

impl DatasetSource for NetCdfDataset {
    fn path(&self) -> &str {
        &self.path
    }

    fn variable_names(&self) -> Vec<String> {
        self.file.variables().map(|v| v.name().to_string()).collect()
    }

    fn describe(&self, variable: &str) -> PlotResult<VariableDescriptor> {
        let var = self.file.variable(variable).ok_or_else(|| {
            PlotError::MissingInput(format!(
                "Variable '{}' not found in {}",
                variable, self.path
            ))
        })?;
        Ok(describe_netcdf_variable(&var))
    }

    fn read_raw(&self, variable: &str) -> PlotResult<Vec<f64>> {
        let var = self.file.variable(variable).ok_or_else(|| {
            PlotError::MissingInput(format!(
                "Variable '{}' not found in {}",
                variable, self.path
            ))
        })?;
        let values = var
            .get::<f64, _>(..)
            .map_err(|e| PlotError::Dataset(format!("Failed to read '{}': {}", variable, e)))?;
        Ok(values.iter().copied().collect())
    }
}

/// Variables held in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    path: String,
    variables: Vec<(VariableDescriptor, Vec<f64>)>,
}

impl MemoryDataset {
    pub fn new(path: &str) -> Self {
        MemoryDataset {
            path: path.to_string(),
            variables: Vec::new(),
        }
    }

    /// Adds (or replaces) a variable. The value count must match the shape.
    pub fn add_variable(
        &mut self,
        descriptor: VariableDescriptor,
        values: Vec<f64>,
    ) -> PlotResult<()> {
        if values.len() != descriptor.len() {
            return Err(PlotError::Dataset(format!(
                "Variable '{}' has shape {:?} but {} values were supplied",
                descriptor.name,
                descriptor.shape,
                values.len()
            )));
        }
        self.variables.retain(|(d, _)| d.name != descriptor.name);
        self.variables.push((descriptor, values));
        Ok(())
    }

    pub fn with_variable(mut self, descriptor: VariableDescriptor, values: Vec<f64>) -> Self {
        if let Err(e) = self.add_variable(descriptor, values) {
            debug!("Ignoring variable: {}", e);
        }
        self
    }

    fn find(&self, variable: &str) -> PlotResult<&(VariableDescriptor, Vec<f64>)> {
        self.variables
            .iter()
            .find(|(d, _)| d.name == variable)
            .ok_or_else(|| {
                PlotError::MissingInput(format!(
                    "Variable '{}' not found in {}",
                    variable, self.path
                ))
            })
    }
}

impl DatasetSource for MemoryDataset {
    fn path(&self) -> &str {
        &self.path
    }

    fn variable_names(&self) -> Vec<String> {
        self.variables.iter().map(|(d, _)| d.name.clone()).collect()
    }

    fn describe(&self, variable: &str) -> PlotResult<VariableDescriptor> {
        self.find(variable).map(|(d, _)| d.clone())
    }

    fn read_raw(&self, variable: &str) -> PlotResult<Vec<f64>> {
        self.find(variable).map(|(_, v)| v.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube() -> DataArray {
        // shape (2, 3, 4), value = 100*i + 10*j + k
        let desc = VariableDescriptor::new("temp", &["time", "lat", "lon"], &[2, 3, 4]);
        let mut values = Vec::new();
        for i in 0..2 {
            for j in 0..3 {
                for k in 0..4 {
                    values.push((100 * i + 10 * j + k) as f64);
                }
            }
        }
        DataArray::new(desc, values).unwrap()
    }

    #[test]
    fn test_select_first_axis() {
        let slice = cube().select(0, 1).unwrap();
        assert_eq!(slice.shape(), &[3, 4]);
        assert_eq!(slice.dimensions(), &["lat".to_string(), "lon".to_string()]);
        assert_eq!(slice.values[0], 100.0);
        assert_eq!(slice.values[11], 123.0);
    }

    #[test]
    fn test_select_middle_axis() {
        let slice = cube().select(1, 2).unwrap();
        assert_eq!(slice.shape(), &[2, 4]);
        assert_eq!(slice.values, vec![20.0, 21.0, 22.0, 23.0, 120.0, 121.0, 122.0, 123.0]);
    }

    #[test]
    fn test_select_out_of_range() {
        assert!(cube().select(0, 2).is_err());
        assert!(cube().select(3, 0).is_err());
    }

    #[test]
    fn test_rows_and_transpose() {
        let desc = VariableDescriptor::new("z", &["y", "x"], &[2, 3]);
        let array = DataArray::new(desc, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(array.rows().unwrap(), vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert_eq!(
            array.transposed_rows().unwrap(),
            vec![vec![1.0, 4.0], vec![2.0, 5.0], vec![3.0, 6.0]]
        );
        assert!(cube().rows().is_err());
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let desc = VariableDescriptor::new("z", &["x"], &[3]);
        assert!(DataArray::new(desc.clone(), vec![1.0]).is_err());
        assert!(MemoryDataset::new("mem").add_variable(desc, vec![1.0]).is_err());
    }

    #[test]
    fn test_decode_fill_and_packing() {
        let desc = VariableDescriptor::new("sst", &["x"], &[3])
            .with_attribute("_FillValue", "-999")
            .with_attribute("scale_factor", "0.5")
            .with_attribute("add_offset", "10");
        let mut values = vec![2.0, -999.0, 4.0];
        decode_values(&desc, &mut values);
        assert_eq!(values[0], 11.0);
        assert!(values[1].is_nan());
        assert_eq!(values[2], 12.0);
    }

    #[test]
    fn test_memory_dataset_load_attaches_coordinates() {
        let source = MemoryDataset::new("mem.nc")
            .with_variable(
                VariableDescriptor::new("depth", &["depth"], &[3]).with_attribute("units", "m"),
                vec![0.0, 10.0, 20.0],
            )
            .with_variable(
                VariableDescriptor::new("temp", &["depth"], &[3]),
                vec![20.0, 15.0, 10.0],
            );

        let array = source.load("temp").unwrap();
        let coord = array.coordinate(0).unwrap();
        assert_eq!(coord.name(), "depth");
        assert_eq!(coord.values, vec![0.0, 10.0, 20.0]);
        assert_eq!(array.axis_label(0), "depth (m)");

        let missing = source.load("salinity");
        assert!(matches!(missing, Err(PlotError::MissingInput(_))));
    }

    #[test]
    fn test_axis_values_fall_back_to_index() {
        let array = cube();
        assert_eq!(array.axis_values(2), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(array.axis_label(1), "lat");
    }

    #[test]
    fn test_auxiliary_coordinates_loaded() {
        let source = MemoryDataset::new("stations.nc")
            .with_variable(
                VariableDescriptor::new("lat", &["station"], &[2])
                    .with_attribute("units", "degrees_north"),
                vec![10.0, 20.0],
            )
            .with_variable(
                VariableDescriptor::new("lon", &["station"], &[2])
                    .with_attribute("units", "degrees_east"),
                vec![100.0, 110.0],
            )
            .with_variable(
                VariableDescriptor::new("sst", &["station"], &[2])
                    .with_attribute("coordinates", "lat lon"),
                vec![25.0, 26.0],
            );

        let array = source.load("sst").unwrap();
        assert_eq!(array.auxiliary.len(), 2);
        assert!(array.coordinate(0).is_none());
    }

    #[test]
    fn test_value_range_skips_nan() {
        assert_eq!(finite_range(&[f64::NAN, 2.0, -1.0]), Some((-1.0, 2.0)));
        assert_eq!(finite_range(&[f64::NAN]), None);
    }
}
