//! # NetCDF File Information Module
//!
//! Extracts and prints the structure of a NetCDF file (dimensions, variables,
//! attributes) together with the axis role of every dimension and the plot
//! kind each variable resolves to.

use crate::classify::{dimension_roles, resolve_plot_kind, AxisRole, Classification, PlotKind};
use crate::dataset::{describe_netcdf_variable, format_attribute_value, NetCdfDataset};
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Information about a NetCDF dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetCdfDimensionInfo {
    pub name: String,
    pub length: usize,
    pub is_unlimited: bool,
    pub role: AxisRole,
}

/// Information about a NetCDF variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetCdfVariableInfo {
    pub name: String,
    pub data_type: String,
    pub dimensions: Vec<String>,
    pub shape: Vec<usize>,
    pub attributes: BTreeMap<String, String>,
    pub plot_kind: Option<PlotKind>,
}

/// Complete information about a NetCDF file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetCdfInfo {
    pub path: String,
    pub dimensions: Vec<NetCdfDimensionInfo>,
    pub variables: Vec<NetCdfVariableInfo>,
    pub global_attributes: BTreeMap<String, String>,
    pub file_size: Option<u64>,
    pub total_variables: usize,
    pub total_dimensions: usize,
}

/// Extract information from a NetCDF file, optionally restricted to one
/// variable. Global attributes are only collected when `detailed` is set.
pub fn get_netcdf_info(file_path: &str, variable: Option<&str>, detailed: bool) -> Result<NetCdfInfo> {
    let dataset = NetCdfDataset::open(file_path)
        .with_context(|| format!("Failed to open NetCDF file: {}", file_path))?;
    let file = dataset.file();

    let file_size = std::fs::metadata(file_path).ok().map(|m| m.len());

    let mut dimensions = Vec::new();
    for dim in file.dimensions() {
        let name = dim.name().to_string();
        let role = AxisRole::classify(
            file.variable(&name)
                .map(|v| describe_netcdf_variable(&v))
                .as_ref(),
        );
        dimensions.push(NetCdfDimensionInfo {
            name,
            length: dim.len(),
            is_unlimited: dim.is_unlimited(),
            role,
        });
    }

    let mut variables = Vec::new();
    for var in file.variables() {
        if let Some(var_name) = variable {
            if var.name() != var_name {
                continue;
            }
        }
        let descriptor = describe_netcdf_variable(&var);
        let roles = dimension_roles(&dataset, &descriptor);
        variables.push(NetCdfVariableInfo {
            plot_kind: resolve_plot_kind(&roles, None).ok(),
            name: descriptor.name,
            data_type: descriptor.data_type,
            dimensions: descriptor.dimensions,
            shape: descriptor.shape,
            attributes: descriptor.attributes.into_iter().collect(),
        });
    }
    if let Some(var_name) = variable {
        if variables.is_empty() {
            anyhow::bail!("Variable '{}' not found in {}", var_name, file_path);
        }
    }

    let mut global_attributes = BTreeMap::new();
    if detailed {
        for attr in file.attributes() {
            if let Ok(value) = attr.value() {
                global_attributes.insert(attr.name().to_string(), format_attribute_value(&value));
            }
        }
    }

    debug!(
        "Collected {} dimension(s) and {} variable(s) from {}",
        dimensions.len(),
        variables.len(),
        file_path
    );
    dataset.close().context("Failed to close NetCDF file")?;

    Ok(NetCdfInfo {
        path: file_path.to_string(),
        total_dimensions: dimensions.len(),
        total_variables: variables.len(),
        dimensions,
        variables,
        global_attributes,
        file_size,
    })
}

fn kind_label(kind: Option<PlotKind>) -> &'static str {
    kind.map_or("-", |k| k.label())
}

/// Print NetCDF info in human-readable format
pub fn print_file_info_human(info: &NetCdfInfo) {
    println!("NetCDF File Information:");
    println!("  Path: {}", info.path);
    if let Some(size) = info.file_size {
        println!("  File Size: {:.2} MB", size as f64 / 1_048_576.0);
    }
    println!("  Dimensions: {} total", info.total_dimensions);
    for dim in &info.dimensions {
        println!(
            "    {} ({}{}) -> {}",
            dim.name,
            dim.length,
            if dim.is_unlimited { ", unlimited" } else { "" },
            dim.role
        );
    }
    println!("  Variables: {} total", info.total_variables);
    for var in &info.variables {
        println!(
            "    {} ({}) - dimensions: [{}] - plot: {}",
            var.name,
            var.data_type,
            var.dimensions.join(", "),
            kind_label(var.plot_kind)
        );
        for (name, value) in &var.attributes {
            println!("      @{}: {}", name, value);
        }
    }
    if !info.global_attributes.is_empty() {
        println!("  Global Attributes:");
        for (name, value) in &info.global_attributes {
            println!("    @{}: {}", name, value);
        }
    }
}

/// Print NetCDF info in JSON format
pub fn print_file_info_json(info: &NetCdfInfo) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(info)?);
    Ok(())
}

/// Print NetCDF info in YAML format
pub fn print_file_info_yaml(info: &NetCdfInfo) -> Result<()> {
    let yaml = serde_yaml::to_string(info).context("Failed to serialize NetCDF info to YAML")?;
    println!("{}", yaml);
    Ok(())
}

/// Print NetCDF info in CSV format (variables only)
pub fn print_file_info_csv(info: &NetCdfInfo) -> Result<()> {
    println!("{}", variables_csv(info));
    Ok(())
}

fn variables_csv(info: &NetCdfInfo) -> String {
    let mut lines = vec!["variable_name,data_type,dimensions,shape,plot_kind,attributes_count".to_string()];
    for var in &info.variables {
        let shape: Vec<String> = var.shape.iter().map(|s| s.to_string()).collect();
        lines.push(format!(
            "{},{},\"{}\",\"{}\",{},{}",
            var.name,
            var.data_type,
            var.dimensions.join(";"),
            shape.join(";"),
            kind_label(var.plot_kind),
            var.attributes.len()
        ));
    }
    lines.join("\n")
}

/// Print classifications as an aligned table
pub fn print_classifications_human(classifications: &[Classification]) {
    let width = classifications
        .iter()
        .map(|c| c.variable.len())
        .max()
        .unwrap_or(8)
        .max(8);
    println!("{:<width$}  {:<18}  roles", "variable", "plot kind", width = width);
    for c in classifications {
        let roles: Vec<String> = c
            .dimensions
            .iter()
            .zip(&c.roles)
            .map(|(d, r)| format!("{}={}", d, r))
            .collect();
        println!(
            "{:<width$}  {:<18}  {}",
            c.variable,
            kind_label(c.plot_kind),
            roles.join(", "),
            width = width
        );
    }
}

pub fn print_classifications_json(classifications: &[Classification]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(classifications)?);
    Ok(())
}

pub fn print_classifications_csv(classifications: &[Classification]) {
    println!("variable,dimensions,roles,plot_kind");
    for c in classifications {
        let roles: Vec<&str> = c.roles.iter().map(|r| r.as_str()).collect();
        println!(
            "{},\"{}\",\"{}\",{}",
            c.variable,
            c.dimensions.join(";"),
            roles.join(";"),
            kind_label(c.plot_kind)
        );
    }
}

pub fn print_classifications_yaml(classifications: &[Classification]) -> Result<()> {
    let yaml = serde_yaml::to_string(classifications)
        .context("Failed to serialize classifications to YAML")?;
    println!("{}", yaml);
    Ok(())
}
