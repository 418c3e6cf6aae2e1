use crate::classify::*;
use crate::dataset::*;
use crate::error::PlotError;
use crate::input::*;
use crate::settings::Settings;
use crate::{default_output, prepare_plot, run_plot_job};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn coordinate_variable(name: &str, units: &str, values: &[f64]) -> (VariableDescriptor, Vec<f64>) {
    (
        VariableDescriptor::new(name, &[name], &[values.len()]).with_attribute("units", units),
        values.to_vec(),
    )
}

fn job(variable: &str, plot_type: Option<PlotKind>) -> PlotJob {
    PlotJob {
        input: "memory.nc".to_string(),
        variable: variable.to_string(),
        plot_type,
        options: Default::default(),
        outputs: Vec::new(),
    }
}

/// sst(lat, lon) with CF coordinates.
fn ocean_surface() -> MemoryDataset {
    let (lat, lat_values) = coordinate_variable("lat", "degrees_north", &[-10.0, 0.0, 10.0]);
    let (lon, lon_values) = coordinate_variable("lon", "degrees_east", &[100.0, 110.0]);
    let sst = VariableDescriptor::new("sst", &["lat", "lon"], &[3, 2])
        .with_attribute("long_name", "Sea surface temperature")
        .with_attribute("units", "degC");
    MemoryDataset::new("memory.nc")
        .with_variable(lat, lat_values)
        .with_variable(lon, lon_values)
        .with_variable(sst, vec![26.0, 27.0, 28.0, 29.0, 27.5, 28.5])
}

/// Writes a small time/lat/lon file with CF attributes.
fn create_test_netcdf(path: &Path) -> Result<(), netcdf::Error> {
    let mut file = netcdf::create(path)?;
    file.add_dimension("time", 3)?;
    file.add_dimension("lat", 2)?;
    file.add_dimension("lon", 3)?;

    {
        let mut var = file.add_variable::<f64>("time", &["time"])?;
        var.put_attribute("units", "days since 2000-01-01")?;
        var.put_attribute("standard_name", "time")?;
        var.put_values(&[0.0, 1.0, 2.0], ..)?;
    }
    {
        let mut var = file.add_variable::<f64>("lat", &["lat"])?;
        var.put_attribute("units", "degrees_north")?;
        var.put_values(&[-5.0, 5.0], ..)?;
    }
    {
        let mut var = file.add_variable::<f64>("lon", &["lon"])?;
        var.put_attribute("units", "degrees_east")?;
        var.put_values(&[10.0, 20.0, 30.0], ..)?;
    }
    {
        let mut var = file.add_variable::<f64>("temp", &["time", "lat", "lon"])?;
        var.put_attribute("_FillValue", -999.0_f64)?;
        var.put_attribute("scale_factor", 0.5_f64)?;
        var.put_attribute("long_name", "Temperature")?;
        var.put_attribute("units", "degC")?;
        let values: Vec<f64> = (0..18).map(|i| if i == 4 { -999.0 } else { i as f64 }).collect();
        var.put_values(&values, ..)?;
    }
    Ok(())
}

fn test_netcdf_path(dir: &Path) -> PathBuf {
    let path = dir.join("ocean.nc");
    create_test_netcdf(&path).unwrap();
    path
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;
    use crate::figure::{axis_is_reversed, numbers, title_text, traces_of};

    #[test]
    fn test_sst_resolves_to_map_with_reversed_y() {
        let source = ocean_surface();
        let plot = prepare_plot(&source, &job("sst", None), &Settings::default()).unwrap();
        assert_eq!(plot.kind, PlotKind::Map2d);

        let json = plot.figure.to_value().unwrap();
        let heatmaps: Vec<_> = traces_of(&json["data"], "heatmap").collect();
        assert_eq!(heatmaps.len(), 1);
        assert_eq!(numbers(&heatmaps[0]["x"]), vec![100.0, 110.0]);
        assert_eq!(numbers(&heatmaps[0]["y"]), vec![-10.0, 0.0, 10.0]);
        assert!(axis_is_reversed(&json["layout"]["yaxis"]));
    }

    #[test]
    fn test_depth_named_dimension_gives_profile() {
        let (depth, depth_values) = coordinate_variable("depth_m", "m", &[0.0, 10.0, 50.0]);
        let temp = VariableDescriptor::new("temp", &["depth_m"], &[3]);
        let source = MemoryDataset::new("cast.nc")
            .with_variable(depth, depth_values)
            .with_variable(temp, vec![20.0, 15.0, 8.0]);

        let plot = prepare_plot(&source, &job("temp", None), &Settings::default()).unwrap();
        assert_eq!(plot.kind, PlotKind::Profile);
        let json = plot.figure.to_value().unwrap();
        let trace = traces_of(&json["data"], "scatter").next().unwrap();
        assert_eq!(numbers(&trace["x"]), vec![20.0, 15.0, 8.0]);
        assert_eq!(numbers(&trace["y"]), vec![0.0, 10.0, 50.0]);
        assert!(axis_is_reversed(&json["layout"]["yaxis"]));
    }

    #[test]
    fn test_time_map_without_time_dimension() {
        let cube = VariableDescriptor::new("field", &["x", "y", "z"], &[2, 2, 2]);
        let source = MemoryDataset::new("grid.nc").with_variable(cube, vec![0.0; 8]);

        let err = prepare_plot(&source, &job("field", Some(PlotKind::TimeMap3d)), &Settings::default());
        match err {
            Err(PlotError::NoSliceDimension { variable, kind }) => {
                assert_eq!(variable, "field");
                assert_eq!(kind, "3D_time_map");
            }
            other => panic!("expected NoSliceDimension, got {:?}", other.map(|p| p.kind)),
        }
    }

    #[test]
    fn test_animated_hint_on_2d_variable_names_the_variable() {
        let err = prepare_plot(
            &ocean_surface(),
            &job("sst", Some(PlotKind::TimeMap3d)),
            &Settings::default(),
        );
        match err {
            Err(PlotError::InsufficientDimensions {
                variable,
                found,
                needed,
                ..
            }) => {
                assert_eq!(variable, "sst");
                assert_eq!(found, 2);
                assert_eq!(needed, 3);
            }
            other => panic!("expected InsufficientDimensions, got {:?}", other.map(|p| p.kind)),
        }
    }

    #[test]
    fn test_missing_variable() {
        let err = prepare_plot(&ocean_surface(), &job("salt", None), &Settings::default());
        assert!(matches!(err, Err(PlotError::MissingInput(_))));
    }

    #[test]
    fn test_scalar_cannot_render() {
        let scalar = VariableDescriptor::new("crs", &[], &[]);
        let source = MemoryDataset::new("grid.nc").with_variable(scalar, vec![0.0]);
        let err = prepare_plot(&source, &job("crs", None), &Settings::default());
        assert!(matches!(err, Err(PlotError::CannotRender { .. })));
    }

    #[test]
    fn test_settings_defaults_reach_the_figure() {
        let mut settings = Settings::default();
        settings.plot_defaults.title = Some("From settings".to_string());
        settings.plot_defaults.vmin = Some(0.0);

        let mut request = job("sst", None);
        request.options.title = Some("From job".to_string());

        let plot = prepare_plot(&ocean_surface(), &request, &settings).unwrap();
        let json = plot.figure.to_value().unwrap();
        assert_eq!(title_text(&json["layout"]), Some("From job"));
        let heatmap = traces_of(&json["data"], "heatmap").next().unwrap();
        assert_eq!(heatmap["zmin"].as_f64(), Some(0.0));
    }
}

#[cfg(test)]
mod classification_tests {
    use super::*;

    #[test]
    fn test_classify_every_variable() {
        let source = ocean_surface();
        let results: Vec<Classification> = source
            .variable_names()
            .iter()
            .map(|name| classify_variable(&source, name, None).unwrap())
            .collect();

        assert_eq!(results.len(), 3);
        let sst = results.iter().find(|c| c.variable == "sst").unwrap();
        assert_eq!(sst.roles, vec![AxisRole::Latitude, AxisRole::Longitude]);
        assert_eq!(sst.plot_kind, Some(PlotKind::Map2d));

        let lat = results.iter().find(|c| c.variable == "lat").unwrap();
        assert_eq!(lat.plot_kind, Some(PlotKind::Generic1d));
    }

    #[test]
    fn test_incompatible_hint_leaves_kind_empty() {
        let result = classify_variable(&ocean_surface(), "sst", Some(PlotKind::DepthMap3d)).unwrap();
        assert_eq!(result.plot_kind, None);
    }

    #[test]
    fn test_dimension_without_coordinate_variable() {
        let desc = VariableDescriptor::new("ssh", &["time", "station"], &[2, 2]);
        let source = MemoryDataset::new("tide.nc").with_variable(desc.clone(), vec![0.0; 4]);
        assert_eq!(
            dimension_roles(&source, &desc),
            vec![AxisRole::Time, AxisRole::Unknown]
        );
    }
}

#[cfg(test)]
mod csv_tests {
    use super::*;
    use crate::export::write_csv;

    #[test]
    fn test_csv_reproduces_values() {
        let data = ocean_surface().load("sst").unwrap();
        let mut buffer = Vec::new();
        write_csv(&data, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("lat,lon,sst"));
        let rows: Vec<Vec<f64>> = lines
            .map(|l| l.split(',').map(|v| v.parse::<f64>().unwrap()).collect())
            .collect();
        assert_eq!(rows.len(), 6);
        let values: Vec<f64> = rows.iter().map(|r| r[2]).collect();
        assert_eq!(values, data.values);
        assert_eq!(rows[1][..2], [-10.0, 110.0]);
        assert_eq!(rows[5][..2], [10.0, 110.0]);
    }
}

#[cfg(test)]
mod netcdf_tests {
    use super::*;

    #[test]
    fn test_load_decodes_and_attaches_coordinates() {
        let dir = tempdir().unwrap();
        let path = test_netcdf_path(dir.path());
        let dataset = NetCdfDataset::open(path.to_str().unwrap()).unwrap();

        let desc = dataset.describe("temp").unwrap();
        assert_eq!(desc.dimensions, vec!["time", "lat", "lon"]);
        assert_eq!(desc.shape, vec![3, 2, 3]);
        assert_eq!(desc.attribute("long_name"), Some("Temperature"));

        let data = dataset.load("temp").unwrap();
        assert_eq!(data.values[1], 0.5);
        assert!(data.values[4].is_nan());
        assert_eq!(data.coordinate(2).unwrap().values, vec![10.0, 20.0, 30.0]);

        assert_eq!(
            dimension_roles(&dataset, &desc),
            vec![AxisRole::Time, AxisRole::Latitude, AxisRole::Longitude]
        );
        dataset.close().unwrap();
    }

    #[test]
    fn test_open_missing_file() {
        assert!(NetCdfDataset::open("/nonexistent/ocean.nc").is_err());
        assert!(matches!(NetCdfDataset::open(""), Err(PlotError::MissingInput(_))));
    }

    #[test]
    fn test_info_reports_roles_and_kinds() {
        let dir = tempdir().unwrap();
        let path = test_netcdf_path(dir.path());
        let info = crate::info::get_netcdf_info(path.to_str().unwrap(), None, true).unwrap();

        assert_eq!(info.total_dimensions, 3);
        assert_eq!(info.total_variables, 4);
        let roles: Vec<AxisRole> = info.dimensions.iter().map(|d| d.role).collect();
        assert_eq!(roles, vec![AxisRole::Time, AxisRole::Latitude, AxisRole::Longitude]);

        let temp = info.variables.iter().find(|v| v.name == "temp").unwrap();
        assert_eq!(temp.plot_kind, Some(PlotKind::TimeMap3d));
        let time = info.variables.iter().find(|v| v.name == "time").unwrap();
        assert_eq!(time.plot_kind, Some(PlotKind::TimeSeries));

        let only = crate::info::get_netcdf_info(path.to_str().unwrap(), Some("lat"), false).unwrap();
        assert_eq!(only.variables.len(), 1);
        assert!(crate::info::get_netcdf_info(path.to_str().unwrap(), Some("salt"), false).is_err());
    }
}

#[cfg(test)]
mod workflow_tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_run_plot_job_writes_every_output() {
        let dir = tempdir().unwrap();
        let path = test_netcdf_path(dir.path());
        let html = dir.path().join("temp.html");
        let json = dir.path().join("temp.json");
        let csv = dir.path().join("temp.csv");

        let yaml = format!(
            "input: {}\nvariable: temp\noptions:\n  cmap: jet\noutputs:\n  - {}\n  - {}\n  - {}\n",
            path.display(),
            html.display(),
            json.display(),
            csv.display()
        );
        let job = PlotJob::from_yaml(&yaml).unwrap();
        let written = run_plot_job(&job, &Settings::default()).unwrap();
        assert_eq!(written.len(), 3);

        let page = std::fs::read_to_string(&html).unwrap();
        assert!(page.contains("Plotly.newPlot"));

        let figure: Value = serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        let frames = figure["frames"].as_array().unwrap();
        assert_eq!(frames.len(), 3);
        assert!(frames[0]["name"].as_str().unwrap().starts_with("time=2000-01-01"));
        assert_eq!(figure["layout"]["sliders"][0]["steps"].as_array().unwrap().len(), 3);

        let text = std::fs::read_to_string(&csv).unwrap();
        assert_eq!(text.lines().count(), 19);
        assert!(text.lines().nth(1).unwrap().starts_with("2000-01-01 00:00:00,"));
    }

    #[test]
    fn test_run_plot_job_reports_construction_failures() {
        let dir = tempdir().unwrap();
        let path = test_netcdf_path(dir.path());
        let job = PlotJob {
            input: path.display().to_string(),
            variable: "lat".to_string(),
            plot_type: Some(PlotKind::DepthMap3d),
            options: Default::default(),
            outputs: vec![dir.path().join("lat.html").display().to_string()],
        };
        let err = run_plot_job(&job, &Settings::default()).unwrap_err();
        assert!(err.is_construction_failure());
        assert!(!dir.path().join("lat.html").exists());
    }

    #[test]
    fn test_default_output() {
        assert_eq!(default_output(&job("sst", None)), "sst.html");
    }
}
