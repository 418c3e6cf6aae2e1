//! # CLI Module
//!
//! This module provides the command-line interface for ncplot, including:
//! - Argument parsing with clap
//! - Environment variable support with the NCPLOT_ prefix
//! - Merging of command-line options over job files
//! - Subcommands for plotting, classification and file inspection

use crate::classify::PlotKind;
use crate::error::PlotResult;
use crate::input::PlotJob;
use crate::settings::{PlotOptions, Settings, Theme};
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Interactive plots of oceanographic NetCDF variables
#[derive(Parser, Debug)]
#[command(name = "ncplot")]
#[command(about = "Plot NetCDF variables with automatic axis detection")]
#[command(version)]
#[command(long_about = "
ncplot inspects the coordinates of a NetCDF variable, decides which of its
dimensions are latitude, longitude, depth or time, and draws the matching plot:
a time series, a vertical profile, a map, a section, or an animated map.

FEATURES:
  • Axis detection from names, units, standard_name and long_name
  • Plot types from scalar up to animated 3-D maps with a frame slider
  • Exports: interactive HTML, figure JSON, PNG, SVG and CSV data dumps
  • Colormaps from Panoply .pal files, coastline/track overlays
  • Settings and job files in JSON or YAML

EXAMPLES:
  # Map of sea surface temperature
  ncplot plot ocean.nc -n sst -o sst.html

  # Force a plot type and write several outputs
  ncplot plot ocean.nc -n temp -t 3D_time_map -o temp.html -o temp.png

  # Dump the data as CSV to stdout
  ncplot plot ocean.nc -n ssh -o -

  # What would each variable be plotted as?
  ncplot classify ocean.nc

  # File inspection
  ncplot info ocean.nc --detailed
")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Settings file path (JSON or YAML)
    #[arg(short, long, global = true, env = "NCPLOT_SETTINGS")]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plot a NetCDF variable
    #[command(long_about = "
Plot a NetCDF variable and export the figure.

The plot type is inferred from the axis roles of the variable's dimensions
unless -t is given. The export format follows each output's extension
(.html, .json, .pdf, .png, .svg, .csv); '-' writes the data as CSV to stdout.

EXAMPLES:
  # Inferred plot type, HTML output
  ncplot plot ocean.nc -n sst -o sst.html

  # Log-scaled chlorophyll with a fixed range
  ncplot plot bio.nc -n chl -o chl.png --log-scale --vmin 0.01 --vmax 10

  # Using a job file with overrides
  ncplot plot --config job.yaml --cmap jet -o other.svg
")]
    Plot(PlotArgs),

    /// Show axis roles and inferred plot types
    #[command(long_about = "
Classify the dimensions of every variable (or one variable) as latitude,
longitude, depth, time or unknown, and show the plot type each variable
resolves to.

EXAMPLES:
  ncplot classify ocean.nc
  ncplot classify ocean.nc -n temp --format json
")]
    Classify {
        /// NetCDF file path
        #[arg(value_name = "INPUT", env = "NCPLOT_INPUT")]
        input: String,

        /// Only classify this variable
        #[arg(short = 'n', long)]
        variable: Option<String>,

        /// Plot type hint to validate against
        #[arg(short = 't', long = "type", value_parser = parse_plot_kind)]
        plot_type: Option<PlotKind>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
        format: OutputFormat,
    },

    /// Show information about NetCDF file
    #[command(long_about = "
Inspect NetCDF files and display structure information.

This command displays:
• File dimensions, their sizes and axis roles
• Available variables, their attributes and inferred plot type
• Global attributes (with --detailed)

EXAMPLES:
  # Basic file info
  ncplot info data.nc

  # Detailed information
  ncplot info ocean.nc --detailed

  # Info about specific variable
  ncplot info ocean.nc -n sea_surface_temperature

  # JSON output for scripting
  ncplot info data.nc --format json
")]
    Info {
        /// NetCDF file path
        file: String,

        /// Include global attributes
        #[arg(long)]
        detailed: bool,

        /// Show only specific variable info
        #[arg(short = 'n', long)]
        variable: Option<String>,

        /// Output format for file information
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Generate job or settings templates
    #[command(long_about = "
Generate a job file or a settings file template.

EXAMPLES:
  # Job template as YAML
  ncplot template job --format yaml -o job.yaml

  # Settings template to stdout
  ncplot template settings
")]
    Template {
        /// Template type to generate
        #[arg(value_enum)]
        template_type: TemplateType,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration format
        #[arg(long, value_enum, default_value_t = ConfigFormat::Json)]
        format: ConfigFormat,
    },

    /// Generate shell completions
    #[command(long_about = "
Generate shell completion scripts for bash, zsh, fish and PowerShell.

INSTALLATION:
  # Bash
  ncplot completions bash > ~/.bash_completion.d/ncplot

  # Zsh
  ncplot completions zsh > ~/.zsh/completions/_ncplot

  # Fish
  ncplot completions fish > ~/.config/fish/completions/ncplot.fish
")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Arguments of `ncplot plot`.
#[derive(Args, Debug)]
pub struct PlotArgs {
    /// Input NetCDF file path
    #[arg(value_name = "INPUT", env = "NCPLOT_INPUT")]
    pub input: Option<String>,

    /// Variable to plot
    #[arg(short = 'n', long, env = "NCPLOT_VARIABLE")]
    pub variable: Option<String>,

    /// Plot type (e.g. map_2d, profile, 3D_time_map); inferred when absent
    #[arg(short = 't', long = "type", env = "NCPLOT_PLOT_TYPE", value_parser = parse_plot_kind)]
    pub plot_type: Option<PlotKind>,

    /// Output path (repeatable); '-' writes CSV to stdout
    #[arg(short, long = "output")]
    pub outputs: Vec<String>,

    /// Job file (JSON or YAML); command-line values take precedence
    #[arg(long, env = "NCPLOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Plot title
    #[arg(long)]
    pub title: Option<String>,

    /// X axis title
    #[arg(long)]
    pub xlabel: Option<String>,

    /// Y axis title
    #[arg(long)]
    pub ylabel: Option<String>,

    /// Colorbar title
    #[arg(long)]
    pub colorbar_label: Option<String>,

    /// Colormap name (.pal file in the colorbar directory, or viridis/jet/grays; default jet)
    #[arg(long, env = "NCPLOT_CMAP")]
    pub cmap: Option<String>,

    /// Lower bound of the value range
    #[arg(long, allow_negative_numbers = true)]
    pub vmin: Option<f64>,

    /// Upper bound of the value range
    #[arg(long, allow_negative_numbers = true)]
    pub vmax: Option<f64>,

    /// Log10 value scale
    #[arg(long)]
    pub log_scale: bool,

    /// Hide grid lines
    #[arg(long)]
    pub no_grid: bool,

    /// Reverse the y axis
    #[arg(long, overrides_with = "no_reverse_y")]
    pub reverse_y: bool,

    /// Do not reverse the y axis
    #[arg(long, overrides_with = "reverse_y")]
    pub no_reverse_y: bool,

    /// strftime format for time labels
    #[arg(long)]
    pub time_format: Option<String>,

    /// Color theme (light or dark)
    #[arg(long, value_parser = parse_theme)]
    pub theme: Option<Theme>,

    /// Overlay file to draw on maps (repeatable)
    #[arg(long = "overlay")]
    pub overlays: Vec<String>,

    /// Raster width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Raster height in pixels
    #[arg(long)]
    pub height: Option<u32>,
}

impl PlotArgs {
    /// Options given on the command line; unset flags stay `None`.
    pub fn options(&self) -> PlotOptions {
        let reverse_y = if self.reverse_y {
            Some(true)
        } else if self.no_reverse_y {
            Some(false)
        } else {
            None
        };
        PlotOptions {
            title: self.title.clone(),
            xlabel: self.xlabel.clone(),
            ylabel: self.ylabel.clone(),
            colorbar_label: self.colorbar_label.clone(),
            cmap: self.cmap.clone(),
            vmin: self.vmin,
            vmax: self.vmax,
            grid: self.no_grid.then_some(false),
            log_scale: self.log_scale.then_some(true),
            reverse_y,
            time_format: self.time_format.clone(),
            theme: self.theme,
            ..PlotOptions::default()
        }
    }

    /// Builds the job: the `--config` file when given, with command-line
    /// values layered on top.
    pub fn to_job(&self) -> PlotResult<PlotJob> {
        let mut job = match &self.config {
            Some(path) => PlotJob::from_file(path)?,
            None => PlotJob {
                input: String::new(),
                variable: String::new(),
                plot_type: None,
                options: PlotOptions::default(),
                outputs: Vec::new(),
            },
        };
        if let Some(input) = &self.input {
            job.input = input.clone();
        }
        if let Some(variable) = &self.variable {
            job.variable = variable.clone();
        }
        if self.plot_type.is_some() {
            job.plot_type = self.plot_type;
        }
        if !self.outputs.is_empty() {
            job.outputs = self.outputs.clone();
        }
        job.options = self.options().merged_over(&job.options);
        job.validate()?;
        Ok(job)
    }

    /// Applies overlays and raster size to `settings`.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        for overlay in &self.overlays {
            if !settings.active_overlays.contains(overlay) {
                settings.active_overlays.push(overlay.clone());
            }
        }
        if let Some(width) = self.width {
            settings.width = width;
        }
        if let Some(height) = self.height {
            settings.height = height;
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON structured output
    Json,
    /// YAML structured output
    Yaml,
    /// CSV output (where applicable)
    Csv,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum TemplateType {
    /// Plot job template
    Job,
    /// Settings template
    Settings,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON configuration format
    Json,
    /// YAML configuration format
    Yaml,
}

/// Parse a plot type name or alias
fn parse_plot_kind(s: &str) -> Result<PlotKind, String> {
    s.parse::<PlotKind>().map_err(|_| {
        let names: Vec<&str> = PlotKind::ALL.iter().map(|k| k.label()).collect();
        format!("Unknown plot type '{}'. Valid types: {}", s, names.join(", "))
    })
}

/// Parse a theme name
fn parse_theme(s: &str) -> Result<Theme, String> {
    s.parse::<Theme>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plot_args(args: &[&str]) -> PlotArgs {
        let mut argv = vec!["ncplot", "plot"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Plot(args) => args,
            other => panic!("expected plot command, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_plot_kind() {
        assert_eq!(parse_plot_kind("map_2d").unwrap(), PlotKind::Map2d);
        assert_eq!(parse_plot_kind("1D_profile").unwrap(), PlotKind::Profile);
        assert_eq!(parse_plot_kind("3D_time_map").unwrap(), PlotKind::TimeMap3d);

        let err = parse_plot_kind("pie_chart").unwrap_err();
        assert!(err.contains("pie_chart"));
        assert!(err.contains("3D_generic"));
    }

    #[test]
    fn test_parse_theme() {
        assert_eq!(parse_theme("dark").unwrap(), Theme::Dark);
        assert!(parse_theme("sepia").is_err());
    }

    #[test]
    fn test_plot_command() {
        let args = plot_args(&[
            "ocean.nc", "-n", "sst", "-t", "map_2d", "-o", "a.html", "-o", "-", "--vmin", "-2",
            "--vmax", "30", "--no-grid", "--log-scale",
        ]);
        let job = args.to_job().unwrap();
        assert_eq!(job.input, "ocean.nc");
        assert_eq!(job.variable, "sst");
        assert_eq!(job.plot_type, Some(PlotKind::Map2d));
        assert_eq!(job.outputs, vec!["a.html", "-"]);
        assert_eq!(job.options.vmin, Some(-2.0));
        assert_eq!(job.options.vmax, Some(30.0));
        assert_eq!(job.options.grid, Some(false));
        assert_eq!(job.options.log_scale, Some(true));
        assert_eq!(job.options.reverse_y, None);
    }

    #[test]
    fn test_reverse_y_flags() {
        assert_eq!(plot_args(&["a.nc", "-n", "v", "--reverse-y"]).options().reverse_y, Some(true));
        assert_eq!(
            plot_args(&["a.nc", "-n", "v", "--no-reverse-y"]).options().reverse_y,
            Some(false)
        );
        // The last flag wins.
        assert_eq!(
            plot_args(&["a.nc", "-n", "v", "--no-reverse-y", "--reverse-y"])
                .options()
                .reverse_y,
            Some(true)
        );
    }

    #[test]
    fn test_missing_variable_is_rejected() {
        let args = plot_args(&["ocean.nc"]);
        assert!(args.to_job().is_err());
    }

    #[test]
    fn test_job_file_with_overrides() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("job.yaml");
        std::fs::write(
            &path,
            "input: ocean.nc\nvariable: temp\noptions:\n  cmap: jet\n  title: Temperature\noutputs: [t.html]\n",
        )
        .unwrap();

        let args = plot_args(&["--config", path.to_str().unwrap(), "--cmap", "grays"]);
        let job = args.to_job().unwrap();
        assert_eq!(job.input, "ocean.nc");
        assert_eq!(job.options.cmap.as_deref(), Some("grays"));
        assert_eq!(job.options.title.as_deref(), Some("Temperature"));
        assert_eq!(job.outputs, vec!["t.html"]);
    }

    #[test]
    fn test_apply_to_settings() {
        let args = plot_args(&["a.nc", "-n", "v", "--overlay", "coast.geojson", "--width", "640"]);
        let mut settings = Settings::default();
        args.apply_to_settings(&mut settings);
        args.apply_to_settings(&mut settings);
        assert_eq!(settings.active_overlays, vec!["coast.geojson"]);
        assert_eq!(settings.width, 640);
        assert_eq!(settings.height, 768);
    }

    #[test]
    fn test_other_commands() {
        let cli = Cli::try_parse_from(["ncplot", "-v", "classify", "a.nc", "--format", "json"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Classify { input, format, .. } => {
                assert_eq!(input, "a.nc");
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let cli = Cli::try_parse_from(["ncplot", "template", "settings", "--format", "yaml"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Template { template_type: TemplateType::Settings, format: ConfigFormat::Yaml, .. }
        ));

        assert!(Cli::try_parse_from(["ncplot", "-v", "-q", "info", "a.nc"]).is_err());
    }
}
