use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use indicatif::{ProgressBar, ProgressStyle};
use log::error;
use ncplot::classify::classify_variable;
use ncplot::cli::{Cli, Commands, ConfigFormat, OutputFormat, PlotArgs, TemplateType};
use ncplot::dataset::{DatasetSource, NetCdfDataset};
use ncplot::info;
use ncplot::input::PlotJob;
use ncplot::log::{job_echo, show_export, show_farewell_with_timing, show_greeting, show_resolved_kind};
use ncplot::settings::Settings;
use ncplot::{default_output, export_plot, prepare_plot};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::time::{Duration, Instant};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = failure_message(&e);
            error!("{}", message);
            eprintln!("Error: {}", message);
            ExitCode::FAILURE
        }
    }
}

/// The error with its whole context chain on one line.
fn failure_message(e: &anyhow::Error) -> String {
    format!("{:#}", e)
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let settings = match path {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };
    Ok(settings.with_env_overrides()?)
}

fn run(cli: Cli) -> Result<()> {
    let quiet = cli.quiet;
    match cli.command {
        Commands::Plot(args) => {
            let settings = load_settings(cli.settings.as_deref())?;
            plot(&args, settings, quiet)
        }
        Commands::Classify {
            input,
            variable,
            plot_type,
            format,
        } => {
            let dataset = NetCdfDataset::open(&input)
                .with_context(|| format!("Failed to open NetCDF file: {}", input))?;
            let names = match variable {
                Some(name) => vec![name],
                None => dataset.variable_names(),
            };
            let classifications = names
                .iter()
                .map(|name| classify_variable(&dataset, name, plot_type))
                .collect::<Result<Vec<_>, _>>()?;
            match format {
                OutputFormat::Human => info::print_classifications_human(&classifications),
                OutputFormat::Json => info::print_classifications_json(&classifications)?,
                OutputFormat::Yaml => info::print_classifications_yaml(&classifications)?,
                OutputFormat::Csv => info::print_classifications_csv(&classifications),
            }
            Ok(())
        }
        Commands::Info {
            file,
            detailed,
            variable,
            format,
        } => {
            let info = info::get_netcdf_info(&file, variable.as_deref(), detailed)?;
            match format.unwrap_or(OutputFormat::Human) {
                OutputFormat::Human => info::print_file_info_human(&info),
                OutputFormat::Json => info::print_file_info_json(&info)?,
                OutputFormat::Yaml => info::print_file_info_yaml(&info)?,
                OutputFormat::Csv => info::print_file_info_csv(&info)?,
            }
            Ok(())
        }
        Commands::Template {
            template_type,
            output,
            format,
        } => {
            let text = match (template_type, format) {
                (TemplateType::Job, ConfigFormat::Json) => PlotJob::template().to_json_pretty()?,
                (TemplateType::Job, ConfigFormat::Yaml) => PlotJob::template().to_yaml()?,
                (TemplateType::Settings, ConfigFormat::Json) => Settings::default().to_json_pretty()?,
                (TemplateType::Settings, ConfigFormat::Yaml) => Settings::default().to_yaml()?,
            };
            match output {
                Some(path) => {
                    std::fs::write(&path, text)
                        .with_context(|| format!("Failed to write template to {}", path.display()))?;
                    if !quiet {
                        println!("Template written to {}", path.display());
                    }
                }
                None => println!("{}", text),
            }
            Ok(())
        }
        Commands::Completions { shell, output } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            match output {
                Some(path) => {
                    let mut file = File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    generate(shell, &mut cmd, name, &mut file);
                }
                None => generate(shell, &mut cmd, name, &mut io::stdout()),
            }
            Ok(())
        }
    }
}

fn spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn plot(args: &PlotArgs, mut settings: Settings, quiet: bool) -> Result<()> {
    let start_time = Instant::now();
    let mut job = args.to_job()?;
    args.apply_to_settings(&mut settings);
    if job.outputs.is_empty() {
        job.outputs.push(default_output(&job));
    }

    // CSV on stdout must stay clean.
    let echo = !quiet && !job.outputs.iter().any(|o| o == "-");
    if echo {
        show_greeting(&job.input);
        job_echo(&job);
    }

    let pb = spinner(&format!("Building plot for '{}'...", job.variable), !echo);
    let dataset = NetCdfDataset::open(&job.input)
        .with_context(|| format!("Failed to open NetCDF file: {}", job.input))?;
    let prepared = prepare_plot(&dataset, &job, &settings)
        .with_context(|| format!("Failed to plot '{}'", job.variable));
    pb.finish_and_clear();
    let prepared = prepared?;
    dataset.close()?;
    if echo {
        show_resolved_kind(&job.variable, prepared.kind);
    }

    for output in &job.outputs {
        let pb = spinner(&format!("Exporting {}...", output), !echo);
        let result = export_plot(&prepared, output, &settings);
        pb.finish_and_clear();
        result.with_context(|| format!("Failed to export {}", output))?;
        if echo {
            show_export(output);
        }
    }
    io::stdout().flush()?;

    if echo {
        show_farewell_with_timing(start_time.elapsed());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_failure_message_keeps_context_chain() {
        let e = anyhow!("Variable 'salt' not found").context("Failed to plot 'salt'");
        assert_eq!(
            failure_message(&e),
            "Failed to plot 'salt': Variable 'salt' not found"
        );
    }
}
