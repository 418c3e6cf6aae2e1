use crate::input::PlotJob;
use crate::classify::PlotKind;
use std::time::Duration;

pub fn show_greeting(input: &str) {
    println!("=== ncplot: NetCDF plotting ===");
    println!("Reading dataset: {}", input);
}

pub fn job_echo(job: &PlotJob) {
    println!("\nPlot request:");
    println!("  Input NetCDF: {}", job.input);
    println!("  Variable: {}", job.variable);
    match job.plot_type {
        Some(kind) => println!("  Plot type: {} (requested)", kind),
        None => println!("  Plot type: inferred"),
    }
    if let Some(cmap) = &job.options.cmap {
        println!("  Colormap: {}", cmap);
    }
    println!("  Number of outputs: {}", job.outputs.len());

    for (i, output) in job.outputs.iter().enumerate() {
        println!("    Output {}: {}", i + 1, output);
    }
}

pub fn show_resolved_kind(variable: &str, kind: PlotKind) {
    println!("\nResolved '{}' as {}", variable, kind);
}

pub fn show_export(path: &str) {
    if path == "-" {
        // Stdout carries the CSV itself.
        return;
    }
    println!("  Saved {}", path);
}

pub fn show_farewell_with_timing(elapsed: Duration) {
    println!("\n=== Plot completed in {:.2}s ===", elapsed.as_secs_f64());
}
