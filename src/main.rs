use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;

use maiware::logging::{init_tracing, init_tracing_json};
use maiware::{Pipeline, PipelineConfig};

#[derive(Parser)]
#[command(name = "maiware")]
#[command(about = "Classify a PE file with an ensemble vote and structural heuristics")]
struct Cli {
    /// File to classify
    file: Option<PathBuf>,

    /// Log per-stage timings and pass --verbose to the call-graph tool
    #[arg(long)]
    verbose: bool,

    /// JSON pipeline configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit diagnostics as JSON lines on stderr
    #[arg(long)]
    json_logs: bool,
}

fn print_error(message: &str) -> ExitCode {
    println!("{}", json!({ "error": message }));
    ExitCode::FAILURE
}

fn run(cli: Cli) -> Result<ExitCode> {
    let Some(file) = cli.file else {
        return Ok(print_error("No file path provided"));
    };
    if !file.exists() {
        return Ok(print_error("File not found"));
    }

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    }
    .with_env_overrides();
    if cli.verbose {
        config.verbose_timing = true;
    }

    let result = Pipeline::new(config).analyze(&file);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.json_logs {
        init_tracing_json();
    } else {
        init_tracing();
    }

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "maiware failed");
            print_error(&format!("{e:#}"))
        }
    }
}
