//! Run command - render every document in a batch configuration.

use std::path::PathBuf;

use colored::Colorize;
use wavebook::{run_batch, BatchConfig, RenderOutcome};

use super::CommandResult;

pub fn run(config_path: PathBuf, json_output: bool) -> CommandResult {
    let config = BatchConfig::load(&config_path)?;
    let report = run_batch(&config)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report.is_complete());
    }

    println!(
        "{} {}",
        "Batch".cyan().bold(),
        config_path.display().to_string().white()
    );
    println!();

    for result in &report.results {
        let label = format!("[{}] {}", result.source_index, result.label);
        match &result.outcome {
            RenderOutcome::Success { output } => {
                println!("  {} {} -> {}", "ok".green().bold(), label, output.display());
            }
            RenderOutcome::Failed { kind, message } => {
                println!("  {} {} ({})", "FAILED".red().bold(), label, kind.label());
                println!("      {}", message.red());
            }
            RenderOutcome::Skipped { reason } => {
                println!("  {} {} ({})", "skipped".yellow(), label, reason);
            }
        }
    }

    println!();
    println!(
        "{} {} succeeded, {} failed, {} skipped",
        "Done:".green().bold(),
        report.succeeded(),
        report.failed(),
        report.skipped()
    );
    if let Some(ref path) = report.provenance_path {
        println!("{} {}", "Provenance:".cyan(), path.display());
    }
    if let Some(ref err) = report.provenance_error {
        println!("{} provenance not written: {}", "Warning:".yellow().bold(), err);
    }

    Ok(report.is_complete())
}
