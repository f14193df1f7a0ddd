//! Discover command - list matching data files and their indices.

use std::path::PathBuf;

use colored::Colorize;
use wavebook::discover;

use super::CommandResult;

pub fn run(root: PathBuf, pattern: String, json_output: bool) -> CommandResult {
    let sources = discover(&root, &pattern)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&sources)?);
        return Ok(!sources.is_empty());
    }

    if sources.is_empty() {
        println!(
            "{} no files under {} match '{}'",
            "Warning:".yellow().bold(),
            root.display(),
            pattern
        );
        return Ok(false);
    }

    println!(
        "{} {} source(s) under {}",
        "Discovered".cyan().bold(),
        sources.len(),
        root.display()
    );
    println!();
    for source in &sources {
        println!(
            "  {:>3}  {}  {}",
            source.index.to_string().white().bold(),
            source.label.green(),
            source.path.display().to_string().dimmed()
        );
    }
    println!();
    println!(
        "{}",
        "Indices follow file-name order. Use them as source_index in the batch run list.".dimmed()
    );

    Ok(true)
}
