//! Render command - one data file through a template, without a batch.

use std::path::PathBuf;

use colored::Colorize;
use wavebook::{backend_for, OutputFormat, RunParameters, Wavebook};

use super::CommandResult;

pub fn run(
    file: PathBuf,
    template: PathBuf,
    output: PathBuf,
    format: String,
    label: Option<String>,
    index: Option<usize>,
) -> CommandResult {
    let format: OutputFormat = format.parse()?;
    let wavebook = Wavebook::from_template_file(&template)?;

    // Index 0 and an empty label fall back to the template's defaults.
    let params = RunParameters::new(index.unwrap_or(0), label.unwrap_or_default(), output.clone());
    let processed = wavebook.process(&file, &params)?;

    let backend = backend_for(format, None, wavebook.template().decimals);
    backend.render(&processed.document, &output)?;

    println!(
        "{} {} -> {}",
        "Rendered".green().bold(),
        processed.source.file,
        output.display()
    );
    println!(
        "  [{}] {} ({} rows, {} column(s) recoded)",
        processed.document.source_index,
        processed.document.source_label,
        processed.source.row_count,
        processed.recode.columns_changed
    );

    Ok(true)
}
