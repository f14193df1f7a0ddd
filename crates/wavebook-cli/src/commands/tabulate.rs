//! Tabulate command - print a weighted table for one file.

use std::path::PathBuf;

use colored::Colorize;
use wavebook::{
    tabulate, CrossTabSpec, DatasetLoader, LoaderConfig, TabulationResult, ValueTransform,
};

use super::CommandResult;

pub fn run(
    file: PathBuf,
    row: String,
    column: Option<String>,
    weight: Option<String>,
    counts: bool,
    decimals: usize,
) -> CommandResult {
    let mut config = LoaderConfig::new().with_categorical(row.clone());
    if let Some(ref column) = column {
        config = config.with_categorical(column.clone());
    }
    if let Some(ref weight) = weight {
        config = config.with_weight(weight.clone());
    }

    let (dataset, metadata) = DatasetLoader::new(config).load(&file)?;

    let spec = match column {
        Some(column) => CrossTabSpec::two_way(row, column),
        None => CrossTabSpec::one_way(row),
    };
    let transform = match (counts, spec.column.is_some()) {
        (true, _) => ValueTransform::Count,
        (false, true) => ValueTransform::ColumnProportion,
        (false, false) => ValueTransform::Proportion,
    };
    let result = tabulate(&dataset, &spec.with_transform(transform))?;

    println!(
        "{} {} ({} rows, {})",
        "Table for".cyan().bold(),
        metadata.file.white(),
        metadata.row_count,
        match dataset.weight_column() {
            Some(w) => format!("weighted by {}", w),
            None => "unweighted".to_string(),
        }
    );
    println!();
    print_table(&result, decimals);

    if result.excluded_rows > 0 {
        println!();
        println!(
            "{} {} row(s) excluded for missing values",
            "Note:".yellow(),
            result.excluded_rows
        );
    }

    Ok(true)
}

fn print_table(result: &TabulationResult, decimals: usize) {
    let headers: Vec<String> = if result.is_two_way() {
        result.column_labels.clone()
    } else {
        vec![result.spec.transform.label().to_string()]
    };

    let label_width = result
        .row_labels
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .max(result.spec.row.chars().count());
    let cell_width = headers
        .iter()
        .map(|h| h.chars().count())
        .max()
        .unwrap_or(0)
        .max(decimals + 6);

    let mut header = format!("{:<label_width$}", result.spec.row);
    for h in &headers {
        header.push_str(&format!("  {:>cell_width$}", h));
    }
    println!("{}", header.bold());

    for (r, label) in result.row_labels.iter().enumerate() {
        let mut line = format!("{:<label_width$}", label);
        for c in 0..result.width() {
            line.push_str(&format!("  {:>cell_width$}", result.format_cell(r, c, decimals)));
        }
        println!("{}", line);
    }
}
