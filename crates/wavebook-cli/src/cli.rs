//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Wavebook: render one report per survey wave from a single template
#[derive(Parser)]
#[command(name = "wavebook")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the data files a batch would see, with their 1-based indices
    Discover {
        /// Directory to search
        #[arg(value_name = "ROOT")]
        root: PathBuf,

        /// Regex matched against file names
        #[arg(short, long, default_value = r"\.(csv|tsv)$")]
        pattern: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a weighted frequency table or cross-tab for one file
    Tabulate {
        /// Path to the data file (CSV/TSV)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Row variable
        #[arg(short, long)]
        row: String,

        /// Column variable for a cross-tab
        #[arg(short, long)]
        column: Option<String>,

        /// Weight column
        #[arg(short, long)]
        weight: Option<String>,

        /// Show weighted counts instead of percentages
        #[arg(long)]
        counts: bool,

        /// Decimal places shown
        #[arg(short, long, default_value = "0")]
        decimals: usize,
    },

    /// Render one data file through a template, outside any batch
    Render {
        /// Path to the data file (CSV/TSV)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Template file (JSON)
        #[arg(short, long)]
        template: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Output format (md, json, html, pdf, docx)
        #[arg(short, long, default_value = "md")]
        format: String,

        /// Source label; the template's default when omitted
        #[arg(short, long)]
        label: Option<String>,

        /// Source index; the template's default when omitted
        #[arg(short, long)]
        index: Option<usize>,
    },

    /// Run a batch configuration and record provenance
    Run {
        /// Path to the batch configuration (JSON)
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Output the batch report as JSON
        #[arg(long)]
        json: bool,
    },
}
