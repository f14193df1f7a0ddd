//! Wavebook CLI - batch survey report renderer.

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Discover {
            root,
            pattern,
            json,
        } => commands::discover::run(root, pattern, json),

        Commands::Tabulate {
            file,
            row,
            column,
            weight,
            counts,
            decimals,
        } => commands::tabulate::run(file, row, column, weight, counts, decimals),

        Commands::Render {
            file,
            template,
            output,
            format,
            label,
            index,
        } => commands::render::run(file, template, output, format, label, index),

        Commands::Run { config, json } => commands::run::run(config, json),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
