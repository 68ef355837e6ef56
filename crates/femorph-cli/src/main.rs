mod cli;
mod commands;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::error::Result;
use clap::Parser;
use std::error::Error;
use tracing::debug;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {}", e);
        let mut cause = e.source();
        while let Some(inner) = cause {
            eprintln!("  caused by: {}", inner);
            cause = inner.source();
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;
    debug!("femorph v{} started", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Setup(args) => commands::setup::run(args),
        Commands::Coords(args) => commands::coords::run(args),
    }
}
