use crate::error::Result;
use std::fs::File;
use std::io;
use std::path::Path;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Maps the repeated `-v` flag (or `-q`) onto the console log level.
fn console_level(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::OFF;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Installs the global tracing subscriber for the CLI.
///
/// Console records go to stderr so they never interleave with result output
/// on stdout, and are filtered by the verbosity flags. With `--log-file` a
/// second layer writes every record, unfiltered and without ANSI codes, to
/// the given file; a morph run can therefore always be diagnosed from its
/// log file even when the console ran quiet.
pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .with_filter(console_level(verbosity, quiet));

    match log_file {
        Some(path) => {
            let sink = File::create(path)?;
            let file_layer = fmt::layer()
                .with_writer(sink)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true);
            tracing_subscriber::registry()
                .with(console)
                .with(file_layer)
                .init();
        }
        None => tracing_subscriber::registry().with(console).init(),
    }

    Ok(())
}
