use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "femorph developers",
    version,
    about = "femorph - build hybrid ligand topologies for alchemical free energy perturbation.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Map the two ligands and write the vacuum-phase morph topology.
    Setup(SetupArgs),
    /// Create solvated-phase morph coordinates for a target system.
    Coords(CoordsArgs),
}

/// Arguments for the `setup` subcommand.
#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Name of the initial-state ligand (its inputs live under ligands/<NAME>/).
    #[arg(value_name = "INITIAL")]
    pub initial: String,

    /// Name of the final-state ligand.
    #[arg(value_name = "FINAL")]
    pub final_name: String,

    /// Path to the configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// First preparation directive recorded into the emitted prep script.
    #[arg(long, value_name = "CMD", default_value = "")]
    pub cmd1: String,

    /// Second preparation directive recorded into the emitted prep script.
    #[arg(long, value_name = "CMD", default_value = "")]
    pub cmd2: String,
}

/// Arguments for the `coords` subcommand.
#[derive(Args, Debug)]
pub struct CoordsArgs {
    /// Name of the initial-state ligand.
    #[arg(value_name = "INITIAL")]
    pub initial: String,

    /// Name of the final-state ligand.
    #[arg(value_name = "FINAL")]
    pub final_name: String,

    /// Path to the configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Target system: "ligand" or "complex".
    #[arg(short, long, value_name = "SYSTEM")]
    pub system: String,

    /// Protein name; required when the target system is "complex".
    #[arg(short, long, value_name = "NAME")]
    pub protein: Option<String>,

    /// First preparation directive recorded into the emitted prep script.
    #[arg(long, value_name = "CMD", default_value = "")]
    pub cmd1: String,

    /// Second preparation directive recorded into the emitted prep script.
    #[arg(long, value_name = "CMD", default_value = "")]
    pub cmd2: String,
}
