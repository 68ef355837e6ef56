use crate::cli::CoordsArgs;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use femorph::engine::config::MorphConfig;
use femorph::engine::progress::ProgressReporter;
use femorph::workflows::morph::{Morph, TargetSystem};
use tracing::info;

pub fn run(args: CoordsArgs) -> Result<()> {
    let system = parse_system(&args)?;

    let config = MorphConfig::load(&args.config)?;
    info!(
        initial = %args.initial,
        final_state = %args.final_name,
        system = system.workdir_name(),
        "Creating morph coordinates"
    );

    let mut morph = Morph::new(config, &args.initial, &args.final_name)?;

    let progress = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress.callback());

    // The mapping is recomputed deterministically from the vacuum
    // structures; coordinates for the target system build on it.
    let result = morph
        .setup(&args.cmd1, &args.cmd2, &reporter)
        .and_then(|_| morph.create_coords(&system, &args.cmd1, &args.cmd2, &reporter));
    progress.finish();
    result?;

    info!(workspace = %morph.workspace().display(), "Coordinate creation finished");
    println!(
        "Coordinates for {} ({}) written to {}",
        morph.name(),
        system.workdir_name(),
        morph.workspace().display()
    );
    Ok(())
}

fn parse_system(args: &CoordsArgs) -> Result<TargetSystem> {
    match args.system.as_str() {
        "ligand" => Ok(TargetSystem::SolvatedLigand),
        "complex" => {
            let protein = args.protein.clone().ok_or_else(|| {
                CliError::Argument("--protein is required for --system complex".to_string())
            })?;
            Ok(TargetSystem::SolvatedComplex { protein })
        }
        other => Err(CliError::Argument(format!(
            "unknown system '{}' (expected 'ligand' or 'complex')",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args(system: &str, protein: Option<&str>) -> CoordsArgs {
        CoordsArgs {
            initial: "lig0".to_string(),
            final_name: "lig1".to_string(),
            config: PathBuf::from("config.toml"),
            system: system.to_string(),
            protein: protein.map(str::to_string),
            cmd1: String::new(),
            cmd2: String::new(),
        }
    }

    #[test]
    fn ligand_system_parses() {
        assert_eq!(
            parse_system(&args("ligand", None)).unwrap(),
            TargetSystem::SolvatedLigand
        );
    }

    #[test]
    fn complex_system_requires_protein() {
        assert!(matches!(
            parse_system(&args("complex", None)),
            Err(CliError::Argument(_))
        ));
        assert_eq!(
            parse_system(&args("complex", Some("prot"))).unwrap(),
            TargetSystem::SolvatedComplex {
                protein: "prot".to_string()
            }
        );
    }

    #[test]
    fn unknown_system_is_rejected() {
        assert!(matches!(
            parse_system(&args("vacuum", None)),
            Err(CliError::Argument(_))
        ));
    }
}
