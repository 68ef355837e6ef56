use crate::cli::SetupArgs;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use femorph::engine::config::MorphConfig;
use femorph::engine::progress::ProgressReporter;
use femorph::workflows::morph::Morph;
use tracing::info;

pub fn run(args: SetupArgs) -> Result<()> {
    let config = MorphConfig::load(&args.config)?;
    info!(
        initial = %args.initial,
        final_state = %args.final_name,
        method = %config.method,
        "Setting up morph"
    );

    let mut morph = Morph::new(config, &args.initial, &args.final_name)?;

    let progress = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress.callback());

    let result = morph.setup(&args.cmd1, &args.cmd2, &reporter);
    progress.finish();
    result?;

    info!(workspace = %morph.workspace().display(), "Morph setup finished");
    println!(
        "Morph {} written to {}",
        morph.name(),
        morph.workspace().display()
    );
    Ok(())
}
