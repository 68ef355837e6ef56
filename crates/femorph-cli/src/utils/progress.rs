use femorph::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const SPINNER_TICK: Duration = Duration::from_millis(80);

/// Renders core progress events as a spinner on stderr.
///
/// `ProgressBar` handles are internally shared, so the callback handed to
/// the core simply clones the bar; no extra synchronization is needed.
pub struct CliProgressHandler {
    bar: ProgressBar,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg}")
                .expect("static spinner template is valid"),
        );
        Self { bar }
    }

    /// A callback suitable for `ProgressReporter::with_callback`.
    pub fn callback(&self) -> ProgressCallback<'static> {
        let bar = self.bar.clone();
        Box::new(move |event| match event {
            Progress::PhaseStart(phase) => {
                bar.enable_steady_tick(SPINNER_TICK);
                bar.set_message(phase.label());
            }
            Progress::PhaseFinish(phase) => {
                bar.disable_steady_tick();
                bar.println(format!("✓ {}", phase.label()));
                bar.set_message("");
            }
            Progress::Note(text) => {
                bar.println(format!("  {}", text));
            }
        })
    }

    /// Removes the spinner once the pipeline is done.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use femorph::engine::progress::MorphPhase;

    #[test]
    fn phase_start_shows_the_phase_label() {
        let handler = CliProgressHandler::new();
        let callback = handler.callback();

        callback(Progress::PhaseStart(MorphPhase::Mapping));
        assert_eq!(handler.bar.message(), MorphPhase::Mapping.label());

        callback(Progress::PhaseFinish(MorphPhase::Mapping));
        assert_eq!(handler.bar.message(), "");
    }

    #[test]
    fn finish_clears_the_bar() {
        let handler = CliProgressHandler::new();
        handler.finish();
        assert!(handler.bar.is_finished());
    }

    #[test]
    fn callback_may_be_driven_from_another_thread() {
        let handler = CliProgressHandler::new();
        let callback = handler.callback();

        std::thread::spawn(move || {
            callback(Progress::PhaseStart(MorphPhase::Coordinates));
            callback(Progress::PhaseFinish(MorphPhase::Coordinates));
        })
        .join()
        .unwrap();

        assert_eq!(handler.bar.message(), "");
    }
}
