/// The steps of the morph construction pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphPhase {
    Mapping,
    Connectivity,
    Coordinates,
    Topology,
}

impl MorphPhase {
    /// Short label for progress displays.
    pub fn label(self) -> &'static str {
        match self {
            Self::Mapping => "Mapping atoms",
            Self::Connectivity => "Resolving connectivity",
            Self::Coordinates => "Synthesizing coordinates",
            Self::Topology => "Writing topology",
        }
    }
}

/// Progress events emitted while a morph is built.
#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStart(MorphPhase),
    PhaseFinish(MorphPhase),
    Note(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards progress events to an optional observer.
///
/// A reporter without a callback swallows every event, so library callers
/// that do not care about progress can pass `ProgressReporter::new()`.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
