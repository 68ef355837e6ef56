use std::env;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Scoped switch of the process working directory.
///
/// The current directory is global mutable state; every phase of a morph
/// runs inside its workspace through this guard so the previous directory
/// is restored on every exit path, including errors.
#[derive(Debug)]
pub struct ScopedDir {
    previous: PathBuf,
}

impl ScopedDir {
    /// Switches the process working directory to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined or
    /// `path` cannot be entered; the working directory is unchanged then.
    pub fn enter(path: &Path) -> io::Result<Self> {
        let previous = env::current_dir()?;
        env::set_current_dir(path)?;
        debug!(path = %path.display(), "Entered working directory");
        Ok(Self { previous })
    }

    /// The directory that will be restored on drop.
    pub fn previous(&self) -> &Path {
        &self.previous
    }
}

impl Drop for ScopedDir {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.previous) {
            // Nothing sensible to do here; the next ScopedDir::enter will fail loudly.
            warn!(
                path = %self.previous.display(),
                error = %e,
                "Failed to restore working directory"
            );
        } else {
            debug!(path = %self.previous.display(), "Restored working directory");
        }
    }
}
