use thiserror::Error;

#[derive(Debug, Error)]
pub enum MorphError {
    #[error("Atom mapping failed: {0}")]
    Mapping(String),

    #[error("Atom '{atom}' has no real anchor within two bonds: {message}")]
    Connectivity { atom: String, message: String },

    #[error("Could not place atom '{atom}': {message}")]
    Geometry { atom: String, message: String },

    #[error("Reference structure has wrong number of atoms: expected {expected}, found {found}")]
    CountMismatch { expected: usize, found: usize },

    #[error("Unknown free energy type: {0}")]
    Configuration(String),

    #[error("Operation out of sequence: {0}")]
    Sequencing(&'static str),

    #[error("{context}: {source}")]
    Collaborator {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl MorphError {
    /// Wraps a collaborator failure, keeping the original message attached.
    pub fn collaborator(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Collaborator {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
