use femorph::engine::config::ConfigLoadError;
use femorph::engine::error::MorphError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Morph(#[from] MorphError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigLoadError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
