use crate::config::ConfigError;
use thiserror::Error;

/// Top-level error type for the mp-properties library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("project has no source and no origin to scan")]
    NothingToLoad,
}
