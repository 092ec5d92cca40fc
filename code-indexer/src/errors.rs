//! Error hierarchy for the indexing layer.

use thiserror::Error;
use vector_store::StoreError;

/// Convenient alias for indexing results.
pub type IndexResult<T> = Result<T, IndexError>;

#[derive(Debug, Error)]
pub enum IndexError {
    /// Snippet storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Git clone/fetch/checkout failure.
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// Filesystem failure while walking or reading the working copy.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking git task failed to complete.
    #[error("background task failed: {0}")]
    Join(String),

    /// Repository key is not of the `owner/repo` form.
    #[error("invalid repository key: {0}, expected owner/repo")]
    InvalidRepoKey(String),

    /// Clone URL cannot be built for this platform.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// A credential required for the clone URL is missing.
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
}
