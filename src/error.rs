//! Error types for pkgscope.
//!
//! Collector failures never show up here: they are absorbed into the
//! snapshot as `unavailable` sections (see `collect::CollectionError`).
//! Everything in this module aborts the current run.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no snapshot found in {0}. Run 'pkgscope-collect run' first.")]
    NotFound(PathBuf),

    #[error("{path} is not a valid snapshot: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Ai(#[from] AiError),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }
}

/// Failures of the single model call. None of these are retried.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited by the model endpoint: {0}")]
    RateLimit(String),

    #[error("model endpoint returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("model returned no usable text: {0}")]
    InvalidResponse(String),
}
