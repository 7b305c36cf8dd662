//! Observatory error types.

use thiserror::Error;

use crate::config::ConfigError;
use crate::probe::TargetError;

/// Errors returned by registration and lifecycle operations.
///
/// Probe failures are not errors; they are recorded as candidate state.
#[derive(Debug, Error)]
pub enum ObservatoryError {
    #[error("candidate tag must not be empty")]
    EmptyTag,

    #[error("candidate already registered: {0}")]
    DuplicateCandidate(String),

    #[error("candidate not registered: {0}")]
    UnknownCandidate(String),

    #[error("invalid target for candidate {tag}: {source}")]
    InvalidTarget {
        tag: String,
        #[source]
        source: TargetError,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("observatory is stopped")]
    Stopped,
}

pub type ObservatoryResult<T> = Result<T, ObservatoryError>;
