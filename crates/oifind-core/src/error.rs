//! Error types for `oifind-core`.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The filter mapping is malformed. Raised before any backend call.
  #[error("invalid filter at `{path}`: {message}")]
  Configuration { path: String, message: String },

  /// The backend failed to run a statement.
  #[error("backend execution failed: {0}")]
  Execution(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("backend call exceeded {0:?}")]
  Timeout(Duration),

  /// A backend returned rows that do not fit the expected projection.
  #[error("malformed row: {0}")]
  MalformedRow(String),

  #[error("could not read filter source: {0}")]
  Source(String),
}

/// Coarse classification surfaced to callers.
///
/// `Execution` errors must never be treated as "no match": an empty result
/// and a failed query are different answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Configuration,
  Execution,
}

impl Error {
  pub fn config(path: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Configuration { path: path.into(), message: message.into() }
  }

  pub fn execution<E>(source: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Execution(Box::new(source))
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Configuration { .. } | Self::Source(_) => ErrorKind::Configuration,
      Self::Execution(_) | Self::Timeout(_) | Self::MalformedRow(_) => {
        ErrorKind::Execution
      }
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
