//! Error type for `oifind-remote`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] oifind_core::Error),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("remote returned {status}: {body}")]
  Status { status: u16, body: String },

  /// The endpoint answered but reported `success: false`.
  #[error("remote rejected the query: {0}")]
  Rejected(String),

  #[error("malformed response: {0}")]
  Malformed(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
