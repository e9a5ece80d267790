//! Error type for `oifind-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] oifind_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A column held a value the engine cannot represent (e.g. a BLOB).
  #[error("unsupported value in column `{column}`: {message}")]
  Decode { column: String, message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
