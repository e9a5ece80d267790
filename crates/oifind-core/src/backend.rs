//! The `Backend` trait: one way to run a [`Statement`] against a store.
//!
//! Implemented by the local SQLite store (`oifind-store-sqlite`), the remote
//! quota-governed store (`oifind-remote`), and the in-memory
//! [`crate::memory::MemoryBackend`]. The engine depends only on this trait.

use std::{future::Future, time::Duration};

use crate::{Error, Result, statement::Statement, value::ResultSet};

/// Abstraction over a read-only store of the competition dataset.
///
/// `execute` returns rows in the order the statement defines, never a null
/// result. A failure must be reported as an error, never as an empty set:
/// "no rows matched" and "the store could not answer" mean different things.
pub trait Backend: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn execute<'a>(
    &'a self,
    statement: &'a Statement,
  ) -> impl Future<Output = Result<ResultSet, Self::Error>> + Send + 'a;

  /// Upper bound on bound parameters per statement, if the store has one.
  fn max_parameters(&self) -> Option<usize> { None }
}

impl<B: Backend> Backend for &B {
  type Error = B::Error;

  fn execute<'a>(
    &'a self,
    statement: &'a Statement,
  ) -> impl Future<Output = Result<ResultSet, Self::Error>> + Send + 'a {
    (**self).execute(statement)
  }

  fn max_parameters(&self) -> Option<usize> { (**self).max_parameters() }
}

/// Run one statement under a deadline, mapping backend failures into
/// [`Error::Execution`] and an elapsed deadline into [`Error::Timeout`].
pub async fn execute_with_timeout<B: Backend>(
  backend: &B,
  statement: &Statement,
  timeout: Duration,
) -> Result<ResultSet> {
  match tokio::time::timeout(timeout, backend.execute(statement)).await {
    Ok(Ok(rows)) => Ok(rows),
    Ok(Err(e)) => {
      tracing::warn!(error = %e, "backend call failed");
      Err(Error::execution(e))
    }
    Err(_) => {
      tracing::warn!(?timeout, "backend call timed out");
      Err(Error::Timeout(timeout))
    }
  }
}
