//! Result assembler: turn the final candidate state into ordered identities.

use std::time::Duration;

use crate::{
  Error, Result,
  backend::{Backend, execute_with_timeout},
  model::{Identity, sort_by_score},
  predicate::{Column, Condition, Predicate},
  statement::Statement,
  tracker::{CandidateState, Step, chunk_ids},
};

/// Fetch the identities described by `state`.
///
/// - `Unbounded`: every identity (the "browse all" default).
/// - `Known(ids)`: exactly those identities, fetched in as many chunks as the
///   backend's parameter cap requires, then merged.
/// - `Empty`: nothing, and no backend call.
///
/// A backend whose parameter cap is zero cannot fetch a known set; that is an
/// execution error.
///
/// The result is ordered by aggregate score descending, then uid.
pub async fn assemble<B: Backend>(
  backend: &B,
  state: &CandidateState,
  timeout: Duration,
) -> Result<(Vec<Identity>, Option<Step>)> {
  let statements = match state {
    CandidateState::Empty => return Ok((Vec::new(), None)),
    CandidateState::Unbounded => vec![Statement::Identities(Predicate::always())],
    CandidateState::Known(ids) => chunk_ids(ids, 0, backend.max_parameters())
      .ok_or_else(|| Error::Execution("backend accepts no bound parameters".into()))?
      .into_iter()
      .map(|chunk| {
        Statement::Identities(
          Predicate::always().and(Condition::In(Column::IdentityUid, chunk)),
        )
      })
      .collect(),
  };

  let mut identities = Vec::new();
  for statement in &statements {
    let set = execute_with_timeout(backend, statement, timeout).await?;
    identities.extend(Identity::from_result_set(&set)?);
  }
  if statements.len() > 1 {
    sort_by_score(&mut identities);
  }

  let step = Step::Fetch { calls: statements.len(), rows: identities.len() };
  Ok((identities, Some(step)))
}
