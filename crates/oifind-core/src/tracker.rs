//! Candidate-set tracker: sequential narrowing across constraint groups.
//!
//! The tracker holds a [`CandidateState`] and folds constraint groups into it
//! one at a time. For each group it picks a strategy:
//!
//! - **Unscoped**: run the group's predicate against the whole store and
//!   intersect afterwards. Used while the state is `Unbounded`, or when the
//!   known set is at least `threshold` ids.
//! - **Enumerated**: additionally restrict `r.oier_uid` to the known set,
//!   inlined as bound parameters (split into chunks when the backend caps the
//!   parameter count).
//! - **Skipped**: the predicate is unsatisfiable; no backend call is made.
//!
//! The strategy changes cost only. Because the result is always intersected
//! with the current state, the final set is the same for any threshold.

use std::{collections::BTreeSet, time::Duration};

use serde::Serialize;

use crate::{
  Result,
  backend::{Backend, execute_with_timeout},
  compile::compile_group,
  filter::ConstraintGroup,
  predicate::{Column, Condition},
  statement::{PARTICIPANT_ID_COLUMN, Statement},
  value::Value,
};

/// Known sets smaller than this are inlined into the next group's query.
pub const DEFAULT_THRESHOLD: usize = 20;

// ─── CandidateState ──────────────────────────────────────────────────────────

/// What is known about the matching identities so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateState {
  /// No narrowing has happened yet. Not the same as `Empty`.
  Unbounded,
  /// A concrete, non-empty set of identity ids.
  Known(BTreeSet<i64>),
  /// Nothing can match; remaining groups are skipped.
  Empty,
}

impl CandidateState {
  /// Build from a matched id set, normalising the empty set to `Empty`.
  pub fn from_ids(ids: BTreeSet<i64>) -> Self {
    if ids.is_empty() { Self::Empty } else { Self::Known(ids) }
  }

  /// `Unbounded ∩ X = X`, `Empty ∩ X = Empty`, `Known(a) ∩ X = a ∩ X`.
  pub fn intersect(self, matched: BTreeSet<i64>) -> Self {
    match self {
      Self::Unbounded => Self::from_ids(matched),
      Self::Empty => Self::Empty,
      Self::Known(mut ids) => {
        ids.retain(|id| matched.contains(id));
        Self::from_ids(ids)
      }
    }
  }

  pub fn is_empty(&self) -> bool { matches!(self, Self::Empty) }

  /// Number of known candidates; `None` while unbounded.
  pub fn len(&self) -> Option<usize> {
    match self {
      Self::Unbounded => None,
      Self::Known(ids) => Some(ids.len()),
      Self::Empty => Some(0),
    }
  }

  /// The set to inline into the next query, if enumeration applies.
  pub fn enumerable(&self, threshold: usize) -> Option<&BTreeSet<i64>> {
    match self {
      Self::Known(ids) if ids.len() < threshold => Some(ids),
      _ => None,
    }
  }
}

// ─── Steps ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
  Unscoped,
  Enumerated,
  Skipped,
}

/// One stage of a query, as executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
  Bootstrap {
    calls:      usize,
    rows:       usize,
    candidates: usize,
  },
  Group {
    index:      usize,
    strategy:   Strategy,
    calls:      usize,
    rows:       usize,
    candidates: usize,
  },
  Fetch {
    calls: usize,
    rows:  usize,
  },
}

impl Step {
  pub fn calls(&self) -> usize {
    match self {
      Self::Bootstrap { calls, .. }
      | Self::Group { calls, .. }
      | Self::Fetch { calls, .. } => *calls,
    }
  }
}

// ─── Chunking ────────────────────────────────────────────────────────────────

/// Split `ids` so that each chunk plus `reserved` parameters fits `max`.
///
/// Returns `None` when `reserved` alone leaves no room.
pub(crate) fn chunk_ids(
  ids: &BTreeSet<i64>,
  reserved: usize,
  max: Option<usize>,
) -> Option<Vec<Vec<Value>>> {
  let all: Vec<Value> = ids.iter().copied().map(Value::Integer).collect();
  let Some(max) = max else {
    return Some(vec![all]);
  };
  let room = max.checked_sub(reserved).filter(|r| *r > 0)?;
  Some(all.chunks(room).map(<[Value]>::to_vec).collect())
}

// ─── Tracker ─────────────────────────────────────────────────────────────────

pub struct Tracker<'b, B> {
  backend:   &'b B,
  threshold: usize,
  timeout:   Duration,
  state:     CandidateState,
  steps:     Vec<Step>,
}

impl<'b, B: Backend> Tracker<'b, B> {
  pub fn new(
    backend: &'b B,
    threshold: usize,
    timeout: Duration,
    initial: CandidateState,
  ) -> Self {
    Self { backend, threshold, timeout, state: initial, steps: Vec::new() }
  }

  pub fn state(&self) -> &CandidateState { &self.state }

  pub fn into_parts(self) -> (CandidateState, Vec<Step>) { (self.state, self.steps) }

  /// Fold every group in order, stopping as soon as the state is `Empty`.
  pub async fn run(&mut self, groups: &[ConstraintGroup]) -> Result<()> {
    for (index, group) in groups.iter().enumerate() {
      if self.state.is_empty() {
        tracing::debug!(index, "candidate set empty; skipping remaining groups");
        break;
      }
      self.apply(index, group).await?;
    }
    Ok(())
  }

  /// Apply one constraint group to the current state.
  pub async fn apply(&mut self, index: usize, group: &ConstraintGroup) -> Result<()> {
    let predicate = compile_group(group);

    if predicate.is_unsatisfiable() {
      tracing::debug!(index, "group can never match; no backend call");
      self.state = CandidateState::Empty;
      self.steps.push(Step::Group {
        index,
        strategy: Strategy::Skipped,
        calls: 0,
        rows: 0,
        candidates: 0,
      });
      return Ok(());
    }

    let chunks = self.state.enumerable(self.threshold).and_then(|ids| {
      chunk_ids(ids, predicate.parameter_count(), self.backend.max_parameters())
    });

    let (strategy, statements) = match chunks {
      Some(chunks) => {
        let statements = chunks
          .into_iter()
          .map(|chunk| {
            Statement::Participants(
              predicate
                .clone()
                .and(Condition::In(Column::RecordIdentity, chunk)),
            )
          })
          .collect::<Vec<_>>();
        (Strategy::Enumerated, statements)
      }
      None => (Strategy::Unscoped, vec![Statement::Participants(predicate)]),
    };

    let mut matched = BTreeSet::new();
    let mut rows = 0;
    for statement in &statements {
      let set = execute_with_timeout(self.backend, statement, self.timeout).await?;
      rows += set.len();
      matched.extend(set.id_set(PARTICIPANT_ID_COLUMN)?);
    }

    let state = std::mem::replace(&mut self.state, CandidateState::Unbounded);
    self.state = state.intersect(matched);
    let candidates = self.state.len().unwrap_or_default();

    tracing::debug!(
      index,
      ?strategy,
      calls = statements.len(),
      rows,
      candidates,
      "applied constraint group"
    );
    self.steps.push(Step::Group {
      index,
      strategy,
      calls: statements.len(),
      rows,
      candidates,
    });
    Ok(())
  }
}
