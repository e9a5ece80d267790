//! [`Finder`]: one top-level query, end to end.
//!
//! bootstrap identity filter → candidate tracker over constraint groups →
//! result assembler. A `Finder` is an immutable value holding only tuning
//! knobs; all per-query state lives on the stack of [`Finder::find`], so a
//! single instance can serve concurrent callers.

use std::time::Duration;

use chrono::Datelike as _;
use serde::Serialize;

use crate::{
  Result,
  assemble::assemble,
  backend::{Backend, execute_with_timeout},
  compile::compile_bootstrap,
  filter::FilterSpec,
  model::Identity,
  statement::{IDENTITY_ID_COLUMN, Statement},
  tracker::{CandidateState, DEFAULT_THRESHOLD, Step, Tracker},
};

/// Default per-call deadline.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct Finder {
  threshold:    usize,
  call_timeout: Duration,
  /// Calendar year used for grade conversion; `None` means "today".
  current_year: Option<i64>,
}

/// The outcome of one query.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
  pub identities: Vec<Identity>,
  pub steps:      Vec<Step>,
}

impl Report {
  /// Total backend calls issued for this query.
  pub fn calls(&self) -> usize { self.steps.iter().map(Step::calls).sum() }
}

impl Default for Finder {
  fn default() -> Self {
    Self {
      threshold:    DEFAULT_THRESHOLD,
      call_timeout: DEFAULT_CALL_TIMEOUT,
      current_year: None,
    }
  }
}

impl Finder {
  pub fn new() -> Self { Self::default() }

  /// Known sets smaller than `threshold` are inlined into later queries.
  /// `0` never inlines; `usize::MAX` always inlines once a set is known.
  pub fn with_threshold(mut self, threshold: usize) -> Self {
    self.threshold = threshold;
    self
  }

  pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
    self.call_timeout = timeout;
    self
  }

  pub fn with_current_year(mut self, year: i64) -> Self {
    self.current_year = Some(year);
    self
  }

  pub fn threshold(&self) -> usize { self.threshold }

  fn year(&self) -> i64 {
    self
      .current_year
      .unwrap_or_else(|| i64::from(chrono::Local::now().year()))
  }

  /// Run `spec` against `backend`.
  ///
  /// Any backend failure aborts the whole query; nothing is retried.
  pub async fn find<B: Backend>(&self, backend: &B, spec: &FilterSpec) -> Result<Report> {
    let mut steps = Vec::new();

    let initial = match compile_bootstrap(spec, self.year()) {
      None => CandidateState::Unbounded,
      Some(p) if p.is_unsatisfiable() => {
        steps.push(Step::Bootstrap { calls: 0, rows: 0, candidates: 0 });
        CandidateState::Empty
      }
      Some(p) => {
        let set =
          execute_with_timeout(backend, &Statement::IdentityIds(p), self.call_timeout)
            .await?;
        let state = CandidateState::from_ids(set.id_set(IDENTITY_ID_COLUMN)?);
        let candidates = state.len().unwrap_or_default();
        tracing::debug!(candidates, "bootstrap filter applied");
        steps.push(Step::Bootstrap { calls: 1, rows: set.len(), candidates });
        state
      }
    };

    let mut tracker = Tracker::new(backend, self.threshold, self.call_timeout, initial);
    tracker.run(spec.groups()).await?;
    let (state, group_steps) = tracker.into_parts();
    steps.extend(group_steps);

    let (mut identities, fetch) = assemble(backend, &state, self.call_timeout).await?;
    steps.extend(fetch);

    if let Some(limit) = spec.limit {
      identities.truncate(limit);
    }

    let report = Report { identities, steps };
    tracing::info!(
      results = report.identities.len(),
      calls = report.calls(),
      groups = spec.groups().len(),
      "query finished"
    );
    Ok(report)
  }
}
