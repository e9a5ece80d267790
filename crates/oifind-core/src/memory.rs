//! An in-process [`Backend`] over a borrowed [`Dataset`].
//!
//! Evaluates statements structurally instead of through SQL, with the same
//! semantics the SQL stores give them: participation rows are inner-joined
//! with their contest (a record whose contest is missing never matches), and
//! comparisons against `NULL` are false.

use std::{collections::HashMap, convert::Infallible};

use crate::{
  backend::Backend,
  model::{Contest, Dataset, Identity, ParticipationRecord, sort_by_score},
  predicate::{Column, Columns, Predicate},
  statement::{IDENTITY_ID_COLUMN, PARTICIPANT_ID_COLUMN, Statement},
  value::{ResultSet, Value},
};

pub struct MemoryBackend<'a> {
  dataset:        &'a Dataset,
  contests:       HashMap<i64, &'a Contest>,
  max_parameters: Option<usize>,
}

impl<'a> MemoryBackend<'a> {
  pub fn new(dataset: &'a Dataset) -> Self {
    let contests = dataset.contests.iter().map(|c| (c.id, c)).collect();
    Self { dataset, contests, max_parameters: None }
  }

  /// Pretend to cap bound parameters, to exercise chunked enumeration.
  pub fn with_max_parameters(mut self, max: usize) -> Self {
    self.max_parameters = Some(max);
    self
  }

  fn identities(&self, predicate: &Predicate) -> impl Iterator<Item = &'a Identity> {
    let predicate = predicate.clone();
    self.dataset.identities.iter().filter(move |i| predicate.matches(*i))
  }

  fn participants(&self, predicate: &Predicate) -> Vec<i64> {
    let mut ids: Vec<i64> = self
      .dataset
      .records
      .iter()
      .filter_map(|record| {
        let contest = self.contests.get(&record.contest_id)?;
        predicate
          .matches(&Joined { record, contest })
          .then_some(record.oier_uid)
      })
      .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
  }

  fn run(&self, statement: &Statement) -> ResultSet {
    match statement {
      Statement::IdentityIds(p) => id_column(
        IDENTITY_ID_COLUMN,
        self.identities(p).map(|i| i.uid).collect(),
      ),
      Statement::Participants(p) => id_column(PARTICIPANT_ID_COLUMN, self.participants(p)),
      Statement::Identities(p) => {
        let mut matched: Vec<Identity> = self.identities(p).cloned().collect();
        sort_by_score(&mut matched);
        let mut set =
          ResultSet::new(Identity::COLUMNS.iter().map(ToString::to_string).collect());
        set.rows = matched.iter().map(Identity::to_row).collect();
        set
      }
    }
  }
}

fn id_column(name: &str, ids: Vec<i64>) -> ResultSet {
  let mut set = ResultSet::new(vec![name.to_owned()]);
  set.rows = ids.into_iter().map(|id| vec![Value::Integer(id)]).collect();
  set
}

impl Backend for MemoryBackend<'_> {
  type Error = Infallible;

  async fn execute(&self, statement: &Statement) -> Result<ResultSet, Infallible> {
    Ok(self.run(statement))
  }

  fn max_parameters(&self) -> Option<usize> { self.max_parameters }
}

// ─── Row views ───────────────────────────────────────────────────────────────

impl Columns for Identity {
  fn column(&self, column: Column) -> Value {
    match column {
      Column::IdentityUid => self.uid.into(),
      Column::IdentityName => self.name.as_str().into(),
      Column::IdentityEnrollment => self.enroll_middle.into(),
      Column::IdentityGender => self.gender.code().into(),
      Column::IdentityScore => self.oierdb_score.into(),
      _ => Value::Null,
    }
  }
}

/// A participation record joined with its contest.
struct Joined<'a> {
  record:  &'a ParticipationRecord,
  contest: &'a Contest,
}

impl Columns for Joined<'_> {
  fn column(&self, column: Column) -> Value {
    match column {
      Column::ContestYear => self.contest.year.into(),
      Column::ContestType => self.contest.kind.as_str().into(),
      Column::ContestFallSemester => Value::Integer(self.contest.fall_semester.into()),
      Column::RecordContest => self.record.contest_id.into(),
      Column::RecordSchool => self.record.school_id.into(),
      Column::RecordScore => self.record.score.into(),
      Column::RecordRank => self.record.rank.into(),
      Column::RecordProvince => self.record.province.clone().into(),
      Column::RecordLevel => self.record.level.clone().into(),
      Column::RecordIdentity => self.record.oier_uid.into(),
      _ => Value::Null,
    }
  }
}
