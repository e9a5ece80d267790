//! Typed conjunctive predicates and their SQL rendering.
//!
//! A [`Predicate`] is a conjunction of [`Condition`]s over a closed set of
//! [`Column`]s. SQL backends render it with [`Predicate::to_sql`], which never
//! interpolates values: every literal becomes a `?` placeholder with a bound
//! parameter. The in-memory backend evaluates the same structure directly.

use std::cmp::Ordering;

use crate::value::Value;

// ─── Column ──────────────────────────────────────────────────────────────────

/// Every column a predicate may reference.
///
/// Participation columns assume the `Record r JOIN Contest c` shape; identity
/// columns assume a bare `OIer` scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
  ContestYear,
  ContestType,
  ContestFallSemester,
  RecordContest,
  RecordSchool,
  RecordScore,
  RecordRank,
  RecordProvince,
  RecordLevel,
  RecordIdentity,
  IdentityUid,
  IdentityName,
  IdentityEnrollment,
  IdentityGender,
  IdentityScore,
}

impl Column {
  pub fn sql(self) -> &'static str {
    match self {
      Self::ContestYear => "c.year",
      Self::ContestType => "c.type",
      Self::ContestFallSemester => "c.fall_semester",
      Self::RecordContest => "r.contest_id",
      Self::RecordSchool => "r.school_id",
      Self::RecordScore => "r.score",
      Self::RecordRank => "r.rank",
      Self::RecordProvince => "r.province",
      Self::RecordLevel => "r.level",
      Self::RecordIdentity => "r.oier_uid",
      Self::IdentityUid => "uid",
      Self::IdentityName => "name",
      Self::IdentityEnrollment => "enroll_middle",
      Self::IdentityGender => "gender",
      Self::IdentityScore => "oierdb_score",
    }
  }
}

/// Anything a predicate can be evaluated against.
pub trait Columns {
  /// The value of `column`, or `Null` when the row has no such column.
  fn column(&self, column: Column) -> Value;
}

// ─── Condition ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
  /// `column >= value`
  AtLeast(Column, Value),
  /// `column <= value`
  AtMost(Column, Value),
  /// `column IN (values…)`; an empty list matches nothing.
  In(Column, Vec<Value>),
  /// Matches nothing.
  Never,
}

impl Condition {
  pub fn is_unsatisfiable(&self) -> bool {
    match self {
      Self::Never => true,
      Self::In(_, values) => values.is_empty(),
      _ => false,
    }
  }

  fn parameter_count(&self) -> usize {
    match self {
      Self::AtLeast(..) | Self::AtMost(..) => 1,
      Self::In(_, values) => values.len(),
      Self::Never => 0,
    }
  }

  fn render(&self, out: &mut String, params: &mut Vec<Value>) {
    match self {
      Self::AtLeast(col, v) => {
        out.push_str(col.sql());
        out.push_str(" >= ?");
        params.push(v.clone());
      }
      Self::AtMost(col, v) => {
        out.push_str(col.sql());
        out.push_str(" <= ?");
        params.push(v.clone());
      }
      Self::In(_, values) if values.is_empty() => out.push_str("1 = 0"),
      Self::In(col, values) => {
        out.push_str(col.sql());
        out.push_str(" IN (");
        out.push_str(&placeholders(values.len()));
        out.push(')');
        params.extend(values.iter().cloned());
      }
      Self::Never => out.push_str("1 = 0"),
    }
  }

  fn matches(&self, row: &impl Columns) -> bool {
    match self {
      Self::AtLeast(col, bound) => matches!(
        row.column(*col).compare(bound),
        Some(Ordering::Greater | Ordering::Equal)
      ),
      Self::AtMost(col, bound) => matches!(
        row.column(*col).compare(bound),
        Some(Ordering::Less | Ordering::Equal)
      ),
      Self::In(col, values) => {
        let v = row.column(*col);
        values.iter().any(|x| v.compare(x) == Some(Ordering::Equal))
      }
      Self::Never => false,
    }
  }
}

// ─── Predicate ───────────────────────────────────────────────────────────────

/// A conjunction of conditions. The empty conjunction is the tautology.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
  conditions: Vec<Condition>,
}

/// A rendered `WHERE` body and its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
  pub template: String,
  pub params:   Vec<Value>,
}

impl Predicate {
  pub fn always() -> Self { Self::default() }

  pub fn and(mut self, condition: Condition) -> Self {
    self.conditions.push(condition);
    self
  }

  pub fn push(&mut self, condition: Condition) { self.conditions.push(condition); }

  pub fn conditions(&self) -> &[Condition] { &self.conditions }

  pub fn is_tautology(&self) -> bool { self.conditions.is_empty() }

  /// True when some condition can never hold, so the whole conjunction is
  /// empty regardless of data.
  pub fn is_unsatisfiable(&self) -> bool {
    self.conditions.iter().any(Condition::is_unsatisfiable)
  }

  pub fn parameter_count(&self) -> usize {
    self.conditions.iter().map(Condition::parameter_count).sum()
  }

  pub fn matches(&self, row: &impl Columns) -> bool {
    self.conditions.iter().all(|c| c.matches(row))
  }

  pub fn to_sql(&self) -> SqlFragment {
    if self.conditions.is_empty() {
      return SqlFragment { template: "1 = 1".to_owned(), params: Vec::new() };
    }
    let mut template = String::new();
    let mut params = Vec::with_capacity(self.parameter_count());
    for (i, condition) in self.conditions.iter().enumerate() {
      if i > 0 {
        template.push_str(" AND ");
      }
      condition.render(&mut template, &mut params);
    }
    SqlFragment { template, params }
  }
}

fn placeholders(n: usize) -> String { vec!["?"; n].join(", ") }
