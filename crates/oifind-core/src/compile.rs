//! Clause compiler: filter fields to [`Predicate`]s.
//!
//! Only fields that are present contribute conditions. A range contributes a
//! lower and/or upper comparison depending on which bounds are set; a
//! membership set contributes an `IN` test. An explicitly empty membership set
//! compiles to an `IN ()` that matches nothing, and that policy holds for every
//! backend because they all consume this one compiler.

use crate::{
  filter::{ConstraintGroup, FilterSpec, Range},
  predicate::{Column, Condition, Predicate},
  value::Value,
};

/// Grade `g` in calendar year `y` corresponds to entering middle school in
/// `y - g + 7`.
const GRADE_OFFSET: i64 = 7;

fn push_range<T: Copy + Into<Value>>(
  p: &mut Predicate,
  column: Column,
  range: Option<&Range<T>>,
) {
  let Some(range) = range else { return };
  if let Some(min) = range.min {
    p.push(Condition::AtLeast(column, min.into()));
  }
  if let Some(max) = range.max {
    p.push(Condition::AtMost(column, max.into()));
  }
}

fn push_set<T: Clone + Into<Value>>(p: &mut Predicate, column: Column, set: Option<&Vec<T>>) {
  if let Some(values) = set {
    p.push(Condition::In(column, values.iter().cloned().map(Into::into).collect()));
  }
}

/// Compile one constraint group over the `Record r JOIN Contest c` shape.
pub fn compile_group(group: &ConstraintGroup) -> Predicate {
  let mut p = Predicate::always();
  push_range(&mut p, Column::ContestYear, group.year_range.as_ref());
  push_range(&mut p, Column::RecordScore, group.score_range.as_ref());
  push_range(&mut p, Column::RecordRank, group.rank_range.as_ref());
  push_set(&mut p, Column::RecordProvince, group.province.as_ref());
  push_set(&mut p, Column::RecordLevel, group.award_level.as_ref());
  push_set(&mut p, Column::ContestType, group.contest_type.as_ref());
  push_set(&mut p, Column::RecordContest, group.contest_id.as_ref());
  push_set(&mut p, Column::RecordSchool, group.school_id.as_ref());
  if let Some(fall) = group.fall_semester {
    p.push(Condition::In(Column::ContestFallSemester, vec![Value::Integer(fall.into())]));
  }
  p
}

/// Convert a grade range to the equivalent enrollment-year range.
pub fn grade_to_enrollment(grades: &Range<i64>, current_year: i64) -> Range<i64> {
  Range {
    min: grades.max.map(|g| current_year - g + GRADE_OFFSET),
    max: grades.min.map(|g| current_year - g + GRADE_OFFSET),
  }
}

/// Compile the identity-level bootstrap filter, if the filter names one.
pub fn compile_bootstrap(spec: &FilterSpec, current_year: i64) -> Option<Predicate> {
  if !spec.has_bootstrap() {
    return None;
  }

  let mut p = Predicate::always();
  push_range(&mut p, Column::IdentityEnrollment, spec.enroll_year_range.as_ref());
  let by_grade = spec
    .grade_range
    .as_ref()
    .map(|g| grade_to_enrollment(g, current_year));
  push_range(&mut p, Column::IdentityEnrollment, by_grade.as_ref());
  if let Some(genders) = &spec.gender {
    p.push(Condition::In(
      Column::IdentityGender,
      genders.iter().map(|g| Value::Integer(g.code())).collect(),
    ));
  }
  push_set(&mut p, Column::IdentityName, spec.name.as_ref());
  if let Some(min) = spec.min_oierdb_score {
    p.push(Condition::AtLeast(Column::IdentityScore, Value::Real(min)));
  }
  Some(p)
}
