//! Scalar values and row sets exchanged with backends.
//!
//! Every backend speaks the same minimal vocabulary: SQLite's four storage
//! classes, and a result set of named columns. Typed entities are projected
//! out of a [`ResultSet`] by column name (see [`crate::model`]).

use std::{cmp::Ordering, collections::BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Value ───────────────────────────────────────────────────────────────────

/// A single bound parameter or column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
  Null,
  Integer(i64),
  Real(f64),
  Text(String),
}

impl Value {
  pub fn is_null(&self) -> bool { matches!(self, Self::Null) }

  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Self::Integer(i) => Some(*i),
      Self::Real(r) if r.fract() == 0.0 => Some(*r as i64),
      _ => None,
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Self::Integer(i) => Some(*i as f64),
      Self::Real(r) => Some(*r),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Self::Text(s) => Some(s),
      _ => None,
    }
  }

  /// SQL comparison semantics: `NULL` compares to nothing, numbers compare
  /// across integer and real, text compares bytewise.
  pub fn compare(&self, other: &Self) -> Option<Ordering> {
    match (self, other) {
      (Self::Text(a), Self::Text(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
      (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
      (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
  }
}

impl From<i64> for Value {
  fn from(v: i64) -> Self { Self::Integer(v) }
}

impl From<f64> for Value {
  fn from(v: f64) -> Self { Self::Real(v) }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self { Self::Text(v.to_owned()) }
}

impl From<String> for Value {
  fn from(v: String) -> Self { Self::Text(v) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(v: Option<T>) -> Self { v.map_or(Self::Null, Into::into) }
}

// ─── ResultSet ───────────────────────────────────────────────────────────────

/// Ordered rows returned by [`crate::backend::Backend::execute`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
  pub columns: Vec<String>,
  pub rows:    Vec<Vec<Value>>,
}

impl ResultSet {
  pub fn new(columns: Vec<String>) -> Self { Self { columns, rows: Vec::new() } }

  pub fn len(&self) -> usize { self.rows.len() }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }

  pub fn column_index(&self, name: &str) -> Result<usize> {
    self
      .columns
      .iter()
      .position(|c| c == name)
      .ok_or_else(|| Error::MalformedRow(format!("missing column {name:?}")))
  }

  /// Collect the ids in one column; a null or non-integer cell is an error.
  pub fn id_set(&self, column: &str) -> Result<BTreeSet<i64>> {
    let idx = self.column_index(column)?;
    self
      .rows
      .iter()
      .map(|row| {
        row.get(idx).and_then(Value::as_i64).ok_or_else(|| {
          Error::MalformedRow(format!("column {column:?} is not an integer id"))
        })
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn compare_mixes_integer_and_real() {
    let a = Value::Integer(90);
    let b = Value::Real(89.5);
    assert_eq!(a.compare(&b), Some(Ordering::Greater));
    assert_eq!(Value::Null.compare(&a), None);
    assert_eq!(Value::from("x").compare(&a), None);
  }

  #[test]
  fn untagged_serde_matches_wire_scalars() {
    let values: Vec<Value> =
      serde_json::from_str(r#"[null, 3, 2.5, "北京"]"#).unwrap();
    assert_eq!(values, vec![
      Value::Null,
      Value::Integer(3),
      Value::Real(2.5),
      Value::Text("北京".into()),
    ]);
  }

  #[test]
  fn id_set_rejects_non_integer_ids() {
    let set = ResultSet {
      columns: vec!["uid".into()],
      rows:    vec![vec![Value::Text("a".into())]],
    };
    assert!(matches!(set.id_set("uid"), Err(Error::MalformedRow(_))));
    assert!(matches!(set.id_set("other"), Err(Error::MalformedRow(_))));
  }
}
