//! Entity types of the competition dataset and their typed row projections.
//!
//! The dataset is built by an external pipeline and is read-only here. Each
//! entity knows its storage column list and how to project itself out of a
//! [`ResultSet`] row, so nothing downstream relies on runtime field lookup.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  value::{ResultSet, Value},
};

// ─── Gender ──────────────────────────────────────────────────────────────────

/// Stored as `0` / `1` / `-1` in the `gender` column.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
  #[default]
  Unknown,
  Male,
  Female,
}

impl Gender {
  pub fn code(self) -> i64 {
    match self {
      Self::Unknown => 0,
      Self::Male => 1,
      Self::Female => -1,
    }
  }

  pub fn from_code(code: i64) -> Option<Self> {
    match code {
      0 => Some(Self::Unknown),
      1 => Some(Self::Male),
      -1 => Some(Self::Female),
      _ => None,
    }
  }

  /// Accepts the English names and the labels used by the legacy tools.
  pub fn from_label(label: &str) -> Option<Self> {
    match label.trim() {
      "unknown" | "其他" => Some(Self::Unknown),
      "male" | "男" => Some(Self::Male),
      "female" | "女" => Some(Self::Female),
      _ => None,
    }
  }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// A de-duplicated competitor (`OIer` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
  pub uid:           i64,
  pub name:          String,
  /// Alternate identifier (pinyin initials in the source data).
  pub initials:      Option<String>,
  #[serde(default)]
  pub gender:        Gender,
  /// Nominal year of entering middle school.
  pub enroll_middle: Option<i64>,
  pub oierdb_score:  Option<f64>,
  pub ccf_score:     Option<f64>,
  pub ccf_level:     Option<i64>,
}

impl Identity {
  pub const COLUMNS: [&'static str; 8] = [
    "uid",
    "initials",
    "name",
    "gender",
    "enroll_middle",
    "oierdb_score",
    "ccf_score",
    "ccf_level",
  ];

  pub fn to_row(&self) -> Vec<Value> {
    vec![
      Value::Integer(self.uid),
      self.initials.clone().into(),
      self.name.clone().into(),
      Value::Integer(self.gender.code()),
      self.enroll_middle.into(),
      self.oierdb_score.into(),
      self.ccf_score.into(),
      self.ccf_level.into(),
    ]
  }

  /// Project every row of `set` into an [`Identity`], preserving row order.
  pub fn from_result_set(set: &ResultSet) -> Result<Vec<Self>> {
    let idx: Vec<usize> = Self::COLUMNS
      .iter()
      .map(|c| set.column_index(c))
      .collect::<Result<_>>()?;

    set
      .rows
      .iter()
      .map(|row| {
        let col = |i: usize| row.get(idx[i]).unwrap_or(&Value::Null);
        let gender_code = opt_i64(col(3), "gender")?.unwrap_or(0);
        Ok(Self {
          uid:           req_i64(col(0), "uid")?,
          initials:      opt_text(col(1), "initials")?,
          name:          opt_text(col(2), "name")?.unwrap_or_default(),
          gender:        Gender::from_code(gender_code).ok_or_else(|| {
            Error::MalformedRow(format!("unknown gender code {gender_code}"))
          })?,
          enroll_middle: opt_i64(col(4), "enroll_middle")?,
          oierdb_score:  opt_f64(col(5), "oierdb_score")?,
          ccf_score:     opt_f64(col(6), "ccf_score")?,
          ccf_level:     opt_i64(col(7), "ccf_level")?,
        })
      })
      .collect()
  }
}

// ─── Contest ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contest {
  pub id:            i64,
  pub name:          String,
  /// Contest series tag, e.g. `"NOI"` or `"CSP提高"`.
  #[serde(rename = "type")]
  pub kind:          String,
  pub year:          i64,
  /// Whether the contest belongs to the autumn half of the school year.
  #[serde(default)]
  pub fall_semester: bool,
  pub full_score:    Option<i64>,
}

impl Contest {
  pub const COLUMNS: [&'static str; 6] =
    ["id", "name", "type", "year", "fall_semester", "full_score"];

  pub fn to_row(&self) -> Vec<Value> {
    vec![
      Value::Integer(self.id),
      self.name.clone().into(),
      self.kind.clone().into(),
      Value::Integer(self.year),
      Value::Integer(self.fall_semester.into()),
      self.full_score.into(),
    ]
  }
}

// ─── School ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
  pub id:       i64,
  pub name:     String,
  pub province: Option<String>,
  pub city:     Option<String>,
  pub score:    Option<f64>,
}

impl School {
  pub const COLUMNS: [&'static str; 5] =
    ["id", "name", "province", "city", "score"];

  pub fn to_row(&self) -> Vec<Value> {
    vec![
      Value::Integer(self.id),
      self.name.clone().into(),
      self.province.clone().into(),
      self.city.clone().into(),
      self.score.into(),
    ]
  }
}

// ─── ParticipationRecord ─────────────────────────────────────────────────────

/// One identity's result in one contest (`Record` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipationRecord {
  pub id:         i64,
  pub oier_uid:   i64,
  pub contest_id: i64,
  pub school_id:  Option<i64>,
  pub score:      Option<f64>,
  pub rank:       Option<i64>,
  /// Province the entry was registered under; may differ from the school's.
  pub province:   Option<String>,
  /// Award level label, e.g. `"金牌"` or `"一等奖"`.
  pub level:      Option<String>,
}

impl ParticipationRecord {
  pub const COLUMNS: [&'static str; 8] = [
    "id",
    "oier_uid",
    "contest_id",
    "school_id",
    "score",
    "rank",
    "province",
    "level",
  ];

  pub fn to_row(&self) -> Vec<Value> {
    vec![
      Value::Integer(self.id),
      Value::Integer(self.oier_uid),
      Value::Integer(self.contest_id),
      self.school_id.into(),
      self.score.into(),
      self.rank.into(),
      self.province.clone().into(),
      self.level.clone().into(),
    ]
  }
}

// ─── Dataset ─────────────────────────────────────────────────────────────────

/// An immutable snapshot of all four tables.
///
/// Constructed once by the loader and handed to backends by reference; the
/// engine never holds global lookup state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
  #[serde(default)]
  pub identities: Vec<Identity>,
  #[serde(default)]
  pub contests:   Vec<Contest>,
  #[serde(default)]
  pub schools:    Vec<School>,
  #[serde(default)]
  pub records:    Vec<ParticipationRecord>,
}

// ─── Ordering ────────────────────────────────────────────────────────────────

/// Sort by aggregate score descending (missing scores last), then by uid.
///
/// Matches `ORDER BY oierdb_score DESC, uid ASC` under SQLite's rule that
/// `NULL` sorts lowest.
pub fn sort_by_score(identities: &mut [Identity]) {
  identities.sort_by(|a, b| {
    let by_score = match (a.oierdb_score, b.oierdb_score) {
      (Some(x), Some(y)) => y.total_cmp(&x),
      (Some(_), None) => std::cmp::Ordering::Less,
      (None, Some(_)) => std::cmp::Ordering::Greater,
      (None, None) => std::cmp::Ordering::Equal,
    };
    by_score.then(a.uid.cmp(&b.uid))
  });
}

// ─── Cell decoding ───────────────────────────────────────────────────────────

fn req_i64(v: &Value, column: &str) -> Result<i64> {
  opt_i64(v, column)?
    .ok_or_else(|| Error::MalformedRow(format!("{column} must not be null")))
}

fn opt_i64(v: &Value, column: &str) -> Result<Option<i64>> {
  match v {
    Value::Null => Ok(None),
    other => other.as_i64().map(Some).ok_or_else(|| {
      Error::MalformedRow(format!("{column} is not an integer: {other:?}"))
    }),
  }
}

fn opt_f64(v: &Value, column: &str) -> Result<Option<f64>> {
  match v {
    Value::Null => Ok(None),
    other => other.as_f64().map(Some).ok_or_else(|| {
      Error::MalformedRow(format!("{column} is not numeric: {other:?}"))
    }),
  }
}

fn opt_text(v: &Value, column: &str) -> Result<Option<String>> {
  match v {
    Value::Null => Ok(None),
    Value::Text(s) => Ok(Some(s.clone())),
    other => {
      Err(Error::MalformedRow(format!("{column} is not text: {other:?}")))
    }
  }
}
