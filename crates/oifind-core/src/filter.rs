//! The validated form of one user query.
//!
//! Every upstream producer (UI forms, legacy converters, hand-written files)
//! converges on one mapping shape:
//!
//! ```yaml
//! enroll_year_range: [2019, null]   # optional, identity level
//! grade_range: [9, 12]              # optional, identity level
//! gender: [female]                  # optional, identity level
//! names: [张三]                     # optional, identity level
//! min_oierdb_score: 100             # optional, identity level
//! limit: 50                         # optional
//! records:                          # optional, ordered constraint groups
//!   - contest_type: [NOI]
//!     province: [北京]
//!     level_range: [金牌, 银牌]
//!     year_range: [2020, 2023]
//!     score_range: [null, 300]
//!     rank_range: [1, 50]
//!     contest_ids: [12, 13]
//!     school_ids: [301]
//!     fall_semester: true
//! ```
//!
//! Plural spellings (`provinces`, `contest_types`, `levels`, `names`,
//! `school_ids`, `contest_ids`) are accepted alongside the singular ones.
//!
//! Parsing goes through [`serde_json::Value`] by hand rather than derived
//! `Deserialize` so that every rejection can name the offending field path.

use std::path::Path;

use serde_json::{Map, Value as Json};

use crate::{Error, Result, model::Gender};

// ─── Range ───────────────────────────────────────────────────────────────────

/// An inclusive range; a `None` bound is unbounded on that side.
///
/// Parsing never produces a range with both bounds `None`; such input is
/// treated as the field being absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range<T> {
  pub min: Option<T>,
  pub max: Option<T>,
}

impl<T> Range<T> {
  pub fn new(min: Option<T>, max: Option<T>) -> Self { Self { min, max } }
}

// ─── ConstraintGroup ─────────────────────────────────────────────────────────

/// One set of per-participation predicates, combined conjunctively.
///
/// Membership fields distinguish `None` (unconstrained) from `Some(vec![])`
/// (an explicit empty set, which matches no rows).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintGroup {
  pub year_range:    Option<Range<i64>>,
  pub score_range:   Option<Range<f64>>,
  pub rank_range:    Option<Range<i64>>,
  pub province:      Option<Vec<String>>,
  pub award_level:   Option<Vec<String>>,
  pub contest_type:  Option<Vec<String>>,
  pub contest_id:    Option<Vec<i64>>,
  /// School the entry was registered under.
  pub school_id:     Option<Vec<i64>>,
  pub fall_semester: Option<bool>,
}

// ─── FilterSpec ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
  pub enroll_year_range: Option<Range<i64>>,
  /// School grade (7 = first year of middle school), converted to an
  /// enrollment window against the current calendar year.
  pub grade_range:       Option<Range<i64>>,
  pub gender:            Option<Vec<Gender>>,
  /// Exact display names.
  pub name:              Option<Vec<String>>,
  /// Lower bound on the aggregate score; identities without one never match.
  pub min_oierdb_score:  Option<f64>,
  /// `None` when the key is absent; `Some(vec![])` when given but empty.
  pub records:           Option<Vec<ConstraintGroup>>,
  pub limit:             Option<usize>,
}

/// Supported on-disk encodings of a filter mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
  Json,
  Yaml,
  Toml,
}

impl Format {
  /// Guess from a file extension; YAML is the legacy default.
  pub fn from_path(path: &Path) -> Self {
    match path.extension().and_then(|e| e.to_str()) {
      Some("json") => Self::Json,
      Some("toml") => Self::Toml,
      _ => Self::Yaml,
    }
  }
}

impl FilterSpec {
  /// Whether any identity-level (bootstrap) filter is present.
  pub fn has_bootstrap(&self) -> bool {
    self.enroll_year_range.is_some()
      || self.grade_range.is_some()
      || self.gender.is_some()
      || self.name.is_some()
      || self.min_oierdb_score.is_some()
  }

  pub fn groups(&self) -> &[ConstraintGroup] {
    self.records.as_deref().unwrap_or_default()
  }

  pub fn parse(text: &str, format: Format) -> Result<Self> {
    let value: Json = match format {
      Format::Json => serde_json::from_str(text)
        .map_err(|e| Error::Source(format!("json: {e}")))?,
      Format::Yaml => serde_yaml::from_str(text)
        .map_err(|e| Error::Source(format!("yaml: {e}")))?,
      Format::Toml => {
        let table: toml::Table = toml::from_str(text)
          .map_err(|e| Error::Source(format!("toml: {e}")))?;
        serde_json::to_value(table)
          .map_err(|e| Error::Source(format!("toml: {e}")))?
      }
    };
    Self::from_value(&value)
  }

  pub fn load(path: &Path) -> Result<Self> {
    let text = std::fs::read_to_string(path)
      .map_err(|e| Error::Source(format!("{}: {e}", path.display())))?;
    Self::parse(&text, Format::from_path(path))
  }

  /// Validate a raw mapping.
  pub fn from_value(value: &Json) -> Result<Self> {
    let map = expect_mapping(value, "$")?;
    let mut spec = Self::default();

    for (key, v) in map {
      match key.as_str() {
        "enroll_year_range" => spec.enroll_year_range = int_range(v, key)?,
        "grade_range" => spec.grade_range = int_range(v, key)?,
        "gender" => spec.gender = genders(v, key)?,
        "name" | "names" => spec.name = strings(v, key)?,
        "min_oierdb_score" => spec.min_oierdb_score = number(v, key)?,
        "limit" => spec.limit = limit(v, key)?,
        "records" => spec.records = groups(v, key)?,
        other => return Err(Error::config(other, "unknown field")),
      }
    }

    Ok(spec)
  }
}

impl std::str::FromStr for FilterSpec {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::parse(s, Format::Json) }
}

// ─── Field parsers ───────────────────────────────────────────────────────────

fn describe(v: &Json) -> &'static str {
  match v {
    Json::Null => "null",
    Json::Bool(_) => "a boolean",
    Json::Number(_) => "a number",
    Json::String(_) => "a string",
    Json::Array(_) => "a list",
    Json::Object(_) => "a mapping",
  }
}

fn expect_mapping<'a>(v: &'a Json, path: &str) -> Result<&'a Map<String, Json>> {
  v.as_object().ok_or_else(|| {
    Error::config(path, format!("expected a mapping, found {}", describe(v)))
  })
}

fn groups(v: &Json, path: &str) -> Result<Option<Vec<ConstraintGroup>>> {
  let items = match v {
    Json::Null => return Ok(None),
    Json::Array(items) => items,
    other => {
      return Err(Error::config(
        path,
        format!("expected a list of mappings, found {}", describe(other)),
      ));
    }
  };

  items
    .iter()
    .enumerate()
    .map(|(i, item)| group(item, &format!("{path}[{i}]")))
    .collect::<Result<Vec<_>>>()
    .map(Some)
}

fn group(v: &Json, path: &str) -> Result<ConstraintGroup> {
  let map = expect_mapping(v, path)?;
  let mut g = ConstraintGroup::default();

  for (key, v) in map {
    let field = format!("{path}.{key}");
    match key.as_str() {
      "year_range" => g.year_range = int_range(v, &field)?,
      "score_range" => g.score_range = real_range(v, &field)?,
      "rank_range" => g.rank_range = int_range(v, &field)?,
      "province" | "provinces" => g.province = strings(v, &field)?,
      "level_range" | "award_level" | "levels" => {
        g.award_level = strings(v, &field)?
      }
      "contest_type" | "contest_types" => g.contest_type = strings(v, &field)?,
      "contest_id" | "contest_ids" => g.contest_id = ids(v, &field)?,
      "school_id" | "school_ids" => g.school_id = ids(v, &field)?,
      "fall_semester" => g.fall_semester = flag(v, &field)?,
      _ => return Err(Error::config(field, "unknown field")),
    }
  }

  Ok(g)
}

fn bounds<'a>(v: &'a Json, path: &str) -> Result<Option<(&'a Json, &'a Json)>> {
  match v {
    Json::Null => Ok(None),
    Json::Array(items) if items.len() == 2 => Ok(Some((&items[0], &items[1]))),
    other => Err(Error::config(
      path,
      format!("expected a [min, max] pair, found {}", describe(other)),
    )),
  }
}

fn range_of<T>(
  v: &Json,
  path: &str,
  bound: impl Fn(&Json) -> Option<T>,
  expected: &str,
) -> Result<Option<Range<T>>> {
  let Some((lo, hi)) = bounds(v, path)? else {
    return Ok(None);
  };
  let side = |b: &Json| -> Result<Option<T>> {
    if b.is_null() {
      return Ok(None);
    }
    bound(b).map(Some).ok_or_else(|| {
      Error::config(path, format!("bound must be {expected} or null, found {}", describe(b)))
    })
  };
  let range = Range::new(side(lo)?, side(hi)?);
  Ok((range.min.is_some() || range.max.is_some()).then_some(range))
}

fn int_range(v: &Json, path: &str) -> Result<Option<Range<i64>>> {
  range_of(v, path, json_i64, "an integer")
}

fn real_range(v: &Json, path: &str) -> Result<Option<Range<f64>>> {
  range_of(v, path, Json::as_f64, "a number")
}

fn json_i64(v: &Json) -> Option<i64> {
  v.as_i64().or_else(|| {
    v.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)
  })
}

/// A membership set: one member, or a list of members.
///
/// `null` entries are dropped; a non-empty list of only `null`s is the legacy
/// spelling of "no filter" and yields `None`. A literal `[]` is kept as an
/// explicit empty set.
fn members<T: PartialEq>(
  v: &Json,
  path: &str,
  member: impl Fn(&Json) -> Option<T>,
  expected: &str,
) -> Result<Option<Vec<T>>> {
  let items: Vec<&Json> = match v {
    Json::Null => return Ok(None),
    Json::Array(items) => items.iter().collect(),
    Json::Object(_) | Json::Bool(_) => {
      return Err(Error::config(
        path,
        format!("expected {expected} or a list of them, found {}", describe(v)),
      ));
    }
    single => vec![single],
  };

  let mut out: Vec<T> = Vec::with_capacity(items.len());
  for &item in &items {
    if item.is_null() {
      continue;
    }
    let value = member(item).ok_or_else(|| {
      Error::config(
        path,
        format!("set members must be {expected}, found {}", describe(item)),
      )
    })?;
    if !out.contains(&value) {
      out.push(value);
    }
  }

  if out.is_empty() && !items.is_empty() {
    return Ok(None);
  }
  Ok(Some(out))
}

fn strings(v: &Json, path: &str) -> Result<Option<Vec<String>>> {
  members(v, path, |j| j.as_str().map(str::to_owned), "a string")
}

fn ids(v: &Json, path: &str) -> Result<Option<Vec<i64>>> {
  members(v, path, json_i64, "an integer")
}

/// A boolean, also spelled `0` / `1` as the stored column is.
fn flag(v: &Json, path: &str) -> Result<Option<bool>> {
  match v {
    Json::Null => Ok(None),
    Json::Bool(b) => Ok(Some(*b)),
    other => match json_i64(other) {
      Some(0) => Ok(Some(false)),
      Some(1) => Ok(Some(true)),
      _ => Err(Error::config(
        path,
        format!("expected a boolean, found {}", describe(other)),
      )),
    },
  }
}

fn number(v: &Json, path: &str) -> Result<Option<f64>> {
  match v {
    Json::Null => Ok(None),
    other => other.as_f64().map(Some).ok_or_else(|| {
      Error::config(path, format!("expected a number, found {}", describe(other)))
    }),
  }
}

fn genders(v: &Json, path: &str) -> Result<Option<Vec<Gender>>> {
  let items: Vec<&Json> = match v {
    Json::Null => return Ok(None),
    Json::Array(items) => items.iter().collect(),
    single => vec![single],
  };

  let mut out = Vec::with_capacity(items.len());
  for item in items {
    let gender = match item {
      Json::String(s) => Gender::from_label(s),
      other => json_i64(other).and_then(Gender::from_code),
    }
    .ok_or_else(|| Error::config(path, format!("unknown gender {item}")))?;
    if !out.contains(&gender) {
      out.push(gender);
    }
  }
  Ok(Some(out))
}

fn limit(v: &Json, path: &str) -> Result<Option<usize>> {
  match v {
    Json::Null => Ok(None),
    other => match json_i64(other) {
      Some(n) if n > 0 => Ok(Some(n as usize)),
      _ => Err(Error::config(path, "expected a positive integer")),
    },
  }
}
