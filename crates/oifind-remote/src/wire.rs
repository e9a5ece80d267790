//! Request and response bodies of the raw query endpoint.
//!
//! The endpoint accepts `{ "sql", "params" }` and answers either with a bare
//! list of statement results or with the account-level envelope
//! `{ "success", "errors", "result": [...] }`. Both shapes are accepted.

use oifind_core::value::{ResultSet, Value};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
  pub sql:    String,
  #[serde(default)]
  pub params: Vec<Value>,
}

/// Rows in columnar form: one name list, then positional rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRows {
  #[serde(default)]
  pub columns: Vec<String>,
  #[serde(default)]
  pub rows:    Vec<Vec<Value>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
  #[serde(default)]
  pub rows_read:    u64,
  #[serde(default)]
  pub rows_written: u64,
  /// Server-side duration in milliseconds.
  #[serde(default)]
  pub duration:     f64,
}

/// The outcome of one statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
  pub success: bool,
  #[serde(default)]
  pub results: Option<RawRows>,
  #[serde(default)]
  pub meta:    Meta,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error:   Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub code:    Option<i64>,
  pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
  pub success: bool,
  #[serde(default)]
  pub errors:  Vec<Message>,
  #[serde(default)]
  pub result:  Vec<QueryResult>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Body {
  Envelope(Envelope),
  Bare(Vec<QueryResult>),
}

impl QueryResult {
  pub fn ok(rows: RawRows, meta: Meta) -> Self {
    Self { success: true, results: Some(rows), meta, error: None }
  }

  pub fn failed(message: impl Into<String>) -> Self {
    Self {
      success: false,
      results: None,
      meta:    Meta::default(),
      error:   Some(message.into()),
    }
  }
}

impl From<ResultSet> for RawRows {
  fn from(set: ResultSet) -> Self { Self { columns: set.columns, rows: set.rows } }
}

/// Decode a response body into the single statement result it must carry.
pub(crate) fn decode(body: &[u8]) -> Result<(ResultSet, Meta)> {
  let body: Body =
    serde_json::from_slice(body).map_err(|e| Error::Malformed(e.to_string()))?;

  let results = match body {
    Body::Envelope(env) if !env.success => {
      let messages: Vec<String> = env.errors.into_iter().map(|m| m.message).collect();
      return Err(Error::Rejected(messages.join("; ")));
    }
    Body::Envelope(env) => env.result,
    Body::Bare(results) => results,
  };

  let [result]: [QueryResult; 1] = results.try_into().map_err(|v: Vec<_>| {
    Error::Malformed(format!("expected one statement result, got {}", v.len()))
  })?;

  if !result.success {
    return Err(Error::Rejected(
      result.error.unwrap_or_else(|| "statement failed".to_owned()),
    ));
  }

  let rows = result.results.unwrap_or_default();
  if let Some(bad) = rows.rows.iter().find(|r| r.len() != rows.columns.len()) {
    return Err(Error::Malformed(format!(
      "row has {} cells for {} columns",
      bad.len(),
      rows.columns.len()
    )));
  }

  let set = ResultSet { columns: rows.columns, rows: rows.rows };
  Ok((set, result.meta))
}
