//! Conversions between engine [`Value`]s and SQLite values.

use oifind_core::value::Value;
use rusqlite::types::Value as SqlValue;

use crate::{Error, Result};

pub fn encode_value(v: &Value) -> SqlValue {
  match v {
    Value::Null => SqlValue::Null,
    Value::Integer(i) => SqlValue::Integer(*i),
    Value::Real(f) => SqlValue::Real(*f),
    Value::Text(s) => SqlValue::Text(s.clone()),
  }
}

pub fn decode_value(column: &str, v: SqlValue) -> Result<Value> {
  match v {
    SqlValue::Null => Ok(Value::Null),
    SqlValue::Integer(i) => Ok(Value::Integer(i)),
    SqlValue::Real(f) => Ok(Value::Real(f)),
    SqlValue::Text(s) => Ok(Value::Text(s)),
    SqlValue::Blob(b) => Err(Error::Decode {
      column:  column.to_owned(),
      message: format!("{}-byte blob", b.len()),
    }),
  }
}

pub fn encode_row(row: &[Value]) -> Vec<SqlValue> { row.iter().map(encode_value).collect() }

/// `INSERT OR REPLACE INTO <table> (<cols>) VALUES (?, …)`
pub fn insert_sql(table: &str, columns: &[&str]) -> String {
  format!(
    "INSERT OR REPLACE INTO {table} ({}) VALUES ({})",
    columns.join(", "),
    vec!["?"; columns.len()].join(", ")
  )
}
