//! [`SqliteStore`]: the local, quota-free [`Backend`].

use std::path::Path;

use oifind_core::{
  backend::Backend,
  model::{Contest, Dataset, Identity, ParticipationRecord, School},
  statement::{SqlStatement, Statement},
  value::{ResultSet, Value},
};
use rusqlite::types::Value as SqlValue;

use crate::{
  Result,
  encode::{decode_value, encode_row, encode_value, insert_sql},
  schema::SCHEMA,
};

/// Host-parameter cap of the bundled SQLite (`SQLITE_MAX_VARIABLE_NUMBER`).
pub const MAX_PARAMETERS: usize = 32_766;

// ─── Store ───────────────────────────────────────────────────────────────────

/// The competition dataset in a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Row counts per table, as reported by [`SqliteStore::counts`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
  pub identities: usize,
  pub contests:   usize,
  pub schools:    usize,
  pub records:    usize,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Load every table of `dataset` in one transaction. Existing rows with the
  /// same primary key are replaced.
  pub async fn insert_dataset(&self, dataset: &Dataset) -> Result<Counts> {
    let batches: Vec<(String, Vec<Vec<SqlValue>>)> = vec![
      (
        insert_sql("OIer", &Identity::COLUMNS),
        dataset.identities.iter().map(|i| encode_row(&i.to_row())).collect(),
      ),
      (
        insert_sql("Contest", &Contest::COLUMNS),
        dataset.contests.iter().map(|c| encode_row(&c.to_row())).collect(),
      ),
      (
        insert_sql("School", &School::COLUMNS),
        dataset.schools.iter().map(|s| encode_row(&s.to_row())).collect(),
      ),
      (
        insert_sql("Record", &ParticipationRecord::COLUMNS),
        dataset.records.iter().map(|r| encode_row(&r.to_row())).collect(),
      ),
    ];

    let counts = Counts {
      identities: dataset.identities.len(),
      contests:   dataset.contests.len(),
      schools:    dataset.schools.len(),
      records:    dataset.records.len(),
    };

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for (sql, rows) in &batches {
          let mut stmt = tx.prepare(sql)?;
          for row in rows {
            stmt.execute(rusqlite::params_from_iter(row.iter()))?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::info!(?counts, "dataset loaded");
    Ok(counts)
  }

  /// Number of rows in each table.
  pub async fn counts(&self) -> Result<Counts> {
    let counts = self
      .conn
      .call(|conn| {
        let count = |table: &str| -> rusqlite::Result<usize> {
          conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| {
            r.get::<_, i64>(0)
          })
          .map(|n| n as usize)
        };
        Ok(Counts {
          identities: count("OIer")?,
          contests:   count("Contest")?,
          schools:    count("School")?,
          records:    count("Record")?,
        })
      })
      .await?;
    Ok(counts)
  }

  /// Run one SQL statement with positional parameters and collect its rows.
  ///
  /// Exposed so that raw-query endpoints (and their test doubles) can sit in
  /// front of a local store.
  pub async fn execute_sql(
    &self,
    sql: impl Into<String>,
    params: &[Value],
  ) -> Result<ResultSet> {
    let sql = sql.into();
    let params: Vec<SqlValue> = params.iter().map(encode_value).collect();

    let (columns, raw) = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let columns: Vec<String> =
          stmt.column_names().into_iter().map(str::to_owned).collect();
        let width = columns.len();
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            (0..width)
              .map(|i| row.get::<_, SqlValue>(i))
              .collect::<rusqlite::Result<Vec<_>>>()
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((columns, rows))
      })
      .await?;

    let mut set = ResultSet::new(columns);
    for raw_row in raw {
      let row = raw_row
        .into_iter()
        .zip(&set.columns)
        .map(|(v, column)| decode_value(column, v))
        .collect::<Result<Vec<_>>>()?;
      set.rows.push(row);
    }
    Ok(set)
  }
}

// ─── Backend impl ────────────────────────────────────────────────────────────

impl Backend for SqliteStore {
  type Error = crate::Error;

  async fn execute(&self, statement: &Statement) -> Result<ResultSet> {
    let SqlStatement { sql, params } = statement.to_sql();
    tracing::trace!(%sql, params = params.len(), "sqlite execute");
    self.execute_sql(sql, &params).await
  }

  fn max_parameters(&self) -> Option<usize> { Some(MAX_PARAMETERS) }
}
