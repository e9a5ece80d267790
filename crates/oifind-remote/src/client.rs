//! [`RemoteStore`] and its per-query [`RemoteSession`].

use std::{
  sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
  },
  time::Duration,
};

use oifind_core::{
  backend::Backend,
  statement::{SqlStatement, Statement},
  value::{ResultSet, Value},
};
use reqwest::Client;
use serde::Serialize;

use crate::{
  Error, Result,
  wire::{QueryRequest, decode},
};

/// Bound parameters per statement accepted by the remote database.
pub const DEFAULT_MAX_PARAMETERS: usize = 100;

/// Connection settings for the raw query endpoint.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
  /// Full URL of the raw query endpoint.
  pub url:            String,
  /// Sent as `Authorization: Bearer <token>` when set.
  pub token:          Option<String>,
  pub timeout:        Duration,
  pub max_parameters: usize,
}

impl RemoteConfig {
  pub fn new(url: impl Into<String>) -> Self {
    Self {
      url:            url.into(),
      token:          None,
      timeout:        Duration::from_secs(30),
      max_parameters: DEFAULT_MAX_PARAMETERS,
    }
  }
}

/// A handle to the remote database.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based. The store
/// itself keeps no counters; open a [`RemoteSession`] per top-level query.
#[derive(Clone)]
pub struct RemoteStore {
  client: Client,
  config: Arc<RemoteConfig>,
}

impl RemoteStore {
  pub fn new(config: RemoteConfig) -> Result<Self> {
    let client = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { client, config: Arc::new(config) })
  }

  pub fn config(&self) -> &RemoteConfig { &self.config }

  /// Start a fresh session with zeroed counters.
  pub fn session(&self) -> RemoteSession {
    RemoteSession { store: self.clone(), usage: Counters::default() }
  }

  async fn post(&self, request: &QueryRequest) -> Result<(ResultSet, u64)> {
    let mut req = self.client.post(&self.config.url).json(request);
    if let Some(token) = &self.config.token {
      req = req.bearer_auth(token);
    }

    let resp = req.send().await?;
    let status = resp.status();
    let body = resp.bytes().await?;
    if !status.is_success() {
      return Err(Error::Status {
        status: status.as_u16(),
        body:   String::from_utf8_lossy(&body).into_owned(),
      });
    }

    let (set, meta) = decode(&body)?;
    Ok((set, meta.rows_read))
  }
}

/// Uncounted access, for long-lived callers that report cost per query
/// through [`oifind_core::finder::Report::steps`] instead.
impl Backend for RemoteStore {
  type Error = Error;

  async fn execute(&self, statement: &Statement) -> Result<ResultSet> {
    let SqlStatement { sql, params } = statement.to_sql();
    let (set, _) = self.post(&QueryRequest { sql, params }).await?;
    Ok(set)
  }

  fn max_parameters(&self) -> Option<usize> { Some(self.config.max_parameters) }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// Resource usage accumulated by one [`RemoteSession`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Usage {
  /// Requests sent, successful or not.
  pub calls:         u64,
  pub rows_returned: u64,
  /// Rows scanned server-side, as reported in the response metadata.
  pub rows_read:     u64,
}

#[derive(Default)]
struct Counters {
  calls:         AtomicU64,
  rows_returned: AtomicU64,
  rows_read:     AtomicU64,
}

/// One query's view of the remote store.
pub struct RemoteSession {
  store: RemoteStore,
  usage: Counters,
}

impl RemoteSession {
  pub fn usage(&self) -> Usage {
    Usage {
      calls:         self.usage.calls.load(Ordering::Relaxed),
      rows_returned: self.usage.rows_returned.load(Ordering::Relaxed),
      rows_read:     self.usage.rows_read.load(Ordering::Relaxed),
    }
  }

  /// Send one raw statement.
  pub async fn query(&self, sql: impl Into<String>, params: Vec<Value>) -> Result<ResultSet> {
    let request = QueryRequest { sql: sql.into(), params };
    self.usage.calls.fetch_add(1, Ordering::Relaxed);

    let (set, rows_read) = self.store.post(&request).await.inspect_err(|e| {
      tracing::warn!(error = %e, "remote query failed");
    })?;

    self
      .usage
      .rows_returned
      .fetch_add(set.len() as u64, Ordering::Relaxed);
    self.usage.rows_read.fetch_add(rows_read, Ordering::Relaxed);
    tracing::debug!(rows = set.len(), rows_read, "remote query");
    Ok(set)
  }
}

impl Backend for RemoteSession {
  type Error = Error;

  async fn execute(&self, statement: &Statement) -> Result<ResultSet> {
    let SqlStatement { sql, params } = statement.to_sql();
    self.query(sql, params).await
  }

  fn max_parameters(&self) -> Option<usize> { Some(self.store.config.max_parameters) }
}
