//! Layered settings: built-in defaults, then `oifind.toml`, then `OIFIND_*`
//! environment variables. Command-line flags are applied on top by `main`.

use std::{path::PathBuf, time::Duration};

use anyhow::Context as _;
use oifind_core::{finder::Finder, tracker::DEFAULT_THRESHOLD};
use oifind_remote::{DEFAULT_MAX_PARAMETERS, RemoteConfig};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// Local SQLite database.
  pub database:        PathBuf,
  pub threshold:       usize,
  pub call_timeout_ms: u64,
  pub host:            String,
  pub port:            u16,
  pub remote:          Option<RemoteSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSettings {
  pub url:            String,
  #[serde(default)]
  pub token:          Option<String>,
  #[serde(default = "default_remote_timeout_ms")]
  pub timeout_ms:     u64,
  #[serde(default = "default_max_parameters")]
  pub max_parameters: usize,
}

fn default_remote_timeout_ms() -> u64 { 30_000 }

fn default_max_parameters() -> usize { DEFAULT_MAX_PARAMETERS }

impl Default for Settings {
  fn default() -> Self {
    Self {
      database:        PathBuf::from("oierdb.sqlite3"),
      threshold:       DEFAULT_THRESHOLD,
      call_timeout_ms: 30_000,
      host:            "127.0.0.1".to_owned(),
      port:            8080,
      remote:          None,
    }
  }
}

impl Settings {
  /// Read `path` (optional) and the `OIFIND_` environment.
  ///
  /// Nested keys use a double underscore: `OIFIND_REMOTE__URL`.
  pub fn load(path: PathBuf) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("OIFIND")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise settings")
  }

  pub fn finder(&self) -> Finder {
    Finder::new()
      .with_threshold(self.threshold)
      .with_call_timeout(Duration::from_millis(self.call_timeout_ms))
  }
}

impl RemoteSettings {
  pub fn to_config(&self) -> RemoteConfig {
    RemoteConfig {
      url:            self.url.clone(),
      token:          self.token.clone(),
      timeout:        Duration::from_millis(self.timeout_ms),
      max_parameters: self.max_parameters,
    }
  }
}
