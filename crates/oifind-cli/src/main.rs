//! `oifind`: search competitor identities by contest participation.
//!
//! # Usage
//!
//! ```text
//! oifind query filter.yml --db oierdb.sqlite3
//! oifind query filter.json --remote https://example.invalid/raw --token T --format json
//! oifind import dataset.json --db oierdb.sqlite3
//! oifind serve --config oifind.toml
//! ```

mod output;
mod settings;

use std::{
  io::Read as _,
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::{Context as _, bail};
use clap::{Args, Parser, Subcommand};
use oifind_core::{
  filter::{FilterSpec, Format},
  model::Dataset,
};
use oifind_remote::{RemoteConfig, RemoteStore};
use oifind_store_sqlite::SqliteStore;
use output::{OutputFormat, render};
use settings::Settings;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "oifind", version, about = "Find OI competitors by contest history")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, global = true, default_value = "oifind.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Run a filter file (JSON, YAML or TOML; `-` reads stdin).
  Query {
    file: PathBuf,

    #[command(flatten)]
    store: StoreArgs,

    /// Inline known candidate sets smaller than this into later queries.
    #[arg(long)]
    threshold: Option<usize>,

    /// Calendar year used to convert grades to enrollment years.
    #[arg(long)]
    year: Option<i64>,

    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
  },

  /// Load a JSON or YAML dataset into the local database.
  Import {
    file: PathBuf,

    /// SQLite database to write (default from config).
    #[arg(long)]
    db: Option<PathBuf>,
  },

  /// Serve the JSON API.
  Serve {
    #[command(flatten)]
    store: StoreArgs,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,
  },
}

#[derive(Args, Debug)]
struct StoreArgs {
  /// Local SQLite database (default from config).
  #[arg(long, conflicts_with = "remote")]
  db: Option<PathBuf>,

  /// Raw query endpoint of a remote database.
  #[arg(long)]
  remote: Option<String>,

  /// Bearer token for `--remote`.
  #[arg(long, env = "OIFIND_TOKEN")]
  token: Option<String>,
}

/// Which store a command runs against, after flags and config are merged.
enum Target {
  Local(PathBuf),
  Remote(RemoteConfig),
}

impl StoreArgs {
  fn resolve(self, settings: &Settings) -> Target {
    let configured = settings.remote.as_ref().map(|r| r.to_config());
    let mut remote = match (self.remote, configured) {
      (Some(url), Some(config)) => RemoteConfig { url, ..config },
      (Some(url), None) => RemoteConfig::new(url),
      (None, Some(config)) if self.db.is_none() => config,
      (None, _) => return Target::Local(self.db.unwrap_or_else(|| settings.database.clone())),
    };
    if self.token.is_some() {
      remote.token = self.token;
    }
    Target::Remote(remote)
  }
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(cli.config)?;

  match cli.command {
    Command::Query { file, store, threshold, year, format } => {
      let spec = read_filter(&file)?;
      let mut finder = settings.finder();
      if let Some(threshold) = threshold {
        finder = finder.with_threshold(threshold);
      }
      if let Some(year) = year {
        finder = finder.with_current_year(year);
      }

      let text = match store.resolve(&settings) {
        Target::Local(path) => {
          let store = open_local(&path).await?;
          let report = finder.find(&store, &spec).await.context("query failed")?;
          render(&report, None, format)
        }
        Target::Remote(config) => {
          let store = RemoteStore::new(config).context("failed to build HTTP client")?;
          let session = store.session();
          let report = finder.find(&session, &spec).await.context("query failed")?;
          render(&report, Some(session.usage()), format)
        }
      };
      print!("{text}");
    }

    Command::Import { file, db } => {
      let dataset = read_dataset(&file)?;
      let path = db.unwrap_or_else(|| settings.database.clone());
      let store = open_local(&path).await?;
      let counts = store
        .insert_dataset(&dataset)
        .await
        .with_context(|| format!("failed to import into {}", path.display()))?;
      println!(
        "imported {} identities, {} contests, {} schools, {} records",
        counts.identities, counts.contests, counts.schools, counts.records
      );
    }

    Command::Serve { store, host, port } => {
      let finder = settings.finder();
      let app = match store.resolve(&settings) {
        Target::Local(path) => {
          oifind_api::api_router(Arc::new(open_local(&path).await?), finder)
        }
        Target::Remote(config) => {
          let store = RemoteStore::new(config).context("failed to build HTTP client")?;
          oifind_api::api_router(Arc::new(store), finder)
        }
      };

      let address = format!(
        "{}:{}",
        host.unwrap_or_else(|| settings.host.clone()),
        port.unwrap_or(settings.port)
      );
      tracing::info!("Listening on http://{address}");
      let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
      axum::serve(listener, app).await.context("server error")?;
    }
  }

  Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

async fn open_local(path: &Path) -> anyhow::Result<SqliteStore> {
  SqliteStore::open(path)
    .await
    .with_context(|| format!("failed to open database at {}", path.display()))
}

/// Read a filter file; `-` reads stdin as YAML (which also accepts JSON).
fn read_filter(path: &Path) -> anyhow::Result<FilterSpec> {
  if path == Path::new("-") {
    let mut text = String::new();
    std::io::stdin()
      .read_to_string(&mut text)
      .context("failed to read filter from stdin")?;
    return Ok(FilterSpec::parse(&text, Format::Yaml)?);
  }
  Ok(FilterSpec::load(path)?)
}

fn read_dataset(path: &Path) -> anyhow::Result<Dataset> {
  let text = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read {}", path.display()))?;
  let dataset = match Format::from_path(path) {
    Format::Json => serde_json::from_str(&text).context("invalid JSON dataset")?,
    Format::Yaml => serde_yaml::from_str(&text).context("invalid YAML dataset")?,
    Format::Toml => bail!("TOML datasets are not supported; use JSON or YAML"),
  };
  Ok(dataset)
}
