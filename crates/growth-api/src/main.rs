//! growth-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus `GROWTH_*`
//! environment overrides, opens the SQLite store, and serves the JSON API
//! over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use growth_api::{AppState, ServerConfig};
use growth_store_sqlite::SqliteStore;
use growth_timelapse::{Assembler, FfmpegEncoder};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Growth plant tracker server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(growth_api::env_overrides())
    .build()
    .context("failed to read config file")?;

  let mut server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  server_cfg.store_path = expand_tilde(&server_cfg.store_path);
  server_cfg.output_dir = expand_tilde(&server_cfg.output_dir);
  server_cfg.scratch_dir = server_cfg.scratch_dir.as_deref().map(expand_tilde);

  tokio::fs::create_dir_all(&server_cfg.output_dir)
    .await
    .with_context(|| format!("failed to create {:?}", server_cfg.output_dir))?;

  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.store_path))?;

  let encoder = FfmpegEncoder::new(server_cfg.encoder.clone());
  tracing::info!(
    program = %encoder.settings().program.display(),
    codec = %encoder.settings().codec,
    "using encoder"
  );
  let assembler = Assembler::new(encoder, server_cfg.scratch_root());

  let state = AppState {
    store:     Arc::new(store.clone()),
    assembler: Arc::new(assembler),
    config:    Arc::new(server_cfg.clone()),
  };

  let app = growth_api::router(state).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  tracing::info!("shutting down");
  store.close().await.context("failed to close store")?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
