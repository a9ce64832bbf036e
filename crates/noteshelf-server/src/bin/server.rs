//! noteshelf server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) and `NOTESHELF_*`
//! environment variables, opens the SQLite store, and serves the JSON API
//! over HTTP.
//!
//! # Session cleanup
//!
//! Expired sessions are swept on every login. To sweep them from cron
//! instead:
//!
//! ```text
//! cargo run -p noteshelf-server --bin server -- --sweep-sessions
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use chrono::Utc;
use clap::Parser;
use noteshelf_api::ApiState;
use noteshelf_core::store::NoteStore as _;
use noteshelf_server::ServerConfig;
use noteshelf_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "noteshelf note server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Delete expired sessions and exit.
  #[arg(long)]
  sweep_sessions: bool,
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

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = tokio::time::timeout(server_cfg.connect_timeout(), SqliteStore::open(&store_path))
    .await
    .with_context(|| format!("timed out opening store at {store_path:?}"))?
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if cli.sweep_sessions {
    let swept = store
      .sweep_sessions(Utc::now())
      .await
      .context("failed to sweep sessions")?;
    tracing::info!(swept, "expired sessions removed");
    return Ok(());
  }

  tracing::info!(
    store = ?store_path,
    order_policy = ?server_cfg.order_policy,
    "store opened",
  );

  let state = ApiState::new(Arc::new(store), server_cfg.api_settings());
  let app = noteshelf_server::router(state);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
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
