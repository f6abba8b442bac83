//! potd-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the phrase API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `admin_password_hash`:
//!
//! ```text
//! cargo run -p potd-server -- --hash-password
//! ```
//!
//! # Seeding
//!
//! ```text
//! cargo run -p potd-server -- --seed phrases.json [--replace]
//! ```

mod seed;
mod settings;

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use potd_api::{AppState, AuthConfig, RateLimit};
use potd_core::{clock::DayBoundary, rotation::RotationEngine};
use potd_store_sqlite::SqliteStore;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

use crate::settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Phrase of the day server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,

  /// Import phrases from a JSON array of documents and exit.
  #[arg(long, value_name = "FILE")]
  seed: Option<PathBuf>,

  /// With `--seed`, soft-delete every active phrase before importing.
  #[arg(long, requires = "seed")]
  replace: bool,
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

  // Helper mode: hash a password and exit.
  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let cfg = ServerConfig::load(&cli.config)?;
  let boundary = DayBoundary::parse(&cfg.time_zone)
    .context("invalid time_zone")?;

  let store_path = cfg.resolved_store_path();
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let engine = RotationEngine::with_system_clock(Arc::new(store), boundary);

  if let Some(path) = &cli.seed {
    seed::seed(&engine, path, cli.replace).await?;
    return Ok(());
  }

  let password_hash = cfg.admin_password_hash.clone().unwrap_or_else(|| {
    warn!("admin_password_hash is not set; admin routes will reject every request");
    String::new()
  });

  let rate_limit = RateLimit::new(cfg.rate_limit_max, cfg.rate_limit_window()).map(Arc::new);
  match &rate_limit {
    Some(limit) => {
      info!(
        max = cfg.rate_limit_max,
        window = ?cfg.rate_limit_window(),
        "rate limiting public routes"
      );
      tokio::spawn(prune_rate_limit(Arc::clone(limit), cfg.rate_limit_window()));
    }
    None => warn!("rate limiting is disabled"),
  }

  let state = AppState {
    engine,
    auth: Arc::new(AuthConfig {
      username: cfg.admin_username.clone(),
      password_hash,
    }),
    selection_timeout: cfg.request_timeout(),
    rate_limit,
  };

  let mut app = potd_api::router(state, &cfg.api_base, &cfg.admin_base);
  if !cfg.cors_origins.is_empty() {
    let cors = potd_api::cors::layer(&cfg.cors_origins).context("invalid cors_origins")?;
    app = app.layer(cors);
  }
  let app = app.layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", cfg.host, cfg.port);

  info!(
    time_zone = %boundary,
    api = %cfg.api_base,
    admin = %cfg.admin_base,
    "listening on http://{address}"
  );
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  // Peer addresses key the rate limiter.
  axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  info!("server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
}

/// Drop idle clients from the limiter once per window.
async fn prune_rate_limit(limit: Arc<RateLimit>, every: std::time::Duration) {
  let mut interval = tokio::time::interval(every);
  loop {
    interval.tick().await;
    limit.prune();
  }
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}
