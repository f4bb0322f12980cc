pub mod audit;
pub mod commands;
pub mod db;
pub mod domain;
pub mod error;
pub mod export;
mod fields;
pub mod files;
pub mod ledger;
pub mod models;
pub mod qr;
pub mod reports;
pub mod scan;
pub mod settings;
pub mod store;

use std::path::PathBuf;

use db::Db;

pub struct AppState {
  pub db: Db,
  pub app_dir: PathBuf,
  pub image_base: PathBuf,
}

impl AppState {
  /// Opens (or creates) the notebook in `app_dir`.
  pub fn open(app_dir: PathBuf) -> Result<AppState, error::AppError> {
    let (db, image_base) = db::init_db(&app_dir)?;
    Ok(AppState {
      db,
      app_dir,
      image_base,
    })
  }
}

/// Installs the `tracing` subscriber for the binaries. `RUST_LOG` overrides
/// the default `info` level; output goes to stderr so stdout stays JSON.
pub fn init_tracing() {
  let filter = tracing_subscriber::EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .try_init();
}
