use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::error::AppError;
use crate::files::images;
use crate::settings;

const DB_FILE: &str = "wifi_notebook.sqlite";

pub struct Db {
  pub conn: Mutex<Connection>,
  pub db_path: PathBuf,
}

impl Db {
  /// Fresh migrated database that lives only as long as the value. Used by
  /// tests and dry runs.
  pub fn open_in_memory() -> Result<Db, AppError> {
    let mut conn = Connection::open_in_memory()?;
    run_migrations(&mut conn)?;
    Ok(Db {
      conn: Mutex::new(conn),
      db_path: PathBuf::from(":memory:"),
    })
  }
}

pub fn resolve_app_dir() -> Result<PathBuf, AppError> {
  if let Ok(dir) = std::env::var("WIFI_NOTEBOOK_DIR") {
    if !dir.trim().is_empty() {
      let dir = PathBuf::from(dir);
      fs::create_dir_all(&dir)?;
      return Ok(dir);
    }
  }

  if let Some(portable) = resolve_portable_dir()? {
    return Ok(portable);
  }

  let base = dirs_next::data_local_dir()
    .ok_or_else(|| AppError::new("PATH", "Local data directory not found"))?;
  Ok(base.join("WifiBillNotebook"))
}

pub fn init_db(app_dir: &Path) -> Result<(Db, PathBuf), AppError> {
  fs::create_dir_all(app_dir)?;
  let db_path = app_dir.join(DB_FILE);
  let mut conn = open_connection(&db_path)?;

  run_migrations(&mut conn)?;

  let image_base = images::ensure_image_base(app_dir)?;
  settings::ensure_defaults(&conn, &image_base)?;
  info!(path = %db_path.display(), "database ready");

  Ok((
    Db {
      conn: Mutex::new(conn),
      db_path,
    },
    image_base,
  ))
}

pub fn with_conn<T>(db: &Db, f: impl FnOnce(&mut Connection) -> Result<T, AppError>) -> Result<T, AppError> {
  let mut guard = db.conn.lock()?;
  f(&mut guard)
}

/// Closes the file connection while `f` runs (so the database file can be
/// replaced) and reopens it afterwards, also when `f` fails.
pub fn with_detached<T>(db: &Db, f: impl FnOnce() -> Result<T, AppError>) -> Result<T, AppError> {
  let mut guard = db.conn.lock()?;
  checkpoint(&guard)?;
  *guard = Connection::open_in_memory()?;
  let result = f();
  *guard = open_connection(&db.db_path)?;
  result
}

pub fn checkpoint(conn: &Connection) -> Result<(), AppError> {
  conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
  Ok(())
}

fn open_connection(db_path: &Path) -> Result<Connection, AppError> {
  let conn = Connection::open(db_path)?;
  conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
  conn.busy_timeout(Duration::from_secs(5))?;
  Ok(conn)
}

fn run_migrations(conn: &mut Connection) -> Result<(), AppError> {
  conn.execute_batch(
    "CREATE TABLE IF NOT EXISTS schema_migrations (version TEXT PRIMARY KEY, applied_at TEXT NOT NULL)",
  )?;

  apply_migration(conn, "001_init", include_str!("../migrations/001_init.sql"))?;
  Ok(())
}

fn apply_migration(conn: &mut Connection, version: &str, sql: &str) -> Result<(), AppError> {
  let exists: i64 = conn.query_row(
    "SELECT COUNT(*) FROM schema_migrations WHERE version = ?1",
    params![version],
    |row| row.get(0),
  )?;
  if exists > 0 {
    return Ok(());
  }

  let tx = conn.transaction()?;
  tx.execute_batch(sql)?;
  tx.execute(
    "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
    params![version, Utc::now().to_rfc3339()],
  )?;
  tx.commit()?;
  debug!(version, "migration applied");
  Ok(())
}

fn resolve_portable_dir() -> Result<Option<PathBuf>, AppError> {
  let env_enabled = std::env::var("WIFI_NOTEBOOK_PORTABLE")
    .ok()
    .map(|value| {
      let value = value.to_ascii_lowercase();
      value == "1" || value == "true" || value == "yes"
    })
    .unwrap_or(false);

  let exe_dir = std::env::current_exe()
    .ok()
    .and_then(|path| path.parent().map(|parent| parent.to_path_buf()));

  if let Some(exe_dir) = exe_dir {
    let flag = exe_dir.join("portable.flag");
    let data_dir = exe_dir.join("data");
    if env_enabled || flag.exists() || data_dir.exists() {
      fs::create_dir_all(&data_dir)?;
      return Ok(Some(data_dir));
    }
  }

  Ok(None)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn migrations_are_idempotent() {
    let db = Db::open_in_memory().unwrap();
    with_conn(&db, |conn| {
      run_migrations(conn)?;
      let applied: i64 = conn.query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))?;
      assert_eq!(applied, 1);
      Ok(())
    })
    .unwrap();
  }

  #[test]
  fn init_creates_database_and_image_folder() {
    let dir = tempfile::tempdir().unwrap();
    let (db, image_base) = init_db(dir.path()).unwrap();
    assert!(db.db_path.exists());
    assert!(image_base.is_dir());
    let replaced = with_detached(&db, || {
      fs::write(db.db_path.with_extension("probe"), b"x")?;
      Ok(7)
    })
    .unwrap();
    assert_eq!(replaced, 7);
    with_conn(&db, |conn| checkpoint(conn)).unwrap();
  }
}
