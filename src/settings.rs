use std::path::Path;

use rusqlite::{params, Connection};

use crate::error::AppError;
use crate::models::{Language, Settings, SettingsUpdate};

const KEY_LANGUAGE: &str = "language";
const KEY_CURRENCY: &str = "currency_symbol";
const KEY_IMAGE_BASE: &str = "image_base_folder";

pub const DEFAULT_CURRENCY: &str = "৳";

pub fn ensure_defaults(conn: &Connection, image_base: &Path) -> Result<(), AppError> {
  conn.execute(
    "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
    params![KEY_LANGUAGE, Language::En.code()],
  )?;
  conn.execute(
    "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
    params![KEY_CURRENCY, DEFAULT_CURRENCY],
  )?;
  conn.execute(
    "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
    params![KEY_IMAGE_BASE, image_base.to_string_lossy().to_string()],
  )?;
  Ok(())
}

pub fn get_settings(conn: &Connection) -> Result<Settings, AppError> {
  let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
  let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

  let mut language = Language::En;
  let mut currency_symbol = DEFAULT_CURRENCY.to_string();
  let mut image_base_folder = String::new();

  for row in rows {
    let (key, value) = row?;
    match key.as_str() {
      KEY_LANGUAGE => {
        language = Language::parse(&value).unwrap_or(language);
      }
      KEY_CURRENCY => {
        if !value.trim().is_empty() {
          currency_symbol = value;
        }
      }
      KEY_IMAGE_BASE => {
        image_base_folder = value;
      }
      _ => {}
    }
  }

  Ok(Settings {
    language,
    currency_symbol,
    image_base_folder,
  })
}

pub fn update_settings(conn: &Connection, update: &SettingsUpdate) -> Result<Settings, AppError> {
  if let Some(language) = update.language {
    conn.execute(
      "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
      params![KEY_LANGUAGE, language.code()],
    )?;
  }
  if let Some(currency) = update.currency_symbol.as_deref() {
    conn.execute(
      "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
      params![KEY_CURRENCY, currency.trim()],
    )?;
  }
  if let Some(folder) = update.image_base_folder.as_deref() {
    conn.execute(
      "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
      params![KEY_IMAGE_BASE, folder.trim()],
    )?;
  }
  get_settings(conn)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::{self, Db};

  #[test]
  fn defaults_then_partial_update() {
    let db = Db::open_in_memory().unwrap();
    db::with_conn(&db, |conn| {
      ensure_defaults(conn, Path::new("/tmp/notes"))?;
      let settings = get_settings(conn)?;
      assert_eq!(settings.language, Language::En);
      assert_eq!(settings.currency_symbol, DEFAULT_CURRENCY);
      assert_eq!(settings.image_base_folder, "/tmp/notes");

      let updated = update_settings(
        conn,
        &SettingsUpdate {
          language: Some(Language::Bn),
          currency_symbol: None,
          image_base_folder: None,
        },
      )?;
      assert_eq!(updated.language, Language::Bn);
      assert_eq!(updated.currency_symbol, DEFAULT_CURRENCY);
      Ok(())
    })
    .unwrap();
  }

  #[test]
  fn bad_stored_values_fall_back() {
    let db = Db::open_in_memory().unwrap();
    db::with_conn(&db, |conn| {
      conn.execute("INSERT INTO settings (key, value) VALUES ('language', 'FR'), ('currency_symbol', '')", [])?;
      let settings = get_settings(conn)?;
      assert_eq!(settings.language, Language::En);
      assert_eq!(settings.currency_symbol, DEFAULT_CURRENCY);
      Ok(())
    })
    .unwrap();
  }
}
