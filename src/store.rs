use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use crate::db::{self, Db};
use crate::error::AppError;
use crate::models::{BillRecord, UserProfile};

pub const BILLS_KEY: &str = "wifi_bills_v1";
pub const PROFILE_KEY: &str = "wifi_user_profile_v2";

/// Durable home of the bill collection and the owner's profile. Both are
/// stored whole; callers load, transform and write back.
pub trait BillStore {
  fn load_bills(&self) -> Result<Vec<BillRecord>, AppError>;
  fn save_bills(&self, bills: &[BillRecord]) -> Result<(), AppError>;
  fn load_profile(&self) -> Result<Option<UserProfile>, AppError>;
  fn save_profile(&self, profile: &UserProfile) -> Result<(), AppError>;
}

impl BillStore for Db {
  fn load_bills(&self) -> Result<Vec<BillRecord>, AppError> {
    db::with_conn(self, |conn| {
      let Some(raw) = read_record(conn, BILLS_KEY)? else {
        return Ok(Vec::new());
      };
      match serde_json::from_str(&raw) {
        Ok(bills) => Ok(bills),
        Err(err) => {
          warn!(error = %err, "stored bill collection is unreadable");
          Err(corrupt(BILLS_KEY, &err))
        }
      }
    })
  }

  fn save_bills(&self, bills: &[BillRecord]) -> Result<(), AppError> {
    let raw = serde_json::to_string(bills)?;
    db::with_conn(self, |conn| write_record(conn, BILLS_KEY, &raw))
  }

  fn load_profile(&self) -> Result<Option<UserProfile>, AppError> {
    db::with_conn(self, |conn| {
      let Some(raw) = read_record(conn, PROFILE_KEY)? else {
        return Ok(None);
      };
      match serde_json::from_str(&raw) {
        Ok(profile) => Ok(Some(profile)),
        Err(err) => {
          warn!(error = %err, "stored profile is unreadable");
          Err(corrupt(PROFILE_KEY, &err))
        }
      }
    })
  }

  fn save_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
    let raw = serde_json::to_string(profile)?;
    db::with_conn(self, |conn| write_record(conn, PROFILE_KEY, &raw))
  }
}

/// Unreadable records are reported, never replaced: a later save would
/// otherwise overwrite the stored data.
fn corrupt(key: &str, err: &serde_json::Error) -> AppError {
  AppError::new("STORE_CORRUPT", format!("Stored record '{key}' cannot be read: {err}"))
}

fn read_record(conn: &Connection, key: &str) -> Result<Option<String>, AppError> {
  let value = conn
    .query_row("SELECT value FROM records WHERE key = ?1", params![key], |row| row.get(0))
    .optional()?;
  Ok(value)
}

fn write_record(conn: &Connection, key: &str, value: &str) -> Result<(), AppError> {
  conn.execute(
    "INSERT OR REPLACE INTO records (key, value, updated_at) VALUES (?1, ?2, ?3)",
    params![key, value, Utc::now().to_rfc3339()],
  )?;
  Ok(())
}

/// Store without persistence, for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
  bills: Mutex<Vec<BillRecord>>,
  profile: Mutex<Option<UserProfile>>,
}

impl BillStore for MemoryStore {
  fn load_bills(&self) -> Result<Vec<BillRecord>, AppError> {
    Ok(self.bills.lock()?.clone())
  }

  fn save_bills(&self, bills: &[BillRecord]) -> Result<(), AppError> {
    *self.bills.lock()? = bills.to_vec();
    Ok(())
  }

  fn load_profile(&self) -> Result<Option<UserProfile>, AppError> {
    Ok(self.profile.lock()?.clone())
  }

  fn save_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
    *self.profile.lock()? = Some(profile.clone());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn bill(id: &str) -> BillRecord {
    serde_json::from_value(serde_json::json!({
      "id": id,
      "createdAt": 1_700_000_000_000i64,
      "month": "May",
      "year": 2024,
      "providerName": "FiberLink",
      "customerId": "C-1",
      "amount": 500.0,
      "status": "Due"
    }))
    .unwrap()
  }

  #[test]
  fn db_store_round_trips_bills_and_profile() {
    let db = Db::open_in_memory().unwrap();
    assert!(db.load_bills().unwrap().is_empty());
    assert!(db.load_profile().unwrap().is_none());

    db.save_bills(&[bill("a"), bill("b")]).unwrap();
    let profile = UserProfile {
      user_id: "AB12CD".into(),
      user_name: "Rahim".into(),
      ..Default::default()
    };
    db.save_profile(&profile).unwrap();

    let bills = db.load_bills().unwrap();
    assert_eq!(bills.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(db.load_profile().unwrap().unwrap().user_id, "AB12CD");
  }

  #[test]
  fn unreadable_collection_fails_and_is_kept() {
    let db = Db::open_in_memory().unwrap();
    let stored = r#"[{"id":"a","createdAt":1,"month":"May","year":2024,"status":"Due"},{"id":"b","createdAt":2,"month":"May","year":2024,"status":"paid"}]"#;
    db::with_conn(&db, |conn| write_record(conn, BILLS_KEY, stored)).unwrap();

    assert_eq!(db.load_bills().unwrap_err().code, "STORE_CORRUPT");
    let partial = crate::models::PartialBill {
      provider_name: Some("New".into()),
      ..Default::default()
    };
    assert_eq!(crate::ledger::save_bill(&db, &partial).unwrap_err().code, "STORE_CORRUPT");

    let after = db::with_conn(&db, |conn| read_record(conn, BILLS_KEY)).unwrap();
    assert_eq!(after.as_deref(), Some(stored));
  }

  #[test]
  fn unreadable_profile_fails_and_is_kept() {
    let db = Db::open_in_memory().unwrap();
    db::with_conn(&db, |conn| write_record(conn, PROFILE_KEY, r#"{"userId":42}"#)).unwrap();

    assert_eq!(db.load_profile().unwrap_err().code, "STORE_CORRUPT");
    assert_eq!(crate::ledger::load_or_init_profile(&db).unwrap_err().code, "STORE_CORRUPT");
    let after = db::with_conn(&db, |conn| read_record(conn, PROFILE_KEY)).unwrap();
    assert_eq!(after.as_deref(), Some(r#"{"userId":42}"#));
  }

  #[test]
  fn memory_store_keeps_last_write() {
    let store = MemoryStore::default();
    store.save_bills(&[bill("x")]).unwrap();
    store.save_bills(&[bill("y")]).unwrap();
    assert_eq!(store.load_bills().unwrap()[0].id, "y");
  }
}
