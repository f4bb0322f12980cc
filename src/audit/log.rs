use chrono::Utc;
use rusqlite::{params, Connection};

use crate::error::AppError;
use crate::models::{AuditLogEntry, Paginated};

pub fn append_audit(
  conn: &Connection,
  actor: Option<String>,
  action: &str,
  entity_type: &str,
  entity_id: Option<String>,
  payload_json: String,
  details: Option<String>,
) -> Result<(), AppError> {
  let ts = Utc::now().to_rfc3339();
  conn.execute(
    "INSERT INTO audit_log (ts, actor, action, entity_type, entity_id, payload_json, details) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![ts, actor, action, entity_type, entity_id, payload_json, details],
  )?;
  Ok(())
}

pub fn list_audit_log(conn: &Connection, page: i64, page_size: i64) -> Result<Paginated<AuditLogEntry>, AppError> {
  let page = if page < 1 { 1 } else { page };
  let page_size = if page_size < 1 { 50 } else { page_size.min(500) };
  let offset = (page - 1).saturating_mul(page_size);

  let total: i64 = conn.query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))?;
  let mut stmt = conn.prepare(
    "SELECT id, ts, actor, action, entity_type, entity_id, payload_json, details
     FROM audit_log ORDER BY id DESC LIMIT ?1 OFFSET ?2",
  )?;
  let rows = stmt.query_map(params![page_size, offset], |row| {
    Ok(AuditLogEntry {
      id: row.get(0)?,
      ts: row.get(1)?,
      actor: row.get(2)?,
      action: row.get(3)?,
      entity_type: row.get(4)?,
      entity_id: row.get(5)?,
      payload_json: row.get(6)?,
      details: row.get(7)?,
    })
  })?;
  let mut items = Vec::new();
  for row in rows {
    items.push(row?);
  }
  Ok(Paginated { total, items })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::{self, Db};

  #[test]
  fn newest_entries_come_first() {
    let db = Db::open_in_memory().unwrap();
    db::with_conn(&db, |conn| {
      append_audit(conn, None, "SAVE_BILL", "BILL", Some("a".into()), "{}".into(), None)?;
      append_audit(
        conn,
        Some("cli".into()),
        "DELETE_BILL",
        "BILL",
        Some("a".into()),
        "{}".into(),
        Some("last bill of customer C1".into()),
      )?;
      let page = list_audit_log(conn, 1, 1)?;
      assert_eq!(page.total, 2);
      assert_eq!(page.items.len(), 1);
      assert_eq!(page.items[0].action, "DELETE_BILL");
      assert_eq!(page.items[0].actor.as_deref(), Some("cli"));
      assert_eq!(page.items[0].details.as_deref(), Some("last bill of customer C1"));
      Ok(())
    })
    .unwrap();
  }

  #[test]
  fn huge_page_numbers_do_not_overflow() {
    let db = Db::open_in_memory().unwrap();
    db::with_conn(&db, |conn| {
      append_audit(conn, None, "SAVE_BILL", "BILL", None, "{}".into(), None)?;
      let page = list_audit_log(conn, i64::MAX, 50)?;
      assert_eq!(page.total, 1);
      assert!(page.items.is_empty());
      Ok(())
    })
    .unwrap();
  }
}
