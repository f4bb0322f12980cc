use std::fs;
use std::path::PathBuf;

use chrono::{Datelike, Local};
use tracing::info;

use crate::audit::log::{self as audit_log, append_audit};
use crate::db;
use crate::domain::customers;
use crate::domain::receipt::{ReceiptRenderer, ReceiptView, TextReceiptRenderer};
use crate::domain::{share, validation};
use crate::error::AppError;
use crate::export::{csv, excel};
use crate::files::{backup, images};
use crate::ledger;
use crate::models::*;
use crate::qr;
use crate::reports;
use crate::scan::{self, BillExtractor};
use crate::settings;
use crate::store::BillStore;
use crate::AppState;

fn audit(
  state: &AppState,
  actor: Option<String>,
  action: &str,
  entity_type: &str,
  entity_id: Option<String>,
  payload_json: String,
  details: Option<String>,
) -> Result<(), AppError> {
  db::with_conn(&state.db, |conn| {
    append_audit(conn, actor, action, entity_type, entity_id, payload_json, details)
  })
}

fn payload<T: serde::Serialize>(value: &T) -> String {
  serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

pub fn get_settings(state: &AppState) -> Result<Settings, AppError> {
  db::with_conn(&state.db, |conn| {
    let mut settings = settings::get_settings(conn)?;
    if settings.image_base_folder.trim().is_empty() {
      settings.image_base_folder = state.image_base.to_string_lossy().to_string();
    }
    Ok(settings)
  })
}

pub fn update_settings(state: &AppState, update: SettingsUpdate, actor: Option<String>) -> Result<Settings, AppError> {
  if let Some(folder) = update.image_base_folder.as_deref().filter(|value| !value.trim().is_empty()) {
    fs::create_dir_all(folder.trim())?;
  }
  let settings = db::with_conn(&state.db, |conn| settings::update_settings(conn, &update))?;
  audit(state, actor, "UPDATE_SETTINGS", "SETTINGS", None, payload(&update), None)?;
  Ok(settings)
}

fn image_base(state: &AppState) -> Result<PathBuf, AppError> {
  let settings = get_settings(state)?;
  let base = PathBuf::from(settings.image_base_folder);
  if base.as_os_str().is_empty() {
    return Ok(state.image_base.clone());
  }
  Ok(base)
}

pub fn get_profile(state: &AppState) -> Result<UserProfile, AppError> {
  ledger::load_or_init_profile(&state.db)
}

pub fn update_profile(state: &AppState, update: ProfileUpdate, actor: Option<String>) -> Result<UserProfile, AppError> {
  let profile = ledger::update_profile(&state.db, update)?;
  audit(state, actor, "UPDATE_PROFILE", "PROFILE", Some(profile.user_id.clone()), payload(&profile), None)?;
  Ok(profile)
}

/// Creates or edits a bill. A note image given as a file path or data URL
/// is filed under the image folder before the collection is written.
pub fn save_bill(state: &AppState, partial: PartialBill, actor: Option<String>) -> Result<BillRecord, AppError> {
  if let Some(amount) = partial.amount {
    validation::ensure_amount_non_negative(amount)?;
  }
  let base = image_base(state)?;

  let bill = ledger::save_bill_with(&state.db, &partial, &Local::now(), |bill| {
    let pending = bill
      .handwritten_image
      .as_deref()
      .map(str::trim)
      .filter(|source| !source.is_empty() && !images::is_stored(source, &base))
      .map(str::to_string);
    if let Some(source) = pending {
      let stored = images::store_image(&source, &base, bill.year, bill.month.number(), &bill.id)?;
      bill.handwritten_image = Some(stored);
    }
    Ok(())
  })?;

  let action = if partial.id.as_deref().map_or(true, |id| id.trim().is_empty()) {
    "CREATE_BILL"
  } else {
    "UPDATE_BILL"
  };
  let details = format!(
    "{} {} {} {} {}",
    customers::customer_key(&bill.customer_id),
    bill.month.name(),
    bill.year,
    bill.status,
    share::format_amount(bill.amount)
  );
  audit(state, actor, action, "BILL", Some(bill.id.clone()), payload(&bill), Some(details))?;
  Ok(bill)
}

pub fn get_bill(state: &AppState, id: &str) -> Result<BillRecord, AppError> {
  let id = validation::ensure_id(id)?;
  ledger::find_bill(&state.db, &id)
}

pub fn delete_bill(state: &AppState, id: &str, actor: Option<String>) -> Result<DeleteOutcome, AppError> {
  let id = validation::ensure_id(id)?;
  let outcome = ledger::delete_bill(&state.db, &id)?;
  if outcome.deleted {
    let details = outcome.customer_id.as_deref().map(|customer| {
      if outcome.customer_has_bills {
        format!("customer {customer} still has bills")
      } else {
        format!("last bill of customer {customer}")
      }
    });
    audit(state, actor, "DELETE_BILL", "BILL", Some(id), payload(&outcome), details)?;
  }
  Ok(outcome)
}

pub fn list_bills(state: &AppState, year: Option<i32>) -> Result<Vec<BillRecord>, AppError> {
  let bills = state.db.load_bills()?;
  Ok(reports::bills_for_year(&bills, year))
}

pub fn search_customers(state: &AppState, query: &str, filter: StatusFilter) -> Result<Vec<CustomerProfile>, AppError> {
  let bills = state.db.load_bills()?;
  let profiles = customers::compute_customer_profiles(&bills);
  Ok(customers::filter_customers(&profiles, query, filter))
}

pub fn get_customer(state: &AppState, customer_id: &str) -> Result<CustomerProfile, AppError> {
  let bills = state.db.load_bills()?;
  customers::customer_detail(&bills, customer_id).ok_or_else(|| AppError::not_found("customer", customer_id))
}

pub fn get_dashboard(state: &AppState) -> Result<DashboardSummary, AppError> {
  let bills = state.db.load_bills()?;
  Ok(reports::dashboard(&bills, Local::now().year()))
}

pub fn bill_qr_code(state: &AppState, id: &str) -> Result<QrCodeOutput, AppError> {
  let bill = get_bill(state, id)?;
  Ok(QrCodeOutput {
    payload: qr::encode_payload(&bill),
    data_url: qr::qr_data_url(&bill)?,
  })
}

/// Turns a scanned QR text into a form draft on top of `draft`.
pub fn decode_qr(raw: &str, draft: PartialBill) -> Result<PartialBill, AppError> {
  let decoded = qr::decode_payload(raw)
    .ok_or_else(|| AppError::new("QR_NOT_RECOGNIZED", "QR code does not hold a bill"))?;
  Ok(draft.overlay(decoded))
}

pub fn scan_image(extractor: &dyn BillExtractor, draft: PartialBill, image: &str) -> Result<PartialBill, AppError> {
  let scanned = extractor.extract_from_image(image)?;
  if scanned.is_none() {
    info!(image, "scan found no bill fields");
  }
  Ok(scan::apply_scan(draft, scanned, image))
}

pub fn share_bill(state: &AppState, bill: &PartialBill) -> Result<String, AppError> {
  let settings = get_settings(state)?;
  let profile = get_profile(state)?;
  Ok(share::share_text(bill, &profile, &settings.currency_symbol, settings.language))
}

pub fn receipt_view(state: &AppState, id: &str) -> Result<ReceiptView, AppError> {
  let bill = get_bill(state, id)?;
  let profile = get_profile(state)?;
  Ok(ReceiptView::resolve(&bill, &profile))
}

pub fn render_receipt_text(state: &AppState, id: &str) -> Result<String, AppError> {
  let view = receipt_view(state, id)?;
  let settings = get_settings(state)?;
  let renderer = TextReceiptRenderer {
    currency: settings.currency_symbol,
  };
  let bytes = renderer.render(&view, settings.language)?;
  String::from_utf8(bytes).map_err(|err| AppError::new("RENDER", err.to_string()))
}

pub fn open_image(state: &AppState, path: &str, actor: Option<String>) -> Result<(), AppError> {
  images::open_image(path)?;
  audit(
    state,
    actor,
    "OPEN_IMAGE",
    "BILL",
    Some(path.to_string()),
    payload(&serde_json::json!({ "path": path })),
    None,
  )
}

fn export_path(state: &AppState, request: &ExportRequest, ext: &str) -> Result<PathBuf, AppError> {
  let export_dir = state.app_dir.join("Exports");
  fs::create_dir_all(&export_dir)?;
  let filename = match request.year {
    Some(year) => format!("bills_{year}.{ext}"),
    None => format!("bills_all.{ext}"),
  };
  let path = request
    .output_path
    .clone()
    .map(PathBuf::from)
    .unwrap_or_else(|| export_dir.join(filename));
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)?;
  }
  Ok(path)
}

pub fn export_csv(state: &AppState, request: ExportRequest) -> Result<String, AppError> {
  let path = export_path(state, &request, "csv")?;
  let bills = list_bills(state, request.year)?;
  let rows = csv::export_bills_csv(&bills, &path)?;
  let path = path.to_string_lossy().to_string();
  info!(path = %path, rows, "csv export written");
  audit(state, request.actor.clone(), "EXPORT_CSV", "EXPORT", Some(path.clone()), payload(&request), Some(format!("{rows} rows")))?;
  Ok(path)
}

pub fn export_excel(state: &AppState, request: ExportRequest) -> Result<String, AppError> {
  let path = export_path(state, &request, "xlsx")?;
  let bills = list_bills(state, request.year)?;
  let settings = get_settings(state)?;
  excel::export_bills_excel(&bills, &settings.currency_symbol, &path)?;
  let path = path.to_string_lossy().to_string();
  info!(path = %path, rows = bills.len(), "excel export written");
  audit(
    state,
    request.actor.clone(),
    "EXPORT_EXCEL",
    "EXPORT",
    Some(path.clone()),
    payload(&request),
    Some(format!("{} rows", bills.len())),
  )?;
  Ok(path)
}

pub fn create_backup(state: &AppState, request: BackupRequest) -> Result<String, AppError> {
  let base = image_base(state)?;
  db::with_conn(&state.db, |conn| db::checkpoint(conn))?;
  let path = backup::create_backup(
    &state.app_dir,
    &state.db.db_path,
    &base,
    request.include_images,
    request.output_path.clone(),
  )?;
  audit(state, request.actor.clone(), "BACKUP", "EXPORT", Some(path.clone()), payload(&request), None)?;
  Ok(path)
}

pub fn restore_backup(state: &AppState, request: RestoreRequest) -> Result<(), AppError> {
  let base = image_base(state)?;
  db::with_detached(&state.db, || backup::restore_backup(&request.archive_path, &state.db.db_path, &base))?;
  audit(
    state,
    request.actor.clone(),
    "RESTORE",
    "EXPORT",
    Some(request.archive_path.clone()),
    payload(&request),
    None,
  )
}

pub fn list_audit_log(state: &AppState, page: i64, page_size: i64) -> Result<Paginated<AuditLogEntry>, AppError> {
  db::with_conn(&state.db, |conn| audit_log::list_audit_log(conn, page, page_size))
}
