use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::AppError;
use crate::fields::{number, text, year};
use crate::models::{BillRecord, BillStatus, Month, PartialBill};

const QR_IMAGE_SIZE: usize = 200;

/// Short keys keep the code small enough to scan from a printed receipt.
#[derive(Debug, Serialize)]
struct QrPayload {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  p: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  c: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  a: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  s: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  m: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  y: Option<i32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  sd: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  ed: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  dd: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  n: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  u: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  ph: Option<String>,
}

pub fn encode_payload(bill: &BillRecord) -> String {
  let payload = QrPayload {
    p: Some(bill.provider_name.clone()),
    c: Some(bill.customer_id.clone()),
    a: Some(bill.amount),
    s: Some(bill.status.as_str().to_string()),
    m: Some(bill.month.name().to_string()),
    y: Some(bill.year),
    sd: bill.billing_start_date.clone(),
    ed: bill.billing_end_date.clone(),
    dd: bill.due_date.clone(),
    n: bill.notes.clone(),
    u: bill.user_name.clone(),
    ph: bill.user_phone.clone(),
  };
  // A struct of strings and numbers always serializes.
  serde_json::to_string(&payload).unwrap_or_else(|_| "{}".to_string())
}

/// `None` when the text is not JSON or carries neither a provider name nor a
/// non-zero amount, i.e. the code was not produced by this app.
pub fn decode_payload(raw: &str) -> Option<PartialBill> {
  let value: Value = match serde_json::from_str(raw.trim()) {
    Ok(value) => value,
    Err(err) => {
      debug!(error = %err, "QR text is not JSON");
      return None;
    }
  };
  let Some(object) = value.as_object() else {
    debug!("QR payload is not an object");
    return None;
  };

  let provider_name = text(object, "p");
  let amount = number(object, "a");
  if provider_name.is_none() && amount.map_or(true, |value| value == 0.0) {
    debug!("QR payload has neither provider nor amount");
    return None;
  }

  Some(PartialBill {
    provider_name,
    customer_id: text(object, "c"),
    amount,
    status: text(object, "s").and_then(|value| value.parse::<BillStatus>().ok()),
    month: text(object, "m").as_deref().and_then(Month::from_name),
    year: year(object, "y"),
    billing_start_date: text(object, "sd"),
    billing_end_date: text(object, "ed"),
    due_date: text(object, "dd"),
    notes: text(object, "n"),
    user_name: text(object, "u"),
    user_phone: text(object, "ph"),
    ..Default::default()
  })
}

/// PNG of the bill payload as a `data:` URL.
pub fn qr_data_url(bill: &BillRecord) -> Result<String, AppError> {
  let png = qrcode_generator::to_png_to_vec(encode_payload(bill), qrcode_generator::QrCodeEcc::Medium, QR_IMAGE_SIZE)
    .map_err(|err| AppError::new("QR_ENCODE", err.to_string()))?;
  Ok(format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(png)))
}
