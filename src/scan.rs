use std::fs;
use std::path::PathBuf;

use serde_json::Value;

use crate::error::AppError;
use crate::fields::{number, text, year};
use crate::models::{BillStatus, Month, PartialBill};

/// Optical/AI extraction collaborator. `Ok(None)` means nothing usable was
/// found; errors are service failures. No retries happen here.
pub trait BillExtractor {
  fn extract_from_image(&self, image: &str) -> Result<Option<PartialBill>, AppError>;
}

/// Reads the JSON an external extractor wrote for the image.
pub struct JsonFileExtractor {
  pub path: PathBuf,
}

impl BillExtractor for JsonFileExtractor {
  fn extract_from_image(&self, _image: &str) -> Result<Option<PartialBill>, AppError> {
    let raw = fs::read_to_string(&self.path)?;
    let value: Value = serde_json::from_str(&raw)
      .map_err(|err| AppError::new("SCAN_INVALID", format!("Extractor output is not JSON: {err}")))?;
    Ok(partial_from_extraction(&value))
  }
}

/// Copies recognised bill fields out of extractor output. Unknown keys,
/// identity fields and issuer fields are ignored; numbers may arrive as
/// strings. `None` when the value is not an object or nothing was found.
pub fn partial_from_extraction(value: &Value) -> Option<PartialBill> {
  let object = value.as_object()?;
  let partial = PartialBill {
    provider_name: text(object, "providerName"),
    customer_id: text(object, "customerId"),
    amount: number(object, "amount").filter(|amount| *amount >= 0.0),
    status: text(object, "status").and_then(|value| value.parse::<BillStatus>().ok()),
    month: text(object, "month").as_deref().and_then(Month::from_name),
    year: year(object, "year"),
    billing_start_date: text(object, "billingStartDate"),
    billing_end_date: text(object, "billingEndDate"),
    due_date: text(object, "dueDate"),
    payment_method: text(object, "paymentMethod"),
    payment_date: text(object, "paymentDate"),
    notes: text(object, "notes"),
    handwritten_image: text(object, "handwrittenImage"),
    user_name: text(object, "userName"),
    user_phone: text(object, "userPhone"),
    ..Default::default()
  };
  if partial == PartialBill::default() {
    None
  } else {
    Some(partial)
  }
}

/// Merges a scan into the form draft. Scanned fields win, the captured image
/// is attached unless the scan brought its own, and the status becomes the
/// scanned one or `Pending`.
pub fn apply_scan(draft: PartialBill, scanned: Option<PartialBill>, image: &str) -> PartialBill {
  let captured = if image.trim().is_empty() { None } else { Some(image.to_string()) };
  match scanned {
    Some(scanned) => {
      let scanned_image = scanned.handwritten_image.clone();
      let scanned_status = scanned.status;
      let mut merged = draft.overlay(scanned);
      merged.handwritten_image = scanned_image.or(captured).or(merged.handwritten_image);
      merged.status = Some(scanned_status.unwrap_or(BillStatus::Pending));
      merged
    }
    None => PartialBill {
      handwritten_image: captured.or(draft.handwritten_image.clone()),
      ..draft
    },
  }
}
