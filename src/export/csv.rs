use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::customers::customer_key;
use crate::error::AppError;
use crate::models::BillRecord;

const HEADER: &str = "id,created_at,year,month,provider_name,customer_id,customer_name,customer_phone,amount,status,billing_start_date,billing_end_date,due_date,payment_method,payment_date,notes,handwritten_image";

/// Writes `bills` in collection order. Returns the number of rows written.
pub fn export_bills_csv(bills: &[BillRecord], path: &Path) -> Result<usize, AppError> {
  let mut file = BufWriter::new(File::create(path)?);
  writeln!(file, "{HEADER}")?;

  for bill in bills {
    writeln!(
      file,
      "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
      escape_csv(&bill.id),
      bill.created_at,
      bill.year,
      bill.month.number(),
      escape_csv(&bill.provider_name),
      escape_csv(customer_key(&bill.customer_id)),
      escape_csv(opt(&bill.user_name)),
      escape_csv(opt(&bill.user_phone)),
      bill.amount,
      bill.status,
      escape_csv(opt(&bill.billing_start_date)),
      escape_csv(opt(&bill.billing_end_date)),
      escape_csv(opt(&bill.due_date)),
      escape_csv(opt(&bill.payment_method)),
      escape_csv(opt(&bill.payment_date)),
      escape_csv(opt(&bill.notes)),
      escape_csv(opt(&bill.handwritten_image))
    )?;
  }

  file.flush()?;
  Ok(bills.len())
}

fn opt(value: &Option<String>) -> &str {
  value.as_deref().unwrap_or("")
}

fn escape_csv(value: &str) -> String {
  if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
    format!("\"{}\"", value.replace('"', "\"\""))
  } else {
    value.to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn escapes_fields_and_writes_one_row_per_bill() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bills.csv");
    let bill: BillRecord = serde_json::from_value(serde_json::json!({
      "id": "b1",
      "createdAt": 5,
      "month": "March",
      "year": 2024,
      "providerName": "Link3, Dhaka",
      "customerId": "",
      "amount": 500.5,
      "status": "Due",
      "notes": "said \"tomorrow\""
    }))
    .unwrap();

    let rows = export_bills_csv(&[bill], &path).unwrap();
    assert_eq!(rows, 1);

    let text = std::fs::read_to_string(&path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some(HEADER));
    let row = lines.next().unwrap();
    assert!(row.starts_with("b1,5,2024,3,\"Link3, Dhaka\",UNKNOWN,,,500.5,Due,"));
    assert!(row.contains("\"said \"\"tomorrow\"\"\""));
  }
}
