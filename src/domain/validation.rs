use crate::error::AppError;
use crate::models::BillStatus;

/// Amounts from the command line. The reconciliation engine trusts its input,
/// so malformed numbers are rejected here.
pub fn parse_amount(raw: &str) -> Result<f64, AppError> {
  let cleaned: String = raw.trim().chars().filter(|c| *c != ',' && *c != '৳').collect();
  let amount: f64 = cleaned
    .trim()
    .parse()
    .map_err(|_| AppError::new("INVALID_AMOUNT", format!("Amount must be a number, got '{raw}'")))?;
  ensure_amount_non_negative(amount)?;
  Ok(amount)
}

pub fn ensure_amount_non_negative(amount: f64) -> Result<(), AppError> {
  if !amount.is_finite() || amount < 0.0 {
    Err(AppError::new("INVALID_AMOUNT", "Amount must be >= 0"))
  } else {
    Ok(())
  }
}

pub fn ensure_id(raw: &str) -> Result<String, AppError> {
  let id = raw.trim();
  if id.is_empty() {
    Err(AppError::new("INVALID_ID", "Bill id missing"))
  } else {
    Ok(id.to_string())
  }
}

pub fn parse_status(raw: &str) -> Result<BillStatus, AppError> {
  raw.parse()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn amounts_accept_grouping_and_currency() {
    assert_eq!(parse_amount("1,200").unwrap(), 1200.0);
    assert_eq!(parse_amount("৳ 500.50").unwrap(), 500.5);
    assert_eq!(parse_amount("abc").unwrap_err().code, "INVALID_AMOUNT");
    assert_eq!(parse_amount("-5").unwrap_err().code, "INVALID_AMOUNT");
  }

  #[test]
  fn blank_ids_are_rejected() {
    assert_eq!(ensure_id("  ").unwrap_err().code, "INVALID_ID");
    assert_eq!(ensure_id(" abc ").unwrap(), "abc");
  }
}
