use std::collections::BTreeMap;

use crate::domain::customers;
use crate::models::{BillRecord, BillStatus, DashboardSummary, YearBills};

/// Overview numbers for the home screen. `total_due` counts only bills in
/// status Due; pending bills are reported separately.
pub fn dashboard(bills: &[BillRecord], current_year: i32) -> DashboardSummary {
  let mut total_paid = 0.0;
  let mut total_due = 0.0;
  let mut total_pending = 0.0;
  let mut by_year: BTreeMap<i32, Vec<BillRecord>> = BTreeMap::new();

  for bill in bills {
    match bill.status {
      BillStatus::Paid => total_paid += bill.amount,
      BillStatus::Due => total_due += bill.amount,
      BillStatus::Pending => total_pending += bill.amount,
    }
    by_year.entry(bill.year).or_default().push(bill.clone());
  }

  let mut years: Vec<i32> = by_year.keys().rev().copied().collect();
  if years.is_empty() {
    years.push(current_year);
  }

  let by_year = by_year
    .into_iter()
    .rev()
    .map(|(year, bills)| YearBills { year, bills })
    .collect();

  DashboardSummary {
    bill_count: bills.len(),
    customer_count: customers::compute_customer_profiles(bills).len(),
    total_paid,
    total_due,
    total_pending,
    years,
    by_year,
  }
}

/// Bills of one year, collection order kept.
pub fn bills_for_year(bills: &[BillRecord], year: Option<i32>) -> Vec<BillRecord> {
  match year {
    Some(year) => bills.iter().filter(|bill| bill.year == year).cloned().collect(),
    None => bills.to_vec(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn bill(id: &str, customer: &str, year: i32, amount: f64, status: &str) -> BillRecord {
    serde_json::from_value(serde_json::json!({
      "id": id,
      "createdAt": 1,
      "month": "January",
      "year": year,
      "providerName": "Link3",
      "customerId": customer,
      "amount": amount,
      "status": status
    }))
    .unwrap()
  }

  #[test]
  fn totals_split_by_status_and_years_descend() {
    let bills = vec![
      bill("a", "C1", 2023, 500.0, "Paid"),
      bill("b", "C1", 2024, 300.0, "Due"),
      bill("c", "C2", 2024, 200.0, "Pending"),
    ];
    let summary = dashboard(&bills, 2025);
    assert_eq!(summary.bill_count, 3);
    assert_eq!(summary.customer_count, 2);
    assert_eq!(summary.total_paid, 500.0);
    assert_eq!(summary.total_due, 300.0);
    assert_eq!(summary.total_pending, 200.0);
    assert_eq!(summary.years, vec![2024, 2023]);
    assert_eq!(summary.by_year[0].year, 2024);
    assert_eq!(summary.by_year[0].bills.len(), 2);
  }

  #[test]
  fn empty_collection_shows_current_year() {
    let summary = dashboard(&[], 2025);
    assert_eq!(summary.years, vec![2025]);
    assert!(summary.by_year.is_empty());
    assert_eq!(summary.total_due, 0.0);
  }

  #[test]
  fn year_filter_keeps_order() {
    let bills = vec![bill("a", "C1", 2024, 1.0, "Paid"), bill("b", "C1", 2023, 1.0, "Paid"), bill("c", "C1", 2024, 1.0, "Paid")];
    let ids: Vec<String> = bills_for_year(&bills, Some(2024)).into_iter().map(|b| b.id).collect();
    assert_eq!(ids, vec!["a", "c"]);
    assert_eq!(bills_for_year(&bills, None).len(), 3);
  }
}
