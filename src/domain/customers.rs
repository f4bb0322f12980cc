use std::collections::HashMap;

use crate::models::{BillRecord, BillStatus, CustomerProfile, StatusFilter};

pub const UNKNOWN_CUSTOMER: &str = "UNKNOWN";

/// Ordering key for "most recent": `createdAt`, then the larger bill id.
type Stamp = (i64, String);

struct Accumulator {
  customer_id: String,
  total_bills: usize,
  total_due: f64,
  total_paid: f64,
  bills: Vec<BillRecord>,
  newest: Option<Stamp>,
  provider: Option<(Stamp, String)>,
  name: Option<(Stamp, String)>,
  phone: Option<(Stamp, String)>,
}

impl Accumulator {
  fn new(customer_id: String) -> Self {
    Self {
      customer_id,
      total_bills: 0,
      total_due: 0.0,
      total_paid: 0.0,
      bills: Vec::new(),
      newest: None,
      provider: None,
      name: None,
      phone: None,
    }
  }

  fn add(&mut self, bill: &BillRecord) {
    self.total_bills += 1;
    if bill.status == BillStatus::Paid {
      self.total_paid += bill.amount;
    } else {
      self.total_due += bill.amount;
    }

    let stamp: Stamp = (bill.created_at, bill.id.clone());
    if self.newest.as_ref().map_or(true, |newest| stamp > *newest) {
      self.newest = Some(stamp.clone());
    }
    keep_latest(&mut self.provider, &stamp, Some(bill.provider_name.as_str()));
    keep_latest(&mut self.name, &stamp, bill.user_name.as_deref());
    keep_latest(&mut self.phone, &stamp, bill.user_phone.as_deref());
    self.bills.push(bill.clone());
  }

  fn finish(self) -> CustomerProfile {
    CustomerProfile {
      customer_id: self.customer_id,
      provider_name: self.provider.map(|(_, value)| value).unwrap_or_default(),
      latest_name: self.name.map(|(_, value)| value).unwrap_or_default(),
      latest_phone: self.phone.map(|(_, value)| value).unwrap_or_default(),
      total_bills: self.total_bills,
      total_due: self.total_due,
      total_paid: self.total_paid,
      bills: self.bills,
      last_active: self.newest.map(|(created_at, _)| created_at).unwrap_or(0),
    }
  }
}

/// Only non-empty values compete, so a newer bill with a blank phone never
/// hides a phone known from an older bill.
fn keep_latest(slot: &mut Option<(Stamp, String)>, stamp: &Stamp, candidate: Option<&str>) {
  let Some(value) = candidate.filter(|value| !value.trim().is_empty()) else {
    return;
  };
  if slot.as_ref().map_or(true, |(current, _)| stamp > current) {
    *slot = Some((stamp.clone(), value.to_string()));
  }
}

pub fn customer_key(customer_id: &str) -> &str {
  if customer_id.trim().is_empty() {
    UNKNOWN_CUSTOMER
  } else {
    customer_id
  }
}

/// One profile per customer id, most recently active first. Customers with
/// the same `lastActive` keep the order in which they first appear in
/// `bills`. Each profile's `bills` keep collection order.
pub fn compute_customer_profiles(bills: &[BillRecord]) -> Vec<CustomerProfile> {
  let mut index: HashMap<String, usize> = HashMap::new();
  let mut accumulators: Vec<Accumulator> = Vec::new();

  for bill in bills {
    let key = customer_key(&bill.customer_id);
    let slot = match index.get(key) {
      Some(slot) => *slot,
      None => {
        accumulators.push(Accumulator::new(key.to_string()));
        index.insert(key.to_string(), accumulators.len() - 1);
        accumulators.len() - 1
      }
    };
    accumulators[slot].add(bill);
  }

  let mut profiles: Vec<CustomerProfile> = accumulators.into_iter().map(Accumulator::finish).collect();
  profiles.sort_by(|a, b| b.last_active.cmp(&a.last_active));
  profiles
}

pub fn matches_query(profile: &CustomerProfile, query: &str) -> bool {
  let needle = query.trim().to_lowercase();
  if needle.is_empty() {
    return true;
  }
  [
    &profile.customer_id,
    &profile.latest_name,
    &profile.latest_phone,
    &profile.provider_name,
  ]
  .iter()
  .any(|field| field.to_lowercase().contains(&needle))
}

pub fn matches_status(profile: &CustomerProfile, filter: StatusFilter) -> bool {
  match filter {
    StatusFilter::All => true,
    StatusFilter::Due => profile.total_due > 0.0,
    StatusFilter::Paid => profile.total_due <= 0.0,
  }
}

pub fn filter_customers(profiles: &[CustomerProfile], query: &str, filter: StatusFilter) -> Vec<CustomerProfile> {
  profiles
    .iter()
    .filter(|profile| matches_query(profile, query) && matches_status(profile, filter))
    .cloned()
    .collect()
}

/// Profile of one customer with its bills newest first.
pub fn customer_detail(bills: &[BillRecord], customer_id: &str) -> Option<CustomerProfile> {
  let key = customer_key(customer_id);
  let own: Vec<BillRecord> = bills
    .iter()
    .filter(|bill| customer_key(&bill.customer_id) == key)
    .cloned()
    .collect();
  let mut profile = compute_customer_profiles(&own).into_iter().next()?;
  profile.bills.sort_by(|a, b| b.created_at.cmp(&a.created_at));
  Some(profile)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::Month;

  fn bill(id: &str, customer: &str, amount: f64, status: BillStatus, created_at: i64) -> BillRecord {
    BillRecord {
      id: id.to_string(),
      created_at,
      month: Month::May,
      year: 2024,
      billing_start_date: None,
      billing_end_date: None,
      due_date: None,
      provider_name: "Link3".to_string(),
      customer_id: customer.to_string(),
      amount,
      status,
      payment_method: None,
      payment_date: None,
      notes: None,
      handwritten_image: None,
      company_name: None,
      company_number: None,
      company_address: None,
      company_logo: None,
      user_name: None,
      user_phone: None,
      email: None,
      present_address: None,
      profile_photo: None,
    }
  }

  fn named(mut bill: BillRecord, name: &str, phone: &str) -> BillRecord {
    bill.user_name = Some(name.to_string());
    bill.user_phone = Some(phone.to_string());
    bill
  }

  #[test]
  fn scenario_two_bills_one_customer() {
    let a = bill("a", "C1", 500.0, BillStatus::Due, 100);
    let mut b = bill("b", "C1", 300.0, BillStatus::Paid, 200);
    b.user_name = Some("Rahim".to_string());

    let profiles = compute_customer_profiles(&[a, b]);
    assert_eq!(profiles.len(), 1);
    let c1 = &profiles[0];
    assert_eq!(c1.customer_id, "C1");
    assert_eq!(c1.total_due, 500.0);
    assert_eq!(c1.total_paid, 300.0);
    assert_eq!(c1.total_bills, 2);
    assert_eq!(c1.last_active, 200);
    assert_eq!(c1.latest_name, "Rahim");

    assert_eq!(filter_customers(&profiles, "", StatusFilter::Due).len(), 1);
    assert!(filter_customers(&profiles, "", StatusFilter::Paid).is_empty());
  }

  #[test]
  fn totals_cover_every_bill() {
    let bills = vec![
      bill("1", "C1", 100.0, BillStatus::Paid, 10),
      bill("2", "C2", 250.0, BillStatus::Pending, 20),
      bill("3", "C1", 75.5, BillStatus::Due, 30),
      bill("4", "", 40.0, BillStatus::Due, 5),
      bill("5", "C2", 10.0, BillStatus::Paid, 15),
    ];
    let profiles = compute_customer_profiles(&bills);
    assert_eq!(profiles.len(), 3);
    for profile in &profiles {
      let own: Vec<&BillRecord> = bills
        .iter()
        .filter(|bill| customer_key(&bill.customer_id) == profile.customer_id)
        .collect();
      let sum: f64 = own.iter().map(|bill| bill.amount).sum();
      assert_eq!(profile.total_bills, own.len());
      assert!((profile.total_due + profile.total_paid - sum).abs() < 1e-9);
      assert_eq!(profile.last_active, own.iter().map(|bill| bill.created_at).max().unwrap());
    }
    assert!(profiles.iter().any(|profile| profile.customer_id == UNKNOWN_CUSTOMER));
  }

  #[test]
  fn profiles_sorted_by_last_activity() {
    let bills = vec![
      bill("1", "OLD", 1.0, BillStatus::Due, 10),
      bill("2", "NEW", 1.0, BillStatus::Due, 50),
      bill("3", "MID", 1.0, BillStatus::Due, 30),
    ];
    let ids: Vec<String> = compute_customer_profiles(&bills)
      .into_iter()
      .map(|profile| profile.customer_id)
      .collect();
    assert_eq!(ids, vec!["NEW", "MID", "OLD"]);
  }

  #[test]
  fn equal_activity_keeps_first_seen_order() {
    let bills = vec![
      bill("1", "B", 1.0, BillStatus::Due, 10),
      bill("2", "A", 1.0, BillStatus::Due, 10),
    ];
    let ids: Vec<String> = compute_customer_profiles(&bills)
      .into_iter()
      .map(|profile| profile.customer_id)
      .collect();
    assert_eq!(ids, vec!["B", "A"]);
  }

  #[test]
  fn latest_contact_comes_from_newest_bill_regardless_of_order() {
    let old = named(bill("1", "C1", 1.0, BillStatus::Due, 100), "Old Name", "0111");
    let new = named(bill("2", "C1", 1.0, BillStatus::Due, 300), "New Name", "");
    let mid = named(bill("3", "C1", 1.0, BillStatus::Due, 200), "Mid Name", "0222");

    let forward = compute_customer_profiles(&[old.clone(), mid.clone(), new.clone()]);
    let backward = compute_customer_profiles(&[new, mid, old]);
    for profiles in [forward, backward] {
      assert_eq!(profiles[0].latest_name, "New Name");
      assert_eq!(profiles[0].latest_phone, "0222");
      assert_eq!(profiles[0].last_active, 300);
    }
  }

  #[test]
  fn equal_timestamps_prefer_larger_id() {
    let a = named(bill("a", "C1", 1.0, BillStatus::Due, 100), "From A", "1");
    let z = named(bill("z", "C1", 1.0, BillStatus::Due, 100), "From Z", "2");
    assert_eq!(compute_customer_profiles(&[z.clone(), a.clone()])[0].latest_name, "From Z");
    assert_eq!(compute_customer_profiles(&[a, z])[0].latest_name, "From Z");
  }

  #[test]
  fn blank_provider_does_not_replace_known_one() {
    let old = bill("1", "C1", 1.0, BillStatus::Due, 100);
    let mut new = bill("2", "C1", 1.0, BillStatus::Due, 200);
    new.provider_name = String::new();
    assert_eq!(compute_customer_profiles(&[old, new])[0].provider_name, "Link3");
  }

  #[test]
  fn query_matches_any_field_case_insensitively() {
    let bills = vec![
      named(bill("1", "C-100", 1.0, BillStatus::Due, 1), "Rahim Uddin", "01711"),
      named(bill("2", "C-200", 1.0, BillStatus::Paid, 2), "Karim", "01822"),
    ];
    let profiles = compute_customer_profiles(&bills);
    assert_eq!(filter_customers(&profiles, "rahim", StatusFilter::All).len(), 1);
    assert_eq!(filter_customers(&profiles, "c-2", StatusFilter::All)[0].latest_name, "Karim");
    assert_eq!(filter_customers(&profiles, "018", StatusFilter::All).len(), 1);
    assert_eq!(filter_customers(&profiles, "LINK3", StatusFilter::All).len(), 2);
    assert!(filter_customers(&profiles, "nobody", StatusFilter::All).is_empty());
  }

  #[test]
  fn filters_compose_and_empty_query_returns_all_in_order() {
    let bills = vec![
      bill("1", "C1", 100.0, BillStatus::Due, 1),
      bill("2", "C2", 100.0, BillStatus::Paid, 2),
      bill("3", "C3", 0.0, BillStatus::Pending, 3),
      bill("4", "C4", 20.0, BillStatus::Pending, 4),
    ];
    let profiles = compute_customer_profiles(&bills);
    assert_eq!(filter_customers(&profiles, "", StatusFilter::All), profiles);

    let all = filter_customers(&profiles, "c", StatusFilter::All);
    let due = filter_customers(&profiles, "c", StatusFilter::Due);
    let paid = filter_customers(&profiles, "c", StatusFilter::Paid);
    assert!(due.iter().all(|profile| all.contains(profile)));
    assert_eq!(due.len() + paid.len(), all.len());
    let paid_ids: Vec<&str> = paid.iter().map(|profile| profile.customer_id.as_str()).collect();
    assert_eq!(paid_ids, vec!["C3", "C2"]);
  }

  #[test]
  fn detail_sorts_bills_newest_first() {
    let bills = vec![
      bill("1", "C1", 1.0, BillStatus::Due, 10),
      bill("2", "C2", 1.0, BillStatus::Due, 20),
      bill("3", "C1", 1.0, BillStatus::Due, 30),
    ];
    let detail = customer_detail(&bills, "C1").unwrap();
    let ids: Vec<&str> = detail.bills.iter().map(|bill| bill.id.as_str()).collect();
    assert_eq!(ids, vec!["3", "1"]);
    assert!(customer_detail(&bills, "C9").is_none());
  }
}
