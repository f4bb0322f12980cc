use chrono::{DateTime, Local, TimeZone};
use tracing::warn;

use crate::domain::{ids, period};
use crate::models::{BillRecord, Month, PartialBill, UserProfile};

/// Builds a complete bill from partial input using the wall clock.
pub fn reconcile(partial: &PartialBill, bills: &[BillRecord], profile: &UserProfile) -> BillRecord {
  reconcile_at(partial, bills, profile, &Local::now())
}

/// Builds a complete bill from partial input.
///
/// A partial with an `id` is an edit: `id` and `createdAt` of the stored
/// record are kept and the issuer snapshot is carried over. Without an `id`
/// a new record is created and the issuer snapshot is frozen from `profile`.
/// Never fails: missing fields fall back to defaults.
pub fn reconcile_at<Tz: TimeZone>(
  partial: &PartialBill,
  bills: &[BillRecord],
  profile: &UserProfile,
  now: &DateTime<Tz>,
) -> BillRecord {
  let (month, year) = resolve_period(partial, now);
  let mut bill = BillRecord {
    id: String::new(),
    created_at: 0,
    month,
    year,
    billing_start_date: partial.billing_start_date.clone(),
    billing_end_date: partial.billing_end_date.clone(),
    due_date: partial.due_date.clone(),
    provider_name: partial.provider_name.clone().unwrap_or_default(),
    customer_id: partial.customer_id.clone().unwrap_or_default(),
    amount: partial.amount.filter(|value| value.is_finite()).unwrap_or(0.0),
    status: partial.status.unwrap_or_default(),
    payment_method: partial.payment_method.clone(),
    payment_date: partial.payment_date.clone(),
    notes: partial.notes.clone(),
    handwritten_image: partial.handwritten_image.clone(),
    company_name: non_empty(&partial.company_name),
    company_number: non_empty(&partial.company_number),
    company_address: non_empty(&partial.company_address),
    company_logo: None,
    user_name: None,
    user_phone: None,
    email: None,
    present_address: None,
    profile_photo: None,
  };

  match edit_id(partial) {
    Some(id) => {
      let existing = bills.iter().find(|candidate| candidate.id == id);
      if existing.is_none() {
        warn!(bill_id = %id, "edited bill is not in the collection, using current time as createdAt");
      }
      bill.id = id.to_string();
      bill.created_at = existing
        .map(|record| record.created_at)
        .unwrap_or_else(|| now.timestamp_millis());
      carry_snapshot(&mut bill, partial, existing);
    }
    None => {
      bill.id = ids::generate_bill_id();
      bill.created_at = now.timestamp_millis();
      freeze_snapshot(&mut bill, profile);
    }
  }

  bill
}

/// Month/year priority: parseable due date, then today for new bills, then
/// the supplied values, then today.
pub fn resolve_period<Tz: TimeZone>(partial: &PartialBill, now: &DateTime<Tz>) -> (Month, i32) {
  if let Some(date) = partial.due_date.as_deref().and_then(period::parse_date) {
    return period::period_of(date);
  }

  let (current_month, current_year) = period::current_period(now);
  if edit_id(partial).is_none() {
    return (current_month, current_year);
  }

  let month = partial.month.unwrap_or(current_month);
  let year = partial.year.filter(|value| *value > 0).unwrap_or(current_year);
  (month, year)
}

/// Replaces the record with the same id in place, otherwise puts the bill
/// first. Returns the new collection.
pub fn merge_into(bills: &[BillRecord], bill: BillRecord) -> Vec<BillRecord> {
  match bills.iter().position(|candidate| candidate.id == bill.id) {
    Some(idx) => {
      let mut next = bills.to_vec();
      next[idx] = bill;
      next
    }
    None => {
      let mut next = Vec::with_capacity(bills.len() + 1);
      next.push(bill);
      next.extend_from_slice(bills);
      next
    }
  }
}

/// Returns the collection without `id` and the removed record, if any.
pub fn remove_bill(bills: &[BillRecord], id: &str) -> (Vec<BillRecord>, Option<BillRecord>) {
  let removed = bills.iter().find(|bill| bill.id == id).cloned();
  let next = bills.iter().filter(|bill| bill.id != id).cloned().collect();
  (next, removed)
}

fn edit_id(partial: &PartialBill) -> Option<&str> {
  partial
    .id
    .as_deref()
    .map(str::trim)
    .filter(|value| !value.is_empty())
}

fn carry_snapshot(bill: &mut BillRecord, partial: &PartialBill, existing: Option<&BillRecord>) {
  let pick = |from_partial: &Option<String>, from_existing: fn(&BillRecord) -> &Option<String>| {
    non_empty(from_partial).or_else(|| existing.and_then(|record| non_empty(from_existing(record))))
  };

  bill.company_name = pick(&partial.company_name, |record| &record.company_name);
  bill.company_number = pick(&partial.company_number, |record| &record.company_number);
  bill.company_address = pick(&partial.company_address, |record| &record.company_address);
  bill.company_logo = pick(&partial.company_logo, |record| &record.company_logo);
  bill.user_name = pick(&partial.user_name, |record| &record.user_name);
  bill.user_phone = pick(&partial.user_phone, |record| &record.user_phone);
  bill.email = pick(&partial.email, |record| &record.email);
  bill.present_address = pick(&partial.present_address, |record| &record.present_address);
  bill.profile_photo = pick(&partial.profile_photo, |record| &record.profile_photo);
}

fn freeze_snapshot(bill: &mut BillRecord, profile: &UserProfile) {
  if bill.company_name.is_none() {
    bill.company_name = non_empty_str(&profile.company_name);
  }
  if bill.company_number.is_none() {
    bill.company_number = non_empty_str(&profile.company_number);
  }
  if bill.company_address.is_none() {
    bill.company_address = non_empty_str(&profile.company_address);
  }
  bill.company_logo = non_empty_str(&profile.company_logo);
  bill.user_name = non_empty_str(&profile.user_name);
  bill.user_phone = non_empty_str(&profile.user_phone);
  bill.email = non_empty_str(&profile.email);
  bill.present_address = non_empty_str(&profile.present_address);
  bill.profile_photo = non_empty_str(&profile.profile_photo);
}

fn non_empty(value: &Option<String>) -> Option<String> {
  value.as_deref().and_then(non_empty_str)
}

fn non_empty_str(value: &str) -> Option<String> {
  if value.trim().is_empty() {
    None
  } else {
    Some(value.to_string())
  }
}
