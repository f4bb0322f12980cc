use chrono::{DateTime, Local, TimeZone};
use tracing::info;

use crate::domain::{customers, ids, reconcile};
use crate::error::AppError;
use crate::models::{BillRecord, DeleteOutcome, PartialBill, ProfileUpdate, UserProfile};
use crate::store::BillStore;

/// Loads the owner's profile, creating and persisting one with a fresh
/// `userId` on first use.
pub fn load_or_init_profile(store: &dyn BillStore) -> Result<UserProfile, AppError> {
  match store.load_profile()? {
    Some(profile) if !profile.user_id.trim().is_empty() => Ok(profile),
    Some(mut profile) => {
      profile.user_id = ids::generate_user_id();
      store.save_profile(&profile)?;
      info!(user_id = %profile.user_id, "assigned missing user id");
      Ok(profile)
    }
    None => {
      let profile = UserProfile {
        user_id: ids::generate_user_id(),
        ..Default::default()
      };
      store.save_profile(&profile)?;
      info!(user_id = %profile.user_id, "created owner profile");
      Ok(profile)
    }
  }
}

pub fn update_profile(store: &dyn BillStore, update: ProfileUpdate) -> Result<UserProfile, AppError> {
  let current = load_or_init_profile(store)?;
  let next = UserProfile {
    user_id: current.user_id,
    company_name: update.company_name.unwrap_or(current.company_name),
    company_number: update.company_number.unwrap_or(current.company_number),
    company_address: update.company_address.unwrap_or(current.company_address),
    company_logo: update.company_logo.unwrap_or(current.company_logo),
    user_name: update.user_name.unwrap_or(current.user_name),
    user_phone: update.user_phone.unwrap_or(current.user_phone),
    email: update.email.unwrap_or(current.email),
    profile_photo: update.profile_photo.unwrap_or(current.profile_photo),
    role: update.role.unwrap_or(current.role),
    present_address: update.present_address.unwrap_or(current.present_address),
  };
  store.save_profile(&next)?;
  Ok(next)
}

pub fn save_bill(store: &dyn BillStore, partial: &PartialBill) -> Result<BillRecord, AppError> {
  save_bill_at(store, partial, &Local::now())
}

pub fn save_bill_at<Tz: TimeZone>(
  store: &dyn BillStore,
  partial: &PartialBill,
  now: &DateTime<Tz>,
) -> Result<BillRecord, AppError> {
  save_bill_with(store, partial, now, |_| Ok(()))
}

/// Reconciles `partial` against the stored collection, lets `prepare` adjust
/// the finished record (e.g. file the note image under its final id), merges
/// it by id and writes the whole collection back. Nothing is persisted when
/// `prepare` fails.
pub fn save_bill_with<Tz, F>(
  store: &dyn BillStore,
  partial: &PartialBill,
  now: &DateTime<Tz>,
  prepare: F,
) -> Result<BillRecord, AppError>
where
  Tz: TimeZone,
  F: FnOnce(&mut BillRecord) -> Result<(), AppError>,
{
  let bills = store.load_bills()?;
  let profile = load_or_init_profile(store)?;
  let mut bill = reconcile::reconcile_at(partial, &bills, &profile, now);
  prepare(&mut bill)?;
  let next = reconcile::merge_into(&bills, bill.clone());
  store.save_bills(&next)?;
  info!(bill_id = %bill.id, customer = %bill.customer_id, total = next.len(), "bill saved");
  Ok(bill)
}

pub fn delete_bill(store: &dyn BillStore, id: &str) -> Result<DeleteOutcome, AppError> {
  let bills = store.load_bills()?;
  let (next, removed) = reconcile::remove_bill(&bills, id);
  let Some(removed) = removed else {
    return Ok(DeleteOutcome {
      deleted: false,
      customer_id: None,
      customer_has_bills: false,
    });
  };

  store.save_bills(&next)?;
  let key = customers::customer_key(&removed.customer_id).to_string();
  let customer_has_bills = next
    .iter()
    .any(|bill| customers::customer_key(&bill.customer_id) == key);
  info!(bill_id = %id, customer = %key, remaining = next.len(), "bill deleted");
  Ok(DeleteOutcome {
    deleted: true,
    customer_id: Some(key),
    customer_has_bills,
  })
}

pub fn find_bill(store: &dyn BillStore, id: &str) -> Result<BillRecord, AppError> {
  store
    .load_bills()?
    .into_iter()
    .find(|bill| bill.id == id)
    .ok_or_else(|| AppError::not_found("bill", id))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  use crate::models::{BillStatus, Month};
  use crate::store::MemoryStore;

  fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap()
  }

  fn draft(customer: &str, amount: f64) -> PartialBill {
    PartialBill {
      provider_name: Some("Link3".into()),
      customer_id: Some(customer.into()),
      amount: Some(amount),
      status: Some(BillStatus::Due),
      ..Default::default()
    }
  }

  #[test]
  fn first_profile_load_assigns_stable_user_id() {
    let store = MemoryStore::default();
    let first = load_or_init_profile(&store).unwrap();
    let second = load_or_init_profile(&store).unwrap();
    assert_eq!(first.user_id.len(), 6);
    assert_eq!(first.user_id, second.user_id);
  }

  #[test]
  fn stored_profile_without_id_gets_one() {
    let store = MemoryStore::default();
    store
      .save_profile(&UserProfile {
        user_name: "Karim".into(),
        ..Default::default()
      })
      .unwrap();
    let profile = load_or_init_profile(&store).unwrap();
    assert!(!profile.user_id.is_empty());
    assert_eq!(profile.user_name, "Karim");
    assert_eq!(store.load_profile().unwrap().unwrap().user_id, profile.user_id);
  }

  #[test]
  fn profile_update_keeps_user_id() {
    let store = MemoryStore::default();
    let before = load_or_init_profile(&store).unwrap();
    let after = update_profile(
      &store,
      ProfileUpdate {
        company_name: Some("Notebook Net".into()),
        ..Default::default()
      },
    )
    .unwrap();
    assert_eq!(after.user_id, before.user_id);
    assert_eq!(after.company_name, "Notebook Net");
  }

  #[test]
  fn saves_prepend_and_edits_replace_in_place() {
    let store = MemoryStore::default();
    let first = save_bill_at(&store, &draft("C1", 500.0), &at(2024, 3, 1)).unwrap();
    let second = save_bill_at(&store, &draft("C2", 300.0), &at(2024, 3, 2)).unwrap();

    let ids: Vec<String> = store.load_bills().unwrap().into_iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![second.id.clone(), first.id.clone()]);

    let edit = PartialBill {
      id: Some(first.id.clone()),
      month: Some(Month::March),
      year: Some(2024),
      status: Some(BillStatus::Paid),
      ..draft("C1", 500.0)
    };
    let edited = save_bill_at(&store, &edit, &at(2024, 6, 1)).unwrap();
    assert_eq!(edited.created_at, first.created_at);
    assert_eq!(edited.status, BillStatus::Paid);

    let bills = store.load_bills().unwrap();
    assert_eq!(bills.len(), 2);
    assert_eq!(bills[1].id, first.id);
    assert_eq!(bills[1].status, BillStatus::Paid);
  }

  #[test]
  fn failed_preparation_leaves_collection_untouched() {
    let store = MemoryStore::default();
    save_bill_at(&store, &draft("C1", 500.0), &at(2024, 3, 1)).unwrap();
    let err = save_bill_with(&store, &draft("C2", 1.0), &at(2024, 3, 2), |_| {
      Err(AppError::new("IMAGE_NOT_FOUND", "missing"))
    })
    .unwrap_err();
    assert_eq!(err.code, "IMAGE_NOT_FOUND");
    assert_eq!(store.load_bills().unwrap().len(), 1);
  }

  #[test]
  fn delete_reports_whether_customer_keeps_bills() {
    let store = MemoryStore::default();
    let a = save_bill_at(&store, &draft("C1", 500.0), &at(2024, 3, 1)).unwrap();
    let b = save_bill_at(&store, &draft("C1", 300.0), &at(2024, 4, 1)).unwrap();

    let outcome = delete_bill(&store, &a.id).unwrap();
    assert!(outcome.deleted);
    assert_eq!(outcome.customer_id.as_deref(), Some("C1"));
    assert!(outcome.customer_has_bills);

    let outcome = delete_bill(&store, &b.id).unwrap();
    assert!(!outcome.customer_has_bills);
    assert!(store.load_bills().unwrap().is_empty());

    let outcome = delete_bill(&store, "missing").unwrap();
    assert!(!outcome.deleted);
  }

  #[test]
  fn blank_customer_deletes_under_unknown() {
    let store = MemoryStore::default();
    let bill = save_bill_at(&store, &draft("  ", 10.0), &at(2024, 1, 1)).unwrap();
    let outcome = delete_bill(&store, &bill.id).unwrap();
    assert_eq!(outcome.customer_id.as_deref(), Some(customers::UNKNOWN_CUSTOMER));
  }

  #[test]
  fn find_bill_reports_not_found() {
    let store = MemoryStore::default();
    let err = find_bill(&store, "nope").unwrap_err();
    assert_eq!(err.code, "NOT_FOUND");
  }
}
