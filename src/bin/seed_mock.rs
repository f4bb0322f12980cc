use std::path::PathBuf;

use chrono::{Duration, Local, NaiveDate};
use rand::Rng;
use tracing::info;

use wifi_bill_notebook::db;
use wifi_bill_notebook::domain::reconcile;
use wifi_bill_notebook::error::AppError;
use wifi_bill_notebook::init_tracing;
use wifi_bill_notebook::ledger;
use wifi_bill_notebook::models::{BillRecord, BillStatus, PartialBill, UserProfile};
use wifi_bill_notebook::store::BillStore;

const PROVIDERS: [&str; 5] = ["Link3", "Amber IT", "Carnival", "Dot Internet", "BDCOM"];
const NAMES: [&str; 8] = ["Rahim", "Karim", "Nusrat", "Tania", "Sabbir", "Farhana", "Jamal", "Mitu"];
const METHODS: [&str; 3] = ["bKash", "Nagad", "Cash"];

fn main() -> Result<(), Box<dyn std::error::Error>> {
  init_tracing();
  let count = std::env::args()
    .nth(1)
    .and_then(|value| value.parse::<usize>().ok())
    .unwrap_or(200);

  let app_dir = if let Ok(path) = std::env::var("WIFI_NOTEBOOK_SEED_DIR") {
    PathBuf::from(path)
  } else {
    db::resolve_app_dir()?
  };

  let (db, _image_base) = db::init_db(&app_dir)?;
  let created = seed_mock_bills(&db, count)?;

  println!("Seeded {} bills in {}", created, app_dir.display());
  Ok(())
}

fn seed_mock_bills(store: &dyn BillStore, count: usize) -> Result<usize, AppError> {
  let profile = ledger::load_or_init_profile(store)?;
  let mut bills: Vec<BillRecord> = store.load_bills()?;
  let mut rng = rand::thread_rng();
  let today = Local::now();

  // One customer id per name so aggregation has something to group.
  let customers: Vec<(String, String, &str)> = (0..NAMES.len())
    .map(|idx| {
      (
        format!("C-{:03}", idx + 1),
        format!("01{}", rng.gen_range(300_000_000u32..999_999_999)),
        PROVIDERS[idx % PROVIDERS.len()],
      )
    })
    .collect();

  for _ in 0..count {
    let idx = rng.gen_range(0..customers.len());
    let (customer_id, phone, provider) = &customers[idx];
    let days_back = rng.gen_range(0..720);
    let now = today - Duration::days(days_back);
    let due: NaiveDate = now.date_naive() + Duration::days(rng.gen_range(5..20));
    let status = match rng.gen_range(0..100) {
      0..=59 => BillStatus::Paid,
      60..=84 => BillStatus::Due,
      _ => BillStatus::Pending,
    };
    let amount = (rng.gen_range(500..3000) / 50 * 50) as f64;

    let partial = PartialBill {
      provider_name: Some(provider.to_string()),
      customer_id: Some(customer_id.clone()),
      amount: Some(amount),
      status: Some(status),
      due_date: Some(due.format("%Y-%m-%d").to_string()),
      payment_method: (status == BillStatus::Paid).then(|| METHODS[rng.gen_range(0..METHODS.len())].to_string()),
      notes: Some("Demo".to_string()),
      ..Default::default()
    };
    // New bills snapshot the profile, so vary it to get distinct names.
    let owner = UserProfile {
      user_name: NAMES[idx].to_string(),
      user_phone: phone.clone(),
      ..profile.clone()
    };
    let bill = reconcile::reconcile_at(&partial, &bills, &owner, &now);
    bills = reconcile::merge_into(&bills, bill);
  }

  bills.sort_by(|a, b| b.created_at.cmp(&a.created_at));
  store.save_bills(&bills)?;
  info!(count, total = bills.len(), "demo bills written");
  Ok(count)
}
