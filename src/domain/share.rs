use crate::models::{BillStatus, Language, PartialBill, UserProfile};

/// Plain-text summary for messaging apps. Works on drafts too, so every
/// field may be missing; name and phone fall back to the owner profile.
pub fn share_text(bill: &PartialBill, profile: &UserProfile, currency: &str, language: Language) -> String {
  let name = first_non_empty(&[bill.user_name.as_deref(), Some(profile.user_name.as_str())]).unwrap_or("N/A");
  let phone = first_non_empty(&[bill.user_phone.as_deref(), Some(profile.user_phone.as_str())]);
  let month = bill.month.map(|month| month.label(language)).unwrap_or("");
  let year = bill.year.map(|year| year.to_string()).unwrap_or_default();

  let mut lines = vec![
    "WiFi Bill Receipt".to_string(),
    "------------------".to_string(),
    format!("Provider: {}", or_na(bill.provider_name.as_deref())),
    format!("Amount: {}{}", currency, format_amount(bill.amount.unwrap_or(0.0))),
    format!("Status: {}", bill.status.unwrap_or(BillStatus::Pending)),
    format!("Month: {month} {year}").trim_end().to_string(),
    String::new(),
    "Customer Info:".to_string(),
    format!("Name: {name}"),
    format!("Customer ID: {}", or_na(bill.customer_id.as_deref())),
  ];
  if let Some(phone) = phone {
    lines.push(format!("Phone: {phone}"));
  }
  if let Some(due) = non_empty(bill.due_date.as_deref()) {
    lines.push(String::new());
    lines.push(format!("Due Date: {due}"));
  }
  if let Some(method) = non_empty(bill.payment_method.as_deref()) {
    lines.push(format!("Paid via: {method}"));
  }
  if let Some(notes) = non_empty(bill.notes.as_deref()) {
    lines.push(String::new());
    lines.push(format!("Notes: {notes}"));
  }
  lines.join("\n").trim().to_string()
}

pub fn format_amount(amount: f64) -> String {
  if amount.fract() == 0.0 {
    format!("{amount:.0}")
  } else {
    format!("{amount:.2}")
  }
}

fn or_na(value: Option<&str>) -> &str {
  non_empty(value).unwrap_or("N/A")
}

fn non_empty(value: Option<&str>) -> Option<&str> {
  value.filter(|value| !value.trim().is_empty())
}

fn first_non_empty<'a>(values: &[Option<&'a str>]) -> Option<&'a str> {
  values.iter().copied().find_map(non_empty)
}
