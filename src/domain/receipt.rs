use serde::Serialize;

use crate::domain::share::format_amount;
use crate::error::AppError;
use crate::models::{BillRecord, Language, UserProfile};

/// Issuer and bill fields a receipt shows. The bill's own snapshot wins;
/// bills saved before a field existed fall back to the current profile.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptView {
  pub file_name: String,
  pub bill: BillRecord,
  pub company_name: Option<String>,
  pub company_number: Option<String>,
  pub company_address: Option<String>,
  pub company_logo: Option<String>,
  pub user_name: Option<String>,
  pub user_phone: Option<String>,
  pub email: Option<String>,
  pub present_address: Option<String>,
  pub profile_photo: Option<String>,
  pub qr_payload: String,
}

impl ReceiptView {
  pub fn resolve(bill: &BillRecord, profile: &UserProfile) -> ReceiptView {
    ReceiptView {
      file_name: receipt_file_name(bill),
      bill: bill.clone(),
      company_name: fallback(&bill.company_name, &profile.company_name),
      company_number: fallback(&bill.company_number, &profile.company_number),
      company_address: fallback(&bill.company_address, &profile.company_address),
      company_logo: fallback(&bill.company_logo, &profile.company_logo),
      user_name: fallback(&bill.user_name, &profile.user_name),
      user_phone: fallback(&bill.user_phone, &profile.user_phone),
      email: fallback(&bill.email, &profile.email),
      present_address: fallback(&bill.present_address, &profile.present_address),
      profile_photo: fallback(&bill.profile_photo, &profile.profile_photo),
      qr_payload: crate::qr::encode_payload(bill),
    }
  }
}

/// PDF rendering collaborator.
pub trait ReceiptRenderer {
  fn render(&self, view: &ReceiptView, language: Language) -> Result<Vec<u8>, AppError>;
}

/// Plain-text stand-in for the PDF renderer, used for printing from a
/// terminal and for previews.
pub struct TextReceiptRenderer {
  pub currency: String,
}

impl ReceiptRenderer for TextReceiptRenderer {
  fn render(&self, view: &ReceiptView, language: Language) -> Result<Vec<u8>, AppError> {
    let bill = &view.bill;
    let mut lines = Vec::new();
    if let Some(company) = view.company_name.as_deref() {
      lines.push(company.to_string());
    }
    for extra in [&view.company_address, &view.company_number] {
      if let Some(value) = extra.as_deref() {
        lines.push(value.to_string());
      }
    }
    lines.push("=".repeat(32));
    lines.push(format!("Bill: {} {}", bill.month.label(language), bill.year));
    lines.push(format!("Provider: {}", bill.provider_name));
    lines.push(format!("Customer ID: {}", bill.customer_id));
    if let Some(name) = view.user_name.as_deref() {
      lines.push(format!("Name: {name}"));
    }
    if let Some(phone) = view.user_phone.as_deref() {
      lines.push(format!("Phone: {phone}"));
    }
    if let (Some(start), Some(end)) = (bill.billing_start_date.as_deref(), bill.billing_end_date.as_deref()) {
      lines.push(format!("Period: {start} - {end}"));
    }
    if let Some(due) = bill.due_date.as_deref() {
      lines.push(format!("Due Date: {due}"));
    }
    lines.push("-".repeat(32));
    lines.push(format!("Amount: {}{}", self.currency, format_amount(bill.amount)));
    lines.push(format!("Status: {}", bill.status));
    if let Some(method) = bill.payment_method.as_deref() {
      lines.push(format!("Paid via: {method}"));
    }
    if let Some(notes) = bill.notes.as_deref() {
      lines.push(format!("Notes: {notes}"));
    }
    lines.push(String::new());
    lines.push(format!("QR: {}", view.qr_payload));
    Ok(lines.join("\n").into_bytes())
  }
}

pub fn receipt_file_name(bill: &BillRecord) -> String {
  let provider: String = bill
    .provider_name
    .chars()
    .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
    .collect();
  format!("Bill_{}_{}.pdf", provider, bill.month.name())
}

fn fallback(own: &Option<String>, current: &str) -> Option<String> {
  match own.as_deref() {
    Some(value) if !value.trim().is_empty() => Some(value.to_string()),
    _ if !current.trim().is_empty() => Some(current.to_string()),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{BillStatus, Month, PartialBill};
  use crate::domain::reconcile::reconcile;

  #[test]
  fn snapshot_wins_and_gaps_fall_back_to_profile() {
    let mut bill = reconcile(
      &PartialBill {
        provider_name: Some("Amber IT".into()),
        amount: Some(800.0),
        status: Some(BillStatus::Due),
        due_date: Some("2024-08-05".into()),
        ..Default::default()
      },
      &[],
      &UserProfile::default(),
    );
    bill.company_name = Some("Old Co".into());

    let profile = UserProfile {
      company_name: "New Co".into(),
      user_phone: "0199".into(),
      ..Default::default()
    };
    let view = ReceiptView::resolve(&bill, &profile);
    assert_eq!(view.company_name.as_deref(), Some("Old Co"));
    assert_eq!(view.user_phone.as_deref(), Some("0199"));
    assert!(view.email.is_none());
    assert_eq!(view.file_name, "Bill_Amber_IT_August.pdf");
    assert_eq!(bill.month, Month::August);
    assert!(view.qr_payload.contains("\"p\":\"Amber IT\""));
  }

  #[test]
  fn text_renderer_prints_bangla_month_and_currency() {
    let bill = reconcile(
      &PartialBill {
        provider_name: Some("Link3".into()),
        customer_id: Some("C7".into()),
        amount: Some(1200.0),
        due_date: Some("2024-01-15".into()),
        ..Default::default()
      },
      &[],
      &UserProfile {
        company_name: "Notebook Net".into(),
        ..Default::default()
      },
    );
    let view = ReceiptView::resolve(&bill, &UserProfile::default());
    let renderer = TextReceiptRenderer { currency: "৳".into() };
    let text = String::from_utf8(renderer.render(&view, Language::Bn).unwrap()).unwrap();
    assert!(text.starts_with("Notebook Net"));
    assert!(text.contains("জানুয়ারি 2024"));
    assert!(text.contains("Amount: ৳1200"));
  }
}
