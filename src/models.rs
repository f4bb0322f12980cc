use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum BillStatus {
  Paid,
  Due,
  #[default]
  Pending,
}

impl BillStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      BillStatus::Paid => "Paid",
      BillStatus::Due => "Due",
      BillStatus::Pending => "Pending",
    }
  }
}

impl fmt::Display for BillStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for BillStatus {
  type Err = AppError;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.trim().to_ascii_lowercase().as_str() {
      "paid" => Ok(BillStatus::Paid),
      "due" => Ok(BillStatus::Due),
      "pending" => Ok(BillStatus::Pending),
      _ => Err(AppError::new(
        "INVALID_STATUS",
        format!("Status must be Paid, Due or Pending, got '{value}'"),
      )),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Month {
  January,
  February,
  March,
  April,
  May,
  June,
  July,
  August,
  September,
  October,
  November,
  December,
}

const MONTH_NAMES_EN: [&str; 12] = [
  "January", "February", "March", "April", "May", "June",
  "July", "August", "September", "October", "November", "December",
];

const MONTH_NAMES_BN: [&str; 12] = [
  "জানুয়ারি", "ফেব্রুয়ারি", "মার্চ", "এপ্রিল", "মে", "জুন",
  "জুলাই", "আগস্ট", "সেপ্টেম্বর", "অক্টোবর", "নভেম্বর", "ডিসেম্বর",
];

impl Month {
  pub const ALL: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
  ];

  /// 1-based calendar number; `None` outside 1..=12.
  pub fn from_number(number: u32) -> Option<Month> {
    if (1..=12).contains(&number) {
      Some(Month::ALL[(number - 1) as usize])
    } else {
      None
    }
  }

  pub fn number(&self) -> u32 {
    *self as u32 + 1
  }

  pub fn name(&self) -> &'static str {
    MONTH_NAMES_EN[*self as usize]
  }

  pub fn label(&self, language: Language) -> &'static str {
    match language {
      Language::En => MONTH_NAMES_EN[*self as usize],
      Language::Bn => MONTH_NAMES_BN[*self as usize],
    }
  }

  /// Accepts English names (any case, three-letter abbreviations included)
  /// and the Bangla names.
  pub fn from_name(value: &str) -> Option<Month> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
      return None;
    }
    let lower = trimmed.to_lowercase();
    for (idx, name) in MONTH_NAMES_EN.iter().enumerate() {
      let name_lower = name.to_lowercase();
      if name_lower == lower || (lower.len() == 3 && name_lower.starts_with(&lower)) {
        return Some(Month::ALL[idx]);
      }
    }
    MONTH_NAMES_BN
      .iter()
      .position(|name| *name == trimmed)
      .map(|idx| Month::ALL[idx])
  }
}

impl fmt::Display for Month {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl Serialize for Month {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.name())
  }
}

impl<'de> Deserialize<'de> for Month {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Month::from_name(&raw).ok_or_else(|| serde::de::Error::custom(format!("unknown month '{raw}'")))
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
  #[default]
  #[serde(rename = "EN")]
  En,
  #[serde(rename = "BN")]
  Bn,
}

impl Language {
  pub fn code(&self) -> &'static str {
    match self {
      Language::En => "EN",
      Language::Bn => "BN",
    }
  }

  pub fn parse(value: &str) -> Option<Language> {
    match value.trim().to_ascii_uppercase().as_str() {
      "EN" => Some(Language::En),
      "BN" => Some(Language::Bn),
      _ => None,
    }
  }
}

/// One billing-cycle entry. Serialized with the camelCase keys of the
/// `wifi_bills_v1` record.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BillRecord {
  pub id: String,
  pub created_at: i64,
  pub month: Month,
  pub year: i32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub billing_start_date: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub billing_end_date: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub due_date: Option<String>,
  #[serde(default)]
  pub provider_name: String,
  #[serde(default)]
  pub customer_id: String,
  #[serde(default)]
  pub amount: f64,
  #[serde(default)]
  pub status: BillStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub payment_method: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub payment_date: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub handwritten_image: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub company_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub company_number: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub company_address: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub company_logo: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user_phone: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub present_address: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub profile_photo: Option<String>,
}

/// Bill input from a form, a scan or a QR payload. Every field may be absent.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialBill {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub month: Option<Month>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub year: Option<i32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub billing_start_date: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub billing_end_date: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub due_date: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub provider_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub customer_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub amount: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<BillStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub payment_method: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub payment_date: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub handwritten_image: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub company_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub company_number: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub company_address: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub company_logo: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user_phone: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub present_address: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub profile_photo: Option<String>,
}

impl PartialBill {
  /// Fields present in `other` replace the ones in `self`.
  pub fn overlay(self, other: PartialBill) -> PartialBill {
    PartialBill {
      id: other.id.or(self.id),
      month: other.month.or(self.month),
      year: other.year.or(self.year),
      billing_start_date: other.billing_start_date.or(self.billing_start_date),
      billing_end_date: other.billing_end_date.or(self.billing_end_date),
      due_date: other.due_date.or(self.due_date),
      provider_name: other.provider_name.or(self.provider_name),
      customer_id: other.customer_id.or(self.customer_id),
      amount: other.amount.or(self.amount),
      status: other.status.or(self.status),
      payment_method: other.payment_method.or(self.payment_method),
      payment_date: other.payment_date.or(self.payment_date),
      notes: other.notes.or(self.notes),
      handwritten_image: other.handwritten_image.or(self.handwritten_image),
      company_name: other.company_name.or(self.company_name),
      company_number: other.company_number.or(self.company_number),
      company_address: other.company_address.or(self.company_address),
      company_logo: other.company_logo.or(self.company_logo),
      user_name: other.user_name.or(self.user_name),
      user_phone: other.user_phone.or(self.user_phone),
      email: other.email.or(self.email),
      present_address: other.present_address.or(self.present_address),
      profile_photo: other.profile_photo.or(self.profile_photo),
    }
  }
}

impl From<&BillRecord> for PartialBill {
  fn from(bill: &BillRecord) -> Self {
    PartialBill {
      id: Some(bill.id.clone()),
      month: Some(bill.month),
      year: Some(bill.year),
      billing_start_date: bill.billing_start_date.clone(),
      billing_end_date: bill.billing_end_date.clone(),
      due_date: bill.due_date.clone(),
      provider_name: Some(bill.provider_name.clone()),
      customer_id: Some(bill.customer_id.clone()),
      amount: Some(bill.amount),
      status: Some(bill.status),
      payment_method: bill.payment_method.clone(),
      payment_date: bill.payment_date.clone(),
      notes: bill.notes.clone(),
      handwritten_image: bill.handwritten_image.clone(),
      company_name: bill.company_name.clone(),
      company_number: bill.company_number.clone(),
      company_address: bill.company_address.clone(),
      company_logo: bill.company_logo.clone(),
      user_name: bill.user_name.clone(),
      user_phone: bill.user_phone.clone(),
      email: bill.email.clone(),
      present_address: bill.present_address.clone(),
      profile_photo: bill.profile_photo.clone(),
    }
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserRole {
  #[default]
  User,
  Admin,
}

/// The app owner. Persisted as `wifi_user_profile_v2`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
  pub user_id: String,
  pub company_name: String,
  pub company_number: String,
  pub company_address: String,
  pub company_logo: String,
  pub user_name: String,
  pub user_phone: String,
  pub email: String,
  pub profile_photo: String,
  pub role: UserRole,
  pub present_address: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileUpdate {
  pub company_name: Option<String>,
  pub company_number: Option<String>,
  pub company_address: Option<String>,
  pub company_logo: Option<String>,
  pub user_name: Option<String>,
  pub user_phone: Option<String>,
  pub email: Option<String>,
  pub profile_photo: Option<String>,
  pub role: Option<UserRole>,
  pub present_address: Option<String>,
}

/// Derived per-customer aggregate; never persisted.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
  pub customer_id: String,
  pub provider_name: String,
  pub latest_name: String,
  pub latest_phone: String,
  pub total_bills: usize,
  pub total_due: f64,
  pub total_paid: f64,
  pub bills: Vec<BillRecord>,
  pub last_active: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
  #[default]
  All,
  Due,
  Paid,
}

impl FromStr for StatusFilter {
  type Err = AppError;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.trim().to_ascii_lowercase().as_str() {
      "" | "all" => Ok(StatusFilter::All),
      "due" => Ok(StatusFilter::Due),
      "paid" => Ok(StatusFilter::Paid),
      _ => Err(AppError::new(
        "INVALID_FILTER",
        format!("Filter must be all, due or paid, got '{value}'"),
      )),
    }
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
  pub deleted: bool,
  pub customer_id: Option<String>,
  pub customer_has_bills: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
  pub language: Language,
  pub currency_symbol: String,
  pub image_base_folder: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SettingsUpdate {
  pub language: Option<Language>,
  pub currency_symbol: Option<String>,
  pub image_base_folder: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuditLogEntry {
  pub id: i64,
  pub ts: String,
  pub actor: Option<String>,
  pub action: String,
  pub entity_type: String,
  pub entity_id: Option<String>,
  pub payload_json: String,
  pub details: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T> {
  pub total: i64,
  pub items: Vec<T>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct YearBills {
  pub year: i32,
  pub bills: Vec<BillRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardSummary {
  pub bill_count: usize,
  pub customer_count: usize,
  pub total_paid: f64,
  pub total_due: f64,
  pub total_pending: f64,
  pub years: Vec<i32>,
  pub by_year: Vec<YearBills>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QrCodeOutput {
  pub payload: String,
  pub data_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportRequest {
  pub year: Option<i32>,
  pub output_path: Option<String>,
  pub actor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackupRequest {
  pub include_images: bool,
  pub output_path: Option<String>,
  pub actor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RestoreRequest {
  pub archive_path: String,
  pub actor: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn month_names_parse_in_both_languages() {
    assert_eq!(Month::from_name("march"), Some(Month::March));
    assert_eq!(Month::from_name(" Sep "), Some(Month::September));
    assert_eq!(Month::from_name("এপ্রিল"), Some(Month::April));
    assert_eq!(Month::from_name("Smarch"), None);
    assert_eq!(Month::from_name(""), None);
    assert_eq!(Month::from_number(12), Some(Month::December));
    assert_eq!(Month::from_number(0), None);
    assert_eq!(Month::June.number(), 6);
  }

  #[test]
  fn bill_record_uses_camel_case_keys() {
    let json = r#"{
      "id": "b1", "createdAt": 100, "month": "May", "year": 2024,
      "providerName": "Link3", "customerId": "C1", "amount": 500,
      "status": "Due", "dueDate": "2024-05-10", "userName": "Rahim"
    }"#;
    let bill: BillRecord = serde_json::from_str(json).unwrap();
    assert_eq!(bill.month, Month::May);
    assert_eq!(bill.status, BillStatus::Due);
    assert_eq!(bill.user_name.as_deref(), Some("Rahim"));
    assert!(bill.notes.is_none());

    let back = serde_json::to_value(&bill).unwrap();
    assert_eq!(back["createdAt"], 100);
    assert!(back.get("notes").is_none());
  }

  #[test]
  fn overlay_prefers_present_fields() {
    let base = PartialBill {
      provider_name: Some("Old".into()),
      amount: Some(100.0),
      ..Default::default()
    };
    let merged = base.overlay(PartialBill {
      provider_name: Some("New".into()),
      ..Default::default()
    });
    assert_eq!(merged.provider_name.as_deref(), Some("New"));
    assert_eq!(merged.amount, Some(100.0));
  }

  #[test]
  fn status_and_filter_parse_case_insensitively() {
    assert_eq!("PAID".parse::<BillStatus>().unwrap(), BillStatus::Paid);
    assert!("late".parse::<BillStatus>().is_err());
    assert_eq!("Due".parse::<StatusFilter>().unwrap(), StatusFilter::Due);
    assert_eq!("".parse::<StatusFilter>().unwrap(), StatusFilter::All);
    assert_eq!("x".parse::<StatusFilter>().unwrap_err().code, "INVALID_FILTER");
  }
}
