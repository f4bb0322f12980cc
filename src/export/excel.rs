use std::path::Path;

use chrono::Datelike;
use rust_xlsxwriter::{Color, ExcelDateTime, Format, FormatAlign, Url, Workbook, Worksheet};

use crate::domain::{customers, period};
use crate::error::AppError;
use crate::models::{BillRecord, BillStatus, CustomerProfile};

const BILL_HEADERS: [&str; 12] = [
  "ID",
  "Year",
  "Month",
  "Provider",
  "Customer ID",
  "Customer",
  "Phone",
  "Amount",
  "Status",
  "Due date",
  "Payment method",
  "Note image",
];

const CUSTOMER_HEADERS: [&str; 7] = [
  "Customer ID",
  "Provider",
  "Name",
  "Phone",
  "Bills",
  "Total due",
  "Total paid",
];

/// Workbook with a BILLS sheet (one row per bill) and a CUSTOMERS sheet
/// (one row per aggregated customer).
pub fn export_bills_excel(bills: &[BillRecord], currency: &str, path: &Path) -> Result<(), AppError> {
  let mut workbook = Workbook::new();
  let money = Format::new().set_num_format(format!("[${currency}] #,##0.00"));

  write_bills_sheet(workbook.add_worksheet(), bills, &money)?;
  let profiles = customers::compute_customer_profiles(bills);
  write_customers_sheet(workbook.add_worksheet(), &profiles, &money)?;

  workbook.save(path)?;
  Ok(())
}

fn header_format() -> Format {
  Format::new()
    .set_bold()
    .set_font_color(Color::White)
    .set_background_color(Color::RGB(0x1A2433))
    .set_align(FormatAlign::Center)
}

fn write_bills_sheet(sheet: &mut Worksheet, bills: &[BillRecord], money: &Format) -> Result<(), AppError> {
  sheet.set_name("BILLS")?;
  let header = header_format();
  let date_format = Format::new().set_num_format("dd.mm.yyyy");
  let due = Format::new().set_font_color(Color::RGB(0xB91C1C));
  let paid = Format::new().set_font_color(Color::RGB(0x15803D));
  let pending = Format::new();

  for (idx, label) in BILL_HEADERS.iter().enumerate() {
    sheet.write_string_with_format(0, idx as u16, *label, &header)?;
  }

  let mut row = 1;
  for bill in bills {
    sheet.write_string(row, 0, &bill.id)?;
    sheet.write_number(row, 1, bill.year)?;
    sheet.write_string(row, 2, bill.month.name())?;
    sheet.write_string(row, 3, &bill.provider_name)?;
    sheet.write_string(row, 4, customers::customer_key(&bill.customer_id))?;
    sheet.write_string(row, 5, bill.user_name.as_deref().unwrap_or(""))?;
    sheet.write_string(row, 6, bill.user_phone.as_deref().unwrap_or(""))?;
    sheet.write_number_with_format(row, 7, bill.amount, money)?;
    let status_format = match bill.status {
      BillStatus::Due => &due,
      BillStatus::Paid => &paid,
      BillStatus::Pending => &pending,
    };
    sheet.write_string_with_format(row, 8, bill.status.as_str(), status_format)?;
    if let Some(raw) = bill.due_date.as_deref() {
      write_date(sheet, row, 9, raw, &date_format)?;
    }
    sheet.write_string(row, 10, bill.payment_method.as_deref().unwrap_or(""))?;
    if let Some(image) = bill.handwritten_image.as_deref().filter(|value| !value.starts_with("data:")) {
      let display = Path::new(image)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(image)
        .to_string();
      sheet.write_url_with_text(row, 11, Url::new(format!("file:///{}", image.replace('\\', "/"))), display)?;
    }
    row += 1;
  }

  let widths = [24, 8, 12, 20, 16, 22, 16, 14, 10, 12, 16, 30];
  for (col, width) in widths.iter().enumerate() {
    sheet.set_column_width(col as u16, *width)?;
  }
  if row > 1 {
    sheet.autofilter(0, 0, row - 1, (BILL_HEADERS.len() - 1) as u16)?;
  }
  sheet.set_freeze_panes(1, 0)?;
  Ok(())
}

fn write_customers_sheet(sheet: &mut Worksheet, profiles: &[CustomerProfile], money: &Format) -> Result<(), AppError> {
  sheet.set_name("CUSTOMERS")?;
  let header = header_format();

  for (idx, label) in CUSTOMER_HEADERS.iter().enumerate() {
    sheet.write_string_with_format(0, idx as u16, *label, &header)?;
  }

  let mut row = 1;
  for profile in profiles {
    sheet.write_string(row, 0, &profile.customer_id)?;
    sheet.write_string(row, 1, &profile.provider_name)?;
    sheet.write_string(row, 2, &profile.latest_name)?;
    sheet.write_string(row, 3, &profile.latest_phone)?;
    sheet.write_number(row, 4, profile.total_bills as f64)?;
    sheet.write_number_with_format(row, 5, profile.total_due, money)?;
    sheet.write_number_with_format(row, 6, profile.total_paid, money)?;
    row += 1;
  }

  let widths = [16, 20, 22, 16, 8, 14, 14];
  for (col, width) in widths.iter().enumerate() {
    sheet.set_column_width(col as u16, *width)?;
  }
  sheet.set_freeze_panes(1, 0)?;
  Ok(())
}

/// Unparseable dates are written as text.
fn write_date(sheet: &mut Worksheet, row: u32, col: u16, raw: &str, format: &Format) -> Result<(), AppError> {
  let Some(parsed) = period::parse_date(raw) else {
    sheet.write_string(row, col, raw)?;
    return Ok(());
  };
  let year = u16::try_from(parsed.year()).map_err(|_| AppError::new("INVALID_DATE", format!("Date out of range: {raw}")))?;
  let date = ExcelDateTime::from_ymd(year, parsed.month() as u8, parsed.day() as u8)?;
  sheet.write_datetime_with_format(row, col, &date, format)?;
  Ok(())
}
