use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::error;

use wifi_bill_notebook::commands;
use wifi_bill_notebook::db;
use wifi_bill_notebook::domain::validation;
use wifi_bill_notebook::error::AppError;
use wifi_bill_notebook::models::{
  BackupRequest, ExportRequest, Language, Month, PartialBill, ProfileUpdate, RestoreRequest, SettingsUpdate,
  StatusFilter, UserRole,
};
use wifi_bill_notebook::scan::JsonFileExtractor;
use wifi_bill_notebook::{init_tracing, AppState};

#[derive(Parser)]
#[command(name = "wifi-notebook", version, about = "Personal notebook for WiFi/ISP bills")]
struct Cli {
  /// Data directory (database, note images, exports, backups)
  #[arg(long, env = "WIFI_NOTEBOOK_DIR", global = true)]
  data_dir: Option<PathBuf>,
  /// Name recorded in the audit log
  #[arg(long, global = true)]
  actor: Option<String>,
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Owner profile used for new bills
  Profile {
    #[command(subcommand)]
    action: ProfileAction,
  },
  Bill {
    #[command(subcommand)]
    action: BillAction,
  },
  Customers {
    #[command(subcommand)]
    action: CustomerAction,
  },
  /// Totals and bills grouped by year
  Dashboard,
  Qr {
    #[command(subcommand)]
    action: QrAction,
  },
  /// Merge extractor output for a captured image into a draft
  Scan {
    /// Captured image (path or data URL)
    #[arg(long)]
    capture: String,
    /// JSON written by the extraction service for that image
    #[arg(long)]
    extraction: PathBuf,
    /// Save the merged draft as a new bill
    #[arg(long)]
    save: bool,
    #[command(flatten)]
    draft: BillFields,
  },
  /// Plain-text summary for messaging apps
  Share { id: String },
  /// Receipt data for a bill
  Receipt {
    id: String,
    /// Print as text instead of JSON
    #[arg(long)]
    text: bool,
  },
  Export {
    #[command(subcommand)]
    action: ExportAction,
  },
  Backup {
    #[command(subcommand)]
    action: BackupAction,
  },
  Settings {
    #[command(subcommand)]
    action: SettingsAction,
  },
  /// Page through the audit log, newest first
  Audit {
    #[arg(long, default_value_t = 1)]
    page: i64,
    #[arg(long, default_value_t = 50)]
    page_size: i64,
  },
}

#[derive(Subcommand)]
enum ProfileAction {
  Show,
  Set(ProfileFields),
}

#[derive(Args)]
struct ProfileFields {
  #[arg(long)]
  company_name: Option<String>,
  #[arg(long)]
  company_number: Option<String>,
  #[arg(long)]
  company_address: Option<String>,
  #[arg(long)]
  company_logo: Option<String>,
  #[arg(long)]
  name: Option<String>,
  #[arg(long)]
  phone: Option<String>,
  #[arg(long)]
  email: Option<String>,
  #[arg(long)]
  photo: Option<String>,
  #[arg(long)]
  address: Option<String>,
  /// user | admin
  #[arg(long)]
  role: Option<String>,
}

#[derive(Subcommand)]
enum BillAction {
  Add(BillFields),
  /// Change fields of an existing bill; omitted flags keep their value
  Edit {
    id: String,
    #[command(flatten)]
    fields: BillFields,
  },
  Show { id: String },
  Delete { id: String },
  List {
    #[arg(long)]
    year: Option<i32>,
  },
  /// Open the bill's handwritten note with the system viewer
  Image { id: String },
}

#[derive(Args, Default)]
struct BillFields {
  #[arg(long)]
  provider: Option<String>,
  #[arg(long)]
  customer: Option<String>,
  /// Accepts grouping commas and the currency sign
  #[arg(long)]
  amount: Option<String>,
  /// Paid | Due | Pending
  #[arg(long)]
  status: Option<String>,
  #[arg(long)]
  month: Option<String>,
  #[arg(long)]
  year: Option<i32>,
  #[arg(long)]
  start: Option<String>,
  #[arg(long)]
  end: Option<String>,
  #[arg(long)]
  due: Option<String>,
  #[arg(long)]
  method: Option<String>,
  #[arg(long)]
  paid_on: Option<String>,
  #[arg(long)]
  notes: Option<String>,
  /// Note image file or data URL
  #[arg(long)]
  image: Option<String>,
  /// Only used on edit; new bills take name and phone from the profile
  #[arg(long)]
  user_name: Option<String>,
  #[arg(long)]
  user_phone: Option<String>,
  #[arg(long)]
  company_name: Option<String>,
  #[arg(long)]
  company_number: Option<String>,
  #[arg(long)]
  company_address: Option<String>,
}

impl BillFields {
  fn into_partial(self) -> Result<PartialBill, AppError> {
    let amount = self.amount.as_deref().map(validation::parse_amount).transpose()?;
    let status = self.status.as_deref().map(validation::parse_status).transpose()?;
    let month = match self.month.as_deref() {
      Some(raw) => Some(
        Month::from_name(raw)
          .or_else(|| raw.trim().parse::<u32>().ok().and_then(Month::from_number))
          .ok_or_else(|| AppError::new("INVALID_DATE", format!("Unknown month '{raw}'")))?,
      ),
      None => None,
    };
    Ok(PartialBill {
      month,
      year: self.year,
      billing_start_date: self.start,
      billing_end_date: self.end,
      due_date: self.due,
      provider_name: self.provider,
      customer_id: self.customer,
      amount,
      status,
      payment_method: self.method,
      payment_date: self.paid_on,
      notes: self.notes,
      handwritten_image: self.image,
      company_name: self.company_name,
      company_number: self.company_number,
      company_address: self.company_address,
      user_name: self.user_name,
      user_phone: self.user_phone,
      ..Default::default()
    })
  }
}

#[derive(Subcommand)]
enum CustomerAction {
  /// Matches customer id, provider, name or phone
  Search {
    #[arg(default_value = "")]
    query: String,
    /// all | due | paid
    #[arg(long, default_value = "all")]
    filter: String,
  },
  Show { id: String },
}

#[derive(Subcommand)]
enum QrAction {
  /// Payload and PNG data URL for a bill
  Encode { id: String },
  /// Draft from a scanned QR text
  Decode { payload: String },
}

#[derive(Subcommand)]
enum ExportAction {
  Csv(ExportArgs),
  Excel(ExportArgs),
}

#[derive(Args)]
struct ExportArgs {
  #[arg(long)]
  year: Option<i32>,
  #[arg(long)]
  out: Option<String>,
}

#[derive(Subcommand)]
enum BackupAction {
  Create {
    #[arg(long)]
    no_images: bool,
    #[arg(long)]
    out: Option<String>,
  },
  Restore { archive: String },
}

#[derive(Subcommand)]
enum SettingsAction {
  Show,
  Set {
    /// EN | BN
    #[arg(long)]
    language: Option<String>,
    #[arg(long)]
    currency: Option<String>,
    #[arg(long)]
    image_folder: Option<String>,
  },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn parse_role(raw: &str) -> Result<UserRole, AppError> {
  match raw.trim().to_ascii_lowercase().as_str() {
    "user" => Ok(UserRole::User),
    "admin" => Ok(UserRole::Admin),
    _ => Err(AppError::new("INVALID_ROLE", format!("Role must be user or admin, got '{raw}'"))),
  }
}

fn run(cli: Cli) -> Result<(), AppError> {
  let app_dir = match cli.data_dir {
    Some(dir) => dir,
    None => db::resolve_app_dir()?,
  };
  let state = AppState::open(app_dir)?;
  let actor = cli.actor;

  match cli.command {
    Command::Profile { action } => match action {
      ProfileAction::Show => print_json(&commands::get_profile(&state)?),
      ProfileAction::Set(fields) => {
        let update = ProfileUpdate {
          company_name: fields.company_name,
          company_number: fields.company_number,
          company_address: fields.company_address,
          company_logo: fields.company_logo,
          user_name: fields.name,
          user_phone: fields.phone,
          email: fields.email,
          profile_photo: fields.photo,
          role: fields.role.as_deref().map(parse_role).transpose()?,
          present_address: fields.address,
        };
        print_json(&commands::update_profile(&state, update, actor)?)
      }
    },
    Command::Bill { action } => match action {
      BillAction::Add(fields) => print_json(&commands::save_bill(&state, fields.into_partial()?, actor)?),
      BillAction::Edit { id, fields } => {
        let existing = commands::get_bill(&state, &id)?;
        let partial = PartialBill::from(&existing).overlay(fields.into_partial()?);
        print_json(&commands::save_bill(&state, partial, actor)?)
      }
      BillAction::Show { id } => print_json(&commands::get_bill(&state, &id)?),
      BillAction::Delete { id } => print_json(&commands::delete_bill(&state, &id, actor)?),
      BillAction::List { year } => print_json(&commands::list_bills(&state, year)?),
      BillAction::Image { id } => {
        let bill = commands::get_bill(&state, &id)?;
        let path = bill.handwritten_image.unwrap_or_default();
        commands::open_image(&state, &path, actor)
      }
    },
    Command::Customers { action } => match action {
      CustomerAction::Search { query, filter } => {
        let filter: StatusFilter = filter.parse()?;
        print_json(&commands::search_customers(&state, &query, filter)?)
      }
      CustomerAction::Show { id } => print_json(&commands::get_customer(&state, &id)?),
    },
    Command::Dashboard => print_json(&commands::get_dashboard(&state)?),
    Command::Qr { action } => match action {
      QrAction::Encode { id } => print_json(&commands::bill_qr_code(&state, &id)?),
      QrAction::Decode { payload } => print_json(&commands::decode_qr(&payload, PartialBill::default())?),
    },
    Command::Scan {
      capture,
      extraction,
      save,
      draft,
    } => {
      let extractor = JsonFileExtractor { path: extraction };
      let merged = commands::scan_image(&extractor, draft.into_partial()?, &capture)?;
      if save {
        print_json(&commands::save_bill(&state, merged, actor)?)
      } else {
        print_json(&merged)
      }
    }
    Command::Share { id } => {
      let bill = commands::get_bill(&state, &id)?;
      println!("{}", commands::share_bill(&state, &PartialBill::from(&bill))?);
      Ok(())
    }
    Command::Receipt { id, text } => {
      if text {
        println!("{}", commands::render_receipt_text(&state, &id)?);
        Ok(())
      } else {
        print_json(&commands::receipt_view(&state, &id)?)
      }
    }
    Command::Export { action } => {
      let (args, excel) = match action {
        ExportAction::Csv(args) => (args, false),
        ExportAction::Excel(args) => (args, true),
      };
      let request = ExportRequest {
        year: args.year,
        output_path: args.out,
        actor,
      };
      let path = if excel {
        commands::export_excel(&state, request)?
      } else {
        commands::export_csv(&state, request)?
      };
      print_json(&serde_json::json!({ "path": path }))
    }
    Command::Backup { action } => match action {
      BackupAction::Create { no_images, out } => {
        let path = commands::create_backup(
          &state,
          BackupRequest {
            include_images: !no_images,
            output_path: out,
            actor,
          },
        )?;
        print_json(&serde_json::json!({ "path": path }))
      }
      BackupAction::Restore { archive } => {
        commands::restore_backup(
          &state,
          RestoreRequest {
            archive_path: archive.clone(),
            actor,
          },
        )?;
        print_json(&serde_json::json!({ "restored": archive }))
      }
    },
    Command::Settings { action } => match action {
      SettingsAction::Show => print_json(&commands::get_settings(&state)?),
      SettingsAction::Set {
        language,
        currency,
        image_folder,
      } => {
        let language = match language.as_deref() {
          Some(raw) => Some(
            Language::parse(raw)
              .ok_or_else(|| AppError::new("INVALID_LANGUAGE", format!("Language must be EN or BN, got '{raw}'")))?,
          ),
          None => None,
        };
        let update = SettingsUpdate {
          language,
          currency_symbol: currency,
          image_base_folder: image_folder,
        };
        print_json(&commands::update_settings(&state, update, actor)?)
      }
    },
    Command::Audit { page, page_size } => print_json(&commands::list_audit_log(&state, page, page_size)?),
  }
}

fn main() -> ExitCode {
  init_tracing();
  let cli = Cli::parse();
  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      error!(code = %err.code, "{}", err.message);
      if let Ok(body) = serde_json::to_string_pretty(&err) {
        eprintln!("{body}");
      }
      ExitCode::FAILURE
    }
  }
}
