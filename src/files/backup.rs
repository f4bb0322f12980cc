use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::AppError;

const DB_ENTRY: &str = "db.sqlite";
const NOTES_DIR: &str = "notes";

pub fn create_backup(
  app_dir: &Path,
  db_path: &Path,
  image_base: &Path,
  include_images: bool,
  output_path: Option<String>,
) -> Result<String, AppError> {
  let backup_dir = app_dir.join("Backups");
  fs::create_dir_all(&backup_dir)?;

  let filename = output_path.unwrap_or_else(|| {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    backup_dir
      .join(format!("wifi_notebook_{stamp}.zip"))
      .to_string_lossy()
      .to_string()
  });

  if let Some(parent) = Path::new(&filename).parent() {
    fs::create_dir_all(parent)?;
  }

  let file = File::create(&filename)?;
  let mut zip = ZipWriter::new(file);
  let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

  zip.start_file(DB_ENTRY, options)?;
  let mut db_file = File::open(db_path)?;
  let mut buffer = Vec::new();
  db_file.read_to_end(&mut buffer)?;
  zip.write_all(&buffer)?;

  let mut images = 0usize;
  if include_images && image_base.exists() {
    for entry in WalkDir::new(image_base).into_iter().filter_map(Result::ok) {
      if entry.file_type().is_file() {
        let path = entry.path();
        let rel = path.strip_prefix(image_base).unwrap_or(path);
        let archive_name = archive_name(rel);
        zip.start_file(archive_name, options)?;
        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        zip.write_all(&data)?;
        images += 1;
      }
    }
  }

  zip.finish()?;
  info!(path = %filename, images, "backup written");
  Ok(filename)
}

/// Restores the database (keeping the previous file as `.bak`) and any
/// archived note images. The caller must reopen its connection afterwards.
pub fn restore_backup(archive_path: &str, db_path: &Path, image_base: &Path) -> Result<(), AppError> {
  let file = File::open(archive_path)?;
  let mut archive = ZipArchive::new(file)?;

  let temp_dir = tempdir_for_restore();
  fs::create_dir_all(&temp_dir)?;

  for i in 0..archive.len() {
    let mut file = archive.by_index(i)?;
    let Some(relative) = file.enclosed_name() else {
      continue;
    };
    let outpath = temp_dir.join(relative);

    if file.is_dir() {
      fs::create_dir_all(&outpath)?;
    } else {
      if let Some(parent) = outpath.parent() {
        fs::create_dir_all(parent)?;
      }
      let mut outfile = File::create(&outpath)?;
      std::io::copy(&mut file, &mut outfile)?;
    }
  }

  let restored_db = temp_dir.join(DB_ENTRY);
  if !restored_db.exists() {
    let _ = fs::remove_dir_all(&temp_dir);
    return Err(AppError::new("RESTORE_INVALID", "Archive does not contain a database"));
  }
  if db_path.exists() {
    fs::copy(db_path, db_path.with_extension("bak"))?;
  }
  fs::copy(&restored_db, db_path)?;
  for suffix in ["sqlite-wal", "sqlite-shm"] {
    let side = db_path.with_extension(suffix);
    if side.exists() {
      fs::remove_file(side)?;
    }
  }

  let restored_notes = temp_dir.join(NOTES_DIR);
  if restored_notes.exists() {
    fs::create_dir_all(image_base)?;
    for entry in WalkDir::new(&restored_notes).into_iter().filter_map(Result::ok) {
      if entry.file_type().is_file() {
        let rel = entry.path().strip_prefix(&restored_notes).unwrap_or(entry.path());
        let target = image_base.join(rel);
        if let Some(parent) = target.parent() {
          fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), target)?;
      }
    }
  }

  fs::remove_dir_all(&temp_dir)?;
  info!(archive = archive_path, "backup restored");
  Ok(())
}

fn archive_name(rel: &Path) -> String {
  let parts: Vec<String> = rel
    .components()
    .map(|part| part.as_os_str().to_string_lossy().to_string())
    .collect();
  format!("{NOTES_DIR}/{}", parts.join("/"))
}

fn tempdir_for_restore() -> PathBuf {
  std::env::temp_dir().join(format!(
    "wifi_notebook_restore_{}_{}",
    std::process::id(),
    Utc::now().timestamp_millis()
  ))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn backup_round_trip_restores_db_and_notes() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("wifi_notebook.sqlite");
    let notes = dir.path().join("Notes");
    fs::create_dir_all(notes.join("2024").join("05")).unwrap();
    fs::write(&db_path, b"original").unwrap();
    fs::write(notes.join("2024").join("05").join("Note_a.jpg"), b"img").unwrap();

    let archive = create_backup(dir.path(), &db_path, &notes, true, None).unwrap();
    assert!(Path::new(&archive).exists());

    fs::write(&db_path, b"changed").unwrap();
    fs::remove_dir_all(&notes).unwrap();

    restore_backup(&archive, &db_path, &notes).unwrap();
    assert_eq!(fs::read(&db_path).unwrap(), b"original");
    assert_eq!(fs::read(db_path.with_extension("bak")).unwrap(), b"changed");
    assert!(notes.join("2024").join("05").join("Note_a.jpg").exists());
  }

  #[test]
  fn archive_without_database_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("empty.zip");
    let mut zip = ZipWriter::new(File::create(&archive).unwrap());
    zip.start_file("readme.txt", SimpleFileOptions::default()).unwrap();
    zip.write_all(b"hi").unwrap();
    zip.finish().unwrap();

    let err = restore_backup(archive.to_str().unwrap(), &dir.path().join("db.sqlite"), dir.path()).unwrap_err();
    assert_eq!(err.code, "RESTORE_INVALID");
  }
}
