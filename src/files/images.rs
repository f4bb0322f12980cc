use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::AppError;

pub fn ensure_image_base(app_dir: &Path) -> Result<PathBuf, AppError> {
  let image_dir = app_dir.join("Notes");
  fs::create_dir_all(&image_dir)?;
  Ok(image_dir)
}

/// Files a handwritten note under `<base>/<year>/<MM>/Note_<bill_id>.<ext>`.
/// `source` is either a path on disk or a `data:image/...;base64,` URL as
/// produced by camera capture.
pub fn store_image(
  source: &str,
  image_base: &Path,
  year: i32,
  month: u32,
  bill_id: &str,
) -> Result<String, AppError> {
  let source = source.trim();
  if source.is_empty() {
    return Err(AppError::new("IMAGE_PATH_EMPTY", "Image source is empty"));
  }

  let month_dir = image_base.join(format!("{year}")).join(format!("{month:02}"));
  fs::create_dir_all(&month_dir)?;

  if let Some((ext, bytes)) = decode_data_url(source)? {
    let target = unique_target(&month_dir, bill_id, &ext);
    fs::write(&target, bytes)?;
    return Ok(target.to_string_lossy().to_string());
  }

  let path = Path::new(source);
  if !path.is_file() {
    return Err(AppError::new("IMAGE_NOT_FOUND", format!("Image file not found: {source}")));
  }
  let ext = path.extension().and_then(|v| v.to_str()).unwrap_or("bin");
  let target = unique_target(&month_dir, bill_id, ext);
  fs::copy(path, &target)?;
  Ok(target.to_string_lossy().to_string())
}

/// True when the stored value already points into the image folder, so a
/// re-save of an unchanged bill does not duplicate the file.
pub fn is_stored(path: &str, image_base: &Path) -> bool {
  Path::new(path).starts_with(image_base) && Path::new(path).is_file()
}

pub fn open_image(path: &str) -> Result<(), AppError> {
  if path.trim().is_empty() {
    return Err(AppError::new("IMAGE_PATH_EMPTY", "Image path is empty"));
  }
  if !Path::new(path).exists() {
    return Err(AppError::new("IMAGE_NOT_FOUND", format!("Image file not found: {path}")));
  }
  open::that(path).map_err(|err| AppError::new("IMAGE_OPEN", err.to_string()))?;
  Ok(())
}

fn unique_target(dir: &Path, bill_id: &str, ext: &str) -> PathBuf {
  let base_name = format!("Note_{bill_id}");
  let mut candidate = dir.join(format!("{base_name}.{ext}"));
  let mut counter = 1;
  while candidate.exists() {
    candidate = dir.join(format!("{base_name}_{counter}.{ext}"));
    counter += 1;
  }
  candidate
}

fn decode_data_url(source: &str) -> Result<Option<(String, Vec<u8>)>, AppError> {
  let Some(rest) = source.strip_prefix("data:") else {
    return Ok(None);
  };
  let (meta, data) = rest
    .split_once(',')
    .ok_or_else(|| AppError::new("IMAGE_DATA", "Malformed data URL"))?;
  if !meta.ends_with(";base64") {
    return Err(AppError::new("IMAGE_DATA", "Only base64 data URLs are supported"));
  }
  let mime = meta.trim_end_matches(";base64");
  let ext = match mime {
    "image/jpeg" | "image/jpg" => "jpg",
    "image/png" => "png",
    "image/webp" => "webp",
    "image/gif" => "gif",
    _ => "bin",
  };
  let bytes = STANDARD
    .decode(data.trim())
    .map_err(|err| AppError::new("IMAGE_DATA", err.to_string()))?;
  Ok(Some((ext.to_string(), bytes)))
}
