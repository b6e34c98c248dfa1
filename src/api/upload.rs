//! Turn a local image file into the data URL the create endpoint expects.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;

use crate::error::{StackError, ValidationError};

/// Read `path` and encode it as `data:<mime>;base64,<payload>`.
///
/// Files larger than `max_bytes` are rejected before they are read.
pub fn encode_image_file(path: &Path, max_bytes: u64) -> Result<String, StackError> {
  let io_error = |e: std::io::Error| StackError::Io {
    path: path.display().to_string(),
    message: e.to_string(),
  };

  let size = std::fs::metadata(path).map_err(io_error)?.len();
  if size == 0 {
    return Err(ValidationError::EmptyImage.into());
  }
  if size > max_bytes {
    return Err(ValidationError::ImageTooLarge {
      size,
      max: max_bytes,
    }
    .into());
  }

  let bytes = std::fs::read(path).map_err(io_error)?;
  Ok(format!(
    "data:{};base64,{}",
    mime_for(path),
    STANDARD.encode(bytes)
  ))
}

fn mime_for(path: &Path) -> &'static str {
  let ext = path
    .extension()
    .and_then(|e| e.to_str())
    .map(|e| e.to_ascii_lowercase());

  match ext.as_deref() {
    Some("png") => "image/png",
    Some("jpg") | Some("jpeg") => "image/jpeg",
    Some("gif") => "image/gif",
    Some("webp") => "image/webp",
    Some("bmp") => "image/bmp",
    Some("svg") => "image/svg+xml",
    _ => "application/octet-stream",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  fn temp_file(suffix: &str, contents: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents).unwrap();
    file
  }

  #[test]
  fn test_encodes_data_url() {
    let file = temp_file(".PNG", b"abc");
    let url = encode_image_file(file.path(), 1024).unwrap();
    assert_eq!(url, "data:image/png;base64,YWJj");
  }

  #[test]
  fn test_unknown_extension() {
    let file = temp_file(".raw", b"abc");
    let url = encode_image_file(file.path(), 1024).unwrap();
    assert!(url.starts_with("data:application/octet-stream;base64,"));
  }

  #[test]
  fn test_rejects_oversized_and_empty() {
    let big = temp_file(".jpg", &[0u8; 16]);
    assert_eq!(
      encode_image_file(big.path(), 8),
      Err(StackError::Validation(ValidationError::ImageTooLarge {
        size: 16,
        max: 8
      }))
    );

    let empty = temp_file(".jpg", b"");
    assert_eq!(
      encode_image_file(empty.path(), 8),
      Err(StackError::Validation(ValidationError::EmptyImage))
    );
  }

  #[test]
  fn test_missing_file_is_io_error() {
    let result = encode_image_file(Path::new("/definitely/not/here.png"), 8);
    assert!(matches!(result, Err(StackError::Io { .. })));
  }
}
