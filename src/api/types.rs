use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A named record with an associated image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackRecord {
  pub id: u64,
  pub name: String,
  /// Identifier resolved against the `/file/{image}` endpoint
  pub image: String,
  pub created_at: String,
}

impl StackRecord {
  /// Creation time in local time, or the raw string if it does not parse
  pub fn created_at_display(&self) -> String {
    DateTime::parse_from_rfc3339(&self.created_at)
      .map(|dt| {
        dt.with_timezone(&Local)
          .format("%Y-%m-%d %H:%M:%S")
          .to_string()
      })
      .unwrap_or_else(|_| self.created_at.clone())
  }
}

/// Payload for creating a stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewStack {
  pub name: String,
  /// Image as a data URL
  pub image: String,
}

impl NewStack {
  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.name.trim().is_empty() {
      return Err(ValidationError::MissingName);
    }
    if self.image.is_empty() {
      return Err(ValidationError::MissingImage);
    }
    Ok(())
  }
}

/// Payload for renaming a stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackPatch {
  pub name: String,
}

impl StackPatch {
  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.name.trim().is_empty() {
      return Err(ValidationError::MissingName);
    }
    Ok(())
  }
}

/// What the file endpoint serves for a stack image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
  pub url: String,
  pub content_type: Option<String>,
  pub size: usize,
}
