//! Domain error types for stack operations.

/// Input problems caught before anything is sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
  #[error("name is required")]
  MissingName,

  #[error("image is required")]
  MissingImage,

  #[error("image file is empty")]
  EmptyImage,

  #[error("image is {size} bytes, limit is {max}")]
  ImageTooLarge { size: u64, max: u64 },
}

/// Errors surfaced by the stacks client and mutation coordinator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StackError {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  /// Transport failure or non-2xx response. Status codes are not classified.
  #[error("request failed: {0}")]
  Network(String),

  #[error("could not read {path}: {message}")]
  Io { path: String, message: String },
}

impl StackError {
  pub fn is_validation(&self) -> bool {
    matches!(self, StackError::Validation(_))
  }
}

impl From<reqwest::Error> for StackError {
  fn from(err: reqwest::Error) -> Self {
    StackError::Network(err.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_validation_display() {
    let err = StackError::from(ValidationError::ImageTooLarge { size: 10, max: 5 });
    assert_eq!(err.to_string(), "image is 10 bytes, limit is 5");
    assert!(err.is_validation());
  }

  #[test]
  fn test_network_display() {
    let err = StackError::Network("HTTP status server error (500)".to_string());
    assert_eq!(
      err.to_string(),
      "request failed: HTTP status server error (500)"
    );
    assert!(!err.is_validation());
  }
}
