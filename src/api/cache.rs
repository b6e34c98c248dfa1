//! Query keys for the stacks API.

use sha2::{Digest, Sha256};

use crate::cache::QueryKey;

/// Query key types for stacks API calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StacksQueryKey {
  /// The whole stacks collection. Every mutation invalidates this key.
  List,
  /// Metadata of one image served by the file endpoint
  Image { name: String },
}

impl QueryKey for StacksQueryKey {
  fn cache_hash(&self) -> String {
    let input = match self {
      Self::List => "stacks".to_string(),
      Self::Image { name } => format!("file:{}", name),
    };

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
  }

  fn description(&self) -> String {
    match self {
      Self::List => "stacks".to_string(),
      Self::Image { name } => format!("image {}", name),
    }
  }
}
