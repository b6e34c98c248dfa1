//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Logical identity of a cached query.
pub trait QueryKey {
  /// Stable, fixed-length hash used as the cache map key
  fn cache_hash(&self) -> String;

  /// Human readable description for logs
  fn description(&self) -> String;
}

/// Failure of a cached fetch. Cloneable so every joined reader gets a copy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct FetchError(pub String);

impl FetchError {
  pub fn new(message: impl Into<String>) -> Self {
    Self(message.into())
  }
}

/// Result from a cache read, including the data and where it came from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data, shared with every other reader of the same fetch
  pub data: Arc<T>,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was fetched
  pub fetched_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  pub fn new(data: Arc<T>, source: CacheSource, fetched_at: Option<DateTime<Utc>>) -> Self {
    Self {
      data,
      source,
      fetched_at,
    }
  }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// This reader started the network request
  Network,
  /// This reader joined a request another reader had already started
  Joined,
  /// Served from cache, still considered fresh
  CacheFresh,
}

/// Lifecycle status of a query entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
  /// Entry exists but nothing has been fetched
  #[default]
  Idle,
  /// A request is in flight (previous data may still be present)
  Loading,
  /// Last request succeeded
  Success,
  /// Last request failed
  Error,
}

/// Point-in-time view of a query entry.
#[derive(Debug)]
pub struct QuerySnapshot<T> {
  pub status: QueryStatus,
  pub data: Option<Arc<T>>,
  pub error: Option<String>,
  pub fetched_at: Option<DateTime<Utc>>,
  pub is_stale: bool,
}

impl<T> QuerySnapshot<T> {
  pub fn idle() -> Self {
    Self {
      status: QueryStatus::Idle,
      data: None,
      error: None,
      fetched_at: None,
      is_stale: true,
    }
  }

  pub fn is_loading(&self) -> bool {
    self.status == QueryStatus::Loading
  }

  pub fn is_success(&self) -> bool {
    self.status == QueryStatus::Success
  }

  pub fn is_error(&self) -> bool {
    self.status == QueryStatus::Error
  }

  pub fn data(&self) -> Option<&T> {
    self.data.as_deref()
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }
}

impl<T> Clone for QuerySnapshot<T> {
  fn clone(&self) -> Self {
    Self {
      status: self.status,
      data: self.data.clone(),
      error: self.error.clone(),
      fetched_at: self.fetched_at,
      is_stale: self.is_stale,
    }
  }
}

impl<T> Default for QuerySnapshot<T> {
  fn default() -> Self {
    Self::idle()
  }
}
