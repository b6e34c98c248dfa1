//! Live view of a cached query for the UI event loop.
//!
//! A `Subscription<T>` keeps its query's background refetches enabled for as
//! long as it is alive. Views hold one per query they render and call
//! `poll()` from their tick handler:
//!
//! ```ignore
//! let mut stacks = client.subscribe_list();
//!
//! // In event loop tick
//! if stacks.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! match stacks.state().status {
//!     QueryStatus::Loading => render_spinner(),
//!     QueryStatus::Success => render_data(stacks.data()),
//!     QueryStatus::Error => render_error(stacks.error()),
//!     QueryStatus::Idle => {}
//! }
//! ```

use tokio::sync::watch;

use super::store::QueryCache;
use super::traits::QuerySnapshot;

pub struct Subscription<T> {
  cache: QueryCache,
  hash: String,
  changes: watch::Receiver<u64>,
  state: QuerySnapshot<T>,
}

impl<T: Send + Sync + 'static> Subscription<T> {
  pub(super) fn new(cache: QueryCache, hash: String, changes: watch::Receiver<u64>) -> Self {
    let state = cache.snapshot_hash(&hash);
    Self {
      cache,
      hash,
      changes,
      state,
    }
  }

  /// Last observed state of the query.
  pub fn state(&self) -> &QuerySnapshot<T> {
    &self.state
  }

  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Pick up changes made since the last poll.
  ///
  /// Returns `true` if the state changed. Once the entry has been removed
  /// from the cache this always returns `false`.
  pub fn poll(&mut self) -> bool {
    match self.changes.has_changed() {
      Ok(true) => {
        self.changes.borrow_and_update();
        self.state = self.cache.snapshot_hash(&self.hash);
        true
      }
      Ok(false) | Err(_) => false,
    }
  }

  /// Force a new request, superseding any in flight.
  pub fn refetch(&mut self) {
    self.cache.refetch_hash(&self.hash);
    self.poll();
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Subscription<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription")
      .field("hash", &self.hash)
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}
