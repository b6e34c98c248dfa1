//! In-memory query cache with request de-duplication and invalidation.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::subscription::Subscription;
use super::traits::{CacheResult, CacheSource, FetchError, QueryKey, QuerySnapshot, QueryStatus};

type AnyValue = Arc<dyn Any + Send + Sync>;
type FetchOutcome = Result<AnyValue, FetchError>;
type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;
type Refetcher = Arc<dyn Fn() -> BoxFuture<'static, FetchOutcome> + Send + Sync>;
type Entries = Arc<Mutex<HashMap<String, Entry>>>;

/// The request currently allowed to write into an entry.
struct InFlight {
  generation: u64,
  future: SharedFetch,
}

struct Entry {
  description: String,
  status: QueryStatus,
  data: Option<AnyValue>,
  error: Option<String>,
  fetched_at: Option<DateTime<Utc>>,
  invalidated: bool,
  /// Bumped on every fetch start and every invalidation. Only a response
  /// carrying the current generation is written back.
  generation: u64,
  in_flight: Option<InFlight>,
  /// Fetcher registered by subscribers, used for background refetches
  refetcher: Option<Refetcher>,
  /// Change counter; subscriptions hold the receivers
  changes: watch::Sender<u64>,
  last_used: DateTime<Utc>,
}

impl Entry {
  fn new(description: String) -> Self {
    let (changes, _) = watch::channel(0);
    Self {
      description,
      status: QueryStatus::Idle,
      data: None,
      error: None,
      fetched_at: None,
      invalidated: false,
      generation: 0,
      in_flight: None,
      refetcher: None,
      changes,
      last_used: Utc::now(),
    }
  }

  fn is_stale(&self, stale_time: Duration, now: DateTime<Utc>) -> bool {
    if self.invalidated {
      return true;
    }
    match self.fetched_at {
      Some(fetched_at) => elapsed(fetched_at, now) >= stale_time,
      None => true,
    }
  }

  fn fresh_data(&self, stale_time: Duration, now: DateTime<Utc>) -> Option<AnyValue> {
    if self.status == QueryStatus::Success && !self.is_stale(stale_time, now) {
      self.data.clone()
    } else {
      None
    }
  }

  /// Drop the claim of any in-flight request on this entry.
  fn supersede(&mut self) {
    self.generation += 1;
    if self.in_flight.take().is_some() && self.status == QueryStatus::Loading {
      self.status = if self.data.is_some() {
        QueryStatus::Success
      } else {
        QueryStatus::Idle
      };
    }
  }

  fn subscriber_count(&self) -> usize {
    self.changes.receiver_count()
  }

  fn notify(&self) {
    self.changes.send_modify(|v| *v = v.wrapping_add(1));
  }
}

/// Process-wide query cache.
///
/// Cloning is cheap and every clone shares the same entries, so the cache is
/// created once at startup and handed to whoever needs it.
#[derive(Clone)]
pub struct QueryCache {
  entries: Entries,
  /// How long before cached data is considered stale
  stale_time: Duration,
  /// How long an unused entry survives `evict_idle`
  gc_time: Duration,
}

impl Default for QueryCache {
  fn default() -> Self {
    Self::new()
  }
}

impl QueryCache {
  pub fn new() -> Self {
    Self {
      entries: Arc::new(Mutex::new(HashMap::new())),
      stale_time: Duration::from_secs(5 * 60),
      gc_time: Duration::from_secs(60),
    }
  }

  /// Set the stale time for cached data.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  /// Set how long unused entries are kept.
  pub fn with_gc_time(mut self, gc_time: Duration) -> Self {
    self.gc_time = gc_time;
    self
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
    lock(&self.entries)
  }

  /// Read a query, going to the network only when needed.
  ///
  /// 1. Fresh cached data is returned immediately
  /// 2. A request already in flight for the key is joined
  /// 3. Otherwise exactly one request is started
  ///
  /// When the awaited request is superseded by an invalidation the read is
  /// re-evaluated, so callers never receive a response older than the last
  /// invalidation.
  pub async fn fetch<T, F, Fut>(
    &self,
    key: &impl QueryKey,
    fetcher: F,
  ) -> Result<CacheResult<T>, FetchError>
  where
    T: Send + Sync + 'static,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
  {
    let hash = key.cache_hash();

    loop {
      let (generation, pending, source) = {
        let mut entries = self.lock();
        let entry = entries
          .entry(hash.clone())
          .or_insert_with(|| Entry::new(key.description()));
        let now = Utc::now();
        entry.last_used = now;

        if let Some(data) = entry.fresh_data(self.stale_time, now) {
          debug!(query = %entry.description, "serving fresh cache");
          let data = downcast::<T>(data, &entry.description)?;
          return Ok(CacheResult::new(
            data,
            CacheSource::CacheFresh,
            entry.fetched_at,
          ));
        }

        let source = if entry.in_flight.is_some() {
          CacheSource::Joined
        } else {
          self.start_fetch(&hash, entry, erase(fetcher()));
          CacheSource::Network
        };
        let Some(in_flight) = &entry.in_flight else {
          return Err(FetchError::new(format!(
            "no request in flight for {}",
            entry.description
          )));
        };
        (in_flight.generation, in_flight.future.clone(), source)
      };

      let outcome = pending.await;

      if self.is_superseded(&hash, generation) {
        debug!(query = %key.description(), generation, "response superseded, reading again");
        continue;
      }

      let data = downcast::<T>(outcome?, &key.description())?;
      let fetched_at = self.lock().get(&hash).and_then(|e| e.fetched_at);
      return Ok(CacheResult::new(data, source, fetched_at));
    }
  }

  /// Subscribe to a query.
  ///
  /// The fetcher becomes the key's background refetcher. A fetch starts right
  /// away unless fresh data is cached or a request is already in flight.
  pub fn subscribe<T, F, Fut>(&self, key: &impl QueryKey, fetcher: F) -> Subscription<T>
  where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
  {
    let hash = key.cache_hash();
    let refetcher: Refetcher = Arc::new(move || erase(fetcher()));

    let receiver = {
      let mut entries = self.lock();
      let entry = entries
        .entry(hash.clone())
        .or_insert_with(|| Entry::new(key.description()));
      let now = Utc::now();
      entry.last_used = now;
      entry.refetcher = Some(Arc::clone(&refetcher));

      let receiver = entry.changes.subscribe();
      if entry.in_flight.is_none() && entry.fresh_data(self.stale_time, now).is_none() {
        self.start_fetch(&hash, entry, refetcher());
      }
      receiver
    };

    Subscription::new(self.clone(), hash, receiver)
  }

  /// Mark a query stale and drop any in-flight request's claim on it.
  ///
  /// With live subscribers the query is refetched in the background right
  /// away; otherwise the next read goes to the network.
  pub fn invalidate(&self, key: &impl QueryKey) {
    let hash = key.cache_hash();
    let mut entries = self.lock();
    let Some(entry) = entries.get_mut(&hash) else {
      debug!(query = %key.description(), "invalidate on unknown query");
      return;
    };

    entry.invalidated = true;
    entry.supersede();
    debug!(
      query = %entry.description,
      subscribers = entry.subscriber_count(),
      "invalidated"
    );

    if entry.subscriber_count() > 0 {
      if let Some(refetcher) = entry.refetcher.clone() {
        self.start_fetch(&hash, entry, refetcher());
        return;
      }
    }
    entry.notify();
  }

  /// Force a new request, superseding any in flight.
  pub(super) fn refetch_hash(&self, hash: &str) {
    let mut entries = self.lock();
    let Some(entry) = entries.get_mut(hash) else {
      return;
    };

    entry.supersede();
    match entry.refetcher.clone() {
      Some(refetcher) => self.start_fetch(hash, entry, refetcher()),
      None => {
        entry.invalidated = true;
        entry.notify();
      }
    }
  }

  /// Current state of a query without triggering any request.
  pub fn snapshot<T: Send + Sync + 'static>(&self, key: &impl QueryKey) -> QuerySnapshot<T> {
    self.snapshot_hash(&key.cache_hash())
  }

  pub(super) fn snapshot_hash<T: Send + Sync + 'static>(&self, hash: &str) -> QuerySnapshot<T> {
    let entries = self.lock();
    let Some(entry) = entries.get(hash) else {
      return QuerySnapshot::idle();
    };

    QuerySnapshot {
      status: entry.status,
      data: entry
        .data
        .clone()
        .and_then(|data| data.downcast::<T>().ok()),
      error: entry.error.clone(),
      fetched_at: entry.fetched_at,
      is_stale: entry.is_stale(self.stale_time, Utc::now()),
    }
  }

  /// Number of entries currently held.
  pub fn len(&self) -> usize {
    self.lock().len()
  }

  /// Evict entries nobody uses: no subscribers, nothing in flight, and not
  /// read for longer than the gc time. Returns how many were dropped.
  pub fn evict_idle(&self) -> usize {
    let now = Utc::now();
    let gc_time = self.gc_time;
    let mut entries = self.lock();
    let before = entries.len();

    entries.retain(|_, entry| {
      entry.subscriber_count() > 0
        || entry.in_flight.is_some()
        || elapsed(entry.last_used, now) < gc_time
    });

    let evicted = before - entries.len();
    if evicted > 0 {
      debug!(evicted, "evicted idle queries");
    }
    evicted
  }

  fn is_superseded(&self, hash: &str, generation: u64) -> bool {
    self
      .lock()
      .get(hash)
      .map(|entry| entry.generation != generation)
      .unwrap_or(false)
  }

  /// Start a request on the runtime and register it as the entry's in-flight
  /// request. The spawned task writes the result back itself, so the entry
  /// settles even if every reader goes away. Readers join through
  /// `entry.in_flight`.
  fn start_fetch(
    &self,
    hash: &str,
    entry: &mut Entry,
    fetch: BoxFuture<'static, FetchOutcome>,
  ) {
    entry.generation += 1;
    let generation = entry.generation;
    entry.status = QueryStatus::Loading;
    debug!(query = %entry.description, generation, "starting fetch");

    let task_entries = Arc::clone(&self.entries);
    let task_key = hash.to_string();
    let task = tokio::spawn(async move {
      let outcome = fetch.await;
      settle(&task_entries, &task_key, generation, &outcome);
      outcome
    });

    let join_entries = Arc::clone(&self.entries);
    let join_key = hash.to_string();
    let future = async move {
      match task.await {
        Ok(outcome) => outcome,
        Err(e) => {
          let outcome = Err(FetchError::new(format!("fetch task failed: {}", e)));
          settle(&join_entries, &join_key, generation, &outcome);
          outcome
        }
      }
    }
    .boxed()
    .shared();

    entry.in_flight = Some(InFlight { generation, future });
    entry.notify();
  }
}

/// Write a finished request into its entry if it still holds the current
/// generation.
fn settle(entries: &Mutex<HashMap<String, Entry>>, key: &str, generation: u64, outcome: &FetchOutcome) {
  let mut entries = lock(entries);
  let Some(entry) = entries.get_mut(key) else {
    return;
  };

  if entry.generation != generation {
    debug!(
      query = %entry.description,
      generation,
      current = entry.generation,
      "discarding superseded response"
    );
    return;
  }

  entry.in_flight = None;
  match outcome {
    Ok(data) => {
      entry.data = Some(Arc::clone(data));
      entry.error = None;
      entry.status = QueryStatus::Success;
      entry.fetched_at = Some(Utc::now());
      entry.invalidated = false;
    }
    Err(e) => {
      warn!(query = %entry.description, error = %e, "fetch failed");
      entry.error = Some(e.to_string());
      entry.status = QueryStatus::Error;
    }
  }
  entry.notify();
}

fn lock(entries: &Mutex<HashMap<String, Entry>>) -> MutexGuard<'_, HashMap<String, Entry>> {
  entries.lock().unwrap_or_else(PoisonError::into_inner)
}

fn erase<T, Fut>(fetch: Fut) -> BoxFuture<'static, FetchOutcome>
where
  T: Send + Sync + 'static,
  Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
{
  async move { fetch.await.map(|data| Arc::new(data) as AnyValue) }.boxed()
}

fn downcast<T: Send + Sync + 'static>(
  data: AnyValue,
  description: &str,
) -> Result<Arc<T>, FetchError> {
  data.downcast::<T>().map_err(|_| {
    FetchError::new(format!(
      "cached value for {} has an unexpected type",
      description
    ))
  })
}

/// Time between two instants; negative spans (clock changes) count as zero.
fn elapsed(from: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
  (to - from).to_std().unwrap_or(Duration::ZERO)
}
