//! Generic in-memory query cache.
//!
//! This module is independent of the stacks API. It provides:
//! - Results keyed by a logical query identity (`QueryKey`)
//! - At most one in-flight request per key, shared by every concurrent reader
//! - Time-based staleness and explicit invalidation
//! - Generation counting so responses superseded by an invalidation are dropped
//! - Subscriptions that get background refetches after invalidation

mod store;
mod subscription;
mod traits;

pub use store::QueryCache;
pub use subscription::Subscription;
pub use traits::{CacheResult, FetchError, QueryKey};

#[cfg(test)]
pub use traits::CacheSource;
