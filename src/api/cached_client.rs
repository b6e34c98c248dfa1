//! Stacks client reads routed through the query cache.

use crate::cache::{CacheResult, FetchError, QueryCache, Subscription};

use super::cache::StacksQueryKey;
use super::client::StacksClient;
use super::types::{ImageInfo, StackRecord};

/// Read side of the stacks API with transparent caching.
///
/// Writes go through `MutationCoordinator`, which invalidates the keys this
/// client reads.
#[derive(Clone)]
pub struct CachedStacksClient {
  inner: StacksClient,
  cache: QueryCache,
}

impl CachedStacksClient {
  pub fn new(inner: StacksClient, cache: QueryCache) -> Self {
    Self { inner, cache }
  }

  pub fn client(&self) -> &StacksClient {
    &self.inner
  }

  pub fn cache(&self) -> &QueryCache {
    &self.cache
  }

  /// Read the stacks collection once.
  pub async fn list(&self) -> Result<CacheResult<Vec<StackRecord>>, FetchError> {
    self
      .cache
      .fetch(&StacksQueryKey::List, || {
        let inner = self.inner.clone();
        async move { inner.list().await.map_err(|e| FetchError::new(e.to_string())) }
      })
      .await
  }

  /// Keep the stacks collection live for a view.
  pub fn subscribe_list(&self) -> Subscription<Vec<StackRecord>> {
    let inner = self.inner.clone();
    self.cache.subscribe(&StacksQueryKey::List, move || {
      let inner = inner.clone();
      async move { inner.list().await.map_err(|e| FetchError::new(e.to_string())) }
    })
  }

  /// Keep one image's metadata live for a view.
  pub fn subscribe_image(&self, image: &str) -> Subscription<ImageInfo> {
    let inner = self.inner.clone();
    let name = image.to_string();
    self.cache.subscribe(
      &StacksQueryKey::Image {
        name: image.to_string(),
      },
      move || {
        let inner = inner.clone();
        let name = name.clone();
        async move {
          inner
            .fetch_image(&name)
            .await
            .map_err(|e| FetchError::new(e.to_string()))
        }
      },
    )
  }
}
