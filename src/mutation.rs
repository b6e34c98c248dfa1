//! Write operations on stacks.
//!
//! Every mutation validates locally, calls the API, and only after the
//! response resolves invalidates the stacks collection and emits a toast.
//! There is no optimistic update, so views only ever see server state.

use std::future::Future;
use std::path::PathBuf;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::api::cache::StacksQueryKey;
use crate::api::client::StacksClient;
use crate::api::types::{NewStack, StackPatch, StackRecord};
use crate::api::upload::encode_image_file;
use crate::cache::QueryCache;
use crate::error::StackError;
use crate::notify::Notifier;

pub const CREATED: &str = "Stack created";
pub const UPDATED: &str = "Stack updated";
pub const DELETED: &str = "Stack deleted";
pub const CREATE_FAILED: &str = "Something went wrong";
pub const UPDATE_FAILED: &str = "Update failed";
pub const DELETE_FAILED: &str = "Delete failed";
pub const CREATE_INCOMPLETE: &str = "Name and image are required";
pub const UPDATE_INCOMPLETE: &str = "Not enough information";
pub const CREATE_BUSY: &str = "Still creating the previous stack";
pub const UPDATE_BUSY: &str = "Still saving the previous rename";
pub const DELETE_BUSY: &str = "A delete is already in progress";

/// Coordinates stack mutations with the query cache and notifications.
#[derive(Clone)]
pub struct MutationCoordinator {
  client: StacksClient,
  cache: QueryCache,
  notifier: Notifier,
}

impl MutationCoordinator {
  pub fn new(client: StacksClient, cache: QueryCache, notifier: Notifier) -> Self {
    Self {
      client,
      cache,
      notifier,
    }
  }

  pub async fn create(&self, input: NewStack) -> Result<StackRecord, StackError> {
    if let Err(e) = input.validate() {
      self.notifier.error(CREATE_INCOMPLETE);
      return Err(e.into());
    }

    match self.client.create(&input).await {
      Ok(record) => {
        info!(id = record.id, name = %record.name, "stack created");
        self.cache.invalidate(&StacksQueryKey::List);
        self.notifier.success(CREATED);
        Ok(record)
      }
      Err(e) => {
        warn!(error = %e, "create failed");
        self.notifier.error(CREATE_FAILED);
        Err(e)
      }
    }
  }

  /// Encode a local image on the blocking pool, then create the stack.
  ///
  /// A blank name or path skips the file and fails validation in `create`.
  pub async fn create_from_file(
    &self,
    name: String,
    image_path: String,
    max_image_bytes: u64,
  ) -> Result<StackRecord, StackError> {
    let name = name.trim().to_string();
    let image_path = image_path.trim().to_string();
    if name.is_empty() || image_path.is_empty() {
      return self
        .create(NewStack {
          name,
          image: String::new(),
        })
        .await;
    }

    let path = PathBuf::from(&image_path);
    let encoded = tokio::task::spawn_blocking(move || encode_image_file(&path, max_image_bytes))
      .await
      .unwrap_or_else(|e| {
        Err(StackError::Io {
          path: image_path.clone(),
          message: format!("encoding task failed: {}", e),
        })
      });

    let image = match encoded {
      Ok(image) => image,
      Err(e) => {
        if e.is_validation() {
          debug!(path = %image_path, error = %e, "image rejected");
        } else {
          warn!(path = %image_path, error = %e, "image unreadable");
        }
        self.notifier.error(e.to_string());
        return Err(e);
      }
    };

    self.create(NewStack { name, image }).await
  }

  pub async fn update(&self, id: u64, patch: StackPatch) -> Result<StackRecord, StackError> {
    if let Err(e) = patch.validate() {
      self.notifier.error(UPDATE_INCOMPLETE);
      return Err(e.into());
    }

    match self.client.update(id, &patch).await {
      Ok(record) => {
        info!(id, name = %record.name, "stack renamed");
        self.cache.invalidate(&StacksQueryKey::List);
        self.notifier.success(UPDATED);
        Ok(record)
      }
      Err(e) => {
        warn!(id, error = %e, "update failed");
        self.notifier.error(UPDATE_FAILED);
        Err(e)
      }
    }
  }

  pub async fn delete(&self, id: u64) -> Result<(), StackError> {
    match self.client.delete(id).await {
      Ok(()) => {
        info!(id, "stack deleted");
        self.cache.invalidate(&StacksQueryKey::List);
        self.notifier.success(DELETED);
        Ok(())
      }
      Err(e) => {
        warn!(id, error = %e, "delete failed");
        self.notifier.error(DELETE_FAILED);
        Err(e)
      }
    }
  }

  pub fn spawn_create_from_file(
    &self,
    name: String,
    image_path: String,
    max_image_bytes: u64,
  ) -> Pending<StackRecord> {
    let this = self.clone();
    Pending::spawn(async move {
      this
        .create_from_file(name, image_path, max_image_bytes)
        .await
    })
  }

  pub fn spawn_update(&self, id: u64, patch: StackPatch) -> Pending<StackRecord> {
    let this = self.clone();
    Pending::spawn(async move { this.update(id, patch).await })
  }

  pub fn spawn_delete(&self, id: u64) -> Pending<()> {
    let this = self.clone();
    Pending::spawn(async move { this.delete(id).await })
  }
}

/// Outcome of a mutation running on the runtime, polled from the UI tick.
#[derive(Debug)]
pub struct Pending<T> {
  receiver: Option<oneshot::Receiver<Result<T, StackError>>>,
}

impl<T: Send + 'static> Pending<T> {
  fn spawn<Fut>(mutation: Fut) -> Self
  where
    Fut: Future<Output = Result<T, StackError>> + Send + 'static,
  {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      // Ignore send errors - the view may have been closed
      let _ = tx.send(mutation.await);
    });
    Self { receiver: Some(rx) }
  }

  /// Still waiting for the response
  #[cfg(test)]
  pub fn is_pending(&self) -> bool {
    self.receiver.is_some()
  }

  /// Take the outcome once it is available. Yields `Some` exactly once.
  pub fn poll(&mut self) -> Option<Result<T, StackError>> {
    let receiver = self.receiver.as_mut()?;

    match receiver.try_recv() {
      Ok(outcome) => {
        self.receiver = None;
        Some(outcome)
      }
      Err(oneshot::error::TryRecvError::Empty) => None,
      Err(oneshot::error::TryRecvError::Closed) => {
        self.receiver = None;
        Some(Err(StackError::Network("mutation was cancelled".to_string())))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::cached_client::CachedStacksClient;
  use crate::cache::CacheSource;
  use crate::config::ApiConfig;
  use crate::error::ValidationError;
  use crate::notify::{self, Level, Notification};
  use mockito::Server;
  use std::io::Write;
  use std::time::Duration;
  use tokio::sync::mpsc;

  const A: &str = r#"{"id":1,"name":"A","image":"a.png","createdAt":"2024-01-01T00:00:00Z"}"#;
  const B: &str = r#"{"id":2,"name":"B","image":"b.png","createdAt":"2024-01-02T00:00:00Z"}"#;

  fn setup(
    server: &Server,
  ) -> (
    CachedStacksClient,
    MutationCoordinator,
    mpsc::UnboundedReceiver<Notification>,
  ) {
    let client = StacksClient::new(&ApiConfig {
      url: server.url(),
      ..ApiConfig::default()
    })
    .unwrap();
    let cache = QueryCache::new();
    let (notifier, rx) = notify::channel();
    (
      CachedStacksClient::new(client.clone(), cache.clone()),
      MutationCoordinator::new(client, cache, notifier),
      rx,
    )
  }

  fn list_body(records: &[&str]) -> String {
    format!(r#"{{"data":[{}]}}"#, records.join(","))
  }

  fn ids(stacks: &[StackRecord]) -> Vec<u64> {
    stacks.iter().map(|s| s.id).collect()
  }

  #[tokio::test]
  async fn test_create_with_missing_fields_never_calls_server() {
    let mut server = Server::new_async().await;
    let post = server
      .mock("POST", "/stacks")
      .expect(0)
      .create_async()
      .await;
    let (_, coordinator, mut rx) = setup(&server);

    let no_name = coordinator
      .create(NewStack {
        name: String::new(),
        image: "data:image/png;base64,AA==".to_string(),
      })
      .await;
    assert_eq!(
      no_name,
      Err(StackError::Validation(ValidationError::MissingName))
    );

    let no_image = coordinator
      .create(NewStack {
        name: "B".to_string(),
        image: String::new(),
      })
      .await;
    assert_eq!(
      no_image,
      Err(StackError::Validation(ValidationError::MissingImage))
    );

    post.assert_async().await;
    let toast = rx.try_recv().unwrap();
    assert_eq!(toast.level, Level::Error);
    assert_eq!(toast.message, CREATE_INCOMPLETE);
  }

  #[tokio::test]
  async fn test_create_invalidates_list() {
    let mut server = Server::new_async().await;
    let before = server
      .mock("GET", "/stacks")
      .with_body(list_body(&[A]))
      .expect(1)
      .create_async()
      .await;
    let (cached, coordinator, mut rx) = setup(&server);

    let first = cached.list().await.unwrap();
    assert_eq!(ids(&first.data), vec![1]);
    before.assert_async().await;
    before.remove_async().await;

    let post = server
      .mock("POST", "/stacks")
      .with_status(201)
      .with_body(B)
      .create_async()
      .await;
    let after = server
      .mock("GET", "/stacks")
      .with_body(list_body(&[A, B]))
      .expect(1)
      .create_async()
      .await;

    let created = coordinator
      .create(NewStack {
        name: "B".to_string(),
        image: "data:image/png;base64,AA==".to_string(),
      })
      .await
      .unwrap();
    assert_eq!(created.id, 2);

    let second = cached.list().await.unwrap();
    assert_eq!(second.source, CacheSource::Network);
    assert_eq!(ids(&second.data), vec![1, 2]);

    post.assert_async().await;
    after.assert_async().await;
    assert_eq!(
      rx.try_recv().unwrap(),
      Notification {
        level: Level::Success,
        message: CREATED.to_string()
      }
    );
  }

  #[tokio::test]
  async fn test_delete_then_read_excludes_record() {
    let mut server = Server::new_async().await;
    let before = server
      .mock("GET", "/stacks")
      .with_body(list_body(&[A, B]))
      .create_async()
      .await;
    let (cached, coordinator, _rx) = setup(&server);

    assert_eq!(ids(&cached.list().await.unwrap().data), vec![1, 2]);
    before.remove_async().await;

    server
      .mock("DELETE", "/stacks/1")
      .with_status(204)
      .create_async()
      .await;
    server
      .mock("GET", "/stacks")
      .with_body(list_body(&[B]))
      .create_async()
      .await;

    coordinator.delete(1).await.unwrap();
    assert_eq!(ids(&cached.list().await.unwrap().data), vec![2]);
  }

  #[tokio::test]
  async fn test_failed_update_keeps_cache() {
    let mut server = Server::new_async().await;
    let list = server
      .mock("GET", "/stacks")
      .with_body(list_body(&[A]))
      .expect(1)
      .create_async()
      .await;
    server
      .mock("PATCH", "/stacks/1")
      .with_status(500)
      .create_async()
      .await;
    let (cached, coordinator, mut rx) = setup(&server);

    cached.list().await.unwrap();
    let result = coordinator
      .update(
        1,
        StackPatch {
          name: "A2".to_string(),
        },
      )
      .await;
    assert!(matches!(result, Err(StackError::Network(_))));

    let again = cached.list().await.unwrap();
    assert_eq!(again.source, CacheSource::CacheFresh);
    assert_eq!(again.data[0].name, "A");
    list.assert_async().await;

    let toast = rx.try_recv().unwrap();
    assert_eq!(toast.level, Level::Error);
    assert_eq!(toast.message, UPDATE_FAILED);
  }

  #[tokio::test]
  async fn test_update_invalidates_list() {
    let mut server = Server::new_async().await;
    let before = server
      .mock("GET", "/stacks")
      .with_body(list_body(&[A]))
      .expect(1)
      .create_async()
      .await;
    let (cached, coordinator, mut rx) = setup(&server);

    assert_eq!(cached.list().await.unwrap().data[0].name, "A");
    before.assert_async().await;
    before.remove_async().await;

    let renamed = r#"{"id":1,"name":"A2","image":"a.png","createdAt":"2024-01-01T00:00:00Z"}"#;
    let patch = server
      .mock("PATCH", "/stacks/1")
      .with_body(renamed)
      .expect(1)
      .create_async()
      .await;
    let after = server
      .mock("GET", "/stacks")
      .with_body(list_body(&[renamed]))
      .expect(1)
      .create_async()
      .await;

    let updated = coordinator
      .update(
        1,
        StackPatch {
          name: "A2".to_string(),
        },
      )
      .await
      .unwrap();
    assert_eq!(updated.name, "A2");

    let again = cached.list().await.unwrap();
    assert_eq!(again.source, CacheSource::Network);
    assert_eq!(again.data[0].name, "A2");

    patch.assert_async().await;
    after.assert_async().await;
    assert_eq!(
      rx.try_recv().unwrap(),
      Notification {
        level: Level::Success,
        message: UPDATED.to_string()
      }
    );
  }

  #[tokio::test]
  async fn test_failed_create_keeps_cache() {
    let mut server = Server::new_async().await;
    let list = server
      .mock("GET", "/stacks")
      .with_body(list_body(&[A]))
      .expect(1)
      .create_async()
      .await;
    let post = server
      .mock("POST", "/stacks")
      .with_status(500)
      .expect(1)
      .create_async()
      .await;
    let (cached, coordinator, mut rx) = setup(&server);

    cached.list().await.unwrap();
    let result = coordinator
      .create(NewStack {
        name: "B".to_string(),
        image: "data:image/png;base64,AA==".to_string(),
      })
      .await;
    assert!(matches!(result, Err(StackError::Network(_))));

    let again = cached.list().await.unwrap();
    assert_eq!(again.source, CacheSource::CacheFresh);
    assert_eq!(ids(&again.data), vec![1]);
    list.assert_async().await;
    post.assert_async().await;

    let toast = rx.try_recv().unwrap();
    assert_eq!(toast.level, Level::Error);
    assert_eq!(toast.message, CREATE_FAILED);
  }

  #[tokio::test]
  async fn test_failed_delete_keeps_cache() {
    let mut server = Server::new_async().await;
    let list = server
      .mock("GET", "/stacks")
      .with_body(list_body(&[A, B]))
      .expect(1)
      .create_async()
      .await;
    let delete = server
      .mock("DELETE", "/stacks/1")
      .with_status(500)
      .expect(1)
      .create_async()
      .await;
    let (cached, coordinator, mut rx) = setup(&server);

    cached.list().await.unwrap();
    let result = coordinator.delete(1).await;
    assert!(matches!(result, Err(StackError::Network(_))));

    let again = cached.list().await.unwrap();
    assert_eq!(again.source, CacheSource::CacheFresh);
    assert_eq!(ids(&again.data), vec![1, 2]);
    list.assert_async().await;
    delete.assert_async().await;

    let toast = rx.try_recv().unwrap();
    assert_eq!(toast.level, Level::Error);
    assert_eq!(toast.message, DELETE_FAILED);
  }

  #[tokio::test]
  async fn test_oversized_file_never_posts() {
    let mut server = Server::new_async().await;
    let post = server
      .mock("POST", "/stacks")
      .expect(0)
      .create_async()
      .await;
    let (_, coordinator, mut rx) = setup(&server);

    let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
    file.write_all(&[1, 2, 3]).unwrap();
    let path = file.path().display().to_string();

    let result = coordinator
      .create_from_file("B".to_string(), path, 2)
      .await;
    assert_eq!(
      result,
      Err(StackError::Validation(ValidationError::ImageTooLarge {
        size: 3,
        max: 2
      }))
    );

    post.assert_async().await;
    let toast = rx.try_recv().unwrap();
    assert_eq!(toast.level, Level::Error);
    assert_eq!(toast.message, "image is 3 bytes, limit is 2");
  }

  #[tokio::test]
  async fn test_create_from_file_posts_data_url() {
    let mut server = Server::new_async().await;
    let post = server
      .mock("POST", "/stacks")
      .match_body(mockito::Matcher::Json(serde_json::json!({
        "name": "B",
        "image": "data:image/png;base64,AQID"
      })))
      .with_status(201)
      .with_body(B)
      .expect(1)
      .create_async()
      .await;
    let (_, coordinator, mut rx) = setup(&server);

    let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
    file.write_all(&[1, 2, 3]).unwrap();
    let path = format!("  {}  ", file.path().display());

    let created = coordinator
      .create_from_file(" B ".to_string(), path, 1024)
      .await
      .unwrap();
    assert_eq!(created.id, 2);
    post.assert_async().await;
    assert_eq!(rx.try_recv().unwrap().message, CREATED);
  }

  #[tokio::test]
  async fn test_blank_rename_is_rejected_locally() {
    let mut server = Server::new_async().await;
    let patch = server
      .mock("PATCH", "/stacks/1")
      .expect(0)
      .create_async()
      .await;
    let (_, coordinator, mut rx) = setup(&server);

    let result = coordinator
      .update(
        1,
        StackPatch {
          name: "   ".to_string(),
        },
      )
      .await;
    assert!(matches!(result, Err(e) if e.is_validation()));
    assert_eq!(rx.try_recv().unwrap().message, UPDATE_INCOMPLETE);
    patch.assert_async().await;
  }

  #[tokio::test]
  async fn test_pending_yields_outcome_once() {
    let mut server = Server::new_async().await;
    server
      .mock("DELETE", "/stacks/3")
      .with_status(204)
      .create_async()
      .await;
    let (_, coordinator, _rx) = setup(&server);

    let mut pending = coordinator.spawn_delete(3);
    assert!(pending.is_pending());

    let mut outcome = None;
    for _ in 0..100 {
      outcome = pending.poll();
      if outcome.is_some() {
        break;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(outcome, Some(Ok(())));
    assert!(!pending.is_pending());
    assert_eq!(pending.poll(), None);
  }
}
