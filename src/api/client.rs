use crate::api::api_types::{ApiListResponse, ApiRecordResponse};
use crate::api::types::{ImageInfo, NewStack, StackPatch, StackRecord};
use crate::config::ApiConfig;
use crate::error::StackError;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// HTTP client for the stacks API
#[derive(Clone)]
pub struct StacksClient {
  http: reqwest::Client,
  base_url: Url,
}

impl StacksClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let base_url =
      Url::parse(&config.url).map_err(|e| eyre!("Invalid API URL {}: {}", config.url, e))?;
    if base_url.cannot_be_a_base() {
      return Err(eyre!("API URL {} cannot be used as a base", config.url));
    }

    let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
      .map_err(|e| eyre!("Invalid API token: {}", e))?;
    auth.set_sensitive(true);
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);

    let mut builder = reqwest::Client::builder().default_headers(headers);
    if let Some(secs) = config.timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }
    let http = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  /// Append path segments to the base URL, percent-encoding each one
  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  /// List all stacks in server order
  pub async fn list(&self) -> Result<Vec<StackRecord>, StackError> {
    let url = self.endpoint(&["stacks"]);
    debug!(%url, "listing stacks");

    let response: ApiListResponse = self
      .http
      .get(url)
      .send()
      .await?
      .error_for_status()?
      .json()
      .await?;

    Ok(response.data)
  }

  /// Create a stack
  pub async fn create(&self, input: &NewStack) -> Result<StackRecord, StackError> {
    let url = self.endpoint(&["stacks"]);
    debug!(%url, name = %input.name, "creating stack");

    let response: ApiRecordResponse = self
      .http
      .post(url)
      .json(input)
      .send()
      .await?
      .error_for_status()?
      .json()
      .await?;

    Ok(response.into_record())
  }

  /// Rename a stack
  pub async fn update(&self, id: u64, patch: &StackPatch) -> Result<StackRecord, StackError> {
    let url = self.endpoint(&["stacks", &id.to_string()]);
    debug!(%url, name = %patch.name, "updating stack");

    let response: ApiRecordResponse = self
      .http
      .patch(url)
      .json(patch)
      .send()
      .await?
      .error_for_status()?
      .json()
      .await?;

    Ok(response.into_record())
  }

  /// Delete a stack
  pub async fn delete(&self, id: u64) -> Result<(), StackError> {
    let url = self.endpoint(&["stacks", &id.to_string()]);
    debug!(%url, "deleting stack");

    self.http.delete(url).send().await?.error_for_status()?;
    Ok(())
  }

  /// Where the file endpoint serves a stack image
  pub fn image_url(&self, image: &str) -> Url {
    self.endpoint(&["file", image])
  }

  /// Download a stack image and describe it
  pub async fn fetch_image(&self, image: &str) -> Result<ImageInfo, StackError> {
    let url = self.image_url(image);
    debug!(%url, "fetching image");

    let response = self.http.get(url.clone()).send().await?.error_for_status()?;
    let content_type = response
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(String::from);
    let bytes = response.bytes().await?;

    Ok(ImageInfo {
      url: url.to_string(),
      content_type,
      size: bytes.len(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use mockito::{Matcher, Server};
  use serde_json::json;

  fn client_for(url: String) -> StacksClient {
    StacksClient::new(&ApiConfig {
      url,
      ..ApiConfig::default()
    })
    .unwrap()
  }

  const RECORD_A: &str = r#"{"id":1,"name":"A","image":"a.png","createdAt":"2024-01-01T00:00:00Z"}"#;

  #[tokio::test]
  async fn test_list_sends_placeholder_token() {
    let mut server = Server::new_async().await;
    let mock = server
      .mock("GET", "/stacks")
      .match_header("authorization", "Bearer token")
      .with_header("content-type", "application/json")
      .with_body(format!(r#"{{"data":[{}]}}"#, RECORD_A))
      .create_async()
      .await;

    let stacks = client_for(server.url()).list().await.unwrap();

    mock.assert_async().await;
    assert_eq!(stacks.len(), 1);
    assert_eq!(stacks[0].name, "A");
  }

  #[tokio::test]
  async fn test_create_posts_name_and_image() {
    let mut server = Server::new_async().await;
    let mock = server
      .mock("POST", "/stacks")
      .match_header("content-type", "application/json")
      .match_body(Matcher::Json(json!({
        "name": "B",
        "image": "data:image/png;base64,AAAA"
      })))
      .with_status(201)
      .with_body(r#"{"id":2,"name":"B","image":"b.png","createdAt":"2024-01-02T00:00:00Z"}"#)
      .create_async()
      .await;

    let created = client_for(server.url())
      .create(&NewStack {
        name: "B".to_string(),
        image: "data:image/png;base64,AAAA".to_string(),
      })
      .await
      .unwrap();

    mock.assert_async().await;
    assert_eq!(created.id, 2);
  }

  #[tokio::test]
  async fn test_update_patches_record() {
    let mut server = Server::new_async().await;
    let mock = server
      .mock("PATCH", "/stacks/1")
      .match_body(Matcher::Json(json!({ "name": "A2" })))
      .with_body(r#"{"data":{"id":1,"name":"A2","image":"a.png","createdAt":"2024-01-01T00:00:00Z"}}"#)
      .create_async()
      .await;

    let updated = client_for(server.url())
      .update(
        1,
        &StackPatch {
          name: "A2".to_string(),
        },
      )
      .await
      .unwrap();

    mock.assert_async().await;
    assert_eq!(updated.name, "A2");
  }

  #[tokio::test]
  async fn test_delete_ignores_body() {
    let mut server = Server::new_async().await;
    let mock = server
      .mock("DELETE", "/stacks/7")
      .with_status(204)
      .create_async()
      .await;

    client_for(server.url()).delete(7).await.unwrap();
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_non_success_status_is_network_error() {
    let mut server = Server::new_async().await;
    server
      .mock("DELETE", "/stacks/1")
      .with_status(404)
      .create_async()
      .await;
    server
      .mock("GET", "/stacks")
      .with_status(500)
      .create_async()
      .await;

    let client = client_for(server.url());
    assert!(matches!(
      client.delete(1).await,
      Err(StackError::Network(_))
    ));
    assert!(matches!(client.list().await, Err(StackError::Network(_))));
  }

  #[tokio::test]
  async fn test_base_url_path_is_kept() {
    let mut server = Server::new_async().await;
    let mock = server
      .mock("GET", "/api/stacks")
      .with_body(r#"{"data":[]}"#)
      .create_async()
      .await;

    let stacks = client_for(format!("{}/api", server.url()))
      .list()
      .await
      .unwrap();

    mock.assert_async().await;
    assert!(stacks.is_empty());
  }

  #[test]
  fn test_image_url_encodes_name() {
    let client = client_for("http://localhost:3000/api/".to_string());
    assert_eq!(
      client.image_url("my image.png").as_str(),
      "http://localhost:3000/api/file/my%20image.png"
    );
  }

  #[tokio::test]
  async fn test_fetch_image_reports_type_and_size() {
    let mut server = Server::new_async().await;
    server
      .mock("GET", "/file/a.png")
      .with_header("content-type", "image/png")
      .with_body(vec![1u8, 2, 3, 4])
      .create_async()
      .await;

    let info = client_for(server.url()).fetch_image("a.png").await.unwrap();
    assert_eq!(info.content_type.as_deref(), Some("image/png"));
    assert_eq!(info.size, 4);
    assert!(info.url.ends_with("/file/a.png"));
  }

  #[test]
  fn test_rejects_invalid_base_url() {
    assert!(StacksClient::new(&ApiConfig {
      url: "not a url".to_string(),
      ..ApiConfig::default()
    })
    .is_err());
  }
}
