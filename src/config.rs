use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that supplies the API base URL.
pub const API_URL_ENV: &str = "STACKDECK_API_URL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the stacks API. Usually provided through `STACKDECK_API_URL`.
  #[serde(default)]
  pub url: String,
  /// Placeholder bearer token sent with every request
  #[serde(default = "default_token")]
  pub token: String,
  /// Request timeout in seconds; transport default when unset
  pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: String::new(),
      token: default_token(),
      timeout_secs: None,
    }
  }
}

fn default_token() -> String {
  "token".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Seconds before a cached query result is considered stale
  #[serde(default = "default_stale_secs")]
  pub stale_secs: u64,
  /// Seconds an unused entry is kept before eviction
  #[serde(default = "default_gc_secs")]
  pub gc_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_secs: default_stale_secs(),
      gc_secs: default_gc_secs(),
    }
  }
}

fn default_stale_secs() -> u64 {
  5 * 60
}

fn default_gc_secs() -> u64 {
  60
}

impl CacheConfig {
  pub fn stale_time(&self) -> Duration {
    Duration::from_secs(self.stale_secs)
  }

  pub fn gc_time(&self) -> Duration {
    Duration::from_secs(self.gc_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
  /// Largest image file accepted by the create form
  #[serde(default = "default_max_image_bytes")]
  pub max_image_bytes: u64,
}

impl Default for UploadConfig {
  fn default() -> Self {
    Self {
      max_image_bytes: default_max_image_bytes(),
    }
  }
}

fn default_max_image_bytes() -> u64 {
  5 * 1024 * 1024
}

impl Config {
  /// Load configuration.
  ///
  /// File search order:
  /// 1. Explicit path if provided
  /// 2. ./stackdeck.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/stackdeck/config.yaml
  ///
  /// Without a file the defaults are used. `STACKDECK_API_URL` overrides the
  /// file's `api.url`, and an API URL must be known one way or the other.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    Ok(config.with_api_url(std::env::var(API_URL_ENV).ok()))
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("stackdeck.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("stackdeck").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }

  /// Replace the API URL when an override is present and non-empty.
  pub fn with_api_url(mut self, url: Option<String>) -> Self {
    if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
      self.api.url = url.trim().to_string();
    }
    self
  }

  /// Fail early when no API URL is configured.
  pub fn validate(&self) -> Result<()> {
    if self.api.url.is_empty() {
      return Err(eyre!(
        "No API URL configured. Set {} or api.url in ~/.config/stackdeck/config.yaml\n\
         See config.example.yaml for the format.",
        API_URL_ENV
      ));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_full_config() {
    let yaml = r#"
title: Team stacks
api:
  url: http://localhost:3000/api
  token: secret
  timeout_secs: 10
cache:
  stale_secs: 30
  gc_secs: 120
upload:
  max_image_bytes: 1024
"#;
    let config = Config::parse(yaml).unwrap();
    assert_eq!(config.title.as_deref(), Some("Team stacks"));
    assert_eq!(config.api.url, "http://localhost:3000/api");
    assert_eq!(config.api.token, "secret");
    assert_eq!(config.api.timeout_secs, Some(10));
    assert_eq!(config.cache.stale_time(), Duration::from_secs(30));
    assert_eq!(config.cache.gc_time(), Duration::from_secs(120));
    assert_eq!(config.upload.max_image_bytes, 1024);
  }

  #[test]
  fn test_defaults() {
    let config = Config::parse("title: x").unwrap();
    assert_eq!(config.api.token, "token");
    assert_eq!(config.cache.stale_time(), Duration::from_secs(300));
    assert_eq!(config.cache.gc_time(), Duration::from_secs(60));
    assert_eq!(config.upload.max_image_bytes, 5 * 1024 * 1024);
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_api_url_override() {
    let config = Config::parse("api:\n  url: http://file").unwrap();

    let same = config.clone().with_api_url(Some("  ".to_string()));
    assert_eq!(same.api.url, "http://file");

    let overridden = config.with_api_url(Some("http://env:8080".to_string()));
    assert_eq!(overridden.api.url, "http://env:8080");
    assert!(overridden.validate().is_ok());
  }
}
