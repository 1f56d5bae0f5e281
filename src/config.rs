use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

const KEYRING_SERVICE: &str = "ThisIsMe";
pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
  OpenAi,
  Gemini,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct AppConfig {
  pub bind_addr: String,
  pub provider: ProviderKind,
  /// OpenAI-compatible backend used in direct mode.
  pub backend_url: String,
  /// Where the wizard reaches the relay in gemini mode.
  pub relay_url: String,
  pub text_model: String,
  pub image_model: String,
  pub gemini_text_model: String,
  pub gemini_image_model: String,
  pub gemini_base_url: String,
  pub retry_max_attempts: u32,
  pub retry_base_delay_ms: u64,
  pub banner_ttl_ms: u64,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      bind_addr: "127.0.0.1:3001".to_string(),
      provider: ProviderKind::OpenAi,
      backend_url: "https://playground.ils.ai.kr/api".to_string(),
      relay_url: "http://127.0.0.1:3001".to_string(),
      text_model: "gpt-3.5-turbo".to_string(),
      image_model: "gpt-image-1".to_string(),
      gemini_text_model: "gemini-2.5-flash-preview-05-20".to_string(),
      gemini_image_model: "gemini-2.5-flash-preview-05-20".to_string(),
      gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
      retry_max_attempts: 3,
      retry_base_delay_ms: 1000,
      banner_ttl_ms: 3000,
    }
  }
}

impl AppConfig {
  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy {
      max_attempts: self.retry_max_attempts.max(1),
      base_delay: Duration::from_millis(self.retry_base_delay_ms),
    }
  }

  pub fn banner_ttl(&self) -> Duration {
    Duration::from_millis(self.banner_ttl_ms)
  }

  pub fn with_port(mut self, port: Option<&str>) -> Result<Self, ConfigError> {
    let Some(port) = port.map(str::trim).filter(|p| !p.is_empty()) else {
      return Ok(self);
    };
    let port: u16 = port
      .parse()
      .map_err(|_| ConfigError::InvalidPort(port.to_string()))?;
    let host = self
      .bind_addr
      .rsplit_once(':')
      .map(|(host, _)| host.to_string())
      .unwrap_or_else(|| "127.0.0.1".to_string());
    self.bind_addr = format!("{host}:{port}");
    Ok(self)
  }
}

pub fn load_or_init(path: &Path) -> anyhow::Result<AppConfig> {
  if path.exists() {
    let data = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&data)?;
    Ok(config)
  } else {
    let config = AppConfig::default();
    save_config(path, &config)?;
    Ok(config)
  }
}

pub fn save_config(path: &Path, config: &AppConfig) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(config)?;
  std::fs::write(path, json)?;
  Ok(())
}

/// The relay never starts without a key: environment first, then the keyring.
pub fn resolve_gemini_key() -> Result<String, ConfigError> {
  pick_key(std::env::var(GEMINI_KEY_ENV).ok(), || stored_key("gemini"))
}

/// Direct mode may run keyless against a key-holding backend.
pub fn resolve_openai_key() -> Option<String> {
  pick_key(std::env::var(OPENAI_KEY_ENV).ok(), || stored_key("openai")).ok()
}

fn pick_key(
  env: Option<String>,
  stored: impl FnOnce() -> Option<String>,
) -> Result<String, ConfigError> {
  if let Some(key) = env.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) {
    return Ok(key);
  }
  stored().ok_or(ConfigError::MissingApiKey)
}

pub fn stored_key(account: &str) -> Option<String> {
  keyring::Entry::new(KEYRING_SERVICE, account)
    .and_then(|e| e.get_password())
    .ok()
    .map(|p| p.trim().to_string())
    .filter(|p| !p.is_empty())
}

pub fn set_api_key(account: &str, key: &str) -> Result<(), ConfigError> {
  if account == "openai" {
    validate_openai_key(key)?;
  } else if key.trim().is_empty() {
    return Err(ConfigError::InvalidApiKey);
  }
  let entry = keyring::Entry::new(KEYRING_SERVICE, account)?;
  entry.set_password(key.trim())?;
  Ok(())
}

pub fn validate_openai_key(key: &str) -> Result<(), ConfigError> {
  let key = key.trim();
  if key.starts_with("sk-") && key.len() > 20 {
    Ok(())
  } else {
    Err(ConfigError::InvalidApiKey)
  }
}
