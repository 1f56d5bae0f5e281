use async_trait::async_trait;
use serde_json::Value;

use crate::config::AppConfig;
use crate::error::GenerationError;
use crate::models::{
  data_url_mime, ImageRef, ImageRelayRequest, ImageRequest, RequestEnvelope, TextRelayRequest,
};
use crate::provider::{read_json, GenerationProvider};
use crate::retry::ensure_success;

/// Calls the local relay, which holds the upstream key. No retries here.
pub struct GeminiRelayProvider {
  client: reqwest::Client,
  relay_url: String,
  text_model: String,
  image_model: String,
}

impl GeminiRelayProvider {
  pub fn new(config: &AppConfig) -> Self {
    Self {
      client: reqwest::Client::new(),
      relay_url: config.relay_url.trim_end_matches('/').to_string(),
      text_model: config.gemini_text_model.clone(),
      image_model: config.gemini_image_model.clone(),
    }
  }

  async fn post<T: serde::Serialize>(&self, path: &str, body: &T) -> Result<Value, GenerationError> {
    let resp = self
      .client
      .post(format!("{}{}", self.relay_url, path))
      .json(body)
      .send()
      .await?;
    read_json(ensure_success(resp).await?).await
  }
}

#[async_trait]
impl GenerationProvider for GeminiRelayProvider {
  fn name(&self) -> &str {
    "gemini"
  }

  async fn generate_text(&self, envelope: &RequestEnvelope) -> Result<String, GenerationError> {
    let body = TextRelayRequest {
      system_prompt: envelope.system_prompt.clone(),
      user_query: envelope.user_query.clone(),
      response_mime_type: Some(envelope.response_format.mime().to_string()),
      model: Some(envelope.model.clone().unwrap_or_else(|| self.text_model.clone())),
    };
    let value = self.post("/api/gemini/text", &body).await?;
    let text = value["text"].as_str().unwrap_or("").trim().to_string();
    if text.is_empty() {
      return Err(GenerationError::NoContent);
    }
    Ok(text)
  }

  async fn generate_image(&self, request: &ImageRequest) -> Result<ImageRef, GenerationError> {
    let photo = request.reference_photo.as_deref();
    let body = ImageRelayRequest {
      prompt: request.prompt.clone(),
      aspect_ratio: Some("1:1".to_string()),
      reference_image_base64: photo.map(str::to_string),
      mime_type: photo.map(|p| data_url_mime(p).to_string()),
      model: Some(self.image_model.clone()),
    };
    let value = self.post("/api/gemini/image", &body).await?;
    value["dataUrl"]
      .as_str()
      .filter(|s| !s.is_empty())
      .map(|s| ImageRef::DataUrl(s.to_string()))
      .ok_or_else(|| GenerationError::Malformed("relay returned no dataUrl".to_string()))
  }
}
