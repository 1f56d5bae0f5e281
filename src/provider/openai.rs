use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::{validate_openai_key, AppConfig};
use crate::error::GenerationError;
use crate::logger::Logger;
use crate::models::{data_url_mime, ImageRef, ImageRequest, RequestEnvelope, ResponseFormat};
use crate::provider::{extract_image_ref, read_json, GenerationProvider};
use crate::retry::{ensure_success, fetch_with_retry, RetryPolicy};

pub struct OpenAiProvider {
  client: reqwest::Client,
  backend_url: String,
  text_model: String,
  image_model: String,
  api_key: Option<String>,
  retry: RetryPolicy,
  logger: Arc<Logger>,
}

impl OpenAiProvider {
  /// A key of the wrong shape is refused here, before any request is sent.
  pub fn new(
    config: &AppConfig,
    api_key: Option<String>,
    logger: Arc<Logger>,
  ) -> Result<Self, GenerationError> {
    if let Some(key) = api_key.as_deref() {
      validate_openai_key(key).map_err(|_| GenerationError::InvalidKey)?;
    }
    Ok(Self {
      client: reqwest::Client::new(),
      backend_url: config.backend_url.trim_end_matches('/').to_string(),
      text_model: config.text_model.clone(),
      image_model: config.image_model.clone(),
      api_key: api_key.map(|k| k.trim().to_string()),
      retry: config.retry_policy(),
      logger,
    })
  }

  fn request(&self, path: &str, body: &Value) -> Result<reqwest::Request, GenerationError> {
    let mut builder = self
      .client
      .post(format!("{}/{}", self.backend_url, path))
      .json(body);
    if let Some(key) = &self.api_key {
      builder = builder.bearer_auth(key);
    }
    Ok(builder.build()?)
  }
}

fn chat_body(model: &str, envelope: &RequestEnvelope) -> Value {
  let mut body = json!({
    "model": envelope.model.as_deref().unwrap_or(model),
    "messages": [
      { "role": "system", "content": envelope.system_prompt },
      { "role": "user", "content": envelope.user_query }
    ],
    "temperature": 0.7
  });
  if envelope.response_format == ResponseFormat::Json {
    body["response_format"] = json!({ "type": "json_object" });
  }
  body
}

fn completion_text(value: &Value) -> String {
  let content = match value["choices"].as_array() {
    Some(choices) if !choices.is_empty() => choices[0]["message"]["content"].as_str(),
    _ => value["text"].as_str(),
  };
  content.unwrap_or("").trim().to_string()
}

#[async_trait]
impl GenerationProvider for OpenAiProvider {
  fn name(&self) -> &str {
    "openai"
  }

  async fn generate_text(&self, envelope: &RequestEnvelope) -> Result<String, GenerationError> {
    let request = self.request("chat/completions", &chat_body(&self.text_model, envelope))?;
    let resp = fetch_with_retry(&self.client, request, self.retry, &self.logger).await?;
    let text = completion_text(&read_json(resp).await?);
    if text.is_empty() {
      return Err(GenerationError::NoContent);
    }
    Ok(text)
  }

  async fn generate_image(&self, request: &ImageRequest) -> Result<ImageRef, GenerationError> {
    let mut body = json!({
      "model": self.image_model,
      "prompt": request.prompt,
      "size": request.size
    });

    let resp = match request.reference_photo.as_deref() {
      // Edits are not retried; the caller falls back to plain generation instead.
      Some(photo) => {
        body["imageBase64"] = json!(photo);
        body["mimeType"] = json!(data_url_mime(photo));
        let http = self.request("images/generations", &body)?;
        ensure_success(self.client.execute(http).await?).await?
      }
      None => {
        let http = self.request("images/generations", &body)?;
        fetch_with_retry(&self.client, http, self.retry, &self.logger).await?
      }
    };

    let value = read_json(resp).await?;
    extract_image_ref(&value)
      .ok_or_else(|| GenerationError::Malformed("image generation returned no data".to_string()))
  }
}
