mod gemini;
mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{AppConfig, ProviderKind};
use crate::error::GenerationError;
use crate::logger::Logger;
use crate::models::{png_data_url, ImageRef, ImageRequest, RequestEnvelope};

pub use gemini::GeminiRelayProvider;
pub use openai::OpenAiProvider;

#[async_trait]
pub trait GenerationProvider: Send + Sync {
  fn name(&self) -> &str;

  async fn generate_text(&self, envelope: &RequestEnvelope) -> Result<String, GenerationError>;

  /// Plain generation without a photo, image-edit with one.
  async fn generate_image(&self, request: &ImageRequest) -> Result<ImageRef, GenerationError>;

  async fn text(
    &self,
    system_prompt: &str,
    user_query: &str,
    want_json: bool,
  ) -> Result<String, GenerationError> {
    self
      .generate_text(&RequestEnvelope::new(system_prompt, user_query, want_json))
      .await
  }
}

pub fn from_config(
  config: &AppConfig,
  openai_key: Option<String>,
  logger: Arc<Logger>,
) -> Result<Arc<dyn GenerationProvider>, GenerationError> {
  match config.provider {
    ProviderKind::OpenAi => Ok(Arc::new(OpenAiProvider::new(config, openai_key, logger)?)),
    ProviderKind::Gemini => Ok(Arc::new(GeminiRelayProvider::new(config))),
  }
}

/// Edit with the photo, then plain generation, then the bundled sample image.
pub async fn generate_image_or_fallback(
  provider: &dyn GenerationProvider,
  prompt: &str,
  size: &str,
  reference_photo: Option<&str>,
  logger: &Logger,
) -> ImageRef {
  if let Some(photo) = reference_photo {
    let edit = ImageRequest {
      prompt: prompt.to_string(),
      size: size.to_string(),
      reference_photo: Some(photo.to_string()),
    };
    match provider.generate_image(&edit).await {
      Ok(image) => return image,
      Err(err) => logger.warn(&format!(
        "image edit via {} failed, falling back to generation: {err}",
        provider.name()
      )),
    }
  }

  let plain = ImageRequest {
    prompt: prompt.to_string(),
    size: size.to_string(),
    reference_photo: None,
  };
  match provider.generate_image(&plain).await {
    Ok(image) => image,
    Err(err) => {
      logger.error(&format!("image generation via {} failed: {err}", provider.name()));
      ImageRef::fallback()
    }
  }
}

/// Tries `dataUrl`, then a base64 payload, then a direct URL.
pub fn extract_image_ref(value: &Value) -> Option<ImageRef> {
  let non_empty = |v: &Value| v.as_str().filter(|s| !s.is_empty()).map(str::to_string);

  if let Some(data_url) = non_empty(&value["dataUrl"]) {
    return Some(ImageRef::DataUrl(data_url));
  }
  if let Some(b64) = non_empty(&value["data"][0]["b64_json"]).or_else(|| non_empty(&value["image"]["b64_json"])) {
    return Some(ImageRef::DataUrl(png_data_url(&b64)));
  }
  non_empty(&value["data"][0]["url"])
    .or_else(|| non_empty(&value["url"]))
    .map(ImageRef::Url)
}

/// Reads a body as JSON, keeping the raw text as the error when it isn't.
pub(crate) async fn read_json(resp: reqwest::Response) -> Result<Value, GenerationError> {
  let text = resp.text().await?;
  serde_json::from_str(&text).map_err(|_| {
    if text.trim().is_empty() {
      GenerationError::Malformed("empty response body".to_string())
    } else {
      GenerationError::Malformed(text.chars().take(200).collect())
    }
  })
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use serde_json::json;

  use super::*;

  #[test]
  fn from_config_picks_the_configured_backend() {
    let logger = Arc::new(Logger::disabled());
    let gemini = AppConfig {
      provider: ProviderKind::Gemini,
      ..AppConfig::default()
    };
    assert_eq!(from_config(&gemini, None, logger.clone()).unwrap().name(), "gemini");
    assert_eq!(from_config(&AppConfig::default(), None, logger.clone()).unwrap().name(), "openai");
    assert!(matches!(
      from_config(&AppConfig::default(), Some("not-a-key".to_string()), logger),
      Err(GenerationError::InvalidKey)
    ));
  }

  #[test]
  fn image_shapes_are_tried_in_priority_order() {
    let both = json!({ "dataUrl": "data:image/png;base64,AAA", "data": [{ "b64_json": "BBB" }] });
    assert_eq!(
      extract_image_ref(&both),
      Some(ImageRef::DataUrl("data:image/png;base64,AAA".to_string()))
    );

    let b64 = json!({ "data": [{ "b64_json": "BBB", "url": "https://x/y.png" }] });
    assert_eq!(
      extract_image_ref(&b64),
      Some(ImageRef::DataUrl("data:image/png;base64,BBB".to_string()))
    );

    let nested = json!({ "image": { "b64_json": "CCC" } });
    assert_eq!(
      extract_image_ref(&nested),
      Some(ImageRef::DataUrl("data:image/png;base64,CCC".to_string()))
    );

    let url = json!({ "url": "https://x/z.png" });
    assert_eq!(extract_image_ref(&url), Some(ImageRef::Url("https://x/z.png".to_string())));

    assert_eq!(extract_image_ref(&json!({ "data": [] })), None);
    assert_eq!(extract_image_ref(&json!({ "dataUrl": "" })), None);
  }

  /// Answers image calls from a script: one entry per call, `None` meaning failure.
  struct Scripted {
    replies: Mutex<Vec<Option<ImageRef>>>,
    seen: Mutex<Vec<bool>>,
  }

  impl Scripted {
    fn new(replies: Vec<Option<ImageRef>>) -> Self {
      Self {
        replies: Mutex::new(replies),
        seen: Mutex::new(Vec::new()),
      }
    }
  }

  #[async_trait]
  impl GenerationProvider for Scripted {
    fn name(&self) -> &str {
      "scripted"
    }

    async fn generate_text(&self, _: &RequestEnvelope) -> Result<String, GenerationError> {
      Err(GenerationError::NoContent)
    }

    async fn generate_image(&self, request: &ImageRequest) -> Result<ImageRef, GenerationError> {
      self.seen.lock().unwrap().push(request.reference_photo.is_some());
      self
        .replies
        .lock()
        .unwrap()
        .remove(0)
        .ok_or_else(|| GenerationError::Malformed("scripted failure".to_string()))
    }
  }

  #[tokio::test]
  async fn edit_result_is_used_when_it_works() {
    let provider = Scripted::new(vec![Some(ImageRef::Url("edited".to_string()))]);
    let image = generate_image_or_fallback(&provider, "p", "1024x1024", Some("data:image/png;base64,QQ=="), &Logger::disabled()).await;
    assert_eq!(image, ImageRef::Url("edited".to_string()));
    assert_eq!(*provider.seen.lock().unwrap(), vec![true]);
  }

  #[tokio::test]
  async fn failed_edit_falls_back_to_plain_generation() {
    let provider = Scripted::new(vec![None, Some(ImageRef::Url("plain".to_string()))]);
    let image = generate_image_or_fallback(&provider, "p", "1024x1024", Some("data:image/png;base64,QQ=="), &Logger::disabled()).await;
    assert_eq!(image, ImageRef::Url("plain".to_string()));
    assert_eq!(*provider.seen.lock().unwrap(), vec![true, false]);
  }

  #[tokio::test]
  async fn both_failures_yield_the_static_image() {
    let provider = Scripted::new(vec![None, None]);
    let image = generate_image_or_fallback(&provider, "p", "1024x1024", Some("data:image/png;base64,QQ=="), &Logger::disabled()).await;
    assert_eq!(image, ImageRef::fallback());
    assert_eq!(image.as_str(), "image/sample_image.png");
  }

  #[tokio::test]
  async fn without_a_photo_only_plain_generation_runs() {
    let provider = Scripted::new(vec![None]);
    let image = generate_image_or_fallback(&provider, "p", "1024x1024", None, &Logger::disabled()).await;
    assert!(image.is_fallback());
    assert_eq!(*provider.seen.lock().unwrap(), vec![false]);
  }
}
