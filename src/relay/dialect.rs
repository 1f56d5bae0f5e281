use std::future::Future;

use base64::Engine;
use serde_json::{json, Value};
use thiserror::Error;

pub struct ImageJob<'a> {
  pub prompt: &'a str,
  pub aspect_ratio: &'a str,
  /// Raw base64, without a data URL header.
  pub reference: Option<&'a str>,
  pub mime_type: &'a str,
}

pub trait Dialect: Send + Sync {
  fn name(&self) -> &'static str;

  /// Suffix appended to `models/{model}`.
  fn method(&self) -> &'static str;

  fn body(&self, job: &ImageJob<'_>) -> Value;

  fn extract(&self, response: &Value) -> Option<String>;
}

#[derive(Debug, Error)]
pub enum DialectError {
  #[error("{dialect}: upstream returned {status}: {body}")]
  Upstream {
    dialect: &'static str,
    status: u16,
    body: String,
  },
  #[error("{dialect}: request failed: {source}")]
  Transport {
    dialect: &'static str,
    #[source]
    source: reqwest::Error,
  },
  #[error("{dialect}: no image returned")]
  NoImage { dialect: &'static str },
  #[error("invalid upstream base URL: {0}")]
  BadBaseUrl(String),
  #[error("no dialects configured")]
  Empty,
}

pub struct GenerateContent;
pub struct GenerateImages;
pub struct PredictPrompt;
pub struct PredictText;

pub fn default_dialects() -> Vec<Box<dyn Dialect>> {
  vec![
    Box::new(GenerateContent),
    Box::new(GenerateImages),
    Box::new(PredictPrompt),
    Box::new(PredictText),
  ]
}

fn reference_images(job: &ImageJob<'_>) -> Option<Value> {
  job
    .reference
    .map(|data| json!([{ "mimeType": job.mime_type, "bytesBase64": data }]))
}

fn non_empty(value: &Value) -> Option<String> {
  value.as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

impl Dialect for GenerateContent {
  fn name(&self) -> &'static str {
    "generate-content"
  }

  fn method(&self) -> &'static str {
    ":generateContent"
  }

  fn body(&self, job: &ImageJob<'_>) -> Value {
    let mut parts = Vec::new();
    if !job.prompt.is_empty() {
      parts.push(json!({ "text": job.prompt }));
    }
    if let Some(data) = job.reference {
      parts.push(json!({ "inline_data": { "mime_type": job.mime_type, "data": data } }));
    }
    json!({
      "contents": [{ "role": "user", "parts": parts }],
      "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] }
    })
  }

  fn extract(&self, response: &Value) -> Option<String> {
    response["candidates"][0]["content"]["parts"]
      .as_array()?
      .iter()
      .find_map(|part| {
        part
          .get("inline_data")
          .or_else(|| part.get("inlineData"))
          .and_then(|inline| non_empty(&inline["data"]))
      })
  }
}

impl Dialect for GenerateImages {
  fn name(&self) -> &'static str {
    "generate-images"
  }

  fn method(&self) -> &'static str {
    ":generateImages"
  }

  fn body(&self, job: &ImageJob<'_>) -> Value {
    let mut body = json!({
      "prompt": { "text": job.prompt },
      "imageGenerationConfig": { "numberOfImages": 1, "aspectRatio": job.aspect_ratio }
    });
    if let Some(refs) = reference_images(job) {
      body["referenceImages"] = refs;
    }
    body
  }

  fn extract(&self, response: &Value) -> Option<String> {
    let first = &response["generatedImages"][0];
    non_empty(&first["image"]["imageBytes"]).or_else(|| non_empty(&first["bytesBase64Encoded"]))
  }
}

fn predict_body(instance: Value, job: &ImageJob<'_>) -> Value {
  let mut instance = instance;
  if let Some(refs) = reference_images(job) {
    instance["referenceImages"] = refs;
  }
  json!({
    "instances": [instance],
    "parameters": { "sampleCount": 1, "aspectRatio": job.aspect_ratio }
  })
}

fn predict_extract(response: &Value) -> Option<String> {
  non_empty(&response["predictions"][0]["bytesBase64Encoded"])
}

impl Dialect for PredictPrompt {
  fn name(&self) -> &'static str {
    "predict-prompt"
  }

  fn method(&self) -> &'static str {
    ":predict"
  }

  fn body(&self, job: &ImageJob<'_>) -> Value {
    predict_body(json!({ "prompt": { "text": job.prompt } }), job)
  }

  fn extract(&self, response: &Value) -> Option<String> {
    predict_extract(response)
  }
}

impl Dialect for PredictText {
  fn name(&self) -> &'static str {
    "predict-text"
  }

  fn method(&self) -> &'static str {
    ":predict"
  }

  fn body(&self, job: &ImageJob<'_>) -> Value {
    predict_body(json!({ "text": job.prompt }), job)
  }

  fn extract(&self, response: &Value) -> Option<String> {
    predict_extract(response)
  }
}

pub fn usable_image(dialect: &dyn Dialect, response: &Value) -> Result<String, DialectError> {
  dialect
    .extract(response)
    .filter(|b64| base64::engine::general_purpose::STANDARD.decode(b64).is_ok())
    .ok_or(DialectError::NoImage {
      dialect: dialect.name(),
    })
}

/// First success wins; otherwise the last error.
pub async fn first_success<I, T, F, Fut>(
  items: I,
  mut attempt: F,
  mut on_error: impl FnMut(&DialectError),
) -> Result<T, DialectError>
where
  I: IntoIterator,
  F: FnMut(I::Item) -> Fut,
  Fut: Future<Output = Result<T, DialectError>>,
{
  let mut last = DialectError::Empty;
  for item in items {
    match attempt(item).await {
      Ok(value) => return Ok(value),
      Err(err) => {
        on_error(&err);
        last = err;
      }
    }
  }
  Err(last)
}
