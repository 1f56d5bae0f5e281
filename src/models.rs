use serde::{Deserialize, Serialize};

pub const FALLBACK_IMAGE_PATH: &str = "image/sample_image.png";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseFormat {
  Text,
  Json,
}

impl ResponseFormat {
  pub fn mime(self) -> &'static str {
    match self {
      ResponseFormat::Text => "text/plain",
      ResponseFormat::Json => "application/json",
    }
  }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
  pub system_prompt: String,
  pub user_query: String,
  pub model: Option<String>,
  pub response_format: ResponseFormat,
}

impl RequestEnvelope {
  pub fn new(system_prompt: &str, user_query: &str, want_json: bool) -> Self {
    Self {
      system_prompt: system_prompt.to_string(),
      user_query: user_query.to_string(),
      model: None,
      response_format: if want_json {
        ResponseFormat::Json
      } else {
        ResponseFormat::Text
      },
    }
  }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ImageRequest {
  pub prompt: String,
  pub size: String,
  /// Data URL of the user's photo.
  pub reference_photo: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ImageRef {
  DataUrl(String),
  Url(String),
  Fallback(String),
}

impl ImageRef {
  pub fn fallback() -> Self {
    ImageRef::Fallback(FALLBACK_IMAGE_PATH.to_string())
  }

  pub fn as_str(&self) -> &str {
    match self {
      ImageRef::DataUrl(s) | ImageRef::Url(s) | ImageRef::Fallback(s) => s,
    }
  }

  pub fn is_fallback(&self) -> bool {
    matches!(self, ImageRef::Fallback(_))
  }
}

pub fn png_data_url(base64: &str) -> String {
  format!("data:image/png;base64,{base64}")
}

/// Drops a `data:...,` header if present.
pub fn strip_data_url(data_url: &str) -> &str {
  match data_url.find(',') {
    Some(i) if data_url.starts_with("data:") => &data_url[i + 1..],
    _ => data_url,
  }
}

pub fn data_url_mime(data_url: &str) -> &str {
  data_url
    .strip_prefix("data:")
    .and_then(|rest| rest.split_once(','))
    .and_then(|(head, _)| head.strip_suffix(";base64"))
    .filter(|mime| !mime.is_empty())
    .unwrap_or("image/png")
}

// Relay wire types.

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TextRelayRequest {
  pub system_prompt: String,
  pub user_query: String,
  pub response_mime_type: Option<String>,
  pub model: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TextRelayResponse {
  pub text: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageRelayRequest {
  pub prompt: String,
  pub aspect_ratio: Option<String>,
  pub reference_image_base64: Option<String>,
  pub mime_type: Option<String>,
  pub model: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ImageRelayResponse {
  pub data_url: String,
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
  pub status: String,
  pub version: String,
  pub uptime_ms: u128,
}
