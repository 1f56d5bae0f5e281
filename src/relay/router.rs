use std::net::TcpListener;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::logger::Logger;
use crate::models::{
  png_data_url, strip_data_url, HealthResponse, ImageRelayRequest, ImageRelayResponse,
  TextRelayRequest, TextRelayResponse,
};
use crate::relay::dialect::{first_success, usable_image, Dialect, DialectError, ImageJob};

pub struct RelayState {
  pub started_at: Instant,
  pub config: AppConfig,
  pub api_key: String,
  pub client: reqwest::Client,
  pub logger: Arc<Logger>,
  pub dialects: Vec<Box<dyn Dialect>>,
}

pub fn relay_app(state: RelayState) -> Router {
  Router::new()
    .route("/health", get(health))
    .route("/api/gemini/text", post(gemini_text))
    .route("/api/gemini/image", post(gemini_image))
    .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
    .with_state(Arc::new(state))
}

pub async fn run_relay(listener: TcpListener, state: RelayState) -> anyhow::Result<()> {
  listener.set_nonblocking(true)?;
  let app = relay_app(state);
  let listener = tokio::net::TcpListener::from_std(listener)?;
  axum::serve(listener, app).await?;
  Ok(())
}

async fn health(State(state): State<Arc<RelayState>>) -> Json<HealthResponse> {
  Json(HealthResponse {
    status: "ok".to_string(),
    version: env!("CARGO_PKG_VERSION").to_string(),
    uptime_ms: state.started_at.elapsed().as_millis(),
  })
}

fn error_response(status: StatusCode, body: Value) -> Response {
  (status, Json(body)).into_response()
}

/// Empty bodies count as `{}`; scalars are read as strings.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, Response> {
  if body.iter().all(u8::is_ascii_whitespace) {
    return Ok(T::default());
  }
  let mut value: Value = serde_json::from_slice(body).map_err(|err| {
    error_response(
      StatusCode::BAD_REQUEST,
      json!({ "error": "Invalid JSON", "details": err.to_string() }),
    )
  })?;
  if let Value::Object(fields) = &mut value {
    fields.retain(|_, v| !v.is_null());
    for v in fields.values_mut() {
      if v.is_number() || v.is_boolean() {
        *v = Value::String(v.to_string());
      }
    }
  }
  serde_json::from_value(value).map_err(|err| {
    error_response(
      StatusCode::BAD_REQUEST,
      json!({ "error": "Invalid request body", "details": err.to_string() }),
    )
  })
}

fn pick(value: Option<String>, default: &str) -> String {
  value
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
    .unwrap_or_else(|| default.to_string())
}

fn model_url(base: &str, model: &str, method: &str) -> Result<reqwest::Url, DialectError> {
  let mut url = reqwest::Url::parse(base).map_err(|_| DialectError::BadBaseUrl(base.to_string()))?;
  url
    .path_segments_mut()
    .map_err(|_| DialectError::BadBaseUrl(base.to_string()))?
    .pop_if_empty()
    .push("models")
    .push(&format!("{model}{method}"));
  Ok(url)
}

/// Parses an upstream body, keeping non-JSON text under `raw`.
fn upstream_json(raw: &str) -> Value {
  if raw.trim().is_empty() {
    return json!({});
  }
  serde_json::from_str(raw).unwrap_or_else(|_| json!({ "raw": raw }))
}

async fn gemini_text(State(state): State<Arc<RelayState>>, body: Bytes) -> Response {
  let req: TextRelayRequest = match parse_body(&body) {
    Ok(req) => req,
    Err(resp) => return resp,
  };
  let model = pick(req.model, &state.config.gemini_text_model);
  let mime = pick(req.response_mime_type, "text/plain");
  state.logger.info(&format!("text request model={model} mime={mime}"));

  let url = match model_url(&state.config.gemini_base_url, &model, ":generateContent") {
    Ok(url) => url,
    Err(err) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": err.to_string() })),
  };
  let payload = json!({
    "contents": [{
      "role": "user",
      "parts": [{ "text": format!("SYSTEM:\n{}\n\nUSER:\n{}", req.system_prompt, req.user_query) }]
    }],
    "generationConfig": { "response_mime_type": mime }
  });

  let resp = match state
    .client
    .post(url)
    .header("x-goog-api-key", &state.api_key)
    .json(&payload)
    .send()
    .await
  {
    Ok(resp) => resp,
    Err(err) => {
      state.logger.error(&format!("text upstream request failed: {err}"));
      return error_response(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": err.to_string() }));
    }
  };

  let upstream_status = resp.status();
  let raw = resp.text().await.unwrap_or_default();
  let data = upstream_json(&raw);
  if !upstream_status.is_success() {
    state
      .logger
      .warn(&format!("text upstream returned {upstream_status}"));
    let status = StatusCode::from_u16(upstream_status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    return error_response(status, data);
  }

  let text = data["candidates"][0]["content"]["parts"][0]["text"]
    .as_str()
    .unwrap_or("")
    .trim()
    .to_string();
  (StatusCode::OK, Json(TextRelayResponse { text })).into_response()
}

async fn gemini_image(State(state): State<Arc<RelayState>>, body: Bytes) -> Response {
  let req: ImageRelayRequest = match parse_body(&body) {
    Ok(req) => req,
    Err(resp) => return resp,
  };
  let model = pick(req.model, &state.config.gemini_image_model);
  let aspect_ratio = pick(req.aspect_ratio, "1:1");
  let mime_type = pick(req.mime_type, "image/png");
  let reference = req
    .reference_image_base64
    .as_deref()
    .map(strip_data_url)
    .filter(|r| !r.is_empty());
  state.logger.info(&format!(
    "image request model={model} reference={}",
    reference.is_some()
  ));

  let job = ImageJob {
    prompt: &req.prompt,
    aspect_ratio: &aspect_ratio,
    reference,
    mime_type: &mime_type,
  };

  let result = first_success(
    state.dialects.iter(),
    |dialect| call_dialect(&state, &model, &**dialect, &job),
    |err| state.logger.warn(&format!("image dialect failed: {err}")),
  )
  .await;

  match result {
    Ok(b64) => (StatusCode::OK, Json(ImageRelayResponse { data_url: png_data_url(&b64) })).into_response(),
    Err(err) => {
      state.logger.error(&format!("image generation failed: {err}"));
      error_response(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": err.to_string() }))
    }
  }
}

async fn call_dialect(
  state: &RelayState,
  model: &str,
  dialect: &dyn Dialect,
  job: &ImageJob<'_>,
) -> Result<String, DialectError> {
  let url = model_url(&state.config.gemini_base_url, model, dialect.method())?;
  let resp = state
    .client
    .post(url)
    .header("x-goog-api-key", &state.api_key)
    .json(&dialect.body(job))
    .send()
    .await
    .map_err(|source| DialectError::Transport {
      dialect: dialect.name(),
      source,
    })?;

  let status = resp.status();
  let raw = resp.text().await.unwrap_or_default();
  if !status.is_success() {
    return Err(DialectError::Upstream {
      dialect: dialect.name(),
      status: status.as_u16(),
      body: raw.chars().take(300).collect(),
    });
  }
  usable_image(dialect, &upstream_json(&raw))
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use axum::extract::Path;
  use axum::http::HeaderMap;

  use super::*;
  use crate::relay::dialect::default_dialects;
  use crate::test_support::serve;

  async fn relay_for(upstream: &str) -> String {
    let state = RelayState {
      started_at: Instant::now(),
      config: AppConfig {
        gemini_base_url: format!("{upstream}/v1beta"),
        ..AppConfig::default()
      },
      api_key: "test-key".to_string(),
      client: reqwest::Client::new(),
      logger: Arc::new(Logger::disabled()),
      dialects: default_dialects(),
    };
    serve(relay_app(state)).await
  }

  #[test]
  fn model_url_appends_method_to_model_segment() {
    let url = model_url("https://example.com/v1beta", "gemini-x", ":generateContent").unwrap();
    assert_eq!(url.as_str(), "https://example.com/v1beta/models/gemini-x:generateContent");
    let url = model_url("https://example.com/v1beta/", "a b", ":predict").unwrap();
    assert_eq!(url.as_str(), "https://example.com/v1beta/models/a%20b:predict");
    assert!(model_url("not a url", "m", ":predict").is_err());
  }

  #[tokio::test]
  async fn text_returns_first_candidate_text() {
    let seen = Arc::new(Mutex::new(Vec::<(String, String, Value)>::new()));
    let record = seen.clone();
    let upstream = Router::new().route(
      "/v1beta/models/:call",
      post(move |Path(call): Path<String>, headers: HeaderMap, Json(body): Json<Value>| {
        let record = record.clone();
        async move {
          let key = headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
          record.lock().unwrap().push((call, key, body));
          Json(json!({ "candidates": [{ "content": { "parts": [{ "text": " Hello from upstream \n" }] } }] }))
        }
      }),
    );
    let relay = relay_for(&serve(upstream).await).await;

    let resp = reqwest::Client::new()
      .post(format!("{relay}/api/gemini/text"))
      .json(&json!({ "systemPrompt": "x", "userQuery": "y" }))
      .send()
      .await
      .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "text": "Hello from upstream" }));

    let seen = seen.lock().unwrap();
    let (call, key, sent) = &seen[0];
    assert_eq!(call, "gemini-2.5-flash-preview-05-20:generateContent");
    assert_eq!(key, "test-key");
    assert_eq!(sent["contents"][0]["parts"][0]["text"], "SYSTEM:\nx\n\nUSER:\ny");
    assert_eq!(sent["generationConfig"]["response_mime_type"], "text/plain");
  }

  #[tokio::test]
  async fn text_mirrors_upstream_errors() {
    let upstream = Router::new().route(
      "/v1beta/models/:call",
      post(|| async { (StatusCode::TOO_MANY_REQUESTS, Json(json!({ "error": { "message": "quota" } }))) }),
    );
    let relay = relay_for(&serve(upstream).await).await;

    let resp = reqwest::Client::new()
      .post(format!("{relay}/api/gemini/text"))
      .json(&json!({ "userQuery": "y" }))
      .send()
      .await
      .unwrap();
    assert_eq!(resp.status(), 429);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "quota");
  }

  #[tokio::test]
  async fn malformed_json_is_a_400_with_details() {
    let upstream = Router::new();
    let relay = relay_for(&serve(upstream).await).await;

    for path in ["/api/gemini/text", "/api/gemini/image"] {
      let resp = reqwest::Client::new()
        .post(format!("{relay}{path}"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
      assert_eq!(resp.status(), 400);
      let body: Value = resp.json().await.unwrap();
      assert_eq!(body["error"], "Invalid JSON");
      assert!(!body["details"].as_str().unwrap().is_empty());
    }
  }

  #[tokio::test]
  async fn scalar_fields_are_read_as_strings() {
    let seen = Arc::new(Mutex::new(Vec::<Value>::new()));
    let record = seen.clone();
    let upstream = Router::new().route(
      "/v1beta/models/:call",
      post(move |Json(body): Json<Value>| {
        let record = record.clone();
        async move {
          record.lock().unwrap().push(body);
          Json(json!({ "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }] }))
        }
      }),
    );
    let relay = relay_for(&serve(upstream).await).await;

    let resp = reqwest::Client::new()
      .post(format!("{relay}/api/gemini/text"))
      .json(&json!({ "systemPrompt": "x", "userQuery": 7, "model": null }))
      .send()
      .await
      .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(seen.lock().unwrap()[0]["contents"][0]["parts"][0]["text"], "SYSTEM:\nx\n\nUSER:\n7");

    let resp = reqwest::Client::new()
      .post(format!("{relay}/api/gemini/text"))
      .json(&json!({ "userQuery": ["not", "a", "string"] }))
      .send()
      .await
      .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid request body");
  }

  #[tokio::test]
  async fn image_walks_dialects_until_one_returns_an_image() {
    let calls = Arc::new(Mutex::new(Vec::<String>::new()));
    let record = calls.clone();
    let upstream = Router::new().route(
      "/v1beta/models/:call",
      post(move |Path(call): Path<String>, Json(body): Json<Value>| {
        let record = record.clone();
        async move {
          record.lock().unwrap().push(call.clone());
          if call.ends_with(":generateContent") {
            // Text only, no inline image.
            (StatusCode::OK, Json(json!({ "candidates": [{ "content": { "parts": [{ "text": "sorry" }] } }] })))
          } else if call.ends_with(":generateImages") {
            (StatusCode::NOT_FOUND, Json(json!({ "error": "unknown method" })))
          } else {
            assert_eq!(body["instances"][0]["referenceImages"][0]["bytesBase64"], "QUJD");
            (StatusCode::OK, Json(json!({ "predictions": [{ "bytesBase64Encoded": "SU1H" }] })))
          }
        }
      }),
    );
    let relay = relay_for(&serve(upstream).await).await;

    let resp = reqwest::Client::new()
      .post(format!("{relay}/api/gemini/image"))
      .json(&json!({
        "prompt": "cartoon me",
        "referenceImageBase64": "data:image/jpeg;base64,QUJD",
        "mimeType": "image/jpeg"
      }))
      .send()
      .await
      .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["dataUrl"], "data:image/png;base64,SU1H");

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    assert!(calls[2].ends_with(":predict"));
  }

  #[tokio::test]
  async fn image_reports_last_error_when_every_dialect_fails() {
    let upstream = Router::new().route(
      "/v1beta/models/:call",
      post(|| async { (StatusCode::BAD_REQUEST, "nope") }),
    );
    let relay = relay_for(&serve(upstream).await).await;

    let resp = reqwest::Client::new()
      .post(format!("{relay}/api/gemini/image"))
      .json(&json!({ "prompt": "p" }))
      .send()
      .await
      .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("predict-text: upstream returned 400"));
  }

  #[tokio::test]
  async fn health_reports_ok() {
    let relay = relay_for("http://127.0.0.1:9").await;
    let body: Value = reqwest::get(format!("{relay}/health")).await.unwrap().json().await.unwrap();
    assert_eq!(body["status"], "ok");
  }
}
