use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("API Error: {status}. Details: {details}...")]
  Status { status: u16, details: String },
  #[error("no content in response")]
  NoContent,
  #[error("malformed response: {0}")]
  Malformed(String),
  #[error("invalid API key format")]
  InvalidKey,
  #[error("request body cannot be replayed")]
  NotReplayable,
}

impl GenerationError {
  /// First `limit` characters of the message, for banners.
  pub fn short_message(&self, limit: usize) -> String {
    self.to_string().chars().take(limit).collect()
  }
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("GEMINI_API_KEY is not set and no key is stored in the keyring")]
  MissingApiKey,
  #[error("invalid API key format")]
  InvalidApiKey,
  #[error("invalid PORT value: {0}")]
  InvalidPort(String),
  #[error("keyring error: {0}")]
  Keyring(#[from] keyring::Error),
}
