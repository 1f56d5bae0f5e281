use std::future::Future;
use std::time::Duration;

use crate::error::GenerationError;
use crate::logger::Logger;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub base_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      base_delay: Duration::from_millis(1000),
    }
  }
}

impl RetryPolicy {
  /// Wait after the zero-indexed `attempt` failed: base, 2*base, 4*base, ...
  pub fn delay_for(&self, attempt: u32) -> Duration {
    let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
    self.base_delay.saturating_mul(factor)
  }
}

/// Runs `op` until it succeeds or the policy's attempts are used up.
pub async fn retry_with_backoff<T, F, Fut>(
  policy: RetryPolicy,
  logger: &Logger,
  mut op: F,
) -> Result<T, GenerationError>
where
  F: FnMut(u32) -> Fut,
  Fut: Future<Output = Result<T, GenerationError>>,
{
  let attempts = policy.max_attempts.max(1);
  let mut attempt = 0;
  loop {
    match op(attempt).await {
      Ok(value) => return Ok(value),
      Err(err) => {
        if attempt + 1 >= attempts {
          logger.error(&format!("API call failed after all retries: {err}"));
          return Err(err);
        }
        let delay = policy.delay_for(attempt);
        logger.warn(&format!(
          "attempt {}/{} failed: {err}; retrying in {}ms",
          attempt + 1,
          attempts,
          delay.as_millis()
        ));
        tokio::time::sleep(delay).await;
        attempt += 1;
      }
    }
  }
}

/// Sends `request`, replaying it with backoff on transport errors and non-2xx statuses.
pub async fn fetch_with_retry(
  client: &reqwest::Client,
  request: reqwest::Request,
  policy: RetryPolicy,
  logger: &Logger,
) -> Result<reqwest::Response, GenerationError> {
  retry_with_backoff(policy, logger, |_| {
    let next = request.try_clone();
    async move {
      let next = next.ok_or(GenerationError::NotReplayable)?;
      let resp = client.execute(next).await?;
      ensure_success(resp).await
    }
  })
  .await
}

pub async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, GenerationError> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body = resp.text().await.unwrap_or_default();
  Err(GenerationError::Status {
    status: status.as_u16(),
    details: body.chars().take(100).collect(),
  })
}
