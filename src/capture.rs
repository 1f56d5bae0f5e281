use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CameraError {
  #[error("camera permission denied: {0}")]
  Denied(String),
  #[error("no camera available")]
  Unavailable,
  #[error("camera is not running")]
  NotActive,
}

/// A webcam-like frame source. At most one stream is open at a time.
#[async_trait]
pub trait MediaSource: Send + Sync {
  async fn start(&mut self) -> Result<(), CameraError>;

  async fn capture(&mut self) -> Result<String, CameraError>;

  fn stop(&mut self);

  fn is_active(&self) -> bool;
}

/// Host without a camera; every start is refused so the upload path is used.
#[derive(Default)]
pub struct NoCamera;

#[async_trait]
impl MediaSource for NoCamera {
  async fn start(&mut self) -> Result<(), CameraError> {
    Err(CameraError::Unavailable)
  }

  async fn capture(&mut self) -> Result<String, CameraError> {
    Err(CameraError::NotActive)
  }

  fn stop(&mut self) {}

  fn is_active(&self) -> bool {
    false
  }
}
