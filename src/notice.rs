use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Banner {
  pub id: String,
  pub message: String,
  #[serde(skip)]
  pub raised_at: Instant,
}

/// Error banners that dismiss themselves after `ttl`.
pub struct Notices {
  ttl: Duration,
  items: Mutex<Vec<Banner>>,
}

impl Notices {
  pub fn new(ttl: Duration) -> Self {
    Self {
      ttl,
      items: Mutex::new(Vec::new()),
    }
  }

  pub fn push(&self, message: impl Into<String>) {
    self.push_at(message, Instant::now());
  }

  pub fn push_at(&self, message: impl Into<String>, now: Instant) {
    let banner = Banner {
      id: uuid::Uuid::new_v4().to_string(),
      message: message.into(),
      raised_at: now,
    };
    if let Ok(mut items) = self.items.lock() {
      items.push(banner);
    }
  }

  pub fn active(&self) -> Vec<Banner> {
    self.active_at(Instant::now())
  }

  pub fn active_at(&self, now: Instant) -> Vec<Banner> {
    let Ok(mut items) = self.items.lock() else {
      return Vec::new();
    };
    let ttl = self.ttl;
    items.retain(|b| now.saturating_duration_since(b.raised_at) < ttl);
    items.clone()
  }

  pub fn clear(&self) {
    if let Ok(mut items) = self.items.lock() {
      items.clear();
    }
  }
}

/// Full-screen loading text; `None` when hidden.
#[derive(Default)]
pub struct LoadingOverlay {
  text: Mutex<Option<String>>,
}

impl LoadingOverlay {
  pub fn show(&self, text: &str) {
    if let Ok(mut slot) = self.text.lock() {
      *slot = Some(text.to_string());
    }
  }

  pub fn hide(&self) {
    if let Ok(mut slot) = self.text.lock() {
      *slot = None;
    }
  }

  pub fn current(&self) -> Option<String> {
    self.text.lock().ok().and_then(|slot| slot.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn banners_expire_after_ttl() {
    let notices = Notices::new(Duration::from_millis(3000));
    let start = Instant::now();
    notices.push_at("first", start);
    notices.push_at("second", start + Duration::from_millis(2000));

    assert_eq!(notices.active_at(start + Duration::from_millis(2999)).len(), 2);

    let later = notices.active_at(start + Duration::from_millis(3000));
    assert_eq!(later.len(), 1);
    assert_eq!(later[0].message, "second");

    assert!(notices.active_at(start + Duration::from_millis(5000)).is_empty());
  }

  #[test]
  fn banner_ids_are_unique() {
    let notices = Notices::new(Duration::from_secs(3));
    notices.push("a");
    notices.push("b");
    let active = notices.active();
    assert_ne!(active[0].id, active[1].id);
    notices.clear();
    assert!(notices.active().is_empty());
  }

  #[test]
  fn overlay_shows_and_hides() {
    let overlay = LoadingOverlay::default();
    assert_eq!(overlay.current(), None);
    overlay.show("Creating your image...");
    assert_eq!(overlay.current().as_deref(), Some("Creating your image..."));
    overlay.hide();
    assert_eq!(overlay.current(), None);
  }
}
