use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;

enum Sink {
  File(Mutex<std::fs::File>),
  Stderr,
  Disabled,
}

pub struct Logger {
  sink: Sink,
}

impl Logger {
  pub fn new(path: &Path) -> anyhow::Result<Self> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Self {
      sink: Sink::File(Mutex::new(file)),
    })
  }

  pub fn stderr() -> Self {
    Self { sink: Sink::Stderr }
  }

  pub fn disabled() -> Self {
    Self { sink: Sink::Disabled }
  }

  pub fn log(&self, level: &str, message: &str) {
    let ts = Utc::now().to_rfc3339();
    let line = format!("[{ts}] {level}: {message}\n");
    match &self.sink {
      Sink::File(file) => {
        if let Ok(mut file) = file.lock() {
          let _ = file.write_all(line.as_bytes());
        }
      }
      Sink::Stderr => eprint!("{line}"),
      Sink::Disabled => {}
    }
  }

  pub fn info(&self, message: &str) {
    self.log("INFO", message);
  }

  pub fn warn(&self, message: &str) {
    self.log("WARN", message);
  }

  pub fn error(&self, message: &str) {
    self.log("ERROR", message);
  }
}
