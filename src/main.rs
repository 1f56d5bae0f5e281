use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;

use thisisme::config::{load_or_init, resolve_gemini_key};
use thisisme::logger::Logger;
use thisisme::relay::dialect::default_dialects;
use thisisme::relay::{run_relay, RelayState};

const DATA_DIR_ENV: &str = "THISISME_DATA_DIR";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let data_dir = std::env::var_os(DATA_DIR_ENV)
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from(".thisisme"));
  std::fs::create_dir_all(&data_dir)
    .with_context(|| format!("cannot create data dir {}", data_dir.display()))?;

  let config_path = data_dir.join("config.json");
  let log_path = data_dir.join("thisisme.log");

  let config = load_or_init(&config_path)?.with_port(std::env::var("PORT").ok().as_deref())?;

  let logger = Arc::new(Logger::new(&log_path).unwrap_or_else(|err| {
    eprintln!("cannot open {}: {err}; logging to stderr", log_path.display());
    Logger::stderr()
  }));
  logger.info("relay starting up");

  let api_key = match resolve_gemini_key() {
    Ok(key) => key,
    Err(err) => {
      logger.error(&format!("refusing to start: {err}"));
      return Err(err).context("relay needs an upstream API key");
    }
  };

  let listener = std::net::TcpListener::bind(&config.bind_addr)
    .with_context(|| format!("cannot bind {}", config.bind_addr))?;
  let addr = listener.local_addr()?;
  logger.info(&format!("relay listening on http://{addr}"));
  eprintln!("relay listening on http://{addr}");

  let state = RelayState {
    started_at: Instant::now(),
    config,
    api_key,
    client: reqwest::Client::new(),
    logger: logger.clone(),
    dialects: default_dialects(),
  };

  if let Err(err) = run_relay(listener, state).await {
    logger.error(&format!("relay error: {err}"));
    return Err(err);
  }
  Ok(())
}
