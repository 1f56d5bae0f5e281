use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::error::GenerationError;
use crate::logger::Logger;
use crate::notice::Notices;
use crate::options::category::Category;
use crate::options::normalize::{normalize_options, selected_value};
use crate::provider::GenerationProvider;

pub const OPTION_COUNT: usize = 5;
pub const MAX_ANSWER_CHARS: usize = 60;

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct OptionSet {
  pub value: String,
  pub options: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
  Fetched,
  FellBack,
  /// Another fetch for the category was already running.
  Skipped,
}

#[derive(Debug, Error)]
pub enum OptionsError {
  #[error(transparent)]
  Generation(#[from] GenerationError),
  #[error("Failed to parse AI response: {0}")]
  Parse(String),
  #[error("AI returned no options.")]
  Empty,
}

#[derive(Default)]
struct Board {
  sets: HashMap<Category, OptionSet>,
  recent: HashMap<Category, Vec<String>>,
  busy: HashSet<Category>,
}

pub struct OptionGenerator {
  provider: Arc<dyn GenerationProvider>,
  notices: Arc<Notices>,
  logger: Arc<Logger>,
  board: Mutex<Board>,
}

impl OptionGenerator {
  pub fn new(provider: Arc<dyn GenerationProvider>, notices: Arc<Notices>, logger: Arc<Logger>) -> Self {
    Self {
      provider,
      notices,
      logger,
      board: Mutex::new(Board::default()),
    }
  }

  /// Refreshes the options for `category`. Failures leave the fallback list in place.
  pub async fn fetch_options(&self, category: Category, description: &str) -> FetchOutcome {
    let previous = {
      let mut board = self.board.lock().await;
      if !board.busy.insert(category) {
        return FetchOutcome::Skipped;
      }
      let set = board.sets.entry(category).or_default();
      set.value.clear();
      set.options.clone()
    };

    let (system_prompt, user_query) = option_prompt(category, description, &previous);
    let result = self.request_options(&system_prompt, &user_query).await;

    let mut board = self.board.lock().await;
    board.busy.remove(&category);
    match result {
      Ok(raw) => {
        let recent = board.recent.get(&category).cloned().unwrap_or_default();
        let chosen = select_options(category, &raw, &recent, &mut rand::thread_rng());
        board.recent.insert(category, chosen.clone());
        board.sets.insert(
          category,
          OptionSet {
            value: String::new(),
            options: chosen,
          },
        );
        FetchOutcome::Fetched
      }
      Err(err) => {
        self
          .logger
          .error(&format!("option fetch for {} failed: {err}", category.key()));
        board.sets.insert(
          category,
          OptionSet {
            value: String::new(),
            options: fallback(category),
          },
        );
        let short: String = err.to_string().chars().take(50).collect();
        self
          .notices
          .push(format!("Couldn't make new choices: {short}... using backup options."));
        FetchOutcome::FellBack
      }
    }
  }

  async fn request_options(&self, system_prompt: &str, user_query: &str) -> Result<Vec<String>, OptionsError> {
    let text = self.provider.text(system_prompt, user_query, true).await?;
    parse_options(&text)
  }

  pub async fn snapshot(&self, category: Category) -> OptionSet {
    self.board.lock().await.sets.get(&category).cloned().unwrap_or_default()
  }

  pub async fn is_busy(&self, category: Category) -> bool {
    self.board.lock().await.busy.contains(&category)
  }

  pub async fn set_value(&self, category: Category, value: &str) {
    let value: String = value.chars().take(MAX_ANSWER_CHARS).collect();
    self.board.lock().await.sets.entry(category).or_default().value = value;
  }

  pub async fn select_option(&self, category: Category, option: &str) -> String {
    let value = selected_value(category, option);
    self.board.lock().await.sets.entry(category).or_default().value = value.clone();
    value
  }

  pub async fn reset(&self) {
    *self.board.lock().await = Board::default();
  }
}

fn fallback(category: Category) -> Vec<String> {
  category.fallback_options().iter().map(|s| s.to_string()).collect()
}

pub fn option_prompt(category: Category, description: &str, previous: &[String]) -> (String, String) {
  let previous_line = if previous.is_empty() {
    String::new()
  } else {
    format!("Previously shown options: [{}].", previous.join(", "))
  };
  let system_prompt = format!(
    "You are an AI assistant for young elementary students.
Provide {OPTION_COUNT} simple, short phrase options for the category: \"{description}\".
CRITICAL RULES:
- Each option MUST be grammatically correct when inserted into the fixed sentence pattern for that category (\"{sentence}\").{rules}
- Generate five options that are ALL different from one another AND also different from the previously shown list for this category (avoid repeats for at least the next refresh). If the word pool is too small, you may repeat only when necessary on later refreshes, but prefer new items first.
- Start with lowercase unless proper nouns are required (not expected here).
{previous_line}
Respond ONLY with a JSON object: {{ \"options\": string[] }}.",
    sentence = category.sentence(),
    rules = category.extra_rules(),
  );
  let user_query = format!("Generate {OPTION_COUNT} options for the category: \"{description}\".");
  (system_prompt, user_query)
}

/// Reads `{ "options": [...] }`, tolerating fences or prose around the object.
pub fn parse_options(text: &str) -> Result<Vec<String>, OptionsError> {
  let value: Value = match serde_json::from_str(text.trim()) {
    Ok(value) => value,
    Err(err) => {
      let start = text.find('{');
      let end = text.rfind('}');
      match (start, end) {
        (Some(start), Some(end)) if start < end => {
          serde_json::from_str(&text[start..=end]).map_err(|e| OptionsError::Parse(e.to_string()))?
        }
        _ => return Err(OptionsError::Parse(err.to_string())),
      }
    }
  };

  let options: Vec<String> = value["options"]
    .as_array()
    .map(|items| {
      items
        .iter()
        .filter_map(|item| match item {
          Value::String(s) => Some(s.clone()),
          Value::Number(n) => Some(n.to_string()),
          _ => None,
        })
        .take(OPTION_COUNT)
        .collect()
    })
    .unwrap_or_default();

  if options.is_empty() {
    return Err(OptionsError::Empty);
  }
  Ok(options)
}

pub fn select_options<R: Rng + ?Sized>(
  category: Category,
  raw: &[String],
  recent: &[String],
  rng: &mut R,
) -> Vec<String> {
  let mut normalized = normalize_options(category, raw);
  normalized.shuffle(rng);

  let fresh: Vec<String> = normalized
    .iter()
    .filter(|option| !recent.contains(option))
    .cloned()
    .collect();
  let mut chosen = if fresh.len() >= OPTION_COUNT { fresh } else { normalized };
  chosen.truncate(OPTION_COUNT);

  for extra in category.fallback_options() {
    if chosen.len() >= OPTION_COUNT {
      break;
    }
    if !chosen.iter().any(|c| c == extra) {
      chosen.push(extra.to_string());
    }
  }
  chosen
}
