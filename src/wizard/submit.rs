use serde_json::{Map, Value};

use crate::error::GenerationError;
use crate::logger::Logger;
use crate::models::ImageRef;
use crate::options::Category;
use crate::provider::{generate_image_or_fallback, GenerationProvider};
use crate::wizard::session::{Session, Style};

pub const INTRO_SYSTEM_PROMPT: &str = "You are a friendly and encouraging English teacher AI for elementary school students. Write a concise, 5-7 sentence self-introduction in simple, cheerful English using ALL the provided information. Start immediately at the beginning of the line with 'Hello! My name is ...' (no leading spaces or indentation). Use correct spacing around punctuation: no spaces before commas/periods, one space after. Keep it clean and readable.";

pub struct Outcome {
  pub image: ImageRef,
  pub text: String,
  /// Set when the canned introduction replaced the generated one.
  pub text_error: Option<GenerationError>,
}

pub fn intro_data(session: &Session, answers: &[(Category, String)]) -> Value {
  let mut data = Map::new();
  data.insert("name".to_string(), Value::String(session.name.clone()));
  data.insert("age".to_string(), Value::String(session.age.clone()));
  data.insert("town".to_string(), Value::String(session.town.clone()));
  for (category, value) in answers {
    data.insert(category.key().to_string(), Value::String(value.clone()));
  }
  Value::Object(data)
}

pub fn intro_query(data: &Value) -> String {
  let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
  format!("Generate a self-introduction based on the following data: {pretty}")
}

/// Introduction used when the text model is unavailable.
pub fn canned_intro(session: &Session, answers: &[(Category, String)]) -> String {
  let mut text = format!(
    "Oops! My AI friend is taking a break. Here is a simple introduction: Hello! My name is {} and I am {} years old. I live in {}.",
    session.name.trim(),
    session.age.trim(),
    session.town.trim()
  );
  for (category, value) in answers {
    if !value.trim().is_empty() {
      text.push(' ');
      text.push_str(&category.fill(value));
    }
  }
  text
}

/// Image chain first, then the introduction. Never fails.
pub async fn run(
  provider: &dyn GenerationProvider,
  session: &Session,
  answers: &[(Category, String)],
  logger: &Logger,
) -> Outcome {
  let style = session.style.unwrap_or_default();
  let image = portrait(provider, style, session.photo.as_deref(), logger).await;

  let query = intro_query(&intro_data(session, answers));
  match introduction(provider, &query).await {
    Ok(text) => Outcome {
      image,
      text,
      text_error: None,
    },
    Err(err) => {
      logger.error(&format!("introduction via {} failed: {err}", provider.name()));
      Outcome {
        image,
        text: canned_intro(session, answers),
        text_error: Some(err),
      }
    }
  }
}

async fn portrait(provider: &dyn GenerationProvider, style: Style, photo: Option<&str>, logger: &Logger) -> ImageRef {
  generate_image_or_fallback(provider, style.prompt(), style.size(), photo, logger).await
}

async fn introduction(provider: &dyn GenerationProvider, query: &str) -> Result<String, GenerationError> {
  let text = provider.text(INTRO_SYSTEM_PROMPT, query, false).await?;
  let text = text.trim();
  if text.is_empty() {
    return Err(GenerationError::NoContent);
  }
  Ok(text.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::wizard::session::RequiredField;

  fn mia() -> (Session, Vec<(Category, String)>) {
    let mut session = Session::new();
    session.set_field(RequiredField::Name, "Mia");
    session.set_field(RequiredField::Age, "7");
    session.set_field(RequiredField::Town, "Seoul");
    let answers = vec![
      (Category::Color, "blue".to_string()),
      (Category::Animal, "an owl".to_string()),
      (Category::Skill, "swim well".to_string()),
    ];
    (session, answers)
  }

  #[test]
  fn query_carries_every_answer() {
    let (session, answers) = mia();
    let data = intro_data(&session, &answers);
    assert_eq!(data["name"], "Mia");
    assert_eq!(data["animal"], "an owl");

    let query = intro_query(&data);
    assert!(query.starts_with("Generate a self-introduction based on the following data: {"));
    assert!(query.contains("\"town\": \"Seoul\""));
  }

  #[test]
  fn canned_intro_uses_real_answers() {
    let (session, answers) = mia();
    assert_eq!(
      canned_intro(&session, &answers),
      "Oops! My AI friend is taking a break. Here is a simple introduction: Hello! My name is Mia and I am 7 years old. I live in Seoul. My favorite color is blue. My favorite animal is an owl. I can swim well."
    );
  }
}
