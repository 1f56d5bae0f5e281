use serde::{Deserialize, Serialize};

use crate::models::ImageRef;
use crate::options::Category;

pub const MAX_FIELD_CHARS: usize = 60;
pub const MAX_AGE_CHARS: usize = 30;
pub const IMAGE_SIZE: &str = "1024x1024";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequiredField {
  Name,
  Age,
  Town,
}

impl RequiredField {
  pub fn max_chars(self) -> usize {
    match self {
      RequiredField::Age => MAX_AGE_CHARS,
      RequiredField::Name | RequiredField::Town => MAX_FIELD_CHARS,
    }
  }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PhotoSource {
  Camera,
  Upload,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Style {
  #[default]
  Cartoon,
  #[serde(rename = "Fairy Tale")]
  FairyTale,
  #[serde(rename = "Super Hero")]
  SuperHero,
  #[serde(rename = "LEGO")]
  Lego,
  Fantasy,
}

impl Style {
  pub const ALL: [Style; 5] = [Style::Cartoon, Style::FairyTale, Style::SuperHero, Style::Lego, Style::Fantasy];

  pub fn label(self) -> &'static str {
    match self {
      Style::Cartoon => "Cartoon",
      Style::FairyTale => "Fairy Tale",
      Style::SuperHero => "Super Hero",
      Style::Lego => "LEGO",
      Style::Fantasy => "Fantasy",
    }
  }

  /// Unknown labels map to the default style.
  pub fn from_label(label: &str) -> Self {
    Self::ALL.into_iter().find(|s| s.label() == label).unwrap_or_default()
  }

  pub fn prompt(self) -> &'static str {
    match self {
      Style::Cartoon => "Create a close-up portrait based on the uploaded photo, keeping the same face and hairstyle. Turn it into a cute cartoon-style character for a young elementary school student. Focus on the face and upper body. Use bright pastel colors, soft lighting, and a friendly smile. The background should be simple and cheerful, like a children's cartoon show.",
      Style::FairyTale => "Create a close-up portrait based on the uploaded photo, keeping the same face and hairstyle. Turn it into a fairy tale-style character suitable for a young child, like a kind princess or gentle storyteller. Focus on the face and upper body. Use soft glow, sparkles, and dreamy pastel tones. The background should feel like a magical storybook scene.",
      Style::SuperHero => "Create a close-up portrait based on the uploaded photo, keeping the same face and hairstyle. Turn it into a kid-friendly superhero character with a confident and cheerful expression. Focus on the face and upper body. Use colorful lighting, comic-style details, and a simple action background. Keep the style bright and fun, not dark.",
      Style::Lego => "Create a close-up portrait based on the uploaded photo, keeping the same face and hairstyle. Turn it into a LEGO-style character face with a smiling expression. Focus on the head and shoulders, showing a simple LEGO body. Use bright colors and a clean background. Make it look friendly and toy-like, suitable for kids.",
      Style::Fantasy => "Create a close-up portrait based on the uploaded photo, keeping the same face and hairstyle. Turn it into a fantasy-style character like a young wizard, explorer, or dragon friend. Focus on the face and upper body. Add soft magical effects, glowing light, or colorful fantasy background. Keep it bright, kind, and child-friendly.",
    }
  }

  pub fn size(self) -> &'static str {
    IMAGE_SIZE
  }
}

#[derive(Serialize, Clone, Debug)]
pub struct Session {
  pub id: String,
  pub name: String,
  pub age: String,
  pub town: String,
  pub categories: Vec<Category>,
  pub style: Option<Style>,
  pub photo: Option<String>,
  pub photo_source: Option<PhotoSource>,
  pub image: Option<ImageRef>,
  pub text: String,
}

impl Session {
  pub fn new() -> Self {
    Self {
      id: uuid::Uuid::new_v4().to_string(),
      name: String::new(),
      age: String::new(),
      town: String::new(),
      categories: Vec::new(),
      style: None,
      photo: None,
      photo_source: None,
      image: None,
      text: String::new(),
    }
  }

  pub fn set_field(&mut self, field: RequiredField, value: &str) {
    let value: String = value.chars().take(field.max_chars()).collect();
    match field {
      RequiredField::Name => self.name = value,
      RequiredField::Age => self.age = value,
      RequiredField::Town => self.town = value,
    }
  }

  pub fn required_filled(&self) -> bool {
    [&self.name, &self.age, &self.town]
      .iter()
      .all(|v| !v.trim().is_empty())
  }

  pub fn clear_photo(&mut self) {
    self.photo = None;
    self.photo_source = None;
    self.style = None;
  }

  pub fn ready_to_submit(&self) -> bool {
    self.photo.is_some() && self.style.is_some()
  }

  pub fn download_name(&self) -> String {
    format!("This_Is_Me_{}_Result.png", self.name)
  }
}

impl Default for Session {
  fn default() -> Self {
    Self::new()
  }
}
