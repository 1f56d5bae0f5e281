use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Category {
  Color,
  Food,
  Animal,
  Hobby,
  Skill,
  Dream,
}

impl Category {
  pub const ALL: [Category; 6] = [
    Category::Color,
    Category::Food,
    Category::Animal,
    Category::Hobby,
    Category::Skill,
    Category::Dream,
  ];

  pub fn key(self) -> &'static str {
    match self {
      Category::Color => "color",
      Category::Food => "food",
      Category::Animal => "animal",
      Category::Hobby => "hobby",
      Category::Skill => "skill",
      Category::Dream => "dream",
    }
  }

  pub fn from_key(key: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|c| c.key() == key)
  }

  pub fn label(self) -> &'static str {
    match self {
      Category::Color => "Color",
      Category::Food => "Food",
      Category::Animal => "Animal",
      Category::Hobby => "Hobby",
      Category::Skill => "Skill",
      Category::Dream => "Dream",
    }
  }

  /// Sentence template; `___` marks the blank.
  pub fn sentence(self) -> &'static str {
    match self {
      Category::Color => "My favorite color is ___.",
      Category::Food => "My favorite food is ___.",
      Category::Animal => "My favorite animal is ___.",
      Category::Hobby => "My hobby is ___.",
      Category::Skill => "I can ___.",
      Category::Dream => "I want to be ___ .",
    }
  }

  pub fn description(self) -> &'static str {
    match self {
      Category::Color => r#"a common, simple color adjective (like "red", "blue", "yellow", "purple", "orange", "gray")"#,
      Category::Food => r#"a simple food noun or phrase, like "pizza" or "fried chicken""#,
      Category::Animal => r#"a simple animal noun, preceded by an appropriate article (a/an/no article), like "a cat", "an elephant", or "lions""#,
      Category::Hobby => r#"a gerund phrase (ending in -ing) that describes an activity, like "reading books" or "playing soccer""#,
      Category::Skill => r#"a simple base verb or verb phrase describing a unique or above-average ability/talent (e.g., "sing very loudly", "build tall towers", "catch things easily")"#,
      Category::Dream => r#"a profession or job title (like "a dentist" or "a teacher"), which should be singular and preceded by "a" or "an""#,
    }
  }

  pub fn extra_rules(self) -> &'static str {
    match self {
      Category::Color => "\n- For the sentence \"My favorite color is ___.\", options MUST be bare color words without any article (e.g., \"red\", \"blue\", \"white\"). NEVER prefix with \"a\" or \"an\".",
      Category::Food => "\n- IMPORTANT: Prefer simple dish/meal names over single ingredients. Use CEFR A1 level, kid-friendly food items like: sandwich, fried noodles, kimbap, pasta, pizza, chicken soup, fried rice, curry rice, hot dog.\n- Avoid plain ingredients such as single fruits/vegetables unless they are commonly eaten as a dish.",
      Category::Animal => "\n- For the sentence \"My favorite animal is ___.\", ALWAYS provide a singular animal with the correct article (\"a\"/\"an\").\n- DO NOT return plural forms (e.g., \"bears\", \"dogs\"). If a plural form would be natural, convert it to singular with an article instead (e.g., \"a bear\", \"a dog\").",
      Category::Dream => "\n- For the sentence \"I want to be ___ .\", options MUST include the correct article: \"a doctor\", \"an artist\", etc.",
      Category::Hobby | Category::Skill => "",
    }
  }

  pub fn fallback_options(self) -> &'static [&'static str] {
    match self {
      Category::Color => &["red", "blue", "yellow", "green", "purple"],
      Category::Food => &["pizza", "burger", "apple", "noodles", "ice cream"],
      Category::Animal => &["a dog", "a cat", "a fish", "an elephant", "a bird"],
      Category::Hobby => &["reading books", "playing games", "singing songs", "drawing pictures", "dancing"],
      Category::Skill => &["run fast", "jump high", "climb trees", "swim well", "build things"],
      Category::Dream => &["a doctor", "a teacher", "a chef", "an astronaut", "a firefighter"],
    }
  }

  pub fn takes_article(self) -> bool {
    matches!(self, Category::Animal | Category::Dream)
  }

  pub fn fill(self, value: &str) -> String {
    self.sentence().replace("___ .", "___.").replacen("___", value.trim(), 1)
  }
}

pub fn pick_random<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<Category> {
  let mut all = Category::ALL.to_vec();
  all.shuffle(rng);
  all.truncate(count);
  all
}
