use crate::options::category::Category;

fn strip_keyword<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
  let head = s.get(..keyword.len())?;
  head.eq_ignore_ascii_case(keyword).then(|| &s[keyword.len()..])
}

/// Drops labels the model sometimes echoes: `label:`, `use:`, `article:`, `no article:`.
fn strip_instruction_prefix(s: &str) -> &str {
  let mut s = s.trim();
  while let Some(rest) = strip_one_prefix(s) {
    s = rest;
  }
  s
}

fn strip_one_prefix(t: &str) -> Option<&str> {
  let no_article = strip_keyword(t, "no").and_then(|rest| strip_keyword(rest.trim_start(), "article"));
  let candidates = [
    no_article,
    strip_keyword(t, "article"),
    strip_keyword(t, "label"),
    strip_keyword(t, "use"),
  ];
  for rest in candidates.into_iter().flatten() {
    if let Some(rest) = rest.trim_start().strip_prefix(':') {
      return Some(rest.trim());
    }
  }
  None
}

pub fn split_article(s: &str) -> Option<(&str, &str)> {
  let (first, rest) = s.split_once(char::is_whitespace)?;
  let is_article = first.eq_ignore_ascii_case("a") || first.eq_ignore_ascii_case("an");
  let rest = rest.trim_start();
  (is_article && !rest.is_empty()).then_some((first, rest))
}

pub fn starts_with_vowel(s: &str) -> bool {
  matches!(
    s.trim_start().chars().next().map(|c| c.to_ascii_lowercase()),
    Some('a' | 'e' | 'i' | 'o' | 'u')
  )
}

pub fn with_article(s: &str) -> String {
  let s = s.trim();
  if starts_with_vowel(s) {
    format!("an {s}")
  } else {
    format!("a {s}")
  }
}

/// Words ending in `ss`, `us` or `is` are left alone, which keeps this a fixed point.
pub fn singularize(s: &str) -> String {
  let lower = s.to_ascii_lowercase();
  if !lower.ends_with('s') || lower.ends_with("ss") || lower.ends_with("us") || lower.ends_with("is") {
    return s.to_string();
  }
  if lower.ends_with("ies") && lower.len() > 4 {
    return format!("{}y", &s[..s.len() - 3]);
  }
  if lower.ends_with("es") {
    let stem = &lower[..lower.len() - 2];
    let sibilant = ["x", "ch", "sh", "z", "ss", "us"].iter().any(|end| stem.ends_with(end));
    if sibilant {
      return s[..s.len() - 2].to_string();
    }
  }
  s[..s.len() - 1].to_string()
}

/// Strips labels, plus any article that hides one. Color loses every leading article.
fn strip_wrappers(category: Category, raw: &str) -> &str {
  let mut s = strip_instruction_prefix(raw);
  while let Some((_, rest)) = split_article(s) {
    if category != Category::Color && strip_one_prefix(rest).is_none() {
      break;
    }
    s = strip_instruction_prefix(rest);
  }
  s
}

pub fn normalize_option(category: Category, raw: &str) -> Option<String> {
  let s = strip_wrappers(category, raw);
  if s.is_empty() {
    return None;
  }
  match category {
    Category::Animal | Category::Dream => {
      let s = singularize(s);
      if split_article(&s).is_some() {
        Some(s)
      } else {
        Some(with_article(&s))
      }
    }
    Category::Color | Category::Food | Category::Hobby | Category::Skill => Some(s.to_string()),
  }
}

pub fn normalize_options<S: AsRef<str>>(category: Category, options: &[S]) -> Vec<String> {
  let mut out: Vec<String> = Vec::with_capacity(options.len());
  for option in options {
    if let Some(s) = normalize_option(category, option.as_ref()) {
      if !out.contains(&s) {
        out.push(s);
      }
    }
  }
  out
}

/// Article fix applied when a child picks an animal or dream chip.
pub fn selected_value(category: Category, option: &str) -> String {
  let option = option.trim();
  let plural = option.to_ascii_lowercase().ends_with('s');
  if category.takes_article() && split_article(option).is_none() && !plural {
    with_article(option)
  } else {
    option.to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn color_drops_articles() {
    assert_eq!(
      normalize_options(Category::Color, &["a red", "An orange", " blue ", "label: green"]),
      vec!["red", "orange", "blue", "green"]
    );
  }

  #[test]
  fn article_follows_first_letter() {
    for (word, expected) in [
      ("elephant", "an elephant"),
      ("owl", "an owl"),
      ("igloo builder", "an igloo builder"),
      ("umpire", "an umpire"),
      ("astronaut", "an astronaut"),
      ("dog", "a dog"),
      ("teacher", "a teacher"),
      ("zebra", "a zebra"),
    ] {
      assert_eq!(normalize_option(Category::Dream, word).as_deref(), Some(expected));
      assert_eq!(normalize_option(Category::Animal, word).as_deref(), Some(expected));
    }
  }

  #[test]
  fn existing_articles_are_kept() {
    assert_eq!(normalize_option(Category::Dream, "a doctor").as_deref(), Some("a doctor"));
    assert_eq!(normalize_option(Category::Dream, "An artist").as_deref(), Some("An artist"));
  }

  #[test]
  fn animal_plurals_become_singular() {
    assert_eq!(
      normalize_options(Category::Animal, &["bears", "foxes", "butterflies", "octopus", "horses", "a walrus", "cats"]),
      vec!["a bear", "a fox", "a butterfly", "an octopus", "a horse", "a walrus", "a cat"]
    );
  }

  #[test]
  fn instruction_prefixes_are_stripped() {
    assert_eq!(strip_instruction_prefix("No Article: pizza"), "pizza");
    assert_eq!(strip_instruction_prefix("article : an owl"), "an owl");
    assert_eq!(strip_instruction_prefix("use: swim well"), "swim well");
    assert_eq!(strip_instruction_prefix("user: swim well"), "user: swim well");
    assert_eq!(strip_instruction_prefix("label: use: jump"), "jump");
  }

  #[test]
  fn labels_hidden_behind_an_article_are_stripped() {
    assert_eq!(normalize_option(Category::Color, "a label: red").as_deref(), Some("red"));
    assert_eq!(normalize_option(Category::Color, "a an label: blue").as_deref(), Some("blue"));
    assert_eq!(normalize_option(Category::Animal, "a label: owls").as_deref(), Some("an owl"));
    assert_eq!(normalize_option(Category::Animal, "a use: a cat").as_deref(), Some("a cat"));
    assert_eq!(normalize_option(Category::Dream, "an artist").as_deref(), Some("an artist"));
  }

  #[test]
  fn blanks_and_duplicates_are_removed() {
    assert_eq!(
      normalize_options(Category::Food, &["pizza", "  ", "pizza ", "fried rice"]),
      vec!["pizza", "fried rice"]
    );
    assert_eq!(
      normalize_options(Category::Animal, &["cat", "a cat", "cats"]),
      vec!["a cat"]
    );
  }

  #[test]
  fn normalization_is_a_fixed_point() {
    let inputs = [
      "bears", "a glasses", "buses", "An owl", "label: ibis", "no article: red", "  dogs ", "walruses",
      "butterflies", "boss", "an actress", "fishes", "foxes", "the moon", "hero", "a label: red",
      "a an label: blue", "an article: owls", "a use: a cat",
    ];
    for category in Category::ALL {
      let once = normalize_options(category, &inputs);
      let twice = normalize_options(category, &once);
      assert_eq!(once, twice, "{category:?}");
    }
  }

  #[test]
  fn selected_value_adds_article_only_where_needed() {
    assert_eq!(selected_value(Category::Animal, "owl"), "an owl");
    assert_eq!(selected_value(Category::Dream, "a chef"), "a chef");
    assert_eq!(selected_value(Category::Animal, "lions"), "lions");
    assert_eq!(selected_value(Category::Food, "apple"), "apple");
  }
}
