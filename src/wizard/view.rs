use serde::Serialize;

use crate::models::ImageRef;
use crate::notice::Banner;
use crate::options::Category;
use crate::wizard::session::{PhotoSource, Style};

#[derive(Serialize, Clone, Debug)]
#[serde(tag = "screen", rename_all = "lowercase")]
pub enum View {
  Entry(EntryView),
  Step1(Step1View),
  Step2(Step2View),
  Result(ResultView),
}

#[derive(Serialize, Clone, Debug)]
pub struct EntryView {
  pub title: &'static str,
  pub subtitle: &'static str,
  pub banners: Vec<Banner>,
  pub loading: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct CategoryView {
  pub category: Category,
  pub label: &'static str,
  pub sentence: &'static str,
  pub value: String,
  pub options: Vec<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct Step1View {
  pub name: String,
  pub age: String,
  pub town: String,
  pub categories: Vec<CategoryView>,
  pub next_enabled: bool,
  pub banners: Vec<Banner>,
  pub loading: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct StyleView {
  pub style: Style,
  pub label: &'static str,
  pub selected: bool,
}

#[derive(Serialize, Clone, Debug)]
pub struct Step2View {
  pub photo: Option<String>,
  pub photo_source: Option<PhotoSource>,
  pub camera_active: bool,
  pub camera_status: Option<String>,
  pub styles: Vec<StyleView>,
  pub submit_enabled: bool,
  pub banners: Vec<Banner>,
  pub loading: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct ResultView {
  pub name: String,
  pub image: ImageRef,
  pub text: String,
  pub download_name: String,
  pub banners: Vec<Banner>,
}

impl View {
  pub fn screen_name(&self) -> &'static str {
    match self {
      View::Entry(_) => "entry",
      View::Step1(_) => "step1",
      View::Step2(_) => "step2",
      View::Result(_) => "result",
    }
  }
}
