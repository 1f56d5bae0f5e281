pub mod session;
pub mod submit;
pub mod view;

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::{CameraError, MediaSource};
use crate::config::{resolve_openai_key, AppConfig, ProviderKind};
use crate::error::GenerationError;
use crate::logger::Logger;
use crate::notice::{LoadingOverlay, Notices};
use crate::options::{pick_random, Category, OptionGenerator};
use crate::provider::{self, GenerationProvider};

pub use session::{PhotoSource, RequiredField, Session, Style};
pub use view::{CategoryView, EntryView, ResultView, Step1View, Step2View, StyleView, View};

pub const CATEGORIES_PER_SESSION: usize = 3;
pub const PREFETCH_TEXT: &str = "AI is making your choices...";
pub const SUBMIT_TEXT: &str = "AI is making your character...";
pub const CAMERA_ON_STATUS: &str = "The camera is on. Tap the button to take a photo!";
pub const CAMERA_BLOCKED_STATUS: &str = "Camera blocked or unavailable. Please upload a file.";

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
  Entry,
  Step1,
  Step2,
  Result,
}

impl Screen {
  pub fn name(self) -> &'static str {
    match self {
      Screen::Entry => "entry",
      Screen::Step1 => "step1",
      Screen::Step2 => "step2",
      Screen::Result => "result",
    }
  }
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WizardEvent {
  Start,
  SetField { field: RequiredField, value: String },
  SetCategoryValue { category: Category, value: String },
  SelectOption { category: Category, option: String },
  Refresh { category: Category },
  Next,
  StartCamera,
  Capture,
  Upload { data_url: String },
  RetryPhoto,
  SelectStyle { style: Style },
  Submit,
  PlayAgain,
}

impl WizardEvent {
  fn name(&self) -> &'static str {
    match self {
      WizardEvent::Start => "start",
      WizardEvent::SetField { .. } => "set_field",
      WizardEvent::SetCategoryValue { .. } => "set_category_value",
      WizardEvent::SelectOption { .. } => "select_option",
      WizardEvent::Refresh { .. } => "refresh",
      WizardEvent::Next => "next",
      WizardEvent::StartCamera => "start_camera",
      WizardEvent::Capture => "capture",
      WizardEvent::Upload { .. } => "upload",
      WizardEvent::RetryPhoto => "retry_photo",
      WizardEvent::SelectStyle { .. } => "select_style",
      WizardEvent::Submit => "submit",
      WizardEvent::PlayAgain => "play_again",
    }
  }

  /// Screen the event belongs to; `None` means any screen.
  fn screen(&self) -> Option<Screen> {
    match self {
      WizardEvent::Start => Some(Screen::Entry),
      WizardEvent::SetField { .. }
      | WizardEvent::SetCategoryValue { .. }
      | WizardEvent::SelectOption { .. }
      | WizardEvent::Refresh { .. }
      | WizardEvent::Next => Some(Screen::Step1),
      WizardEvent::StartCamera
      | WizardEvent::Capture
      | WizardEvent::Upload { .. }
      | WizardEvent::RetryPhoto
      | WizardEvent::SelectStyle { .. }
      | WizardEvent::Submit => Some(Screen::Step2),
      WizardEvent::PlayAgain => None,
    }
  }
}

#[derive(Debug, Error)]
pub enum WizardError {
  #[error("{event} is not available on the {screen} screen")]
  WrongScreen {
    event: &'static str,
    screen: &'static str,
  },
  #[error("{0:?} is not one of this session's categories")]
  UnknownCategory(Category),
  #[error("fill in every field before continuing")]
  Incomplete,
  #[error("a photo and a style are required")]
  NotReady,
  #[error("uploaded file is not an image")]
  InvalidPhoto,
  #[error(transparent)]
  Camera(#[from] CameraError),
}

pub struct Wizard {
  screen: Screen,
  session: Session,
  provider: Arc<dyn GenerationProvider>,
  options: OptionGenerator,
  notices: Arc<Notices>,
  overlay: LoadingOverlay,
  camera: Box<dyn MediaSource>,
  camera_status: Option<String>,
  logger: Arc<Logger>,
}

impl Wizard {
  pub fn new(
    config: &AppConfig,
    provider: Arc<dyn GenerationProvider>,
    camera: Box<dyn MediaSource>,
    logger: Arc<Logger>,
  ) -> Self {
    let notices = Arc::new(Notices::new(config.banner_ttl()));
    let options = OptionGenerator::new(provider.clone(), notices.clone(), logger.clone());
    Self {
      screen: Screen::Entry,
      session: Session::new(),
      provider,
      options,
      notices,
      overlay: LoadingOverlay::default(),
      camera,
      camera_status: None,
      logger,
    }
  }

  /// Gemini mode goes through the relay, so only direct mode looks up a key.
  pub fn from_config(
    config: &AppConfig,
    camera: Box<dyn MediaSource>,
    logger: Arc<Logger>,
  ) -> Result<Self, GenerationError> {
    let key = match config.provider {
      ProviderKind::OpenAi => resolve_openai_key(),
      ProviderKind::Gemini => None,
    };
    let provider = provider::from_config(config, key, logger.clone())?;
    Ok(Self::new(config, provider, camera, logger))
  }

  pub fn screen(&self) -> Screen {
    self.screen
  }

  pub fn session(&self) -> &Session {
    &self.session
  }

  pub fn notices(&self) -> &Notices {
    &self.notices
  }

  pub fn loading_text(&self) -> Option<String> {
    self.overlay.current()
  }

  pub async fn dispatch(&mut self, event: WizardEvent) -> Result<View, WizardError> {
    if let Some(screen) = event.screen() {
      if screen != self.screen {
        return Err(WizardError::WrongScreen {
          event: event.name(),
          screen: self.screen.name(),
        });
      }
    }

    match event {
      WizardEvent::Start => self.start().await,
      WizardEvent::SetField { field, value } => self.session.set_field(field, &value),
      WizardEvent::SetCategoryValue { category, value } => {
        self.ensure_category(category)?;
        self.options.set_value(category, &value).await;
      }
      WizardEvent::SelectOption { category, option } => {
        self.ensure_category(category)?;
        self.options.select_option(category, &option).await;
      }
      WizardEvent::Refresh { category } => {
        self.ensure_category(category)?;
        self.options.fetch_options(category, category.description()).await;
      }
      WizardEvent::Next => {
        if !self.next_enabled().await {
          return Err(WizardError::Incomplete);
        }
        self.screen = Screen::Step2;
      }
      WizardEvent::StartCamera => self.start_camera().await,
      WizardEvent::Capture => {
        let frame = self.camera.capture().await?;
        self.camera.stop();
        self.camera_status = None;
        self.session.photo = Some(frame);
        self.session.photo_source = Some(PhotoSource::Camera);
      }
      WizardEvent::Upload { data_url } => {
        if !data_url.starts_with("data:image/") {
          return Err(WizardError::InvalidPhoto);
        }
        self.stop_camera();
        self.session.photo = Some(data_url);
        self.session.photo_source = Some(PhotoSource::Upload);
      }
      WizardEvent::RetryPhoto => {
        self.stop_camera();
        self.session.clear_photo();
      }
      WizardEvent::SelectStyle { style } => self.session.style = Some(style),
      WizardEvent::Submit => self.submit().await?,
      WizardEvent::PlayAgain => self.play_again().await,
    }

    Ok(self.view().await)
  }

  async fn start(&mut self) {
    if self.session.categories.is_empty() {
      self.session.categories = pick_random(&mut rand::thread_rng(), CATEGORIES_PER_SESSION);
    }
    self.overlay.show(PREFETCH_TEXT);
    self.screen = Screen::Step1;

    let options = &self.options;
    join_all(
      self
        .session
        .categories
        .iter()
        .map(|&category| options.fetch_options(category, category.description())),
    )
    .await;

    self.overlay.hide();
    self.logger.info(&format!(
      "session {} started with categories {:?}",
      self.session.id, self.session.categories
    ));
  }

  fn ensure_category(&self, category: Category) -> Result<(), WizardError> {
    if self.session.categories.contains(&category) {
      Ok(())
    } else {
      Err(WizardError::UnknownCategory(category))
    }
  }

  async fn answers(&self) -> Vec<(Category, String)> {
    let mut answers = Vec::with_capacity(self.session.categories.len());
    for &category in &self.session.categories {
      answers.push((category, self.options.snapshot(category).await.value));
    }
    answers
  }

  async fn next_enabled(&self) -> bool {
    self.session.required_filled() && self.answers().await.iter().all(|(_, value)| !value.trim().is_empty())
  }

  async fn start_camera(&mut self) {
    self.stop_camera();
    match self.camera.start().await {
      Ok(()) => self.camera_status = Some(CAMERA_ON_STATUS.to_string()),
      Err(err) => {
        self.logger.warn(&format!("camera unavailable: {err}"));
        self.camera.stop();
        self.camera_status = Some(CAMERA_BLOCKED_STATUS.to_string());
      }
    }
  }

  fn stop_camera(&mut self) {
    if self.camera.is_active() {
      self.camera.stop();
    }
    self.camera_status = None;
  }

  async fn submit(&mut self) -> Result<(), WizardError> {
    if !self.session.ready_to_submit() {
      return Err(WizardError::NotReady);
    }
    self.stop_camera();
    self.overlay.show(SUBMIT_TEXT);

    let answers = self.answers().await;
    let outcome = submit::run(self.provider.as_ref(), &self.session, &answers, &self.logger).await;
    if let Some(err) = &outcome.text_error {
      self
        .notices
        .push(format!("Introduction error: {}...", err.short_message(50)));
    }
    self.session.image = Some(outcome.image);
    self.session.text = outcome.text;

    self.overlay.hide();
    self.screen = Screen::Result;
    Ok(())
  }

  async fn play_again(&mut self) {
    self.stop_camera();
    self.options.reset().await;
    self.notices.clear();
    self.overlay.hide();
    self.session = Session::new();
    self.screen = Screen::Entry;
  }

  pub async fn view(&self) -> View {
    let banners = self.notices.active();
    let loading = self.overlay.current();
    match self.screen {
      Screen::Entry => View::Entry(EntryView {
        title: "This is Me!",
        subtitle: "Create your own self-introduction!",
        banners,
        loading,
      }),
      Screen::Step1 => {
        let mut categories = Vec::with_capacity(self.session.categories.len());
        for &category in &self.session.categories {
          let set = self.options.snapshot(category).await;
          categories.push(CategoryView {
            category,
            label: category.label(),
            sentence: category.sentence(),
            value: set.value,
            options: set.options,
          });
        }
        View::Step1(Step1View {
          name: self.session.name.clone(),
          age: self.session.age.clone(),
          town: self.session.town.clone(),
          categories,
          next_enabled: self.next_enabled().await,
          banners,
          loading,
        })
      }
      Screen::Step2 => View::Step2(Step2View {
        photo: self.session.photo.clone(),
        photo_source: self.session.photo_source,
        camera_active: self.camera.is_active(),
        camera_status: self.camera_status.clone(),
        styles: Style::ALL
          .into_iter()
          .map(|style| StyleView {
            style,
            label: style.label(),
            selected: self.session.style == Some(style),
          })
          .collect(),
        submit_enabled: self.session.ready_to_submit(),
        banners,
        loading,
      }),
      Screen::Result => View::Result(ResultView {
        name: self.session.name.clone(),
        image: self.session.image.clone().unwrap_or_else(crate::models::ImageRef::fallback),
        text: self.session.text.clone(),
        download_name: self.session.download_name(),
        banners,
      }),
    }
  }
}
