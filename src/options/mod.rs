pub mod category;
pub mod generator;
pub mod normalize;

pub use category::{pick_random, Category};
pub use generator::{FetchOutcome, OptionGenerator, OptionSet, OptionsError, MAX_ANSWER_CHARS, OPTION_COUNT};
pub use normalize::{normalize_option, normalize_options, selected_value};
