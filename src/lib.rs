//! Draw words from random encyclopedia articles without ever serving the same
//! word twice for a language.
//!
//! The pieces compose as fetch → [`extract_words`] → [`UsageStore::used_words`]
//! → [`select_words`] → [`UsageStore::store_used`]. The HTTP service wiring
//! them together lives behind the `web` feature.

mod extract;
mod select;
mod store;

#[cfg(feature = "web")]
pub mod source;
#[cfg(feature = "web")]
pub mod web;

pub use extract::{ExtractError, extract_words, extract_words_from_bytes, normalize_text};
pub use select::{select_words, select_words_random};
pub use store::{StoreError, UsageStore};

/// Language served when a request names none.
pub const DEFAULT_LANGUAGE: &str = "en";
/// Number of words served when a request names no usable count.
pub const DEFAULT_COUNT: usize = 10;
/// Database file used when none is configured, relative to the working directory.
pub const DEFAULT_DATABASE: &str = "words.db";

/// Fallbacks applied to missing or unusable request parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickDefaults {
    pub language: String,
    pub count: usize,
}

impl Default for PickDefaults {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            count: DEFAULT_COUNT,
        }
    }
}

impl PickDefaults {
    /// Resolves the raw `language` parameter. Empty values count as absent.
    pub fn language(&self, raw: Option<&str>) -> String {
        raw.filter(|value| !value.is_empty())
            .unwrap_or(self.language.as_str())
            .to_string()
    }

    /// Resolves the raw `count` parameter. Anything that is not an unsigned
    /// integer falls back to the default instead of failing the request.
    pub fn count(&self, raw: Option<&str>) -> usize {
        raw.and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(self.count)
    }
}
