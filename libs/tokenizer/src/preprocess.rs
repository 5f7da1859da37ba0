//! Text normalization ahead of training and encoding

use crate::TokenizerConfig;

/// ASCII punctuation replaced by spaces during cleaning
pub const DEFAULT_PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Normalizes raw text into words and splits words into atomic symbols.
///
/// Both training and encoding go through the same preprocessor, so a
/// tokenizer must be built with the settings its merges were learned under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessor {
    lowercase: bool,
    end_of_word: Option<String>,
}

impl Preprocessor {
    /// `Preprocessor::new(true, Some(DEFAULT_END_OF_WORD))` equals `Preprocessor::default()`
    pub fn new(lowercase: bool, end_of_word: Option<&str>) -> Self {
        Self {
            lowercase,
            end_of_word: end_of_word.map(str::to_string),
        }
    }

    pub fn from_config(config: &TokenizerConfig) -> Self {
        Self {
            lowercase: config.lowercase,
            end_of_word: config.end_of_word.clone(),
        }
    }

    pub fn lowercase(&self) -> bool {
        self.lowercase
    }

    pub fn end_of_word(&self) -> Option<&str> {
        self.end_of_word.as_deref()
    }

    /// Lower-case (if enabled) and replace punctuation and whitespace with spaces
    pub fn clean(&self, text: &str) -> String {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        text.chars()
            .map(|c| {
                if c.is_whitespace() || DEFAULT_PUNCTUATION.contains(c) {
                    ' '
                } else {
                    c
                }
            })
            .collect()
    }

    /// Collapse whitespace runs to single spaces and trim both ends
    pub fn normalize_whitespace(&self, text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Clean and normalize, then split on whitespace
    pub fn words(&self, text: &str) -> Vec<String> {
        let normalized = self.normalize_whitespace(&self.clean(text));
        normalized
            .split(' ')
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// One symbol per code point, followed by the end-of-word marker if set
    pub fn word_symbols(&self, word: &str) -> Vec<String> {
        let mut symbols: Vec<String> = word.chars().map(|c| c.to_string()).collect();
        if let Some(marker) = &self.end_of_word {
            symbols.push(marker.clone());
        }
        symbols
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::from_config(&TokenizerConfig::default())
    }
}
