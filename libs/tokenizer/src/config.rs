//! Tokenizer configuration

use crate::{Result, SpecialToken, TokenizerError, DEFAULT_PUNCTUATION};
use serde::{Deserialize, Serialize};

/// Default end-of-word marker appended to every word
pub const DEFAULT_END_OF_WORD: &str = "</w>";

/// How equally frequent pairs are ordered during training
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Smaller `"left right"` key wins
    #[default]
    Lexicographic,
    /// Pairs without the end-of-word marker win, then `Lexicographic`
    DeferEndOfWord,
}

/// Configuration for BPE training and preprocessing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// Target vocabulary size (including reserved tokens)
    pub vocab_size: usize,
    /// Minimum frequency for a pair to be merged
    pub min_frequency: u64,
    /// Whether preprocessing lower-cases text
    pub lowercase: bool,
    /// Marker appended to each word, if any
    pub end_of_word: Option<String>,
    /// Reserved tokens registered before training, in id order
    pub reserved: Vec<SpecialToken>,
    /// Tie-break policy for pair selection
    pub tie_break: TieBreak,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            vocab_size: 8192,
            min_frequency: 1,
            lowercase: true,
            end_of_word: Some(DEFAULT_END_OF_WORD.to_string()),
            reserved: SpecialToken::all().to_vec(),
            tie_break: TieBreak::Lexicographic,
        }
    }
}

impl TokenizerConfig {
    pub fn with_vocab_size(mut self, vocab_size: usize) -> Self {
        self.vocab_size = vocab_size;
        self
    }

    pub fn with_min_frequency(mut self, min_frequency: u64) -> Self {
        self.min_frequency = min_frequency;
        self
    }

    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    pub fn with_end_of_word(mut self, marker: &str) -> Self {
        self.end_of_word = Some(marker.to_string());
        self
    }

    pub fn without_end_of_word(mut self) -> Self {
        self.end_of_word = None;
        self
    }

    pub fn with_reserved(mut self, reserved: Vec<SpecialToken>) -> Self {
        self.reserved = reserved;
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.vocab_size == 0 {
            return Err(TokenizerError::InvalidConfig(
                "vocab_size must be > 0".to_string(),
            ));
        }

        if self.min_frequency == 0 {
            return Err(TokenizerError::InvalidConfig(
                "min_frequency must be > 0".to_string(),
            ));
        }

        if let Some(marker) = &self.end_of_word {
            if marker.is_empty() || marker.chars().any(char::is_whitespace) {
                return Err(TokenizerError::InvalidConfig(format!(
                    "end_of_word marker must be non-empty without whitespace, got {:?}",
                    marker
                )));
            }
            // Cleaned text never contains punctuation, so no word can spell the marker
            if !marker.chars().any(|c| DEFAULT_PUNCTUATION.contains(c)) {
                return Err(TokenizerError::InvalidConfig(format!(
                    "end_of_word marker {:?} must contain a punctuation character",
                    marker
                )));
            }
            if SpecialToken::from_symbol(marker).is_some() {
                return Err(TokenizerError::InvalidConfig(format!(
                    "end_of_word marker {:?} collides with a reserved token",
                    marker
                )));
            }
        }

        for (i, token) in self.reserved.iter().enumerate() {
            if self.reserved[..i].contains(token) {
                return Err(TokenizerError::InvalidConfig(format!(
                    "reserved token {:?} declared twice",
                    token.as_str()
                )));
            }
        }

        Ok(())
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = TokenizerConfig::default();
        assert_eq!(config.vocab_size, 8192);
        assert_eq!(config.min_frequency, 1);
        assert!(config.lowercase);
        assert_eq!(config.end_of_word.as_deref(), Some("</w>"));
        assert_eq!(config.reserved.len(), 5);
        assert_eq!(config.tie_break, TieBreak::Lexicographic);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_setters() {
        let config = TokenizerConfig::default()
            .with_vocab_size(100)
            .with_lowercase(false)
            .without_end_of_word()
            .with_reserved(vec![SpecialToken::Unk])
            .with_tie_break(TieBreak::DeferEndOfWord)
            .with_min_frequency(2);

        assert_eq!(config.vocab_size, 100);
        assert!(!config.lowercase);
        assert_eq!(config.end_of_word, None);
        assert_eq!(config.reserved, vec![SpecialToken::Unk]);
        assert_eq!(config.tie_break, TieBreak::DeferEndOfWord);
        assert_eq!(config.min_frequency, 2);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(TokenizerConfig::default().with_vocab_size(0).validate().is_err());
        assert!(TokenizerConfig::default().with_min_frequency(0).validate().is_err());
        assert!(TokenizerConfig::default().with_end_of_word("").validate().is_err());
        assert!(TokenizerConfig::default().with_end_of_word("a b").validate().is_err());
        assert!(TokenizerConfig::default().with_end_of_word("<unk>").validate().is_err());
        assert!(TokenizerConfig::default().with_end_of_word("</s>").validate().is_err());

        let dup = TokenizerConfig::default()
            .with_reserved(vec![SpecialToken::Unk, SpecialToken::Pad, SpecialToken::Unk]);
        assert!(matches!(dup.validate(), Err(TokenizerError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_marker_made_of_word_chars() {
        for marker in ["x", "w", "xyz", "é", "1"] {
            let config = TokenizerConfig::default().with_end_of_word(marker);
            assert!(
                matches!(config.validate(), Err(TokenizerError::InvalidConfig(_))),
                "marker {:?} should be rejected",
                marker
            );
        }
        for marker in [DEFAULT_END_OF_WORD, "_", "@@", "<eow>"] {
            assert!(TokenizerConfig::default().with_end_of_word(marker).validate().is_ok());
        }
    }

    #[test]
    fn test_from_json_rejects_word_char_marker() {
        let json = TokenizerConfig::default().with_end_of_word("x").to_json().unwrap();
        assert!(TokenizerConfig::from_json(&json).is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = TokenizerConfig::default()
            .with_vocab_size(300)
            .with_tie_break(TieBreak::DeferEndOfWord);
        let json = config.to_json().unwrap();
        assert!(json.contains("\"defer_end_of_word\""));

        let loaded = TokenizerConfig::from_json(&json).unwrap();
        assert_eq!(loaded, config);
    }
}
