//! BPE (Byte Pair Encoding) Tokenizer
//!
//! Learns an ordered list of merge rules from a raw text corpus and replays
//! them to segment new text into token ids. Every Unicode code point is an
//! atomic symbol; words carry an optional end-of-word marker so merges can
//! tell word-final fragments apart.
//!
//! ```no_run
//! use bpe_tokenizer::{BpeTokenizer, TokenizerConfig};
//!
//! let mut tokenizer = BpeTokenizer::new(TokenizerConfig::default().with_vocab_size(500))?;
//! tokenizer.train("the quick brown fox jumps over the lazy dog");
//! let ids = tokenizer.encode("the lazy fox");
//! assert_eq!(tokenizer.decode(&ids), "the lazy fox");
//! tokenizer.save("vocab.json")?;
//! # Ok::<(), bpe_tokenizer::TokenizerError>(())
//! ```

use serde::{Deserialize, Serialize};

mod bpe;
mod config;
mod error;
mod preprocess;
mod store;
mod trainer;
mod vocab;

pub use bpe::BpeTokenizer;
pub use config::{TieBreak, TokenizerConfig, DEFAULT_END_OF_WORD};
pub use error::{Result, TokenizerError};
pub use preprocess::{Preprocessor, DEFAULT_PUNCTUATION};
pub use store::{TokenizerArtifact, ARTIFACT_VERSION};
pub use trainer::{MergeLearner, MergeRule, StopReason, TrainingSummary};
pub use vocab::Vocabulary;

/// Reserved symbols that can be pre-registered in a vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecialToken {
    /// Start of text
    Start,
    /// End of text
    End,
    /// Unknown symbol
    Unk,
    /// Padding
    Pad,
    /// Word separator
    Space,
}

impl SpecialToken {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecialToken::Start => "<s>",
            SpecialToken::End => "</s>",
            SpecialToken::Unk => "<unk>",
            SpecialToken::Pad => "<pad>",
            SpecialToken::Space => " ",
        }
    }

    pub fn all() -> [SpecialToken; 5] {
        [
            SpecialToken::Start,
            SpecialToken::End,
            SpecialToken::Unk,
            SpecialToken::Pad,
            SpecialToken::Space,
        ]
    }

    /// Look up the reserved token spelled `symbol`
    pub fn from_symbol(symbol: &str) -> Option<SpecialToken> {
        Self::all().into_iter().find(|t| t.as_str() == symbol)
    }

    /// Control tokens are dropped from decoded text
    pub fn is_control(&self) -> bool {
        !matches!(self, SpecialToken::Space)
    }
}
