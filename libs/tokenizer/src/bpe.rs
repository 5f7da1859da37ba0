//! BPE tokenizer: training, encoding and decoding

use crate::{
    MergeLearner, MergeRule, Preprocessor, Result, SpecialToken, TokenizerConfig,
    TrainingSummary, Vocabulary,
};
use log::info;

/// BPE Tokenizer with training and encoding capabilities
///
/// Training is the only operation that mutates the vocabulary or merge list;
/// `encode` and `decode` borrow immutably, so a trained tokenizer can be
/// shared across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct BpeTokenizer {
    /// Configuration
    config: TokenizerConfig,
    /// Text normalization shared by training and encoding
    preprocessor: Preprocessor,
    /// Vocabulary
    vocab: Vocabulary,
    /// Merge rules in the order they were learned
    merges: Vec<MergeRule>,
}

impl BpeTokenizer {
    /// Create an untrained tokenizer holding only the reserved tokens
    ///
    /// Fails with `InvalidConfig` when `config` does not validate.
    pub fn new(config: TokenizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::untrained(config))
    }

    /// Create a tokenizer with default configuration
    pub fn with_defaults() -> Self {
        Self::untrained(TokenizerConfig::default())
    }

    fn untrained(config: TokenizerConfig) -> Self {
        Self {
            preprocessor: Preprocessor::from_config(&config),
            vocab: Vocabulary::with_reserved(&config.reserved),
            merges: Vec::new(),
            config,
        }
    }

    pub(crate) fn from_parts(
        config: TokenizerConfig,
        vocab: Vocabulary,
        merges: Vec<MergeRule>,
    ) -> Self {
        Self {
            preprocessor: Preprocessor::from_config(&config),
            vocab,
            merges,
            config,
        }
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    /// Get the vocabulary
    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Get the vocabulary size
    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    /// Get the merge rules
    pub fn merges(&self) -> &[MergeRule] {
        &self.merges
    }

    pub fn token_to_id(&self, token: &str) -> Option<u32> {
        self.vocab.get_id(token)
    }

    pub fn id_to_token(&self, id: u32) -> Option<&str> {
        self.vocab.get_token(id)
    }

    pub fn special_token_id(&self, token: SpecialToken) -> Option<u32> {
        self.vocab.special_token_id(token)
    }

    /// Train the tokenizer on a corpus, replacing any earlier vocabulary
    pub fn train(&mut self, corpus: &str) -> TrainingSummary {
        info!(
            "Training BPE tokenizer on {} bytes (target vocab size {})",
            corpus.len(),
            self.config.vocab_size
        );

        let mut vocab = Vocabulary::with_reserved(&self.config.reserved);
        let learner = MergeLearner::new(self.config.clone());
        let (merges, summary) = learner.learn(corpus, &mut vocab);

        self.vocab = vocab;
        self.merges = merges;
        summary
    }

    /// Segment text into post-merge symbols
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let separate_words = self.separates_words_with_space();
        let mut tokens = Vec::new();

        for (i, word) in self.preprocessor.words(text).iter().enumerate() {
            if separate_words && i > 0 {
                tokens.push(SpecialToken::Space.as_str().to_string());
            }
            tokens.extend(self.apply_all_merges(self.preprocessor.word_symbols(word)));
        }

        tokens
    }

    /// Encode text into token IDs.
    ///
    /// Symbols missing from the vocabulary become the `<unk>` id when that
    /// token is reserved and are dropped otherwise.
    pub fn encode(&self, text: &str) -> Vec<u32> {
        let unk = self.vocab.unk_id();
        self.tokenize(text)
            .iter()
            .filter_map(|token| self.vocab.get_id(token).or(unk))
            .collect()
    }

    /// Encode with the start and end tokens around the text, when reserved
    pub fn encode_with_special(&self, text: &str) -> Vec<u32> {
        let mut ids = Vec::new();
        ids.extend(self.special_token_id(SpecialToken::Start));
        ids.extend(self.encode(text));
        ids.extend(self.special_token_id(SpecialToken::End));
        ids
    }

    /// Decode token IDs back to text.
    ///
    /// Unknown ids and control tokens are skipped. A symbol ending in the
    /// end-of-word marker closes a word; other symbols are word fragments.
    pub fn decode(&self, token_ids: &[u32]) -> String {
        let marker = self.preprocessor.end_of_word();
        let mut text = String::new();

        for &id in token_ids {
            let Some(token) = self.vocab.get_token(id) else {
                continue;
            };

            match SpecialToken::from_symbol(token) {
                Some(special) if special.is_control() => continue,
                Some(_) => {
                    if !text.ends_with(' ') {
                        text.push(' ');
                    }
                    continue;
                }
                None => {}
            }

            match marker.and_then(|m| token.strip_suffix(m)) {
                Some(stem) => {
                    text.push_str(stem);
                    text.push(' ');
                }
                None => text.push_str(token),
            }
        }

        text.trim().to_string()
    }

    /// Apply all learned merges to a sequence of symbols
    fn apply_all_merges(&self, mut symbols: Vec<String>) -> Vec<String> {
        for merge in &self.merges {
            if symbols.len() < 2 {
                break;
            }
            symbols = merge.apply(&symbols);
        }
        symbols
    }

    /// Without an end-of-word marker, words are delimited by the space token
    fn separates_words_with_space(&self) -> bool {
        self.preprocessor.end_of_word().is_none()
            && self.vocab.contains(SpecialToken::Space.as_str())
    }
}
