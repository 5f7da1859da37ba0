//! BPE merge learning

use crate::{Preprocessor, Result, TieBreak, TokenizerConfig, TokenizerError, Vocabulary};
use log::{debug, info, warn};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::iter;

/// A merge rule learned during BPE training
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MergeRule {
    /// Left symbol of the pair
    pub left: String,
    /// Right symbol of the pair
    pub right: String,
    /// Resulting merged symbol
    pub merged: String,
}

impl MergeRule {
    pub fn new(left: &str, right: &str) -> Self {
        Self {
            left: left.to_string(),
            right: right.to_string(),
            merged: format!("{}{}", left, right),
        }
    }

    /// The `"left right"` form used in artifacts and for tie-breaking
    pub fn key(&self) -> String {
        format!("{} {}", self.left, self.right)
    }

    /// Parse a `"left right"` entry; exactly two non-empty symbols are required
    pub fn parse(entry: &str) -> Result<Self> {
        let mut parts = entry.split(' ');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(left), Some(right), None) if !left.is_empty() && !right.is_empty() => {
                Ok(Self::new(left, right))
            }
            _ => Err(TokenizerError::InvalidArtifact(format!(
                "merge entry {:?} is not two space-separated symbols",
                entry
            ))),
        }
    }

    /// Merge every non-overlapping occurrence of the pair, scanning left to right
    pub fn apply(&self, word: &[String]) -> Vec<String> {
        if word.len() < 2 {
            return word.to_vec();
        }

        let mut result = Vec::with_capacity(word.len());
        let mut i = 0;

        while i < word.len() {
            if i < word.len() - 1 && word[i] == self.left && word[i + 1] == self.right {
                result.push(self.merged.clone());
                i += 2;
            } else {
                result.push(word[i].clone());
                i += 1;
            }
        }

        result
    }
}

/// Why a training run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The vocabulary reached the configured size
    ReachedVocabSize,
    /// Every word collapsed to a single symbol (or the corpus was empty)
    NoPairsLeft,
    /// The remaining pairs are rarer than `min_frequency`
    BelowMinFrequency,
}

/// Outcome of a training run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingSummary {
    /// Vocabulary size after reserved and atomic symbols were registered
    pub initial_vocab_size: usize,
    /// Vocabulary size when training stopped
    pub final_vocab_size: usize,
    /// Number of merge rules learned
    pub merges_learned: usize,
    pub stop_reason: StopReason,
}

/// A candidate pair and its corpus frequency
#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    left: &'a str,
    right: &'a str,
    freq: u64,
}

impl Candidate<'_> {
    fn touches_marker(&self, marker: Option<&str>) -> bool {
        marker.is_some_and(|m| self.left.contains(m) || self.right.contains(m))
    }
}

/// Greedy frequency-driven pair merging.
///
/// Words are deduplicated into `(symbols, frequency)` entries kept in
/// first-seen order, so pair counts are per occurrence across the corpus and
/// the seed vocabulary is assigned ids deterministically.
#[derive(Debug, Clone)]
pub struct MergeLearner {
    config: TokenizerConfig,
    preprocessor: Preprocessor,
}

impl MergeLearner {
    pub fn new(config: TokenizerConfig) -> Self {
        let preprocessor = Preprocessor::from_config(&config);
        Self {
            config,
            preprocessor,
        }
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    /// Learn merges from `corpus`, growing `vocab` until it holds
    /// `config.vocab_size` symbols or no eligible pair remains.
    ///
    /// `vocab` should already contain the reserved tokens.
    pub fn learn(&self, corpus: &str, vocab: &mut Vocabulary) -> (Vec<MergeRule>, TrainingSummary) {
        let mut words = self.split_corpus(corpus);
        info!("Found {} distinct words", words.len());

        // Seed with atomic symbols in corpus order
        for (symbols, freq) in &words {
            for symbol in symbols {
                for _ in 0..*freq {
                    vocab.add_token(symbol);
                }
            }
        }
        let initial_vocab_size = vocab.len();
        info!(
            "Initial vocabulary size: {} (target {})",
            initial_vocab_size, self.config.vocab_size
        );

        let mut merges = Vec::new();
        let mut stop_reason = StopReason::ReachedVocabSize;

        while vocab.len() < self.config.vocab_size {
            let (merge, freq) = {
                let pair_freqs = count_pairs(&words);
                if pair_freqs.is_empty() {
                    stop_reason = StopReason::NoPairsLeft;
                    break;
                }

                let Some(best) = self.select_best_pair(&pair_freqs) else {
                    stop_reason = StopReason::BelowMinFrequency;
                    break;
                };
                (MergeRule::new(best.left, best.right), best.freq)
            };

            debug!(
                "Merge {}: {:?} (frequency {}, vocab size {}/{})",
                merges.len() + 1,
                merge.key(),
                freq,
                vocab.len(),
                self.config.vocab_size
            );

            for (symbols, _) in words.iter_mut() {
                *symbols = merge.apply(symbols);
            }

            if vocab.contains(&merge.merged) {
                debug!("Merged symbol {:?} already in vocabulary", merge.merged);
            }
            vocab.add_token(&merge.merged);
            merges.push(merge);
        }

        if stop_reason != StopReason::ReachedVocabSize {
            warn!(
                "Training stopped at vocab size {} of {} ({:?})",
                vocab.len(),
                self.config.vocab_size,
                stop_reason
            );
        }

        let summary = TrainingSummary {
            initial_vocab_size,
            final_vocab_size: vocab.len(),
            merges_learned: merges.len(),
            stop_reason,
        };
        info!(
            "Learned {} merges, final vocabulary size {}",
            summary.merges_learned, summary.final_vocab_size
        );

        (merges, summary)
    }

    fn split_corpus(&self, corpus: &str) -> Vec<(Vec<String>, u64)> {
        let mut words: Vec<(Vec<String>, u64)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for word in self.preprocessor.words(corpus) {
            match index.get(&word) {
                Some(&i) => words[i].1 += 1,
                None => {
                    index.insert(word.clone(), words.len());
                    words.push((self.preprocessor.word_symbols(&word), 1));
                }
            }
        }

        words
    }

    fn select_best_pair<'a>(
        &self,
        pair_freqs: &'a HashMap<(&'a str, &'a str), u64>,
    ) -> Option<Candidate<'a>> {
        let marker = self.config.end_of_word.as_deref();
        pair_freqs
            .iter()
            .filter(|&(_, &freq)| freq >= self.config.min_frequency)
            .map(|(&(left, right), &freq)| Candidate { left, right, freq })
            .min_by(|a, b| compare_candidates(a, b, self.config.tie_break, marker))
    }
}

/// Count adjacent pairs over all words, weighted by word frequency
fn count_pairs(words: &[(Vec<String>, u64)]) -> HashMap<(&str, &str), u64> {
    let mut pair_freqs: HashMap<(&str, &str), u64> = HashMap::new();

    for (symbols, freq) in words {
        for pair in symbols.windows(2) {
            *pair_freqs
                .entry((pair[0].as_str(), pair[1].as_str()))
                .or_insert(0) += freq;
        }
    }

    pair_freqs
}

/// Total order over candidates; `Less` means "merge first".
fn compare_candidates(
    a: &Candidate<'_>,
    b: &Candidate<'_>,
    tie_break: TieBreak,
    marker: Option<&str>,
) -> Ordering {
    let by_freq = b.freq.cmp(&a.freq);
    let by_marker = match tie_break {
        TieBreak::Lexicographic => Ordering::Equal,
        TieBreak::DeferEndOfWord => a.touches_marker(marker).cmp(&b.touches_marker(marker)),
    };
    by_freq.then(by_marker).then_with(|| {
        let key_a = a.left.bytes().chain(iter::once(b' ')).chain(a.right.bytes());
        let key_b = b.left.bytes().chain(iter::once(b' ')).chain(b.right.bytes());
        key_a.cmp(key_b)
    })
}
