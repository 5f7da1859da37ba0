//! Vocabulary management for the tokenizer

use crate::{Result, SpecialToken, TokenizerError};
use std::collections::HashMap;

/// Vocabulary mapping between symbols and dense ids
///
/// Ids are assigned in first-seen order starting at 0. The inverse table is
/// a `Vec`, so `id_to_token[token_to_id[s]] == s` holds by construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    /// Symbol to ID mapping
    token_to_id: HashMap<String, u32>,
    /// ID to symbol mapping
    id_to_token: Vec<String>,
    /// Occurrences seen through `add_token`
    counts: HashMap<String, u64>,
}

impl Vocabulary {
    /// Create an empty vocabulary
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a vocabulary with the given reserved tokens at ids 0..n
    pub fn with_reserved(reserved: &[SpecialToken]) -> Self {
        let mut vocab = Self::new();
        for special in reserved {
            vocab.add_token(special.as_str());
        }
        vocab
    }

    /// Rebuild a vocabulary from a `symbol -> id` table.
    ///
    /// Ids must be unique and cover `0..len` exactly. Counts start at zero.
    pub fn from_ids<'a, I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, u32)>,
    {
        let entries: Vec<(&str, u32)> = entries.into_iter().collect();
        let mut slots: Vec<Option<&str>> = vec![None; entries.len()];

        for &(token, id) in &entries {
            let slot = slots.get_mut(id as usize).ok_or_else(|| {
                TokenizerError::InvalidArtifact(format!(
                    "id {} for {:?} is outside the dense range 0..{}",
                    id,
                    token,
                    entries.len()
                ))
            })?;
            if let Some(existing) = slot {
                return Err(TokenizerError::InvalidArtifact(format!(
                    "id {} assigned to both {:?} and {:?}",
                    id, existing, token
                )));
            }
            *slot = Some(token);
        }

        let mut vocab = Self::new();
        for token in slots.into_iter().flatten() {
            vocab.token_to_id.insert(token.to_string(), vocab.id_to_token.len() as u32);
            vocab.id_to_token.push(token.to_string());
        }
        Ok(vocab)
    }

    /// Get the vocabulary size
    pub fn len(&self) -> usize {
        self.id_to_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_token.is_empty()
    }

    /// Add a symbol to the vocabulary and bump its count
    /// Returns the symbol ID (existing or new)
    pub fn add_token(&mut self, token: &str) -> u32 {
        *self.counts.entry(token.to_string()).or_insert(0) += 1;
        if let Some(&id) = self.token_to_id.get(token) {
            return id;
        }
        let id = self.id_to_token.len() as u32;
        self.token_to_id.insert(token.to_string(), id);
        self.id_to_token.push(token.to_string());
        id
    }

    /// Get symbol ID by symbol string
    pub fn get_id(&self, token: &str) -> Option<u32> {
        self.token_to_id.get(token).copied()
    }

    /// Get symbol string by ID
    pub fn get_token(&self, id: u32) -> Option<&str> {
        self.id_to_token.get(id as usize).map(|s| s.as_str())
    }

    /// Get the ID of a reserved token, if it was registered
    pub fn special_token_id(&self, token: SpecialToken) -> Option<u32> {
        self.get_id(token.as_str())
    }

    pub fn unk_id(&self) -> Option<u32> {
        self.special_token_id(SpecialToken::Unk)
    }

    /// Check if a symbol exists in the vocabulary
    pub fn contains(&self, token: &str) -> bool {
        self.token_to_id.contains_key(token)
    }

    /// Number of times `token` was added
    pub fn count(&self, token: &str) -> u64 {
        self.counts.get(token).copied().unwrap_or(0)
    }

    /// All symbols in id order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.id_to_token
            .iter()
            .enumerate()
            .map(|(id, s)| (id as u32, s.as_str()))
    }

    /// Symbols by descending count, ties by ascending symbol
    pub fn sorted_by_count(&self) -> Vec<&str> {
        let mut tokens: Vec<&str> = self.id_to_token.iter().map(|s| s.as_str()).collect();
        tokens.sort_by(|a, b| self.count(b).cmp(&self.count(a)).then_with(|| a.cmp(b)));
        tokens
    }
}
