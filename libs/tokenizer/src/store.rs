//! Tokenizer persistence as a JSON artifact

use crate::config::DEFAULT_END_OF_WORD;
use crate::{
    BpeTokenizer, MergeRule, Result, SpecialToken, TieBreak, TokenizerConfig, TokenizerError,
    Vocabulary,
};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Current artifact layout version
pub const ARTIFACT_VERSION: u32 = 1;

fn default_version() -> u32 {
    ARTIFACT_VERSION
}

fn default_lowercase() -> bool {
    true
}

fn default_end_of_word() -> Option<String> {
    Some(DEFAULT_END_OF_WORD.to_string())
}

/// The persisted `{merges, vocab}` document.
///
/// Files written before the version tag existed carry only `merges` and
/// `vocab`; the remaining fields fall back to the defaults those files were
/// trained with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenizerArtifact {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_lowercase")]
    pub lowercase: bool,
    #[serde(default = "default_end_of_word")]
    pub end_of_word: Option<String>,
    #[serde(default)]
    pub tie_break: TieBreak,
    /// `"left right"` entries in learned order
    pub merges: Vec<String>,
    /// Symbol to id, written in symbol order
    pub vocab: BTreeMap<String, u32>,
}

impl TokenizerArtifact {
    pub fn from_tokenizer(tokenizer: &BpeTokenizer) -> Self {
        let config = tokenizer.config();
        Self {
            version: ARTIFACT_VERSION,
            lowercase: config.lowercase,
            end_of_word: config.end_of_word.clone(),
            tie_break: config.tie_break,
            merges: tokenizer.merges().iter().map(MergeRule::key).collect(),
            vocab: tokenizer
                .vocab()
                .iter()
                .map(|(id, token)| (token.to_string(), id))
                .collect(),
        }
    }

    /// Validate the document and build a tokenizer from it
    pub fn into_tokenizer(self) -> Result<BpeTokenizer> {
        if self.version != ARTIFACT_VERSION {
            return Err(TokenizerError::InvalidArtifact(format!(
                "unsupported version {} (expected {})",
                self.version, ARTIFACT_VERSION
            )));
        }

        let vocab = Vocabulary::from_ids(self.vocab.iter().map(|(t, &id)| (t.as_str(), id)))?;

        let merges = self
            .merges
            .iter()
            .map(|entry| MergeRule::parse(entry))
            .collect::<Result<Vec<_>>>()?;
        if let Some(missing) = merges.iter().find(|m| !vocab.contains(&m.merged)) {
            return Err(TokenizerError::InvalidArtifact(format!(
                "merge {:?} produces {:?}, which is not in the vocabulary",
                missing.key(),
                missing.merged
            )));
        }

        let mut reserved: Vec<(u32, SpecialToken)> = SpecialToken::all()
            .into_iter()
            .filter_map(|t| vocab.special_token_id(t).map(|id| (id, t)))
            .collect();
        reserved.sort_by_key(|&(id, _)| id);

        let config = TokenizerConfig {
            vocab_size: vocab.len(),
            lowercase: self.lowercase,
            end_of_word: self.end_of_word,
            reserved: reserved.into_iter().map(|(_, t)| t).collect(),
            tie_break: self.tie_break,
            ..TokenizerConfig::default()
        };
        config.validate()?;

        Ok(BpeTokenizer::from_parts(config, vocab, merges))
    }
}

impl BpeTokenizer {
    /// Serialize tokenizer to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&TokenizerArtifact::from_tokenizer(self))?)
    }

    /// Deserialize tokenizer from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: TokenizerArtifact = serde_json::from_str(json)?;
        artifact.into_tokenizer()
    }

    /// Save tokenizer to file
    ///
    /// The artifact is written to a sibling temporary file and renamed over
    /// `path`, so an existing artifact survives a failed save.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let artifact = TokenizerArtifact::from_tokenizer(self);
        let staging = staging_path(path);

        let written = write_artifact(&staging, &artifact).and_then(|()| {
            fs::rename(&staging, path)?;
            Ok(())
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&staging);
            return Err(e);
        }

        info!(
            "Saved tokenizer ({} symbols, {} merges) to {}",
            artifact.vocab.len(),
            artifact.merges.len(),
            path.display()
        );
        Ok(())
    }

    /// Load tokenizer from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let tokenizer = Self::from_json(&json)?;

        info!(
            "Loaded tokenizer ({} symbols, {} merges) from {}",
            tokenizer.vocab_size(),
            tokenizer.merges().len(),
            path.display()
        );
        Ok(tokenizer)
    }

    /// Replace this tokenizer's state with the artifact at `path`.
    ///
    /// On error the current state is left untouched.
    pub fn reload<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        *self = Self::load(path)?;
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_artifact(path: &Path, artifact: &TokenizerArtifact) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, artifact)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trained() -> BpeTokenizer {
        let mut tokenizer =
            BpeTokenizer::new(TokenizerConfig::default().with_vocab_size(25)).unwrap();
        tokenizer.train("low lower newest newest");
        tokenizer
    }

    #[test]
    fn test_artifact_layout() {
        let json = trained().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["version"], 1);
        assert_eq!(value["merges"][0], "w e");
        assert_eq!(value["merges"][10], "lowe r");
        assert_eq!(value["vocab"]["<s>"], 0);
        assert_eq!(value["vocab"]["lower"], 24);
        assert_eq!(value["end_of_word"], "</w>");
        assert_eq!(value["tie_break"], "lexicographic");
    }

    #[test]
    fn test_serialization_roundtrip() {
        let tokenizer = trained();
        let loaded = BpeTokenizer::from_json(&tokenizer.to_json().unwrap()).unwrap();

        assert_eq!(loaded.vocab_size(), tokenizer.vocab_size());
        assert_eq!(loaded.merges(), tokenizer.merges());
        assert_eq!(loaded.config().reserved, tokenizer.config().reserved);
        assert_eq!(loaded.encode("lower newest"), tokenizer.encode("lower newest"));
    }

    #[test]
    fn test_output_is_deterministic() {
        assert_eq!(trained().to_json().unwrap(), trained().to_json().unwrap());
    }

    #[test]
    fn test_legacy_layout_without_version() {
        let json = r#"{
            "merges": ["l o", "lo w", "low </w>"],
            "vocab": {"<unk>": 0, "l": 1, "o": 2, "w": 3, "</w>": 4, "lo": 5, "low": 6, "low</w>": 7}
        }"#;
        let tokenizer = BpeTokenizer::from_json(json).unwrap();

        assert_eq!(tokenizer.encode("low"), vec![7]);
        assert_eq!(tokenizer.encode("x"), vec![0, 4]);
        assert_eq!(tokenizer.config().reserved, vec![SpecialToken::Unk]);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let json = r#"{"version": 7, "merges": [], "vocab": {"a": 0}}"#;
        assert!(matches!(
            BpeTokenizer::from_json(json),
            Err(TokenizerError::InvalidArtifact(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            BpeTokenizer::from_json("{\"merges\": [\"a b\""),
            Err(TokenizerError::Serialization(_))
        ));
        assert!(matches!(
            BpeTokenizer::from_json(r#"{"merges": "a b", "vocab": {}}"#),
            Err(TokenizerError::Serialization(_))
        ));
    }

    #[test]
    fn test_rejects_non_dense_ids() {
        let json = r#"{"merges": [], "vocab": {"a": 0, "b": 5}}"#;
        assert!(matches!(
            BpeTokenizer::from_json(json),
            Err(TokenizerError::InvalidArtifact(_))
        ));
    }

    #[test]
    fn test_rejects_bad_merge_entries() {
        let json = r#"{"merges": ["abc"], "vocab": {"a": 0}}"#;
        assert!(BpeTokenizer::from_json(json).is_err());

        // Merges over a " " word-prefix symbol are not two non-empty symbols
        let json = r#"{"merges": ["  l"], "vocab": {" ": 0, "l": 1, " l": 2}}"#;
        assert!(matches!(
            BpeTokenizer::from_json(json),
            Err(TokenizerError::InvalidArtifact(_))
        ));

        let json = r#"{"merges": ["a b"], "vocab": {"a": 0, "b": 1}}"#;
        assert!(matches!(
            BpeTokenizer::from_json(json),
            Err(TokenizerError::InvalidArtifact(_))
        ));
    }

    #[test]
    fn test_file_save_load() {
        let tokenizer = trained();
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("vocab.json");

        tokenizer.save(&path).unwrap();
        let loaded = BpeTokenizer::load(&path).unwrap();

        assert_eq!(loaded.vocab_size(), tokenizer.vocab_size());
        assert_eq!(loaded.encode("newest low"), tokenizer.encode("newest low"));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = BpeTokenizer::load(temp_dir.path().join("missing.json"));
        assert!(matches!(result, Err(TokenizerError::Io(_))));
    }

    #[test]
    fn test_save_to_missing_directory_leaves_state() {
        let tokenizer = trained();
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("no-such-dir").join("vocab.json");

        assert!(matches!(tokenizer.save(&path), Err(TokenizerError::Io(_))));
        assert_eq!(tokenizer.vocab_size(), 25);
    }

    #[test]
    fn test_save_overwrites_existing_artifact() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("vocab.json");
        BpeTokenizer::with_defaults().save(&path).unwrap();

        trained().save(&path).unwrap();
        assert_eq!(BpeTokenizer::load(&path).unwrap().vocab_size(), 25);
        let entries: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_failed_save_keeps_existing_artifact() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("vocab.json");
        trained().save(&path).unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        // A directory in the staging slot makes the write fail
        std::fs::create_dir(temp_dir.path().join("vocab.json.tmp")).unwrap();
        let result = BpeTokenizer::with_defaults().save(&path);

        assert!(matches!(result, Err(TokenizerError::Io(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
        assert_eq!(BpeTokenizer::load(&path).unwrap().vocab_size(), 25);
    }

    #[test]
    fn test_failed_reload_keeps_state() {
        let mut tokenizer = trained();
        let before = tokenizer.clone();
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(tokenizer.reload(&path).is_err());
        assert_eq!(tokenizer, before);
    }

    #[test]
    fn test_reload_replaces_state() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("vocab.json");
        trained().save(&path).unwrap();

        let mut tokenizer = BpeTokenizer::with_defaults();
        tokenizer.reload(&path).unwrap();
        assert_eq!(tokenizer.vocab_size(), 25);
        assert_eq!(tokenizer.merges().len(), 11);
    }
}
