//! Persisted vocabulary tables.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Vocabulary tables as written at training time.
///
/// Field names follow the training checkpoint's vocabulary dictionary, so a
/// dumped checkpoint can be read without renaming.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VocabSnapshot {
    /// Corpus name.
    #[serde(default)]
    pub name: String,
    /// Whether low-frequency words were already trimmed.
    #[serde(default)]
    pub trimmed: bool,
    /// Word to id; sentinels may be absent.
    pub word2index: HashMap<String, u32>,
    /// Occurrence tallies, only meaningful while building.
    #[serde(default)]
    pub word2count: HashMap<String, u64>,
    /// Id to word, sentinels included.
    pub index2word: BTreeMap<u32, String>,
    /// Number of ids, sentinels included.
    pub num_words: usize,
}

impl VocabSnapshot {
    /// Load from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let snapshot: Self = serde_json::from_str(&contents)?;
        Ok(snapshot)
    }

    /// Write as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
