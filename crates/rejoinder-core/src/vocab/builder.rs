//! Offline vocabulary construction.
//!
//! Counts words over a training corpus and drops rare ones before the
//! snapshot is frozen. Nothing here runs at inference time.

use super::{VocabSnapshot, Vocabulary, RESERVED};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

/// Mutable vocabulary used while preparing training data.
#[derive(Debug, Clone)]
pub struct VocabularyBuilder {
    name: String,
    trimmed: bool,
    word_to_id: HashMap<String, u32>,
    word_count: HashMap<String, u64>,
    id_to_word: Vec<String>,
}

impl VocabularyBuilder {
    /// Create an empty builder holding only the sentinels.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            trimmed: false,
            word_to_id: HashMap::new(),
            word_count: HashMap::new(),
            id_to_word: RESERVED.iter().map(|(_, w)| w.to_string()).collect(),
        }
    }

    /// Register every space-separated word of a normalized sentence.
    pub fn add_sentence(&mut self, sentence: &str) {
        for word in sentence.split(' ').filter(|w| !w.is_empty()) {
            self.add_word(word);
        }
    }

    /// Register one word, assigning the next id on first sight.
    pub fn add_word(&mut self, word: &str) {
        if let Some(count) = self.word_count.get_mut(word) {
            *count += 1;
            return;
        }
        let id = self.id_to_word.len() as u32;
        self.word_to_id.insert(word.to_string(), id);
        self.word_count.insert(word.to_string(), 1);
        self.id_to_word.push(word.to_string());
    }

    /// Drop words seen fewer than `min_count` times.
    ///
    /// Survivors are re-registered in their original order, so ids stay dense
    /// and each tally restarts at one. A second call is a no-op.
    pub fn trim(&mut self, min_count: u64) {
        if self.trimmed {
            return;
        }
        self.trimmed = true;

        let before = self.word_to_id.len();
        let keep: Vec<String> = self
            .id_to_word
            .iter()
            .skip(RESERVED.len())
            .filter(|w| self.word_count.get(*w).copied().unwrap_or(0) >= min_count)
            .cloned()
            .collect();

        let ratio = if before == 0 {
            0.0
        } else {
            keep.len() as f64 / before as f64
        };
        info!(kept = keep.len(), total = before, ratio, "trimmed vocabulary");

        self.word_to_id.clear();
        self.word_count.clear();
        self.id_to_word.truncate(RESERVED.len());
        for word in keep {
            self.add_word(&word);
        }
    }

    /// Number of ids, sentinels included.
    pub fn num_words(&self) -> usize {
        self.id_to_word.len()
    }

    /// Tally for a word, zero if unseen.
    pub fn count(&self, word: &str) -> u64 {
        self.word_count.get(word).copied().unwrap_or(0)
    }

    /// Freeze the current tables.
    pub fn snapshot(&self) -> VocabSnapshot {
        VocabSnapshot {
            name: self.name.clone(),
            trimmed: self.trimmed,
            word2index: self.word_to_id.clone(),
            word2count: self.word_count.clone(),
            index2word: self
                .id_to_word
                .iter()
                .enumerate()
                .map(|(id, word)| (id as u32, word.clone()))
                .collect::<BTreeMap<_, _>>(),
            num_words: self.id_to_word.len(),
        }
    }

    /// Build the immutable inference vocabulary.
    pub fn build(&self) -> Vocabulary {
        let mut word_to_id = self.word_to_id.clone();
        for (id, word) in RESERVED {
            word_to_id.insert(word.to_string(), id);
        }
        Vocabulary {
            name: self.name.clone(),
            word_to_id,
            id_to_word: self.id_to_word.clone(),
        }
    }
}
