//! Word-level vocabulary for text-to-token and token-to-text conversion.
//!
//! The inference [`Vocabulary`] is immutable: it is loaded once from a
//! [`VocabSnapshot`] written at training time. Building and trimming a
//! vocabulary happens offline through [`VocabularyBuilder`].

mod builder;
mod snapshot;

pub use builder::VocabularyBuilder;
pub use snapshot::VocabSnapshot;

use crate::error::{RejoinderError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Padding token id.
pub const PAD_TOKEN: u32 = 0;
/// Start-of-sentence token id.
pub const SOS_TOKEN: u32 = 1;
/// End-of-sentence token id.
pub const EOS_TOKEN: u32 = 2;

/// Sentinel word bound to [`PAD_TOKEN`].
pub const PAD_WORD: &str = "PAD";
/// Sentinel word bound to [`SOS_TOKEN`].
pub const SOS_WORD: &str = "SOS";
/// Sentinel word bound to [`EOS_TOKEN`].
pub const EOS_WORD: &str = "EOS";

/// Reserved ids in order, paired with their sentinel words.
pub(crate) const RESERVED: [(u32, &str); 3] =
    [(PAD_TOKEN, PAD_WORD), (SOS_TOKEN, SOS_WORD), (EOS_TOKEN, EOS_WORD)];

/// Immutable bidirectional mapping between words and token ids.
#[derive(Clone)]
pub struct Vocabulary {
    /// Corpus name the vocabulary was built from.
    name: String,
    /// Word to id, including the sentinels.
    word_to_id: HashMap<String, u32>,
    /// Id to word; ids are dense so the index is the id.
    id_to_word: Vec<String>,
}

impl Vocabulary {
    /// Build a vocabulary from a training-time snapshot.
    ///
    /// Fails with [`RejoinderError::CorruptVocabulary`] when the reserved ids
    /// are not bound to their sentinels, ids are not dense, or the forward and
    /// inverse maps disagree.
    pub fn from_snapshot(snapshot: VocabSnapshot) -> Result<Self> {
        let VocabSnapshot {
            name,
            word2index,
            index2word,
            num_words,
            ..
        } = snapshot;

        if index2word.len() != num_words {
            return Err(RejoinderError::CorruptVocabulary(format!(
                "num_words is {} but index2word has {} entries",
                num_words,
                index2word.len()
            )));
        }

        for (id, word) in RESERVED {
            match index2word.get(&id) {
                Some(bound) if bound == word => {}
                Some(bound) => {
                    return Err(RejoinderError::CorruptVocabulary(format!(
                        "reserved id {} bound to {:?}, expected {:?}",
                        id, bound, word
                    )));
                }
                None => {
                    return Err(RejoinderError::CorruptVocabulary(format!(
                        "reserved id {} ({}) is missing",
                        id, word
                    )));
                }
            }
        }

        // BTreeMap iterates in id order, so density is a positional check.
        let mut id_to_word = Vec::with_capacity(num_words);
        for (expected, (id, word)) in index2word.into_iter().enumerate() {
            if id as usize != expected {
                return Err(RejoinderError::CorruptVocabulary(format!(
                    "ids are not dense: expected {}, found {}",
                    expected, id
                )));
            }
            id_to_word.push(word);
        }

        let mut word_to_id = HashMap::with_capacity(id_to_word.len());
        for (id, word) in id_to_word.iter().enumerate() {
            if word_to_id.insert(word.clone(), id as u32).is_some() {
                return Err(RejoinderError::CorruptVocabulary(format!(
                    "word {:?} is bound to more than one id",
                    word
                )));
            }
        }

        // The forward table may omit sentinels, but whatever it holds must
        // agree with the inverse table.
        for (word, id) in &word2index {
            match id_to_word.get(*id as usize) {
                Some(bound) if bound == word => {}
                _ => {
                    return Err(RejoinderError::CorruptVocabulary(format!(
                        "word2index maps {:?} to {} but index2word disagrees",
                        word, id
                    )));
                }
            }
        }
        let forward_len = word2index.len()
            + RESERVED
                .iter()
                .filter(|(_, w)| !word2index.contains_key(*w))
                .count();
        if forward_len != id_to_word.len() {
            return Err(RejoinderError::CorruptVocabulary(format!(
                "word2index covers {} ids, index2word has {}",
                forward_len,
                id_to_word.len()
            )));
        }

        Ok(Self {
            name,
            word_to_id,
            id_to_word,
        })
    }

    /// Load a vocabulary from a snapshot JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_snapshot(VocabSnapshot::from_file(path)?)
    }

    /// Look up the id of a word.
    pub fn to_id(&self, word: &str) -> Result<u32> {
        self.word_to_id
            .get(word)
            .copied()
            .ok_or_else(|| RejoinderError::UnknownWord(word.to_string()))
    }

    /// Look up the word for an id.
    pub fn to_word(&self, id: u32) -> Result<&str> {
        self.id_to_word
            .get(id as usize)
            .map(String::as_str)
            .ok_or(RejoinderError::InvalidId(id))
    }

    /// Number of ids, sentinels included.
    pub fn size(&self) -> usize {
        self.id_to_word.len()
    }

    /// Corpus name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Map a normalized sentence to token ids terminated by [`EOS_TOKEN`].
    ///
    /// Words are whitespace-delimited; an empty sentence yields `[EOS]`.
    pub fn encode_sentence(&self, sentence: &str) -> Result<Vec<u32>> {
        let mut ids = sentence
            .split_whitespace()
            .map(|word| self.to_id(word))
            .collect::<Result<Vec<_>>>()?;
        ids.push(EOS_TOKEN);
        Ok(ids)
    }

    /// Render token ids as text, dropping padding and end-of-sentence tokens.
    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        let mut words = Vec::with_capacity(ids.len());
        for &id in ids {
            let word = self.to_word(id)?;
            if id != PAD_TOKEN && id != EOS_TOKEN {
                words.push(word);
            }
        }
        Ok(words.join(" "))
    }

    /// Export the tables as a snapshot. Tallies are not kept at inference
    /// time, so `word2count` is empty.
    pub fn snapshot(&self) -> VocabSnapshot {
        VocabSnapshot {
            name: self.name.clone(),
            trimmed: false,
            word2index: self
                .id_to_word
                .iter()
                .enumerate()
                .skip(RESERVED.len())
                .map(|(id, word)| (word.clone(), id as u32))
                .collect(),
            word2count: HashMap::new(),
            index2word: self
                .id_to_word
                .iter()
                .enumerate()
                .map(|(id, word)| (id as u32, word.clone()))
                .collect(),
            num_words: self.id_to_word.len(),
        }
    }

    /// Write the snapshot as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.snapshot().save(path)
    }
}

impl std::fmt::Debug for Vocabulary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vocabulary")
            .field("name", &self.name)
            .field("size", &self.size())
            .finish()
    }
}
