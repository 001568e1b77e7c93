//! # Rejoinder Core
//!
//! Inference core for single-turn reply generation with a recurrent
//! sequence-to-sequence model.
//!
//! This crate provides:
//! - **Vocabulary** with fixed `PAD`/`SOS`/`EOS` ids and an offline builder
//! - **Text normalization** matching the vocabulary's conventions
//! - **Bidirectional GRU encoder** and **attentional GRU decoder**
//!   (dot, general and concat scoring)
//! - **Greedy search** as an explicit start/decoding/done state machine
//! - **Inference context** loading a parameter bundle from disk

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod search;
pub mod testing;
pub mod vocab;

pub use error::{RejoinderError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{RejoinderError, Result};
    pub use crate::model::{AttentionKind, Batch, ModelConfig, Seq2Seq};
    pub use crate::normalize::TextNormalizer;
    pub use crate::pipeline::{InferenceContext, Reply};
    pub use crate::search::{Generation, GreedySearch};
    pub use crate::vocab::{Vocabulary, VocabularyBuilder, EOS_TOKEN, PAD_TOKEN, SOS_TOKEN};
}
