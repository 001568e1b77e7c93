//! # Rejoinder
//!
//! Single-turn conversational reply generation with a recurrent
//! encoder/decoder model.
//!
//! - **One call per message**: normalize, encode, decode greedily, render
//! - **Graceful unknown words**: inputs outside the vocabulary get a fixed
//!   fallback reply instead of an error
//! - **Shareable**: the loaded bundle is read-only and lives behind an `Arc`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rejoinder::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let bot = Chatbot::builder().bundle_dir("bundle").build()?;
//!
//!     if let Some(reply) = bot.respond("Hello there!")? {
//!         println!("{reply}");
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// Re-export core crate
pub use rejoinder_core::*;

mod engine;

pub use engine::{Chatbot, ChatbotBuilder, ChatbotConfig, DEFAULT_FALLBACK};

/// Commonly used types.
pub mod prelude {
    pub use crate::engine::{Chatbot, ChatbotBuilder, ChatbotConfig, DEFAULT_FALLBACK};
    pub use crate::{
        error::{RejoinderError, Result},
        model::{AttentionKind, ModelConfig, Seq2Seq},
        normalize::TextNormalizer,
        pipeline::{InferenceContext, Reply},
        search::{Generation, GreedySearch},
        vocab::{Vocabulary, VocabularyBuilder},
    };

    // Re-export useful external types
    pub use anyhow;
    pub use tracing;
}
