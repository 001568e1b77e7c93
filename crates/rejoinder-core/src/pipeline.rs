//! End-to-end text → reply inference.
//!
//! An [`InferenceContext`] owns everything generation reads: the
//! vocabulary, normalizer and model weights (which carry their own
//! configuration). It is built once
//! and only read afterwards, so a single instance can be shared across
//! threads behind an `Arc`.

use crate::error::{RejoinderError, Result};
use crate::model::{Batch, ModelConfig, Seq2Seq, WeightLoader};
use crate::normalize::TextNormalizer;
use crate::search::GreedySearch;
use crate::vocab::Vocabulary;
use candle_core::Device;
use std::path::Path;
use tracing::{debug, info};

/// Model configuration file inside a bundle directory.
pub const CONFIG_FILE: &str = "config.json";

/// Vocabulary snapshot file inside a bundle directory.
pub const VOCAB_FILE: &str = "vocab.json";

/// A generated reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Generated ids, including a trailing `EOS` when one was produced.
    pub ids: Vec<u32>,
    /// Probability of each id at its step.
    pub scores: Vec<f32>,
    /// Rendered words; may be empty.
    pub text: String,
}

/// Immutable state shared by every generation request.
#[derive(Debug)]
pub struct InferenceContext {
    vocab: Vocabulary,
    normalizer: TextNormalizer,
    model: Seq2Seq,
    device: Device,
}

impl InferenceContext {
    /// Load a bundle directory holding `config.json`, `vocab.json` and one or
    /// more `.safetensors` files.
    pub fn load(bundle_dir: &Path, device: &Device) -> Result<Self> {
        let config = ModelConfig::from_file(&bundle_dir.join(CONFIG_FILE))?;
        let vocab = Vocabulary::from_file(bundle_dir.join(VOCAB_FILE))?;
        let loader = WeightLoader::from_dir(bundle_dir, device)?;
        let model = Seq2Seq::load(&loader, config, vocab.size())?;

        info!(
            bundle = %bundle_dir.display(),
            vocab = vocab.name(),
            vocab_size = vocab.size(),
            tensors = loader.num_tensors(),
            "inference context ready"
        );
        Self::from_parts(vocab, model)
    }

    /// Assemble from already loaded parts; the configuration is the model's.
    pub fn from_parts(vocab: Vocabulary, model: Seq2Seq) -> Result<Self> {
        if model.vocab_size() != vocab.size() {
            return Err(RejoinderError::ModelLoad(format!(
                "model projects onto {} words but the vocabulary has {}",
                model.vocab_size(),
                vocab.size()
            )));
        }
        let device = model.device().clone();
        Ok(Self {
            vocab,
            normalizer: TextNormalizer::new()?,
            model,
            device,
        })
    }

    /// Normalize `text` and map it to ids terminated by `EOS`.
    pub fn encode_input(&self, text: &str) -> Result<Vec<u32>> {
        let normalized = self.normalizer.normalize(text);
        self.vocab.encode_sentence(&normalized)
    }

    /// Generate a reply capped at the configured `max_length`.
    pub fn generate(&self, text: &str) -> Result<Reply> {
        self.generate_with_limit(text, self.model.config().max_length)
    }

    /// Generate a reply of at most `max_length` tokens.
    pub fn generate_with_limit(&self, text: &str, max_length: usize) -> Result<Reply> {
        let ids = self.encode_input(text)?;
        let batch = Batch::single(&ids, &self.device)?;
        let generation = GreedySearch::new(&self.model).generate(&batch, max_length)?;
        let reply = self.vocab.decode(&generation.tokens)?;

        debug!(
            input_tokens = ids.len(),
            output_tokens = generation.len(),
            finished = generation.is_finished(),
            "generated reply"
        );
        Ok(Reply {
            ids: generation.tokens,
            scores: generation.scores,
            text: reply,
        })
    }

    /// Model configuration.
    pub fn config(&self) -> &ModelConfig {
        self.model.config()
    }

    /// The vocabulary.
    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// The input normalizer.
    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    /// The model weights.
    pub fn model(&self) -> &Seq2Seq {
        &self.model
    }

    /// Device the weights live on.
    pub fn device(&self) -> &Device {
        &self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        scripted_config, scripted_model, scripted_vocab, write_scripted_bundle, HELLO,
    };
    use crate::vocab::EOS_TOKEN;

    fn context() -> InferenceContext {
        let model = scripted_model(&Device::Cpu).unwrap();
        InferenceContext::from_parts(scripted_vocab(), model).unwrap()
    }

    #[test]
    fn hello_world_end_to_end() {
        let ctx = context();
        let reply = ctx.generate("hello world").unwrap();
        assert_eq!(reply.ids, vec![HELLO, EOS_TOKEN]);
        assert_eq!(reply.text, "hello");
        assert_eq!(reply.scores.len(), 2);
    }

    #[test]
    fn input_is_normalized_first() {
        let ctx = context();
        assert_eq!(ctx.encode_input("  HÉLLO,   World ").unwrap(), vec![3, 4, 2]);
        assert_eq!(ctx.encode_input("").unwrap(), vec![EOS_TOKEN]);
    }

    #[test]
    fn unknown_word() {
        let ctx = context();
        match ctx.encode_input("zzz") {
            Err(RejoinderError::UnknownWord(word)) => assert_eq!(word, "zzz"),
            other => panic!("expected UnknownWord, got {other:?}"),
        }
        assert!(ctx.generate("hello zzz").unwrap_err().is_input_error());
    }

    #[test]
    fn limit_zero_gives_empty_reply() {
        let reply = context().generate_with_limit("hello", 0).unwrap();
        assert!(reply.ids.is_empty());
        assert!(reply.text.is_empty());
    }

    #[test]
    fn rejects_vocab_model_mismatch() {
        let mut builder = crate::vocab::VocabularyBuilder::new("bigger");
        builder.add_sentence("hello world again");
        let model = scripted_model(&Device::Cpu).unwrap();
        assert!(matches!(
            InferenceContext::from_parts(builder.build(), model),
            Err(RejoinderError::ModelLoad(_))
        ));
    }

    #[test]
    fn config_comes_from_model() {
        let config = ModelConfig {
            hidden_size: 4,
            encoder_layers: 2,
            decoder_layers: 1,
            max_length: 3,
            ..Default::default()
        };
        let model = Seq2Seq::random(config.clone(), 5, &Device::Cpu).unwrap();
        let ctx = InferenceContext::from_parts(scripted_vocab(), model).unwrap();

        assert_eq!(ctx.config(), &config);
        assert_eq!(ctx.config(), ctx.model().config());
        assert!(ctx.generate("hello world").unwrap().ids.len() <= 3);
    }

    #[test]
    fn bundle_round_trip() {
        let dir = std::env::temp_dir().join(format!("rejoinder-pipeline-{}", std::process::id()));
        write_scripted_bundle(&dir).unwrap();

        let ctx = InferenceContext::load(&dir, &Device::Cpu).unwrap();
        assert_eq!(ctx.vocab().size(), 5);
        assert_eq!(ctx.config(), &scripted_config());
        assert_eq!(ctx.generate("world").unwrap().text, "hello");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_bundle_files() {
        let dir = std::env::temp_dir().join(format!("rejoinder-empty-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        assert!(matches!(
            InferenceContext::load(&dir, &Device::Cpu),
            Err(RejoinderError::IoError(_))
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn context_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InferenceContext>();
    }
}
