//! Encoder/decoder pair sharing one embedding table.

use super::{Decoder, Embedding, Encoder, ModelConfig, WeightLoader};
use crate::error::Result;
use candle_core::Device;
use tracing::info;

/// The complete set of inference weights.
#[derive(Debug, Clone)]
pub struct Seq2Seq {
    config: ModelConfig,
    encoder: Encoder,
    decoder: Decoder,
}

impl Seq2Seq {
    /// Assemble from already built halves.
    pub fn new(config: ModelConfig, encoder: Encoder, decoder: Decoder) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            encoder,
            decoder,
        })
    }

    /// Create with random weights (for testing).
    pub fn random(config: ModelConfig, vocab_size: usize, device: &Device) -> Result<Self> {
        config.validate()?;
        let embedding = Embedding::random(vocab_size, config.hidden_size, device)?;
        let encoder = Encoder::random(embedding.clone(), config.encoder_layers, device)?;
        let decoder =
            Decoder::random(embedding, config.decoder_layers, config.attention, device)?;
        Self::new(config, encoder, decoder)
    }

    /// Build every layer from a loader, checking each tensor's shape.
    pub fn load(loader: &WeightLoader, config: ModelConfig, vocab_size: usize) -> Result<Self> {
        config.validate()?;
        let embedding = Embedding::load(loader, vocab_size, config.hidden_size)?;
        let encoder = Encoder::load(loader, embedding.clone(), config.encoder_layers)?;
        let decoder =
            Decoder::load(loader, embedding, config.decoder_layers, config.attention)?;

        info!(
            hidden_size = config.hidden_size,
            encoder_layers = config.encoder_layers,
            decoder_layers = config.decoder_layers,
            attention = %config.attention,
            vocab_size,
            "model weights loaded"
        );
        Self::new(config, encoder, decoder)
    }

    /// Model configuration.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// The encoder half.
    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// The decoder half.
    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Output vocabulary size.
    pub fn vocab_size(&self) -> usize {
        self.decoder.vocab_size()
    }

    /// Device the weights live on.
    pub fn device(&self) -> &Device {
        self.encoder.embedding().device()
    }
}
