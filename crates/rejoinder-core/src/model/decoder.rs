//! Attentional GRU decoder.
//!
//! One call to [`Decoder::step`] consumes one token per sequence:
//!
//! 1. Embed the previous token
//! 2. Advance the stacked GRU one step
//! 3. Score the top layer's new state against the encoder outputs
//! 4. Context = attention-weighted sum of encoder outputs
//! 5. `tanh(W_c [h; context] + b_c)`
//! 6. Project to the vocabulary and softmax
//!
//! The returned state is the raw GRU state; the attention context only
//! shapes the current step's distribution.

use super::{Attention, AttentionKind, Embedding, GruCell, WeightLoader};
use crate::error::{RejoinderError, Result};
use candle_core::{Device, Tensor, D};

/// Decoder with Luong attention.
#[derive(Debug, Clone)]
pub struct Decoder {
    embedding: Embedding,
    layers: Vec<GruCell>,
    attention: Attention,
    /// Combine projection: [hidden_size, 2 * hidden_size]
    concat_weight: Tensor,
    /// [hidden_size]
    concat_bias: Tensor,
    /// Output projection: [vocab_size, hidden_size]
    out_weight: Tensor,
    /// [vocab_size]
    out_bias: Tensor,
    hidden_size: usize,
    vocab_size: usize,
}

impl Decoder {
    /// Create a decoder from its parts.
    pub fn new(
        embedding: Embedding,
        layers: Vec<GruCell>,
        attention: Attention,
        concat: (Tensor, Tensor),
        out: (Tensor, Tensor),
    ) -> Result<Self> {
        let hidden_size = embedding.hidden_size();
        let (vocab_size, out_in) = out.0.dims2()?;
        if concat.0.dims() != [hidden_size, 2 * hidden_size]
            || concat.1.dims() != [hidden_size]
            || out_in != hidden_size
            || out.1.dims() != [vocab_size]
        {
            return Err(RejoinderError::ShapeMismatch(format!(
                "concat {:?}+{:?} / out {:?}+{:?} do not fit hidden size {}",
                concat.0.dims(),
                concat.1.dims(),
                out.0.dims(),
                out.1.dims(),
                hidden_size
            )));
        }
        attention.check(hidden_size)?;
        Ok(Self {
            embedding,
            layers,
            attention,
            concat_weight: concat.0,
            concat_bias: concat.1,
            out_weight: out.0,
            out_bias: out.1,
            hidden_size,
            vocab_size,
        })
    }

    /// Create a decoder with random weights (for testing).
    pub fn random(
        embedding: Embedding,
        num_layers: usize,
        attention: AttentionKind,
        device: &Device,
    ) -> Result<Self> {
        let hidden = embedding.hidden_size();
        let vocab = embedding.vocab_size();
        let std = 1.0 / (hidden as f32).sqrt();
        let layers = (0..num_layers)
            .map(|_| GruCell::random(hidden, hidden, device))
            .collect::<Result<Vec<_>>>()?;
        let attention = Attention::random(attention, hidden, device)?;
        let concat = (
            Tensor::randn(0.0f32, std, &[hidden, 2 * hidden], device)?,
            Tensor::randn(0.0f32, std, &[hidden], device)?,
        );
        let out = (
            Tensor::randn(0.0f32, std, &[vocab, hidden], device)?,
            Tensor::randn(0.0f32, std, &[vocab], device)?,
        );
        Self::new(embedding, layers, attention, concat, out)
    }

    /// Load `decoder.*` tensors.
    pub fn load(
        loader: &WeightLoader,
        embedding: Embedding,
        num_layers: usize,
        attention: AttentionKind,
    ) -> Result<Self> {
        let hidden = embedding.hidden_size();
        let vocab = embedding.vocab_size();
        let layers = (0..num_layers)
            .map(|i| GruCell::load(loader, "decoder.gru", i, "", hidden, hidden))
            .collect::<Result<Vec<_>>>()?;
        let attention = Attention::load(loader, attention, hidden)?;
        let concat = (
            loader.tensor("decoder.concat.weight", &[hidden, 2 * hidden])?,
            loader.tensor("decoder.concat.bias", &[hidden])?,
        );
        let out = (
            loader.tensor("decoder.out.weight", &[vocab, hidden])?,
            loader.tensor("decoder.out.bias", &[vocab])?,
        );
        Self::new(embedding, layers, attention, concat, out)
    }

    /// Advance one step.
    ///
    /// # Arguments
    ///
    /// * `input` - Previous token per sequence [batch] (u32)
    /// * `hidden` - Previous state [num_layers, batch, hidden_size]
    /// * `encoder_outputs` - [max_len, batch, hidden_size]
    ///
    /// # Returns
    ///
    /// (probabilities [batch, vocab_size], new state [num_layers, batch, hidden_size])
    pub fn step(
        &self,
        input: &Tensor,
        hidden: &Tensor,
        encoder_outputs: &Tensor,
    ) -> Result<(Tensor, Tensor)> {
        let (layers, batch, width) = hidden.dims3()?;
        if layers != self.layers.len() || width != self.hidden_size || input.dims() != [batch] {
            return Err(RejoinderError::ShapeMismatch(format!(
                "decoder state {:?} / input {:?} for {} layers of width {}",
                hidden.dims(),
                input.dims(),
                self.layers.len(),
                self.hidden_size
            )));
        }

        let mut x = self.embedding.forward(input)?;
        let mut states = Vec::with_capacity(layers);
        for (i, cell) in self.layers.iter().enumerate() {
            x = cell.step(&x, &hidden.get(i)?)?;
            states.push(x.clone());
        }
        let new_hidden = Tensor::stack(&states, 0)?;

        // [batch, 1, max_len] @ [batch, max_len, hidden] -> [batch, hidden]
        let weights = self.attention.score(&x, encoder_outputs)?;
        let context = weights
            .unsqueeze(1)?
            .matmul(&encoder_outputs.transpose(0, 1)?.contiguous()?)?
            .squeeze(1)?;

        let joined = Tensor::cat(&[&x, &context], 1)?;
        let attended = joined
            .matmul(&self.concat_weight.t()?)?
            .broadcast_add(&self.concat_bias)?
            .tanh()?;
        let logits = attended
            .matmul(&self.out_weight.t()?)?
            .broadcast_add(&self.out_bias)?;
        let probs = candle_nn::ops::softmax(&logits, D::Minus1)?;

        Ok((probs, new_hidden))
    }

    /// Number of stacked GRU layers.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Get the hidden size.
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Output vocabulary size.
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// The attention scoring function.
    pub fn attention(&self) -> &Attention {
        &self.attention
    }
}
