//! Luong-style attention scoring.
//!
//! Given the decoder's current state `h` and encoder outputs `e_t`:
//!
//! | Variant | Energy |
//! |---------|--------|
//! | [`Attention::Dot`] | `h · e_t` |
//! | [`Attention::General`] | `h · (W e_t + b)` |
//! | [`Attention::Concat`] | `v · tanh(W [h; e_t] + b)` |
//!
//! Energies are softmaxed over time steps. Padded steps are not masked.

use super::{AttentionKind, WeightLoader};
use crate::error::{RejoinderError, Result};
use candle_core::{Device, Tensor, D};

/// Attention scoring function, resolved once at load time.
#[derive(Debug, Clone)]
pub enum Attention {
    /// Raw dot product.
    Dot,
    /// Dot product against a linear map of the encoder outputs.
    General {
        /// [hidden_size, hidden_size]
        weight: Tensor,
        /// [hidden_size]
        bias: Tensor,
    },
    /// Additive scoring over the concatenated states.
    Concat {
        /// [hidden_size, 2 * hidden_size]
        weight: Tensor,
        /// [hidden_size]
        bias: Tensor,
        /// [hidden_size]
        v: Tensor,
    },
}

impl Attention {
    /// Bilinear scoring; `weight` must be square with a matching `bias`.
    pub fn general(weight: Tensor, bias: Tensor) -> Result<Self> {
        let hidden_size = weight.dims().first().copied().unwrap_or(0);
        let attention = Self::General { weight, bias };
        attention.check(hidden_size)?;
        Ok(attention)
    }

    /// Additive scoring; `weight` is [hidden_size, 2 * hidden_size].
    pub fn concat(weight: Tensor, bias: Tensor, v: Tensor) -> Result<Self> {
        let hidden_size = weight.dims().first().copied().unwrap_or(0);
        let attention = Self::Concat { weight, bias, v };
        attention.check(hidden_size)?;
        Ok(attention)
    }

    /// Create the scoring function with random weights (for testing).
    pub fn random(kind: AttentionKind, hidden_size: usize, device: &Device) -> Result<Self> {
        let std = 1.0 / (hidden_size as f32).sqrt();
        match kind {
            AttentionKind::Dot => Ok(Self::Dot),
            AttentionKind::General => Self::general(
                Tensor::randn(0.0f32, std, &[hidden_size, hidden_size], device)?,
                Tensor::randn(0.0f32, std, &[hidden_size], device)?,
            ),
            AttentionKind::Concat => Self::concat(
                Tensor::randn(0.0f32, std, &[hidden_size, 2 * hidden_size], device)?,
                Tensor::randn(0.0f32, std, &[hidden_size], device)?,
                Tensor::randn(0.0f32, 1.0, &[hidden_size], device)?,
            ),
        }
    }

    /// Load `decoder.attn.*` tensors for the given variant.
    pub fn load(loader: &WeightLoader, kind: AttentionKind, hidden_size: usize) -> Result<Self> {
        match kind {
            AttentionKind::Dot => Ok(Self::Dot),
            AttentionKind::General => Self::general(
                loader.tensor("decoder.attn.weight", &[hidden_size, hidden_size])?,
                loader.tensor("decoder.attn.bias", &[hidden_size])?,
            ),
            AttentionKind::Concat => Self::concat(
                loader.tensor("decoder.attn.weight", &[hidden_size, 2 * hidden_size])?,
                loader.tensor("decoder.attn.bias", &[hidden_size])?,
                loader.tensor("decoder.attn.v", &[hidden_size])?,
            ),
        }
    }

    /// Verify every parameter fits decoder states of width `hidden_size`.
    pub fn check(&self, hidden_size: usize) -> Result<()> {
        let expected: Vec<(&str, &Tensor, Vec<usize>)> = match self {
            Self::Dot => return Ok(()),
            Self::General { weight, bias } => vec![
                ("weight", weight, vec![hidden_size, hidden_size]),
                ("bias", bias, vec![hidden_size]),
            ],
            Self::Concat { weight, bias, v } => vec![
                ("weight", weight, vec![hidden_size, 2 * hidden_size]),
                ("bias", bias, vec![hidden_size]),
                ("v", v, vec![hidden_size]),
            ],
        };
        for (name, tensor, shape) in expected {
            if tensor.dims() != shape.as_slice() {
                return Err(RejoinderError::ShapeMismatch(format!(
                    "{} attention {}: expected {:?}, got {:?}",
                    self.kind(),
                    name,
                    shape,
                    tensor.dims()
                )));
            }
        }
        Ok(())
    }

    /// Which variant this is.
    pub fn kind(&self) -> AttentionKind {
        match self {
            Self::Dot => AttentionKind::Dot,
            Self::General { .. } => AttentionKind::General,
            Self::Concat { .. } => AttentionKind::Concat,
        }
    }

    /// Attention weights over encoder steps.
    ///
    /// # Arguments
    ///
    /// * `hidden` - Decoder state [batch, hidden_size]
    /// * `encoder_outputs` - [max_len, batch, hidden_size]
    ///
    /// # Returns
    ///
    /// Weights [batch, max_len]; each row is non-negative and sums to 1.
    pub fn score(&self, hidden: &Tensor, encoder_outputs: &Tensor) -> Result<Tensor> {
        let (max_len, batch, width) = encoder_outputs.dims3()?;
        if hidden.dims() != [batch, width] {
            return Err(RejoinderError::ShapeMismatch(format!(
                "decoder state {:?} does not match encoder outputs {:?}",
                hidden.dims(),
                encoder_outputs.dims()
            )));
        }
        self.check(width)?;

        let query = hidden.unsqueeze(0)?;
        // energies: [max_len, batch]
        let energies = match self {
            Self::Dot => encoder_outputs.broadcast_mul(&query)?.sum(D::Minus1)?,
            Self::General { weight, bias } => {
                let flat = encoder_outputs.reshape((max_len * batch, width))?;
                let projected = flat
                    .matmul(&weight.t()?)?
                    .broadcast_add(bias)?
                    .reshape((max_len, batch, width))?;
                projected.broadcast_mul(&query)?.sum(D::Minus1)?
            }
            Self::Concat { weight, bias, v } => {
                let expanded = query.broadcast_as((max_len, batch, width))?.contiguous()?;
                let joined = Tensor::cat(&[&expanded, encoder_outputs], 2)?
                    .reshape((max_len * batch, 2 * width))?;
                let energy = joined
                    .matmul(&weight.t()?)?
                    .broadcast_add(bias)?
                    .tanh()?
                    .reshape((max_len, batch, width))?;
                energy.broadcast_mul(v)?.sum(D::Minus1)?
            }
        };

        let weights = candle_nn::ops::softmax(&energies.t()?.contiguous()?, D::Minus1)?;
        Ok(weights)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    prop_compose! {
        fn arb_states()(max_len in 1usize..8, batch in 1usize..4, width in 1usize..8)(
            outputs in prop::collection::vec(-20.0f32..20.0, max_len * batch * width),
            hidden in prop::collection::vec(-20.0f32..20.0, batch * width),
            max_len in Just(max_len),
            batch in Just(batch),
            width in Just(width),
        ) -> (Tensor, Tensor) {
            let dev = Device::Cpu;
            (
                Tensor::from_vec(hidden, (batch, width), &dev).unwrap(),
                Tensor::from_vec(outputs, (max_len, batch, width), &dev).unwrap(),
            )
        }
    }

    fn arb_kind() -> impl Strategy<Value = AttentionKind> {
        prop::sample::select(vec![
            AttentionKind::Dot,
            AttentionKind::General,
            AttentionKind::Concat,
        ])
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        /// Invariant: each row of weights is non-negative and sums to 1
        #[test]
        fn invariant_weights_normalized(
            (hidden, outputs) in arb_states(),
            kind in arb_kind(),
        ) {
            let (max_len, batch, width) = outputs.dims3().unwrap();
            let attn = Attention::random(kind, width, &Device::Cpu).unwrap();
            let weights = attn.score(&hidden, &outputs).unwrap();
            prop_assert_eq!(weights.dims(), &[batch, max_len]);

            let rows: Vec<Vec<f32>> = weights.to_vec2().unwrap();
            for row in rows {
                prop_assert!(row.iter().all(|w| w.is_finite() && *w >= 0.0));
                let sum: f32 = row.iter().sum();
                prop_assert!((sum - 1.0).abs() < 1e-4, "weights sum to {}", sum);
            }
        }
    }
}
