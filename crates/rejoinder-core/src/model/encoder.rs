//! Bidirectional GRU encoder.
//!
//! Each layer runs a forward and a backward [`GruCell`] over the valid
//! prefix of every sequence. Deeper layers read both directions
//! concatenated; the top layer's two directions are summed into one
//! `hidden_size` vector per step.
//!
//! Sequences are processed column by column up to their true length, so
//! padding never reaches the recurrence. Padded steps read as zeros.

use super::{Batch, Embedding, GruCell, WeightLoader};
use crate::error::Result;
use candle_core::{DType, Device, Tensor};

/// Result of encoding a batch.
#[derive(Debug, Clone)]
pub struct EncoderOutput {
    /// Per-step outputs: [max_len, batch, hidden_size]
    pub outputs: Tensor,
    /// Final states `[l0 fwd, l0 bwd, l1 fwd, ...]`: [2 * layers, batch, hidden_size]
    pub hidden: Tensor,
}

/// One encoder layer: forward and backward cells.
#[derive(Debug, Clone)]
pub struct BiGruLayer {
    forward: GruCell,
    backward: GruCell,
}

impl BiGruLayer {
    /// Pair two cells.
    pub fn new(forward: GruCell, backward: GruCell) -> Self {
        Self { forward, backward }
    }
}

/// Sequence encoder.
#[derive(Debug, Clone)]
pub struct Encoder {
    embedding: Embedding,
    layers: Vec<BiGruLayer>,
    hidden_size: usize,
}

impl Encoder {
    /// Create an encoder from an embedding and its layers.
    pub fn new(embedding: Embedding, layers: Vec<BiGruLayer>) -> Self {
        let hidden_size = embedding.hidden_size();
        Self {
            embedding,
            layers,
            hidden_size,
        }
    }

    /// Create an encoder with random weights (for testing).
    pub fn random(embedding: Embedding, num_layers: usize, device: &Device) -> Result<Self> {
        let hidden = embedding.hidden_size();
        let layers = (0..num_layers)
            .map(|i| {
                let input = if i == 0 { hidden } else { 2 * hidden };
                Ok(BiGruLayer::new(
                    GruCell::random(input, hidden, device)?,
                    GruCell::random(input, hidden, device)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(embedding, layers))
    }

    /// Load `encoder.gru.*` tensors.
    pub fn load(loader: &WeightLoader, embedding: Embedding, num_layers: usize) -> Result<Self> {
        let hidden = embedding.hidden_size();
        let layers = (0..num_layers)
            .map(|i| {
                let input = if i == 0 { hidden } else { 2 * hidden };
                Ok(BiGruLayer::new(
                    GruCell::load(loader, "encoder.gru", i, "", input, hidden)?,
                    GruCell::load(loader, "encoder.gru", i, "_reverse", input, hidden)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(embedding, layers))
    }

    /// Encode a padded batch.
    pub fn encode(&self, batch: &Batch) -> Result<EncoderOutput> {
        let max_len = batch.max_len();
        let device = batch.ids().device();

        let mut outputs = Vec::with_capacity(batch.batch_size());
        let mut finals = Vec::with_capacity(batch.batch_size());
        for (index, &len) in batch.lengths().iter().enumerate() {
            let ids = batch.sequence(index)?;
            let (steps, hidden) = self.encode_sequence(&ids)?;

            let steps = if len < max_len {
                let pad = Tensor::zeros((max_len - len, self.hidden_size), DType::F32, device)?;
                Tensor::cat(&[&steps, &pad], 0)?
            } else {
                steps
            };
            outputs.push(steps);
            finals.push(hidden);
        }

        Ok(EncoderOutput {
            outputs: Tensor::stack(&outputs, 1)?,
            hidden: Tensor::stack(&finals, 1)?,
        })
    }

    /// Encode one unpadded sequence `[len]`.
    ///
    /// Returns outputs [len, hidden_size] and final states [2 * layers, hidden_size].
    fn encode_sequence(&self, ids: &Tensor) -> Result<(Tensor, Tensor)> {
        let mut input = self.embedding.forward(ids)?;
        let mut finals = Vec::with_capacity(2 * self.layers.len());
        let mut output = None;

        for (i, layer) in self.layers.iter().enumerate() {
            let (fwd, fwd_final) = self.run(&layer.forward, &input, false)?;
            let (bwd, bwd_final) = self.run(&layer.backward, &input, true)?;
            finals.push(fwd_final);
            finals.push(bwd_final);

            if i + 1 == self.layers.len() {
                output = Some((fwd + bwd)?);
            } else {
                input = Tensor::cat(&[&fwd, &bwd], 1)?;
            }
        }

        // No layers degenerates to the embeddings themselves.
        let output = match output {
            Some(output) => output,
            None => input,
        };
        let finals = if finals.is_empty() {
            Tensor::zeros((0, self.hidden_size), DType::F32, ids.device())?
        } else {
            Tensor::cat(&finals, 0)?
        };
        Ok((output, finals))
    }

    /// Run one direction over `[len, in]`, returning steps [len, hidden] and the final state [1, hidden].
    fn run(&self, cell: &GruCell, input: &Tensor, reverse: bool) -> Result<(Tensor, Tensor)> {
        let len = input.dims()[0];
        let mut h = Tensor::zeros((1, self.hidden_size), DType::F32, input.device())?;
        let mut steps = Vec::with_capacity(len);

        for k in 0..len {
            let t = if reverse { len - 1 - k } else { k };
            let x = input.narrow(0, t, 1)?;
            h = cell.step(&x, &h)?;
            steps.push(h.clone());
        }
        if reverse {
            steps.reverse();
        }

        Ok((Tensor::cat(&steps, 0)?, h))
    }

    /// Number of bidirectional layers.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Get the hidden size.
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// The shared embedding table.
    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn max_abs_diff(a: &Tensor, b: &Tensor) -> f32 {
        (a - b)
            .unwrap()
            .abs()
            .unwrap()
            .flatten_all()
            .unwrap()
            .max(0)
            .unwrap()
            .to_scalar()
            .unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Invariant: a sequence encodes the same alone or padded in a batch
        #[test]
        fn invariant_padding_invariance(
            a in prop::collection::vec(3u32..10, 1..6),
            b in prop::collection::vec(3u32..10, 1..8),
            layers in 1usize..3,
        ) {
            let dev = Device::Cpu;
            let embedding = Embedding::random(10, 6, &dev).unwrap();
            let enc = Encoder::random(embedding, layers, &dev).unwrap();

            let alone = enc.encode(&Batch::single(&a, &dev).unwrap()).unwrap();
            let batched = enc
                .encode(&Batch::from_sequences(&[a.clone(), b], &dev).unwrap())
                .unwrap();

            let batched_steps = batched
                .outputs
                .narrow(0, 0, a.len())
                .unwrap()
                .narrow(1, 0, 1)
                .unwrap();
            prop_assert!(max_abs_diff(&alone.outputs, &batched_steps) < 1e-5);

            let batched_hidden = batched.hidden.narrow(1, 0, 1).unwrap();
            prop_assert!(max_abs_diff(&alone.hidden, &batched_hidden) < 1e-5);
        }
    }
}
