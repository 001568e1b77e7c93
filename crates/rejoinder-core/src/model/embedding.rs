//! Token embedding table shared by the encoder and decoder.

use super::WeightLoader;
use crate::error::Result;
use candle_core::{Device, Tensor};

/// Lookup table: [vocab_size, hidden_size]
#[derive(Debug, Clone)]
pub struct Embedding {
    weight: Tensor,
    hidden_size: usize,
}

impl Embedding {
    /// Wrap an existing weight matrix.
    pub fn new(weight: Tensor) -> Result<Self> {
        let (_, hidden_size) = weight.dims2()?;
        Ok(Self {
            weight,
            hidden_size,
        })
    }

    /// Create with random weights (for testing).
    pub fn random(vocab_size: usize, hidden_size: usize, device: &Device) -> Result<Self> {
        Self::new(Tensor::randn(0.0f32, 1.0, &[vocab_size, hidden_size], device)?)
    }

    /// Load `embedding.weight`.
    pub fn load(loader: &WeightLoader, vocab_size: usize, hidden_size: usize) -> Result<Self> {
        Self::new(loader.tensor("embedding.weight", &[vocab_size, hidden_size])?)
    }

    /// Embed token ids of any shape; output gains a trailing `hidden_size` dim.
    pub fn forward(&self, ids: &Tensor) -> Result<Tensor> {
        let mut dims = ids.dims().to_vec();
        let flat = ids.flatten_all()?;
        let rows = self.weight.index_select(&flat, 0)?;
        dims.push(self.hidden_size);
        Ok(rows.reshape(dims)?)
    }

    /// Number of rows.
    pub fn vocab_size(&self) -> usize {
        self.weight.dims()[0]
    }

    /// Row width.
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Device holding the table.
    pub fn device(&self) -> &Device {
        self.weight.device()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_picks_rows() {
        let dev = Device::Cpu;
        let weight = Tensor::new(&[[0.0f32, 0.0], [1.0, 2.0], [3.0, 4.0]], &dev).unwrap();
        let emb = Embedding::new(weight).unwrap();
        let ids = Tensor::new(&[[2u32, 1], [1, 0]], &dev).unwrap();
        let out = emb.forward(&ids).unwrap();
        assert_eq!(out.dims(), &[2, 2, 2]);
        let vals: Vec<Vec<Vec<f32>>> = out.to_vec3().unwrap();
        assert_eq!(vals[0][0], vec![3.0, 4.0]);
        assert_eq!(vals[1][1], vec![0.0, 0.0]);
    }

    #[test]
    fn out_of_range_id_errors() {
        let emb = Embedding::random(3, 2, &Device::Cpu).unwrap();
        let ids = Tensor::new(&[7u32], &Device::Cpu).unwrap();
        assert!(emb.forward(&ids).is_err());
    }
}
