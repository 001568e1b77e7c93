//! Gated recurrent unit cell.
//!
//! # Formula
//!
//! ```text
//! r  = sigmoid(W_ir x + b_ir + W_hr h + b_hr)
//! z  = sigmoid(W_iz x + b_iz + W_hz h + b_hz)
//! n  = tanh(W_in x + b_in + r * (W_hn h + b_hn))
//! h' = (1 - z) * n + z * h
//! ```
//!
//! Gate weights are stacked `[r; z; n]` along the first dimension, the
//! layout training checkpoints use.

use super::WeightLoader;
use crate::error::{RejoinderError, Result};
use candle_core::{Device, Tensor, D};
use candle_nn::ops::sigmoid;

/// One GRU cell (a single layer, single direction).
#[derive(Debug, Clone)]
pub struct GruCell {
    /// Input weights: [3 * hidden_size, input_size]
    w_ih: Tensor,
    /// Recurrent weights: [3 * hidden_size, hidden_size]
    w_hh: Tensor,
    /// Input bias: [3 * hidden_size]
    b_ih: Tensor,
    /// Recurrent bias: [3 * hidden_size]
    b_hh: Tensor,
    /// Input dimension.
    input_size: usize,
    /// Hidden dimension.
    hidden_size: usize,
}

impl GruCell {
    /// Create a GRU cell with provided weights.
    pub fn new(w_ih: Tensor, w_hh: Tensor, b_ih: Tensor, b_hh: Tensor) -> Result<Self> {
        let (gates, input_size) = w_ih.dims2()?;
        if gates % 3 != 0 {
            return Err(RejoinderError::ShapeMismatch(format!(
                "GRU gate dimension {} is not a multiple of 3",
                gates
            )));
        }
        let hidden_size = gates / 3;
        for (name, t, expected) in [
            ("w_hh", &w_hh, vec![gates, hidden_size]),
            ("b_ih", &b_ih, vec![gates]),
            ("b_hh", &b_hh, vec![gates]),
        ] {
            if t.dims() != expected.as_slice() {
                return Err(RejoinderError::ShapeMismatch(format!(
                    "{}: expected {:?}, got {:?}",
                    name,
                    expected,
                    t.dims()
                )));
            }
        }

        Ok(Self {
            w_ih,
            w_hh,
            b_ih,
            b_hh,
            input_size,
            hidden_size,
        })
    }

    /// Create a GRU cell with random weights (for testing).
    pub fn random(input_size: usize, hidden_size: usize, device: &Device) -> Result<Self> {
        let std = 1.0 / (hidden_size as f64).sqrt();
        let gates = 3 * hidden_size;
        Self::new(
            Tensor::randn(0.0f32, std as f32, &[gates, input_size], device)?,
            Tensor::randn(0.0f32, std as f32, &[gates, hidden_size], device)?,
            Tensor::randn(0.0f32, std as f32, &[gates], device)?,
            Tensor::randn(0.0f32, std as f32, &[gates], device)?,
        )
    }

    /// Load `{prefix}.weight_ih_l{layer}{suffix}` and siblings.
    pub fn load(
        loader: &WeightLoader,
        prefix: &str,
        layer: usize,
        suffix: &str,
        input_size: usize,
        hidden_size: usize,
    ) -> Result<Self> {
        let gates = 3 * hidden_size;
        let name = |kind: &str| format!("{}.{}_l{}{}", prefix, kind, layer, suffix);
        Self::new(
            loader.tensor(&name("weight_ih"), &[gates, input_size])?,
            loader.tensor(&name("weight_hh"), &[gates, hidden_size])?,
            loader.tensor(&name("bias_ih"), &[gates])?,
            loader.tensor(&name("bias_hh"), &[gates])?,
        )
    }

    /// Advance one time step.
    ///
    /// # Arguments
    ///
    /// * `x` - Input [batch, input_size]
    /// * `h` - Previous state [batch, hidden_size]
    ///
    /// Returns the new state [batch, hidden_size].
    pub fn step(&self, x: &Tensor, h: &Tensor) -> Result<Tensor> {
        let gi = x.matmul(&self.w_ih.t()?)?.broadcast_add(&self.b_ih)?;
        let gh = h.matmul(&self.w_hh.t()?)?.broadcast_add(&self.b_hh)?;

        let gi = gi.chunk(3, D::Minus1)?;
        let gh = gh.chunk(3, D::Minus1)?;

        let r = sigmoid(&(&gi[0] + &gh[0])?)?;
        let z = sigmoid(&(&gi[1] + &gh[1])?)?;
        let n = (&gi[2] + (r * &gh[2])?)?.tanh()?;

        // h' = n + z * (h - n)
        let h_new = (&n + (z * (h - &n)?)?)?;
        Ok(h_new)
    }

    /// Get the input size.
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Get the hidden size.
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;

    #[test]
    fn step_shape() {
        let cell = GruCell::random(6, 4, &Device::Cpu).unwrap();
        let x = Tensor::randn(0.0f32, 1.0, &[2, 6], &Device::Cpu).unwrap();
        let h = Tensor::zeros((2, 4), DType::F32, &Device::Cpu).unwrap();
        let out = cell.step(&x, &h).unwrap();
        assert_eq!(out.dims(), &[2, 4]);
        assert_eq!(cell.input_size(), 6);
        assert_eq!(cell.hidden_size(), 4);
    }

    #[test]
    fn zero_weights_halve_state() {
        // All gates see 0 => z = 0.5, n = 0, so h' = 0.5 * h.
        let dev = Device::Cpu;
        let cell = GruCell::new(
            Tensor::zeros((6, 3), DType::F32, &dev).unwrap(),
            Tensor::zeros((6, 2), DType::F32, &dev).unwrap(),
            Tensor::zeros(6, DType::F32, &dev).unwrap(),
            Tensor::zeros(6, DType::F32, &dev).unwrap(),
        )
        .unwrap();
        let x = Tensor::ones((1, 3), DType::F32, &dev).unwrap();
        let h = Tensor::new(&[[2.0f32, -4.0]], &dev).unwrap();
        let out: Vec<Vec<f32>> = cell.step(&x, &h).unwrap().to_vec2().unwrap();
        assert!((out[0][0] - 1.0).abs() < 1e-6);
        assert!((out[0][1] + 2.0).abs() < 1e-6);
    }

    #[test]
    fn state_stays_bounded() {
        // Starting inside [-1, 1] the update is a convex mix of tanh and h.
        let cell = GruCell::random(4, 8, &Device::Cpu).unwrap();
        let mut h = Tensor::zeros((1, 8), DType::F32, &Device::Cpu).unwrap();
        for _ in 0..20 {
            let x = Tensor::randn(0.0f32, 3.0, &[1, 4], &Device::Cpu).unwrap();
            h = cell.step(&x, &h).unwrap();
        }
        let vals: Vec<f32> = h.flatten_all().unwrap().to_vec1().unwrap();
        assert!(vals.iter().all(|v| v.abs() <= 1.0 + 1e-6));
    }

    #[test]
    fn bad_shapes_rejected() {
        let dev = Device::Cpu;
        let result = GruCell::new(
            Tensor::zeros((6, 3), DType::F32, &dev).unwrap(),
            Tensor::zeros((6, 3), DType::F32, &dev).unwrap(),
            Tensor::zeros(6, DType::F32, &dev).unwrap(),
            Tensor::zeros(6, DType::F32, &dev).unwrap(),
        );
        assert!(matches!(result, Err(RejoinderError::ShapeMismatch(_))));
    }
}
