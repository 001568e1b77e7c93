//! Padded, sequence-major input batches.

use crate::error::{RejoinderError, Result};
use crate::vocab::PAD_TOKEN;
use candle_core::{Device, Tensor};

/// Token ids laid out `[max_len, batch_size]`, right-padded with
/// [`PAD_TOKEN`], plus the unpadded length of each column.
#[derive(Debug, Clone)]
pub struct Batch {
    ids: Tensor,
    lengths: Vec<usize>,
}

impl Batch {
    /// Pad and transpose token sequences into a batch.
    pub fn from_sequences(sequences: &[Vec<u32>], device: &Device) -> Result<Self> {
        if sequences.is_empty() {
            return Err(RejoinderError::ShapeMismatch("batch has no sequences".into()));
        }
        let lengths: Vec<usize> = sequences.iter().map(Vec::len).collect();
        let max_len = lengths.iter().copied().max().unwrap_or(0);
        if lengths.contains(&0) {
            return Err(RejoinderError::ShapeMismatch("batch contains an empty sequence".into()));
        }

        let batch_size = sequences.len();
        let mut data = vec![PAD_TOKEN; max_len * batch_size];
        for (b, seq) in sequences.iter().enumerate() {
            for (t, &id) in seq.iter().enumerate() {
                data[t * batch_size + b] = id;
            }
        }

        let ids = Tensor::from_vec(data, (max_len, batch_size), device)?;
        Ok(Self { ids, lengths })
    }

    /// A batch holding one sequence.
    pub fn single(sequence: &[u32], device: &Device) -> Result<Self> {
        Self::from_sequences(&[sequence.to_vec()], device)
    }

    /// Wrap an already padded `[max_len, batch_size]` id tensor.
    pub fn new(ids: Tensor, lengths: Vec<usize>) -> Result<Self> {
        let (max_len, batch_size) = ids.dims2()?;
        if lengths.len() != batch_size {
            return Err(RejoinderError::ShapeMismatch(format!(
                "{} lengths for batch of {}",
                lengths.len(),
                batch_size
            )));
        }
        if let Some(&bad) = lengths.iter().find(|&&l| l == 0 || l > max_len) {
            return Err(RejoinderError::ShapeMismatch(format!(
                "length {} outside 1..={}",
                bad, max_len
            )));
        }
        Ok(Self { ids, lengths })
    }

    /// Ids `[max_len, batch_size]`.
    pub fn ids(&self) -> &Tensor {
        &self.ids
    }

    /// True length of each sequence.
    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    /// Number of sequences.
    pub fn batch_size(&self) -> usize {
        self.lengths.len()
    }

    /// Padded length.
    pub fn max_len(&self) -> usize {
        self.ids.dims()[0]
    }

    /// Unpadded ids of sequence `index`, shape `[len]`.
    pub fn sequence(&self, index: usize) -> Result<Tensor> {
        let len = *self.lengths.get(index).ok_or_else(|| {
            RejoinderError::ShapeMismatch(format!(
                "sequence {} out of batch of {}",
                index,
                self.batch_size()
            ))
        })?;
        Ok(self.ids.narrow(0, 0, len)?.narrow(1, index, 1)?.squeeze(1)?.contiguous()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_sequence_major() {
        let batch = Batch::from_sequences(&[vec![3, 4, 2], vec![5, 2]], &Device::Cpu).unwrap();
        assert_eq!(batch.ids().dims(), &[3, 2]);
        assert_eq!(batch.lengths(), &[3, 2]);
        let ids: Vec<Vec<u32>> = batch.ids().to_vec2().unwrap();
        assert_eq!(ids, vec![vec![3, 5], vec![4, 2], vec![2, PAD_TOKEN]]);
        let second: Vec<u32> = batch.sequence(1).unwrap().to_vec1().unwrap();
        assert_eq!(second, vec![5, 2]);
    }

    #[test]
    fn rejects_empty() {
        assert!(Batch::from_sequences(&[], &Device::Cpu).is_err());
        assert!(Batch::from_sequences(&[vec![3], vec![]], &Device::Cpu).is_err());
    }

    #[test]
    fn new_checks_lengths() {
        let ids = Tensor::new(&[[3u32], [2]], &Device::Cpu).unwrap();
        assert!(Batch::new(ids.clone(), vec![2]).is_ok());
        assert!(Batch::new(ids.clone(), vec![3]).is_err());
        assert!(Batch::new(ids, vec![1, 1]).is_err());
    }
}
