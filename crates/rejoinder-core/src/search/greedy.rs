//! Greedy decoding.
//!
//! # Algorithm
//!
//! 1. `Start`: encode the input once; seed the decoder with the first
//!    `decoder_layers` encoder final states and the `SOS` token
//! 2. `Decoding`: step the decoder, commit to the most probable token
//!    (lowest id on ties) and record its probability
//! 3. `Done`: reached once `EOS` is emitted or `max_length` tokens exist
//!
//! Every `Decoding` transition adds exactly one token, so the loop ends
//! after at most `max_length` decoder steps whatever the weights.

use crate::error::{RejoinderError, Result};
use crate::model::{Batch, Seq2Seq};
use crate::vocab::{EOS_TOKEN, SOS_TOKEN};
use candle_core::Tensor;
use tracing::debug;

/// Tokens chosen by a search, with the probability of each choice.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// Selected ids, including a trailing `EOS` if one was produced.
    pub tokens: Vec<u32>,
    /// Probability of each selected id at its step.
    pub scores: Vec<f32>,
}

impl Generation {
    /// Whether generation stopped on `EOS` rather than the length cap.
    pub fn is_finished(&self) -> bool {
        self.tokens.last() == Some(&EOS_TOKEN)
    }

    /// Number of decoder steps taken.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no step was taken.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Search state between decoder steps.
enum DecodeState {
    /// Nothing encoded yet.
    Start,
    /// Waiting to feed `token` with `hidden` to the decoder.
    Decoding {
        token: u32,
        hidden: Tensor,
        encoder_outputs: Tensor,
    },
    /// Terminal.
    Done,
}

/// Greedy search over a [`Seq2Seq`] model.
#[derive(Debug, Clone, Copy)]
pub struct GreedySearch<'a> {
    model: &'a Seq2Seq,
}

impl<'a> GreedySearch<'a> {
    /// Create a searcher borrowing the model.
    pub fn new(model: &'a Seq2Seq) -> Self {
        Self { model }
    }

    /// Decode a reply for a batch holding exactly one sequence.
    pub fn generate(&self, batch: &Batch, max_length: usize) -> Result<Generation> {
        if batch.batch_size() != 1 {
            return Err(RejoinderError::ShapeMismatch(format!(
                "greedy search decodes one sequence, got a batch of {}",
                batch.batch_size()
            )));
        }
        let device = batch.ids().device();
        let decoder = self.model.decoder();

        let mut generation = Generation {
            tokens: Vec::with_capacity(max_length),
            scores: Vec::with_capacity(max_length),
        };
        let mut state = DecodeState::Start;

        loop {
            state = match state {
                DecodeState::Start => {
                    if max_length == 0 {
                        DecodeState::Done
                    } else {
                        let encoded = self.model.encoder().encode(batch)?;
                        let hidden = encoded.hidden.narrow(0, 0, decoder.num_layers())?;
                        DecodeState::Decoding {
                            token: SOS_TOKEN,
                            hidden,
                            encoder_outputs: encoded.outputs,
                        }
                    }
                }
                DecodeState::Decoding {
                    token,
                    hidden,
                    encoder_outputs,
                } => {
                    let input = Tensor::new(&[token], device)?;
                    let (probs, hidden) = decoder.step(&input, &hidden, &encoder_outputs)?;
                    let row: Vec<f32> = probs.squeeze(0)?.to_vec1()?;
                    let (next, score) = argmax(&row);

                    generation.tokens.push(next);
                    generation.scores.push(score);

                    if next == EOS_TOKEN || generation.tokens.len() == max_length {
                        DecodeState::Done
                    } else {
                        DecodeState::Decoding {
                            token: next,
                            hidden,
                            encoder_outputs,
                        }
                    }
                }
                DecodeState::Done => break,
            };
        }

        debug!(
            steps = generation.len(),
            finished = generation.is_finished(),
            "greedy search done"
        );
        Ok(generation)
    }
}

/// Index and value of the largest entry; the first one wins ties.
fn argmax(values: &[f32]) -> (u32, f32) {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    (best as u32, best_value)
}
