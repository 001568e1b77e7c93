//! Model loading and inference.
//!
//! Provides the recurrent sequence-to-sequence model:
//! - Model configuration
//! - Weight loading
//! - Bidirectional GRU encoder
//! - Attention scoring and attentional GRU decoder

mod attention;
mod batch;
mod config;
mod decoder;
mod embedding;
mod encoder;
mod gru;
mod loader;
mod seq2seq;

pub use attention::Attention;
pub use batch::Batch;
pub use config::{AttentionKind, ModelConfig};
pub use decoder::Decoder;
pub use embedding::Embedding;
pub use encoder::{BiGruLayer, Encoder, EncoderOutput};
pub use gru::GruCell;
pub use loader::WeightLoader;
pub use seq2seq::Seq2Seq;
