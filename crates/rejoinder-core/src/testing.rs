//! Hand-scripted parameter bundles for tests, benchmarks and demos.
//!
//! The scripted model uses the vocabulary `{PAD, SOS, EOS, hello, world}`
//! and always answers `hello` followed by `EOS`, whatever the input:
//!
//! - the encoder is all zeros, so attention is uniform over a zero context
//! - the decoder's update gate is pinned shut (`z ≈ 0`), making its new
//!   state `tanh(3 * embedding)`; `SOS` embeds to `[1, 0]`, `hello` to `[0, 1]`
//! - the output projection maps the first axis to `hello` and the second
//!   to `EOS`
//!
//! [`write_scripted_bundle`] lays the same model out as an on-disk bundle
//! (`config.json`, `vocab.json`, `model.safetensors`).

use crate::error::Result;
use crate::model::{AttentionKind, ModelConfig, Seq2Seq, WeightLoader};
use crate::pipeline::{CONFIG_FILE, VOCAB_FILE};
use crate::vocab::{Vocabulary, VocabularyBuilder, EOS_TOKEN, SOS_TOKEN};
use candle_core::{DType, Device, Tensor};
use std::collections::HashMap;
use std::path::Path;

/// Width of the scripted model.
pub const SCRIPTED_HIDDEN: usize = 2;

/// Id of `hello` in [`scripted_vocab`].
pub const HELLO: u32 = 3;

/// Id of `world` in [`scripted_vocab`].
pub const WORLD: u32 = 4;

/// `{PAD, SOS, EOS, hello, world}`.
pub fn scripted_vocab() -> Vocabulary {
    let mut builder = VocabularyBuilder::new("scripted");
    builder.add_sentence("hello world");
    builder.build()
}

/// Configuration matching [`scripted_tensors`].
pub fn scripted_config() -> ModelConfig {
    ModelConfig {
        hidden_size: SCRIPTED_HIDDEN,
        encoder_layers: 1,
        decoder_layers: 1,
        dropout: 0.0,
        attention: AttentionKind::Dot,
        max_length: 10,
    }
}

/// Named tensors of the scripted bundle.
pub fn scripted_tensors(device: &Device) -> Result<HashMap<String, Tensor>> {
    let h = SCRIPTED_HIDDEN;
    let vocab = 5;
    let zeros = |shape: &[usize]| Tensor::zeros(shape, DType::F32, device);

    let mut embedding = vec![0.0f32; vocab * h];
    embedding[SOS_TOKEN as usize * h] = 1.0;
    embedding[HELLO as usize * h + 1] = 1.0;

    // Gate rows are stacked [r; z; n].
    let mut w_ih = vec![0.0f32; 3 * h * h];
    for i in 0..h {
        w_ih[(2 * h + i) * h + i] = 3.0;
    }
    let mut b_ih = vec![0.0f32; 3 * h];
    for b in b_ih.iter_mut().skip(h).take(h) {
        *b = -20.0;
    }

    let mut concat = vec![0.0f32; h * 2 * h];
    for i in 0..h {
        concat[i * 2 * h + i] = 1.0;
    }

    let mut out = vec![0.0f32; vocab * h];
    out[HELLO as usize * h] = 10.0;
    out[EOS_TOKEN as usize * h + 1] = 10.0;

    let mut tensors = HashMap::new();
    tensors.insert(
        "embedding.weight".to_string(),
        Tensor::from_vec(embedding, (vocab, h), device)?,
    );
    for suffix in ["", "_reverse"] {
        tensors.insert(format!("encoder.gru.weight_ih_l0{suffix}"), zeros(&[3 * h, h])?);
        tensors.insert(format!("encoder.gru.weight_hh_l0{suffix}"), zeros(&[3 * h, h])?);
        tensors.insert(format!("encoder.gru.bias_ih_l0{suffix}"), zeros(&[3 * h])?);
        tensors.insert(format!("encoder.gru.bias_hh_l0{suffix}"), zeros(&[3 * h])?);
    }
    tensors.insert(
        "decoder.gru.weight_ih_l0".to_string(),
        Tensor::from_vec(w_ih, (3 * h, h), device)?,
    );
    tensors.insert("decoder.gru.weight_hh_l0".to_string(), zeros(&[3 * h, h])?);
    tensors.insert(
        "decoder.gru.bias_ih_l0".to_string(),
        Tensor::from_vec(b_ih, 3 * h, device)?,
    );
    tensors.insert("decoder.gru.bias_hh_l0".to_string(), zeros(&[3 * h])?);
    tensors.insert(
        "decoder.concat.weight".to_string(),
        Tensor::from_vec(concat, (h, 2 * h), device)?,
    );
    tensors.insert("decoder.concat.bias".to_string(), zeros(&[h])?);
    tensors.insert(
        "decoder.out.weight".to_string(),
        Tensor::from_vec(out, (vocab, h), device)?,
    );
    tensors.insert("decoder.out.bias".to_string(), zeros(&[vocab])?);
    Ok(tensors)
}

/// The scripted model, built through the regular loader.
pub fn scripted_model(device: &Device) -> Result<Seq2Seq> {
    let loader = WeightLoader::from_tensors(scripted_tensors(device)?);
    Seq2Seq::load(&loader, scripted_config(), 5)
}

/// Write the scripted bundle into `dir`, creating it if needed.
pub fn write_scripted_bundle(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    scripted_config().save(&dir.join(CONFIG_FILE))?;
    scripted_vocab().save(dir.join(VOCAB_FILE))?;
    WeightLoader::from_tensors(scripted_tensors(&Device::Cpu)?)
        .save(&dir.join("model.safetensors"))
}
