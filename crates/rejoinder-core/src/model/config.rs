//! Model configuration.

use crate::error::{RejoinderError, Result};
use serde::{Deserialize, Serialize};

/// Attention scoring policy, fixed when the model is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttentionKind {
    /// Raw dot product between decoder state and encoder output.
    #[default]
    Dot,
    /// Dot product after a learned linear map of the encoder output.
    General,
    /// Learned vector applied to `tanh(W [h; e] + b)`.
    Concat,
}

impl std::fmt::Display for AttentionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Dot => "dot",
            Self::General => "general",
            Self::Concat => "concat",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for AttentionKind {
    type Err = RejoinderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dot" => Ok(Self::Dot),
            "general" => Ok(Self::General),
            "concat" => Ok(Self::Concat),
            other => Err(RejoinderError::InvalidConfig(format!(
                "{:?} is not an appropriate attention method",
                other
            ))),
        }
    }
}

/// Configuration for the encoder/decoder pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Embedding and recurrence width.
    pub hidden_size: usize,
    /// Stacked bidirectional GRU layers in the encoder.
    pub encoder_layers: usize,
    /// Stacked GRU layers in the decoder.
    pub decoder_layers: usize,
    /// Dropout rate used in training; inference ignores it.
    pub dropout: f64,
    /// Attention scoring policy.
    pub attention: AttentionKind,
    /// Default cap on generated tokens.
    pub max_length: usize,
}

impl ModelConfig {
    /// Load from JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write as pretty-printed JSON.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Check ranges and layer compatibility.
    pub fn validate(&self) -> Result<()> {
        if self.hidden_size == 0 {
            return Err(RejoinderError::InvalidConfig("hidden_size must be positive".into()));
        }
        if self.encoder_layers == 0 || self.decoder_layers == 0 {
            return Err(RejoinderError::InvalidConfig("layer counts must be positive".into()));
        }
        // The decoder is seeded from the first slices of the encoder's
        // per-direction final states.
        if self.decoder_layers > 2 * self.encoder_layers {
            return Err(RejoinderError::InvalidConfig(format!(
                "decoder_layers ({}) exceeds the {} encoder final states",
                self.decoder_layers,
                2 * self.encoder_layers
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(RejoinderError::InvalidConfig(format!(
                "dropout {} outside [0, 1)",
                self.dropout
            )));
        }
        Ok(())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        // Small chatbot defaults
        Self {
            hidden_size: 50,
            encoder_layers: 1,
            decoder_layers: 1,
            dropout: 0.1,
            attention: AttentionKind::Dot,
            max_length: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ModelConfig::default();
        config.validate().unwrap();
        assert_eq!(config.hidden_size, 50);
        assert_eq!(config.attention, AttentionKind::Dot);
        assert_eq!(config.max_length, 10);
    }

    #[test]
    fn parse_partial_json() {
        let config: ModelConfig =
            serde_json::from_str(r#"{"hidden_size": 8, "attention": "concat"}"#).unwrap();
        assert_eq!(config.hidden_size, 8);
        assert_eq!(config.attention, AttentionKind::Concat);
        assert_eq!(config.encoder_layers, 1);
    }

    #[test]
    fn unknown_attention_rejected() {
        assert!(serde_json::from_str::<ModelConfig>(r#"{"attention": "cosine"}"#).is_err());
        assert!("cosine".parse::<AttentionKind>().is_err());
        assert_eq!("general".parse::<AttentionKind>().unwrap(), AttentionKind::General);
    }

    #[test]
    fn validate_rejects_bad_layers() {
        let config = ModelConfig {
            encoder_layers: 1,
            decoder_layers: 3,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RejoinderError::InvalidConfig(_))));

        let config = ModelConfig {
            hidden_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ModelConfig {
            dropout: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
