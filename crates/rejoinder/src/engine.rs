//! High-level reply engine.

use anyhow::{bail, Context, Result};
use candle_core::Device;
use rejoinder_core::pipeline::{InferenceContext, Reply};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error};

/// Reply sent when the input contains a word the vocabulary lacks.
pub const DEFAULT_FALLBACK: &str = "i don't know what you mean";

/// Configuration for the chatbot.
#[derive(Debug, Clone)]
pub struct ChatbotConfig {
    /// Parameter bundle directory.
    pub bundle_dir: Option<PathBuf>,
    /// Cap on reply tokens; `None` uses the bundle's `max_length`.
    pub max_length: Option<usize>,
    /// Reply for inputs with unknown words.
    pub fallback: String,
}

impl Default for ChatbotConfig {
    fn default() -> Self {
        Self {
            bundle_dir: None,
            max_length: None,
            fallback: DEFAULT_FALLBACK.to_string(),
        }
    }
}

/// Builder for creating a [`Chatbot`].
pub struct ChatbotBuilder {
    config: ChatbotConfig,
    device: Device,
    context: Option<Arc<InferenceContext>>,
}

impl ChatbotBuilder {
    /// Create a new chatbot builder.
    pub fn new() -> Self {
        Self {
            config: ChatbotConfig::default(),
            device: Device::Cpu,
            context: None,
        }
    }

    /// Set the bundle directory to load.
    pub fn bundle_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.bundle_dir = Some(path.into());
        self
    }

    /// Set the device weights are loaded onto.
    pub fn device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Override the bundle's reply length cap.
    pub fn max_length(mut self, len: usize) -> Self {
        self.config.max_length = Some(len);
        self
    }

    /// Set the unknown-word reply.
    pub fn fallback(mut self, reply: impl Into<String>) -> Self {
        self.config.fallback = reply.into();
        self
    }

    /// Use an already loaded context instead of a bundle directory.
    pub fn context(mut self, context: Arc<InferenceContext>) -> Self {
        self.context = Some(context);
        self
    }

    /// Build the chatbot.
    pub fn build(self) -> Result<Chatbot> {
        let context = match (self.context, &self.config.bundle_dir) {
            (Some(context), _) => context,
            (None, Some(dir)) => Arc::new(
                InferenceContext::load(dir, &self.device)
                    .with_context(|| format!("failed to load bundle {}", dir.display()))?,
            ),
            (None, None) => bail!("chatbot needs a bundle directory or a loaded context"),
        };

        Ok(Chatbot {
            config: self.config,
            context,
        })
    }
}

impl Default for ChatbotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-turn chatbot.
///
/// Cheap to clone; clones share one [`InferenceContext`].
#[derive(Clone)]
pub struct Chatbot {
    config: ChatbotConfig,
    context: Arc<InferenceContext>,
}

impl Chatbot {
    /// Create a new chatbot builder.
    pub fn builder() -> ChatbotBuilder {
        ChatbotBuilder::new()
    }

    /// Get chatbot configuration.
    pub fn config(&self) -> &ChatbotConfig {
        &self.config
    }

    /// Get the shared inference context.
    pub fn context(&self) -> &Arc<InferenceContext> {
        &self.context
    }

    /// Effective reply length cap.
    pub fn max_length(&self) -> usize {
        self.config
            .max_length
            .unwrap_or(self.context.config().max_length)
    }

    /// Generate the full reply, ids and scores included.
    pub fn reply(&self, text: &str) -> rejoinder_core::Result<Reply> {
        self.context.generate_with_limit(text, self.max_length())
    }

    /// Answer one message.
    ///
    /// Unknown words produce the fallback reply. `None` means the model
    /// produced no words and nothing should be sent.
    pub fn respond(&self, text: &str) -> Result<Option<String>> {
        match self.reply(text) {
            Ok(reply) if reply.text.is_empty() => {
                debug!(tokens = reply.ids.len(), "empty reply");
                Ok(None)
            }
            Ok(reply) => Ok(Some(reply.text)),
            Err(e) if e.is_input_error() => {
                debug!(error = %e, "falling back");
                Ok(Some(self.config.fallback.clone()))
            }
            Err(e) => {
                error!(error = %e, "reply generation failed");
                Err(e.into())
            }
        }
    }
}

impl std::fmt::Debug for Chatbot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chatbot")
            .field("config", &self.config)
            .field("vocab", self.context.vocab())
            .finish()
    }
}
