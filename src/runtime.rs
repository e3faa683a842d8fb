//! The seam between the conversation layer and the model backend.
//!
//! Everything hardware- and model-specific (weights, tokenizer internals,
//! device placement) lives behind [`ModelRuntime`]; the session only ever
//! sees strings and token ids.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::conversation::Message;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("chat template failed: {0}")]
    Template(String),

    #[error("tokenization failed: {0}")]
    Tokenize(String),

    #[error("generation failed: {0}")]
    Generate(String),

    #[error("decoding failed: {0}")]
    Decode(String),
}

/// Generation options handed to the runtime on every call.
///
/// Known options are typed; anything else goes through `extra` to the
/// runtime unvalidated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub do_sample: bool,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: Option<u32>,
    pub max_new_tokens: usize,
    pub repetition_penalty: Option<f32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            do_sample: true,
            temperature: 0.7,
            top_p: 0.95,
            top_k: None,
            max_new_tokens: 256,
            repetition_penalty: None,
            extra: BTreeMap::new(),
        }
    }
}

impl GenerationConfig {
    /// Copy of `self` with every option present in `overrides` replaced.
    pub fn merged(&self, overrides: &GenerationOverrides) -> GenerationConfig {
        let mut config = self.clone();
        if let Some(v) = overrides.do_sample {
            config.do_sample = v;
        }
        if let Some(v) = overrides.temperature {
            config.temperature = v;
        }
        if let Some(v) = overrides.top_p {
            config.top_p = v;
        }
        if let Some(v) = overrides.top_k {
            config.top_k = Some(v);
        }
        if let Some(v) = overrides.max_new_tokens {
            config.max_new_tokens = v;
        }
        if let Some(v) = overrides.repetition_penalty {
            config.repetition_penalty = Some(v);
        }
        for (key, value) in &overrides.extra {
            config.extra.insert(key.clone(), value.clone());
        }
        config
    }
}

/// Per-call overrides for [`GenerationConfig`]; absent fields keep the
/// session defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOverrides {
    pub do_sample: Option<bool>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub max_new_tokens: Option<usize>,
    pub repetition_penalty: Option<f32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A loaded tokenizer/model pair.
///
/// Implementations are constructed once and owned by the session for its
/// lifetime. All methods are synchronous; failures propagate to the caller
/// as [`RuntimeError`] with no retry.
pub trait ModelRuntime {
    /// Renders a message list into a single prompt string using the
    /// model's chat template. `add_generation_prompt` appends the opening
    /// of an assistant turn; `enable_thinking` is a hint that runtimes
    /// without thinking support silently ignore.
    fn apply_chat_template(
        &self,
        messages: &[Message],
        add_generation_prompt: bool,
        enable_thinking: bool,
    ) -> Result<String, RuntimeError>;

    /// Tokenizes a prompt string. Special tokens are not re-added; the
    /// chat template already placed them.
    fn encode(&self, prompt: &str) -> Result<Vec<u32>, RuntimeError>;

    /// Runs generation. The returned sequence begins with the echoed
    /// `prompt_ids`, followed by the newly generated tokens.
    fn generate(
        &self,
        prompt_ids: &[u32],
        config: &GenerationConfig,
    ) -> Result<Vec<u32>, RuntimeError>;

    /// Decodes token ids back into text.
    fn decode(&self, token_ids: &[u32], skip_special_tokens: bool) -> Result<String, RuntimeError>;

    /// Whether the model's chat template understands thinking mode.
    fn supports_thinking(&self) -> bool {
        false
    }
}

/// Deterministic in-process runtime for tests and offline demo runs.
///
/// Encodes prompts as raw bytes, echoes the prompt ids, and appends a
/// canned reply (optionally wrapped in `<think>` tags), so the whole
/// template/encode/generate/decode round trip behaves like a real backend
/// without loading a model.
#[derive(Debug, Clone)]
pub struct MockRuntime {
    reply: String,
    thinking: Option<String>,
    thinking_supported: bool,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self {
            reply: "This is a canned reply; the mock runtime has no real model loaded.".to_string(),
            thinking: Some("The user spoke. I will answer with the canned reply.".to_string()),
            thinking_supported: true,
        }
    }
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = reply.into();
        self
    }

    pub fn with_thinking(mut self, thinking: impl Into<String>) -> Self {
        self.thinking = Some(thinking.into());
        self
    }

    pub fn without_thinking(mut self) -> Self {
        self.thinking = None;
        self
    }

    pub fn without_thinking_support(mut self) -> Self {
        self.thinking_supported = false;
        self
    }

    fn canned_output(&self) -> String {
        match &self.thinking {
            Some(thinking) => format!("<think>{}</think>{}", thinking, self.reply),
            None => self.reply.clone(),
        }
    }
}

impl ModelRuntime for MockRuntime {
    fn apply_chat_template(
        &self,
        messages: &[Message],
        add_generation_prompt: bool,
        _enable_thinking: bool,
    ) -> Result<String, RuntimeError> {
        if messages.is_empty() {
            return Err(RuntimeError::Template("empty message list".to_string()));
        }
        let mut prompt = String::new();
        for message in messages {
            prompt.push_str(&format!("<|{}|>{}\n", message.role, message.content));
        }
        if add_generation_prompt {
            prompt.push_str("<|assistant|>");
        }
        Ok(prompt)
    }

    fn encode(&self, prompt: &str) -> Result<Vec<u32>, RuntimeError> {
        Ok(prompt.bytes().map(u32::from).collect())
    }

    fn generate(
        &self,
        prompt_ids: &[u32],
        _config: &GenerationConfig,
    ) -> Result<Vec<u32>, RuntimeError> {
        let mut output = prompt_ids.to_vec();
        output.extend(self.canned_output().bytes().map(u32::from));
        Ok(output)
    }

    fn decode(&self, token_ids: &[u32], _skip_special_tokens: bool) -> Result<String, RuntimeError> {
        let bytes: Vec<u8> = token_ids.iter().map(|&id| id as u8).collect();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn supports_thinking(&self) -> bool {
        self.thinking_supported
    }
}
