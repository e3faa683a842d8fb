use std::path::Path;

use eyre::Result;
use tracing::debug;

use crate::conversation::{ConversationState, Message};
use crate::runtime::{GenerationConfig, GenerationOverrides, ModelRuntime};
use crate::{snapshot, thinking};

/// The outcome of one [`ChatSession::ask`] exchange. Only `content` is
/// persisted into the conversation history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub thinking: String,
    pub content: String,
}

/// Per-call knobs for [`ChatSession::ask_with`].
#[derive(Debug, Clone)]
pub struct AskOptions {
    /// `None` defers to the runtime's own thinking capability.
    pub enable_thinking: Option<bool>,
    pub add_generation_prompt: bool,
    pub overrides: GenerationOverrides,
}

impl Default for AskOptions {
    fn default() -> Self {
        Self {
            enable_thinking: None,
            add_generation_prompt: true,
            overrides: GenerationOverrides::default(),
        }
    }
}

/// One long-lived pairing of a loaded model runtime with a conversation.
///
/// The runtime is acquired at construction and owned for the session's
/// lifetime. There is no internal synchronization; callers sharing a
/// session must serialize access themselves.
pub struct ChatSession<R: ModelRuntime> {
    runtime: R,
    state: ConversationState,
    defaults: GenerationConfig,
}

impl<R: ModelRuntime> ChatSession<R> {
    pub fn new(runtime: R) -> Self {
        Self {
            runtime,
            state: ConversationState::new(),
            defaults: GenerationConfig::default(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.state.set_system(system);
        self
    }

    pub fn with_defaults(mut self, defaults: GenerationConfig) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn defaults(&self) -> &GenerationConfig {
        &self.defaults
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ConversationState {
        &mut self.state
    }

    /// Asks with the session defaults.
    pub fn ask(&mut self, text: &str) -> Result<ChatReply> {
        self.ask_with(text, &AskOptions::default())
    }

    /// Appends `text` as a user message, generates a reply, splits out any
    /// thinking segment and appends the remaining content as the assistant
    /// message. Returns both halves.
    ///
    /// A runtime failure propagates with the user message already appended;
    /// the history is not rolled back.
    pub fn ask_with(&mut self, text: &str, options: &AskOptions) -> Result<ChatReply> {
        self.state.add_user_message(text);
        let messages = self.state.history();

        let enable_thinking = options
            .enable_thinking
            .unwrap_or_else(|| self.runtime.supports_thinking());

        let prompt =
            self.runtime
                .apply_chat_template(&messages, options.add_generation_prompt, enable_thinking)?;
        let prompt_ids = self.runtime.encode(&prompt)?;
        debug!(
            "rendered prompt: {} tokens, thinking={}",
            prompt_ids.len(),
            enable_thinking
        );

        let config = self.defaults.merged(&options.overrides);
        let output_ids = self.runtime.generate(&prompt_ids, &config)?;
        let new_ids = &output_ids[prompt_ids.len().min(output_ids.len())..];
        let decoded = self.runtime.decode(new_ids, true)?;
        debug!("generated {} new tokens", new_ids.len());

        let (thinking, content) = thinking::split_thinking(&decoded);
        self.state.add_assistant_message(&content);
        Ok(ChatReply { thinking, content })
    }

    // Conversation history, delegated.

    pub fn history(&self) -> Vec<Message> {
        self.state.history()
    }

    pub fn clear_history(&mut self, keep_system: bool) {
        self.state.clear_history(keep_system);
    }

    pub fn pop_last_turn(&mut self) {
        self.state.pop_last_turn();
    }

    pub fn set_system(&mut self, content: impl Into<String>) {
        self.state.set_system(content);
    }

    pub fn system(&self) -> Option<&str> {
        self.state.system()
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.state.add_user_message(content);
    }

    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.state.add_assistant_message(content);
    }

    // Snapshots, delegated.

    pub fn export_json(&self, path: impl AsRef<Path>) -> Result<()> {
        snapshot::write_json(&self.state, path)
    }

    pub fn import_json(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.state = snapshot::read_json(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use crate::runtime::MockRuntime;

    #[test]
    fn ask_appends_user_then_assistant() {
        let runtime = MockRuntime::new().with_reply("ok").with_thinking("diag");
        let mut session = ChatSession::new(runtime).with_system("S");

        let reply = session.ask("hello").unwrap();
        assert_eq!(reply.thinking, "diag");
        assert_eq!(reply.content, "ok");

        let history = session.history();
        assert_eq!(history[0].role, Role::System);
        assert_eq!(history[1], Message::user("hello"));
        assert_eq!(history[2], Message::assistant("ok"));
    }

    #[test]
    fn ask_without_thinking_segment() {
        let runtime = MockRuntime::new().with_reply("plain").without_thinking();
        let mut session = ChatSession::new(runtime);

        let reply = session.ask("hi").unwrap();
        assert_eq!(reply.thinking, "");
        assert_eq!(reply.content, "plain");
    }
}
