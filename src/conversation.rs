use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Linear conversation history: an optional system prompt plus user and
/// assistant messages in insertion order. The system prompt is stored
/// separately and only synthesized into the view returned by [`history`];
/// the stored sequence itself never contains a system-role message.
///
/// [`history`]: ConversationState::history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    system: Option<String>,
    messages: Vec<Message>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.set_system(system);
        self
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Stored messages only, without the system prompt.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Full ordered view: system prompt first (if set), then the stored
    /// messages in insertion order.
    pub fn history(&self) -> Vec<Message> {
        let mut view = Vec::with_capacity(self.messages.len() + 1);
        if let Some(system) = &self.system {
            view.push(Message::system(system.clone()));
        }
        view.extend(self.messages.iter().cloned());
        view
    }

    pub fn clear_history(&mut self, keep_system: bool) {
        self.messages.clear();
        if !keep_system {
            self.system = None;
        }
    }

    /// Removes the trailing assistant message if present, then the trailing
    /// user message if present. At most one of each, tail only.
    pub fn pop_last_turn(&mut self) {
        if self
            .messages
            .last()
            .is_some_and(|m| m.role == Role::Assistant)
        {
            self.messages.pop();
        }
        if self.messages.last().is_some_and(|m| m.role == Role::User) {
            self.messages.pop();
        }
    }

    /// An empty string removes the system prompt.
    pub fn set_system(&mut self, content: impl Into<String>) {
        let content = content.into();
        self.system = if content.is_empty() {
            None
        } else {
            Some(content)
        };
    }

    pub fn system(&self) -> Option<&str> {
        self.system.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_places_system_first() {
        let mut state = ConversationState::new();
        state.add_user_message("u1");
        state.add_assistant_message("a1");
        state.set_system("sys");

        let history = state.history();
        assert_eq!(history[0], Message::system("sys"));
        assert_eq!(history[1], Message::user("u1"));
        assert_eq!(history[2], Message::assistant("a1"));
    }

    #[test]
    fn set_system_replaces_and_empty_removes() {
        let mut state = ConversationState::new().with_system("sys0");
        assert_eq!(state.system(), Some("sys0"));

        state.set_system("sys1");
        assert_eq!(state.system(), Some("sys1"));

        state.set_system("");
        assert_eq!(state.system(), None);
        assert!(state.history().is_empty());
    }

    #[test]
    fn clear_history_keeps_system_unless_asked() {
        let mut state = ConversationState::new().with_system("sys");
        state.add_user_message("u1");
        state.add_assistant_message("a1");

        state.clear_history(true);
        assert_eq!(state.history(), vec![Message::system("sys")]);

        state.clear_history(false);
        assert!(state.history().is_empty());
    }

    #[test]
    fn pop_last_turn_removes_trailing_pair() {
        let mut state = ConversationState::new().with_system("sys");
        state.add_user_message("u1");
        state.add_assistant_message("a1");

        state.pop_last_turn();
        assert_eq!(state.history(), vec![Message::system("sys")]);
    }

    #[test]
    fn pop_last_turn_handles_partial_turns() {
        let mut state = ConversationState::new();
        state.add_user_message("u1");
        state.add_assistant_message("a1");
        state.add_assistant_message("a2");

        // only the trailing assistant goes; "u1"/"a1" stay intact
        state.pop_last_turn();
        assert_eq!(
            state.messages(),
            &[Message::user("u1"), Message::assistant("a1")]
        );

        state.pop_last_turn();
        assert!(state.is_empty());
    }

    #[test]
    fn pop_last_turn_on_empty_is_noop() {
        let mut state = ConversationState::new().with_system("sys");
        state.pop_last_turn();
        assert_eq!(state.history(), vec![Message::system("sys")]);
    }

    #[test]
    fn pop_last_turn_removes_lone_user_message() {
        let mut state = ConversationState::new();
        state.add_user_message("u1");
        state.pop_last_turn();
        assert!(state.is_empty());
    }
}
