//! Flat JSON snapshot of a conversation: `{"system": ..., "messages": [...]}`,
//! pretty-printed with 2-space indentation, non-ASCII left unescaped.

use std::fs;
use std::path::Path;

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::conversation::{ConversationState, Message, Role};

#[derive(Debug, Serialize)]
struct Document<'a> {
    system: Option<&'a str>,
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default)]
    system: Option<String>,
    #[serde(default)]
    messages: Vec<Value>,
}

/// Serializes `state` to a JSON document string.
pub fn to_document(state: &ConversationState) -> Result<String> {
    let document = Document {
        system: state.system(),
        messages: state.messages(),
    };
    serde_json::to_string_pretty(&document).wrap_err("failed to serialize conversation")
}

/// Rebuilds a conversation from a JSON document string.
///
/// The document itself must be valid JSON; within it, entries of `messages`
/// that are not well-formed user/assistant messages are dropped silently.
pub fn from_document(json: &str) -> Result<ConversationState> {
    let raw: RawDocument =
        serde_json::from_str(json).wrap_err("snapshot document is not valid JSON")?;

    let mut state = ConversationState::new();
    if let Some(system) = raw.system {
        state.set_system(system);
    }
    let total = raw.messages.len();
    let mut kept = 0usize;
    for entry in raw.messages {
        match serde_json::from_value::<Message>(entry) {
            Ok(Message {
                role: Role::User,
                content,
            }) => {
                state.add_user_message(content);
                kept += 1;
            }
            Ok(Message {
                role: Role::Assistant,
                content,
            }) => {
                state.add_assistant_message(content);
                kept += 1;
            }
            _ => {}
        }
    }
    if kept < total {
        debug!("dropped {} malformed snapshot entries", total - kept);
    }
    Ok(state)
}

/// Writes the snapshot document for `state` to `path` as UTF-8.
pub fn write_json(state: &ConversationState, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let document = to_document(state)?;
    fs::write(path, document)
        .wrap_err_with(|| format!("failed to write snapshot to {}", path.display()))
}

/// Reads a snapshot document from `path` and rebuilds the conversation.
/// A missing file is an error.
pub fn read_json(path: impl AsRef<Path>) -> Result<ConversationState> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read snapshot from {}", path.display()))?;
    from_document(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> ConversationState {
        let mut state = ConversationState::new().with_system("sys");
        state.add_user_message("u1");
        state.add_assistant_message("a1");
        state
    }

    #[test]
    fn round_trip_is_identity() {
        let state = sample_state();
        let document = to_document(&state).unwrap();
        let restored = from_document(&document).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn document_is_pretty_printed_with_unescaped_unicode() {
        let mut state = ConversationState::new();
        state.add_user_message("café ☕");

        let document = to_document(&state).unwrap();
        assert!(document.contains("\n  \"messages\""));
        assert!(document.contains("café ☕"));
    }

    #[test]
    fn absent_system_serializes_as_null() {
        let mut state = ConversationState::new();
        state.add_user_message("u");
        let document = to_document(&state).unwrap();
        assert!(document.contains("\"system\": null"));
    }

    #[test]
    fn import_drops_only_malformed_entries() {
        let json = r#"{
          "system": "sys",
          "messages": [
            {"role": "user", "content": "u1"},
            {"role": "assistant"},
            {"role": "oracle", "content": "x"},
            "not an object",
            {"role": "assistant", "content": "a1"}
          ]
        }"#;

        let state = from_document(json).unwrap();
        assert_eq!(state.system(), Some("sys"));
        assert_eq!(
            state.messages(),
            &[Message::user("u1"), Message::assistant("a1")]
        );
    }

    #[test]
    fn import_keeps_system_out_of_the_message_sequence() {
        let json = r#"{
          "system": null,
          "messages": [
            {"role": "system", "content": "smuggled"},
            {"role": "user", "content": "u1"}
          ]
        }"#;

        let state = from_document(json).unwrap();
        assert_eq!(state.system(), None);
        assert_eq!(state.messages(), &[Message::user("u1")]);
    }

    #[test]
    fn import_normalizes_empty_system() {
        let state = from_document(r#"{"system": "", "messages": []}"#).unwrap();
        assert_eq!(state.system(), None);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(from_document("{not json").is_err());
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        let state = sample_state();
        write_json(&state, &path).unwrap();
        let restored = read_json(&path).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_json(dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read snapshot"));
    }
}
