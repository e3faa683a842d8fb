use std::collections::HashMap;

use crate::conversation::{Message, Role};

#[derive(Debug, Clone, Default)]
struct Slot {
    system: Option<String>,
    messages: Vec<Message>,
}

impl Slot {
    fn view(&self) -> Vec<Message> {
        let mut view = Vec::with_capacity(self.messages.len() + 1);
        if let Some(system) = &self.system {
            view.push(Message::system(system.clone()));
        }
        view.extend(self.messages.iter().cloned());
        view
    }
}

/// A keyed collection of independent conversation records, for keeping
/// several named sessions side by side outside any one session object.
/// Records are created on first `set`/`append`/`clear` of a key; reads of
/// unknown keys return an empty view without creating anything.
#[derive(Debug, Clone, Default)]
pub struct HistoryBook {
    store: HashMap<String, Slot>,
}

impl HistoryBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces (or creates) the record at `key` wholesale.
    pub fn set(&mut self, key: impl Into<String>, system: Option<String>, messages: Vec<Message>) {
        self.store.insert(
            key.into(),
            Slot {
                system: system.filter(|s| !s.is_empty()),
                messages,
            },
        );
    }

    /// Synthesized history view for `key`: system prompt first (if set),
    /// then the stored messages. Unknown keys read as empty.
    pub fn get(&self, key: &str) -> Vec<Message> {
        self.store.get(key).map(Slot::view).unwrap_or_default()
    }

    /// Appends to the record at `key`, creating it if absent. A system-role
    /// append replaces the record's system prompt instead of appending.
    pub fn append(&mut self, key: impl Into<String>, role: Role, content: impl Into<String>) {
        let slot = self.store.entry(key.into()).or_default();
        let content = content.into();
        match role {
            Role::System => {
                slot.system = if content.is_empty() {
                    None
                } else {
                    Some(content)
                };
            }
            role => slot.messages.push(Message { role, content }),
        }
    }

    /// Empties the messages at `key` (creating the record if absent); also
    /// drops the system prompt when `keep_system` is false.
    pub fn clear(&mut self, key: impl Into<String>, keep_system: bool) {
        let slot = self.store.entry(key.into()).or_default();
        slot.messages.clear();
        if !keep_system {
            slot.system = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_append_clear() {
        let mut book = HistoryBook::new();

        book.set("A", Some("S".to_string()), vec![Message::user("u")]);
        let history = book.get("A");
        assert_eq!(history[0], Message::system("S"));
        assert_eq!(history[1], Message::user("u"));

        book.append("A", Role::Assistant, "a");
        assert_eq!(book.get("A").last(), Some(&Message::assistant("a")));

        book.clear("A", true);
        assert_eq!(book.get("A"), vec![Message::system("S")]);

        book.clear("A", false);
        assert!(book.get("A").is_empty());
    }

    #[test]
    fn get_unknown_key_reads_empty_without_creating() {
        let book = HistoryBook::new();
        assert!(book.get("missing").is_empty());
        assert!(book.store.is_empty());
    }

    #[test]
    fn append_system_to_unseen_key_creates_record() {
        let mut book = HistoryBook::new();
        book.append("K", Role::System, "S");
        assert_eq!(book.get("K"), vec![Message::system("S")]);
    }

    #[test]
    fn append_system_replaces_instead_of_appending() {
        let mut book = HistoryBook::new();
        book.append("K", Role::System, "S1");
        book.append("K", Role::User, "u");
        book.append("K", Role::System, "S2");

        assert_eq!(
            book.get("K"),
            vec![Message::system("S2"), Message::user("u")]
        );
    }

    #[test]
    fn empty_system_normalizes_to_absent() {
        let mut book = HistoryBook::new();
        book.set("A", Some(String::new()), vec![Message::user("u")]);
        assert_eq!(book.get("A"), vec![Message::user("u")]);

        book.append("A", Role::System, "");
        assert_eq!(book.get("A"), vec![Message::user("u")]);
    }

    #[test]
    fn set_replaces_wholesale() {
        let mut book = HistoryBook::new();
        book.set("A", Some("S".to_string()), vec![Message::user("u")]);
        book.set("A", None, vec![]);
        assert!(book.get("A").is_empty());
    }
}
