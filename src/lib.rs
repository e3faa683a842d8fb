//! A thin conversational wrapper around a local causal-LM runtime:
//! linear message history, chat-template prompting, and thinking-segment
//! parsing, with flat JSON snapshots and a named conversation store.

pub mod cli;
pub mod conversation;
pub mod history_book;
pub mod runtime;
pub mod session;
pub mod snapshot;
pub mod thinking;

pub use conversation::{ConversationState, Message, Role};
pub use history_book::HistoryBook;
pub use runtime::{GenerationConfig, GenerationOverrides, MockRuntime, ModelRuntime, RuntimeError};
pub use session::{AskOptions, ChatReply, ChatSession};
