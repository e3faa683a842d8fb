use rustyline::{Config, Editor, Result};

/// Prompt string for the REPL; shows how many messages the conversation
/// currently holds so /pop and /clear feedback is visible at a glance.
pub fn generate_prompt(message_count: usize) -> String {
    if message_count == 0 {
        "> ".to_string()
    } else {
        format!("[{message_count}] > ")
    }
}

pub fn rl() -> Result<Editor<()>> {
    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    Editor::with_config(config)
}
