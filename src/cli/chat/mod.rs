pub mod prompt;

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Local;
use color_print::cformat;
use eyre::{bail, Result};
use prompt::generate_prompt;
use rustyline::error::ReadlineError;
use tracing::info;

use crate::conversation::Role;
use crate::history_book::HistoryBook;
use crate::runtime::ModelRuntime;
use crate::session::{AskOptions, ChatSession};

const WELCOME_TEXT: &str = "
Hi, I'm a local chat session. Ask me anything.

/help         Show the help dialogue
/quit         Quit the application
";

const HELP_TEXT: &str = "
chatllm

/clear [all]     Clear the conversation history ('all' also drops the system prompt)
/pop             Remove the last user/assistant turn
/system [text]   Show or replace the system prompt
/history         Print the full conversation
/save [path]     Write the conversation to a JSON snapshot
/load <path>     Replace the conversation from a JSON snapshot
/stash <name>    Keep the current conversation under a name
/restore <name>  Bring a stashed conversation back
/think on|off|auto   Control thinking mode for generation
/help            Show this help dialogue
/quit            Quit the application
";

pub struct ChatContext<R: ModelRuntime> {
    output: Box<dyn Write>,
    input: Option<String>,
    interactive: bool,
    session: ChatSession<R>,
    book: HistoryBook,
    ask_options: AskOptions,
}

impl<R: ModelRuntime> ChatContext<R> {
    pub fn new(
        session: ChatSession<R>,
        output: Box<dyn Write>,
        input: Option<String>,
        interactive: bool,
        ask_options: AskOptions,
    ) -> Self {
        Self {
            output,
            input,
            interactive,
            session,
            book: HistoryBook::new(),
            ask_options,
        }
    }

    pub fn run(&mut self) -> Result<ExitCode> {
        if self.interactive {
            self.print_welcome()?;
        }

        // Non-interactive mode: a single query, then exit
        if let Some(input) = self.input.take() {
            self.handle_input(&input)?;
            return Ok(ExitCode::SUCCESS);
        }

        if self.interactive {
            self.run_interactive()?;
        }

        Ok(ExitCode::SUCCESS)
    }

    fn print_welcome(&mut self) -> Result<()> {
        writeln!(self.output, "{WELCOME_TEXT}")?;
        Ok(())
    }

    fn run_interactive(&mut self) -> Result<()> {
        let mut rl = prompt::rl()?;

        loop {
            let prompt_text = generate_prompt(self.session.state().len());
            match rl.readline(&prompt_text) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if line == "/quit" {
                        break;
                    }
                    if let Err(e) = self.handle_input(line) {
                        writeln!(self.output, "{}", cformat!("<red>Error: {e:#}</red>"))?;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => {
                    writeln!(self.output, "{}", cformat!("<red>Error: {e}</red>"))?;
                    break;
                }
            }
        }

        Ok(())
    }

    fn handle_input(&mut self, input: &str) -> Result<()> {
        if let Some(command) = input.strip_prefix('/') {
            self.handle_command(command)
        } else {
            self.process_chat_input(input)
        }
    }

    fn handle_command(&mut self, command: &str) -> Result<()> {
        let (name, rest) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };

        match name {
            "help" => {
                writeln!(self.output, "{HELP_TEXT}")?;
            }
            "clear" => {
                let keep_system = rest != "all";
                self.session.clear_history(keep_system);
                writeln!(self.output, "Conversation cleared.")?;
            }
            "pop" => {
                self.session.pop_last_turn();
                writeln!(self.output, "Last turn removed.")?;
            }
            "system" => {
                if rest.is_empty() {
                    match self.session.system() {
                        Some(system) => {
                            writeln!(self.output, "{}", cformat!("<cyan>[system]</cyan> {system}"))?
                        }
                        None => writeln!(self.output, "No system prompt set.")?,
                    }
                } else {
                    self.session.set_system(rest);
                    writeln!(self.output, "System prompt updated.")?;
                }
            }
            "history" => {
                for (i, message) in self.session.history().iter().enumerate() {
                    let role = match message.role {
                        Role::System => cformat!("<cyan>[system]</cyan>"),
                        Role::User => cformat!("<blue>[user]</blue>"),
                        Role::Assistant => cformat!("<green>[assistant]</green>"),
                    };
                    writeln!(self.output, "{}. {role} {}", i + 1, message.content)?;
                }
            }
            "save" => {
                let path = if rest.is_empty() {
                    default_snapshot_path()?
                } else {
                    PathBuf::from(rest)
                };
                self.session.export_json(&path)?;
                info!("saved snapshot to {}", path.display());
                writeln!(self.output, "Saved conversation to {}", path.display())?;
            }
            "load" => {
                if rest.is_empty() {
                    bail!("usage: /load <path>");
                }
                self.session.import_json(rest)?;
                writeln!(
                    self.output,
                    "Loaded conversation ({} messages).",
                    self.session.state().len()
                )?;
            }
            "stash" => {
                if rest.is_empty() {
                    bail!("usage: /stash <name>");
                }
                self.book.set(
                    rest,
                    self.session.system().map(String::from),
                    self.session.state().messages().to_vec(),
                );
                writeln!(self.output, "Stashed conversation as '{rest}'.")?;
            }
            "restore" => {
                if rest.is_empty() {
                    bail!("usage: /restore <name>");
                }
                self.session.clear_history(false);
                for message in self.book.get(rest) {
                    match message.role {
                        Role::System => self.session.set_system(message.content),
                        Role::User => self.session.add_user_message(message.content),
                        Role::Assistant => self.session.add_assistant_message(message.content),
                    }
                }
                writeln!(
                    self.output,
                    "Restored '{rest}' ({} messages).",
                    self.session.state().len()
                )?;
            }
            "think" => {
                self.ask_options.enable_thinking = match rest {
                    "on" => Some(true),
                    "off" => Some(false),
                    "auto" => None,
                    _ => bail!("usage: /think on|off|auto"),
                };
                writeln!(self.output, "Thinking mode: {rest}.")?;
            }
            _ => {
                writeln!(
                    self.output,
                    "Unknown command '/{name}'. Try /help for the list."
                )?;
            }
        }

        Ok(())
    }

    fn process_chat_input(&mut self, input: &str) -> Result<()> {
        let options = self.ask_options.clone();
        let reply = self.session.ask_with(input, &options)?;

        if !reply.thinking.is_empty() {
            writeln!(
                self.output,
                "{}",
                cformat!("<yellow>[thinking] {}</yellow>", reply.thinking)
            )?;
        }
        writeln!(self.output, "{}", cformat!("<green>{}</green>", reply.content))?;
        Ok(())
    }
}

fn default_snapshot_path() -> Result<PathBuf> {
    let dir = dirs::data_dir()
        .map(|d| d.join("chatllm"))
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&dir)?;
    let name = format!("chatllm-{}.json", Local::now().format("%Y%m%d-%H%M%S"));
    Ok(dir.join(name))
}
