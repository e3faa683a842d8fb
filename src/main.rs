use std::env;
use std::io;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use eyre::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use chatllm::cli::chat::ChatContext;
use chatllm::runtime::{GenerationOverrides, MockRuntime};
use chatllm::session::{AskOptions, ChatSession};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    options: ChatOptions,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a chat session
    Chat {
        #[command(flatten)]
        options: ChatOptions,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(clap::Args, Clone)]
struct ChatOptions {
    /// Input to send to the chat, non-interactively
    #[arg(short, long)]
    input: Option<String>,

    /// System prompt (falls back to the CHATLLM_SYSTEM env var)
    #[arg(short, long)]
    system: Option<String>,

    /// Sampling temperature override
    #[arg(short, long)]
    temperature: Option<f32>,

    /// Cap on newly generated tokens
    #[arg(long)]
    max_new_tokens: Option<usize>,

    /// Extra generation options as a JSON object, passed through to the runtime
    #[arg(long, value_name = "JSON")]
    gen_options: Option<String>,

    /// Thinking mode: on, off, or auto (probe the runtime)
    #[arg(long, default_value = "auto")]
    think: String,
}

fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    let (options, verbose) = match cli.command {
        Some(Commands::Chat { options, verbose }) => (options, verbose),
        None => (cli.options, cli.verbose),
    };

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("Starting chatllm");

    let system = options
        .system
        .clone()
        .or_else(|| env::var("CHATLLM_SYSTEM").ok());

    let mut session = ChatSession::new(MockRuntime::default());
    if let Some(system) = system {
        session.set_system(system);
    }

    let ask_options = build_ask_options(&options)?;
    let interactive = options.input.is_none();

    let mut chat_context = ChatContext::new(
        session,
        Box::new(io::stdout()),
        options.input,
        interactive,
        ask_options,
    );
    chat_context.run()
}

fn build_ask_options(options: &ChatOptions) -> Result<AskOptions> {
    let mut overrides: GenerationOverrides = match &options.gen_options {
        Some(json) => serde_json::from_str(json)?,
        None => GenerationOverrides::default(),
    };
    if options.temperature.is_some() {
        overrides.temperature = options.temperature;
    }
    if options.max_new_tokens.is_some() {
        overrides.max_new_tokens = options.max_new_tokens;
    }

    let enable_thinking = match options.think.as_str() {
        "on" => Some(true),
        "off" => Some(false),
        _ => None,
    };

    Ok(AskOptions {
        enable_thinking,
        add_generation_prompt: true,
        overrides,
    })
}
