//! Command-line interface parsing and the line-oriented chat host
//!
//! The host is deliberately thin: it reads lines, hands them to the session
//! orchestrator, and reprints the current transcript page. All conversation
//! behavior lives in the core; the host only decides process-level things
//! (when to stop, where diagnostics go, timer teardown).

use std::error::Error;
use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::api::CompletionClient;
use crate::core::chat::{ChatSession, SubmitOutcome};
use crate::core::config::Config;
use crate::core::constants::API_KEY_ENV;
use crate::core::conversation::Conversation;
use crate::core::models;
use crate::session::{export, spawn_auto_save, SessionStore};

#[derive(Parser)]
#[command(name = "causerie")]
#[command(about = "A command-driven terminal chat client for OpenRouter-compatible APIs")]
#[command(long_about = "Causerie is a line-oriented chat client that talks to an \
OpenRouter-compatible completion endpoint and keeps the exchange as a paginated, \
command-driven conversation log with automatic session persistence.\n\n\
Environment Variables:\n\
  OPENROUTER_API_KEY    Your API key (required for sending messages)\n\n\
Commands (typed in the message input):\n\
  /help                 Display available commands and usage\n\
  /clear                Clear chat display\n\
  /exit                 End current session\n\
  /save                 Export chat history to file\n\
  /model [id]           Select different AI model\n\
  /retry                Regenerate last AI response\n\
  /scroll <up/down>     Navigate message history")]
pub struct Args {
    /// Model to use for chat (must be in the built-in allow-list)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Start a fresh session instead of restoring the saved one
    #[arg(long)]
    pub fresh: bool,

    /// List the available models and exit
    #[arg(long)]
    pub list_models: bool,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.list_models {
        for model in models::builtin_models() {
            println!("{} ({})", model.display_name, model.id);
        }
        return Ok(());
    }

    if let Some(model) = args.model.as_deref() {
        if !models::is_allowed(model) {
            eprintln!("❌ Unknown model: {model}");
            eprintln!("Run with --list-models to see the available models.");
            std::process::exit(1);
        }
    }

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("⚠️  {e}");
        Config::default()
    });
    let config_model = config.default_model.as_deref().filter(|model| {
        let known = models::is_allowed(model);
        if !known {
            eprintln!("⚠️  Ignoring unknown default_model in config: {model}");
        }
        known
    });
    let model_override = args.model.as_deref().or(config_model);

    let mut client = CompletionClient::from_env();
    if let Some(base_url) = &config.base_url {
        client = client.with_base_url(base_url);
    }
    if !client.test_connectivity() {
        eprintln!("⚠️  {API_KEY_ENV} is not set (or too short); messages will fail until it is configured.");
    }

    let store = SessionStore::new();
    let (session, restored) = ChatSession::bootstrap(client, store, model_override, !args.fresh);

    eprintln!("💬 Causerie — type a message, /help for commands, /exit to quit");
    eprintln!("📡 Model: {}", session.conversation().selected_model());
    if restored {
        eprintln!("💾 Restored previous session.");
    }
    render_page(session.conversation());

    let session = Arc::new(Mutex::new(session));
    let cancel = CancellationToken::new();
    let auto_save = spawn_auto_save(session.clone(), config.auto_save_interval(), cancel.clone());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let outcome = session.lock().await.submit(&line).await;
        match outcome {
            SubmitOutcome::Ignored => continue,
            SubmitOutcome::Busy => {
                eprintln!("⚠️  A request is already in flight.");
                continue;
            }
            _ => {}
        }

        {
            let guard = session.lock().await;
            render_page(guard.conversation());
        }

        if outcome == SubmitOutcome::SessionEnded {
            break;
        }
    }

    cancel.cancel();
    let _ = auto_save.await;
    if let Err(error) = session.lock().await.save_now() {
        warn!(%error, "final session save failed");
    }

    Ok(())
}

/// Print the page the cursor is on, export-style, one entry per message.
fn render_page(conversation: &Conversation) {
    println!(
        "--- page {} of {} ---",
        conversation.current_page(),
        conversation.total_pages()
    );
    for message in conversation.page_messages(conversation.current_page()) {
        print!("{}", export::format_entry(message));
    }
}
