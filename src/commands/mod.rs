//! Slash-command parsing and dispatch
//!
//! Commands share the message input channel with chat text: anything whose
//! trimmed form starts with `/` is intercepted here and never reaches the
//! completion endpoint. The parser only tokenizes; unknown names are the
//! dispatcher's concern and produce a transcript message, not an error.

mod registry;

pub use registry::{all_commands, find_command, Command};

use chrono::Local;

use crate::core::conversation::{Conversation, ScrollDirection};
use crate::core::models;
use crate::session::export;
use crate::session::{PersistedSession, SessionStore};

/// What remains for the orchestrator to do after a command was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    /// Fully handled; nothing further.
    Continue,
    /// `/retry` prepared a truncation; a resend is due.
    RetryLast,
    /// `/exit`; the host decides what session end means.
    SessionEnded,
}

/// Capability handle passed to every handler: the store plus the
/// persistence collaborator, no ambient lookup.
pub struct CommandContext<'a> {
    pub conversation: &'a mut Conversation,
    pub store: &'a SessionStore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<String>,
}

/// True iff the trimmed text begins with the command prefix.
pub fn is_command(input: &str) -> bool {
    input.trim().starts_with('/')
}

/// Strip the prefix and split on whitespace runs; the first token
/// (lowercased) names the command, the rest are positional arguments.
pub fn parse_command(input: &str) -> ParsedCommand {
    let trimmed = input.trim().trim_start_matches('/');
    let mut tokens = trimmed.split_whitespace();
    let name = tokens.next().unwrap_or("").to_lowercase();
    let args = tokens.map(str::to_string).collect();
    ParsedCommand { name, args }
}

/// Dispatch command-shaped input. Every shape is handled: recognized
/// commands run their handler, everything else gets an "unknown command"
/// transcript message.
pub fn process_input(ctx: &mut CommandContext<'_>, input: &str) -> CommandResult {
    let parsed = parse_command(input);
    match find_command(&parsed.name) {
        Some(command) => (command.handler)(ctx, &parsed),
        None => {
            ctx.conversation.append_system(format!(
                "Unknown command: /{}. Type /help for available commands.",
                parsed.name
            ));
            CommandResult::Continue
        }
    }
}

pub(super) fn handle_help(ctx: &mut CommandContext<'_>, _parsed: &ParsedCommand) -> CommandResult {
    let mut help_text = String::from("Available commands:\n\n");
    for command in all_commands() {
        help_text.push_str(&format!("/{} - {}\n", command.name, command.help));
        if let Some(usage) = command.usage {
            help_text.push_str(&format!("    Usage: {usage}\n"));
        }
    }
    ctx.conversation.append_system(help_text);
    CommandResult::Continue
}

pub(super) fn handle_clear(ctx: &mut CommandContext<'_>, _parsed: &ParsedCommand) -> CommandResult {
    ctx.conversation.clear();
    CommandResult::Continue
}

pub(super) fn handle_exit(ctx: &mut CommandContext<'_>, _parsed: &ParsedCommand) -> CommandResult {
    ctx.conversation
        .append_system("Ending session. Thank you for using the secure chat interface.");
    CommandResult::SessionEnded
}

pub(super) fn handle_save(ctx: &mut CommandContext<'_>, _parsed: &ParsedCommand) -> CommandResult {
    let now = Local::now();
    let filename = export::export_filename(now);
    let content = export::render(ctx.conversation.messages(), now);
    match ctx.store.deliver_export(&filename, &content) {
        Ok(_) => {
            ctx.conversation
                .append_system(format!("Chat history exported to {filename}"));
        }
        Err(e) => {
            ctx.conversation.record_error(e.to_string());
            ctx.conversation
                .append_system("Failed to export chat history. Please try again.");
            return CommandResult::Continue;
        }
    }

    // An explicit export also snapshots the session, and unlike the timer
    // path its failure is surfaced
    if let Err(e) = ctx
        .store
        .save(&PersistedSession::capture(ctx.conversation))
    {
        ctx.conversation.record_error(e.to_string());
        ctx.conversation
            .append_system(format!("Failed to save session: {e}"));
    }
    CommandResult::Continue
}

pub(super) fn handle_model(ctx: &mut CommandContext<'_>, parsed: &ParsedCommand) -> CommandResult {
    match parsed.args.first() {
        None => {
            let listing = model_listing(ctx.conversation.selected_model());
            ctx.conversation.append_system(listing);
        }
        Some(id) => {
            if ctx.conversation.change_model(id) {
                ctx.conversation
                    .append_system(format!("Model changed to {id}"));
            } else {
                ctx.conversation.append_system(format!(
                    "Invalid model ID: {id}. Use /model to see available models."
                ));
                let listing = model_listing(ctx.conversation.selected_model());
                ctx.conversation.append_system(listing);
            }
        }
    }
    CommandResult::Continue
}

pub(super) fn handle_retry(ctx: &mut CommandContext<'_>, _parsed: &ParsedCommand) -> CommandResult {
    if ctx.conversation.prepare_regenerate() {
        CommandResult::RetryLast
    } else {
        CommandResult::Continue
    }
}

pub(super) fn handle_scroll(ctx: &mut CommandContext<'_>, parsed: &ParsedCommand) -> CommandResult {
    let direction = parsed
        .args
        .first()
        .and_then(|arg| arg.parse::<ScrollDirection>().ok());
    match direction {
        Some(direction) => ctx.conversation.scroll(direction),
        None => ctx.conversation.append_system("Usage: /scroll <up/down>"),
    }
    CommandResult::Continue
}

/// Allow-list rendering with the current selection marked.
fn model_listing(current: &str) -> String {
    let mut listing = String::from("Available models:\n\n");
    for model in models::builtin_models() {
        let marker = if model.id == current { "* " } else { "  " };
        listing.push_str(&format!("{marker}{} ({})\n", model.display_name, model.id));
    }
    listing.push_str("\nTo select a model, use /model followed by the model ID");
    listing
}
