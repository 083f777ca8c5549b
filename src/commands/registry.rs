use super::{CommandContext, CommandResult, ParsedCommand};

pub type CommandHandler = fn(&mut CommandContext<'_>, &ParsedCommand) -> CommandResult;

pub struct Command {
    pub name: &'static str,
    pub help: &'static str,
    pub usage: Option<&'static str>,
    pub handler: CommandHandler,
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands()
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        help: "Display available commands and usage",
        usage: None,
        handler: super::handle_help,
    },
    Command {
        name: "clear",
        help: "Clear chat display",
        usage: None,
        handler: super::handle_clear,
    },
    Command {
        name: "exit",
        help: "End current session",
        usage: None,
        handler: super::handle_exit,
    },
    Command {
        name: "save",
        help: "Export chat history to file",
        usage: None,
        handler: super::handle_save,
    },
    Command {
        name: "model",
        help: "Select different AI model",
        usage: Some("/model [id]"),
        handler: super::handle_model,
    },
    Command {
        name: "retry",
        help: "Regenerate last AI response",
        usage: None,
        handler: super::handle_retry,
    },
    Command {
        name: "scroll",
        help: "Navigate message history",
        usage: Some("/scroll <up/down>"),
        handler: super::handle_scroll,
    },
];
