//! Plain-text export rendering
//!
//! Renders the transcript as a downloadable text file: a two-line header,
//! then one `[HH:MM:SS] Role> content` line per message in local time with
//! a blank line between entries.

use chrono::{DateTime, Local};

use crate::core::message::Message;

pub fn render(messages: &[Message], generated_at: DateTime<Local>) -> String {
    let mut out = String::new();
    out.push_str("# Chat History Export\n");
    out.push_str(&format!("# Generated: {}\n\n", generated_at.to_rfc3339()));

    for message in messages {
        out.push_str(&format_entry(message));
        out.push('\n');
    }

    out
}

/// One transcript line, also used by the terminal host for display.
pub fn format_entry(message: &Message) -> String {
    format!(
        "[{}] {}> {}\n",
        message.timestamp.with_timezone(&Local).format("%H:%M:%S"),
        message.role.display_name(),
        message.content
    )
}

/// `chat-export-YYYY-MM-DD-HHMM.txt` from the local clock.
pub fn export_filename(now: DateTime<Local>) -> String {
    format!("chat-export-{}.txt", now.format("%Y-%m-%d-%H%M"))
}
