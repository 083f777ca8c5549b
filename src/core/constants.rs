//! Shared constants used across the application

use std::time::Duration;

/// Default completion API base URL (OpenRouter, OpenAI-compatible wire format).
pub const COMPLETION_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Referer value attached to every outbound completion request.
pub const COMPLETION_REFERER: &str = "https://github.com/permacommons/causerie";

/// Environment variable holding the API credential.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Keys shorter than this are treated as not configured.
pub const MIN_API_KEY_LEN: usize = 10;

/// How long a completion request may run before the timeout race wins.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum completion requests per rolling rate-limit window.
pub const RATE_LIMIT_PER_MINUTE: u32 = 30;

/// Length of the rolling rate-limit window.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Messages shown per transcript page.
pub const MESSAGES_PER_PAGE: usize = 20;

/// How many non-system messages accompany a new message to the API.
pub const OUTBOUND_HISTORY_LEN: usize = 10;

/// Interval between automatic session snapshots.
pub const AUTO_SAVE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// File name of the persisted session inside the data directory.
pub const SESSION_FILE_NAME: &str = "session.json";

/// Seed message for a brand-new session.
pub const WELCOME_MESSAGE: &str =
    "Welcome to the secure chat interface. Type a message to start or /help for available commands.";

/// Replacement message after /clear wipes the transcript.
pub const CLEARED_MESSAGE: &str =
    "Chat cleared. Type a message to start or /help for available commands.";
