//! Session orchestrator
//!
//! Owns the conversation store, the completion client and the persistence
//! store, built explicitly from its collaborators (no ambient lookup).
//! `submit` is the single entry point for raw input: command-shaped text
//! goes to the dispatcher and never reaches the completion endpoint;
//! everything else is sanitized and sent through the completion path.

use tracing::{debug, warn};

use crate::api::CompletionClient;
use crate::commands::{self, CommandContext, CommandResult};
use crate::core::conversation::Conversation;
use crate::core::models;
use crate::core::sanitize::sanitize;
use crate::session::{PersistedSession, SessionError, SessionLoad, SessionStore};

/// What a call to [`ChatSession::submit`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty input, or input that sanitized down to nothing.
    Ignored,
    /// A command ran; the transcript holds its output.
    Handled,
    /// The assistant replied.
    Replied,
    /// The completion failed; the transcript and `last_error` hold why.
    Failed,
    /// A request is already in flight; nothing was changed.
    Busy,
    /// `/exit` was issued; the host decides what happens next.
    SessionEnded,
}

pub struct ChatSession {
    conversation: Conversation,
    client: CompletionClient,
    store: SessionStore,
}

impl ChatSession {
    pub fn new(conversation: Conversation, client: CompletionClient, store: SessionStore) -> Self {
        Self {
            conversation,
            client,
            store,
        }
    }

    /// Build the session's initial state: the persisted snapshot when one
    /// is restorable, otherwise a fresh welcome. A malformed snapshot never
    /// fails startup; it degrades to fresh plus a transcript notice.
    ///
    /// Returns the session and whether a snapshot was restored.
    pub fn bootstrap(
        client: CompletionClient,
        store: SessionStore,
        model_override: Option<&str>,
        restore: bool,
    ) -> (Self, bool) {
        let fallback = model_override.unwrap_or_else(|| models::default_model());

        if !restore {
            return (Self::new(Conversation::new(fallback), client, store), false);
        }

        match store.load() {
            SessionLoad::Restored(snapshot) => {
                let model = model_override.unwrap_or(&snapshot.selected_model);
                let conversation =
                    Conversation::from_parts(snapshot.messages, snapshot.current_page, model);
                (Self::new(conversation, client, store), true)
            }
            SessionLoad::Missing => (Self::new(Conversation::new(fallback), client, store), false),
            SessionLoad::Malformed => {
                let mut conversation = Conversation::new(fallback);
                conversation
                    .append_system("Failed to load previous session. Starting a new session.");
                (Self::new(conversation, client, store), false)
            }
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn client(&self) -> &CompletionClient {
        &self.client
    }

    /// Route one line of raw user input. Sanitization happens before the
    /// command-shape check, so markup cannot smuggle a command past the
    /// dispatcher or vice versa; a message that is purely a command leaves
    /// no user-role entry in the log.
    pub async fn submit(&mut self, input: &str) -> SubmitOutcome {
        let content = sanitize(input);
        if content.is_empty() {
            return SubmitOutcome::Ignored;
        }

        if commands::is_command(&content) {
            let result = {
                let mut ctx = CommandContext {
                    conversation: &mut self.conversation,
                    store: &self.store,
                };
                commands::process_input(&mut ctx, &content)
            };
            return match result {
                CommandResult::Continue => SubmitOutcome::Handled,
                CommandResult::SessionEnded => SubmitOutcome::SessionEnded,
                CommandResult::RetryLast => self.request_completion().await,
            };
        }

        // Guard before touching the log so a refused send leaves no trace
        if self.conversation.is_loading() {
            return SubmitOutcome::Busy;
        }

        self.conversation.append_user(content);
        self.request_completion().await
    }

    async fn request_completion(&mut self) -> SubmitOutcome {
        if !self.conversation.begin_request() {
            return SubmitOutcome::Busy;
        }

        let model = self.conversation.selected_model().to_string();
        let history = self.conversation.outbound_history();
        match self.client.send_completion(&model, history).await {
            Ok(reply) => {
                self.conversation.complete_request(reply);
                SubmitOutcome::Replied
            }
            Err(error) => {
                debug!(%error, %model, "completion request failed");
                self.conversation.fail_request(error.to_string());
                SubmitOutcome::Failed
            }
        }
    }

    /// Snapshot the conversation to durable storage.
    pub fn save_now(&self) -> Result<(), SessionError> {
        self.store.save(&PersistedSession::capture(&self.conversation))
    }

    /// Timer-driven save: success is noted in the transcript, failure only
    /// in the diagnostic log so the session is never interrupted.
    pub fn auto_save(&mut self) {
        match self.save_now() {
            Ok(()) => self.conversation.append_system("Chat session auto-saved."),
            Err(error) => warn!(%error, "auto-save failed"),
        }
    }
}
