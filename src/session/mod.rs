//! Session persistence
//!
//! Serializes the conversation to a single JSON snapshot in the platform
//! data directory and restores it at startup. Saves are full-state
//! overwrites through a temp file so a crash mid-write never corrupts the
//! previous snapshot. Also owns export delivery and the auto-save task.

pub mod export;

use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::core::chat::ChatSession;
use crate::core::constants::SESSION_FILE_NAME;
use crate::core::conversation::Conversation;
use crate::core::message::Message;

/// Durable snapshot of a conversation. The sole seed of session state on
/// the next startup; timestamps round-trip as RFC 3339 into structured
/// instants, never as opaque text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSession {
    pub messages: Vec<Message>,
    pub current_page: usize,
    pub selected_model: String,
    pub last_saved_at: DateTime<Utc>,
}

impl PersistedSession {
    pub fn capture(conversation: &Conversation) -> Self {
        Self {
            messages: conversation.messages().to_vec(),
            current_page: conversation.current_page(),
            selected_model: conversation.selected_model().to_string(),
            last_saved_at: Utc::now(),
        }
    }
}

#[derive(Debug)]
pub enum SessionError {
    /// The storage backend could not be reached or written.
    StorageUnavailable(std::io::Error),

    /// The storage backend refused the write for lack of space.
    QuotaExceeded,

    /// The snapshot could not be serialized.
    Serialize(serde_json::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::StorageUnavailable(source) => {
                write!(f, "Session storage unavailable: {source}")
            }
            SessionError::QuotaExceeded => write!(f, "Session storage quota exceeded"),
            SessionError::Serialize(source) => {
                write!(f, "Failed to serialize session: {source}")
            }
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::StorageUnavailable(source) => Some(source),
            SessionError::Serialize(source) => Some(source),
            SessionError::QuotaExceeded => None,
        }
    }
}

impl SessionError {
    fn from_io(source: std::io::Error) -> Self {
        match source.kind() {
            ErrorKind::QuotaExceeded | ErrorKind::StorageFull => SessionError::QuotaExceeded,
            _ => SessionError::StorageUnavailable(source),
        }
    }
}

/// Outcome of restoring the persisted session at startup.
#[derive(Debug)]
pub enum SessionLoad {
    Restored(PersistedSession),
    /// No snapshot exists; start fresh silently.
    Missing,
    /// A snapshot exists but could not be used; start fresh and say so.
    Malformed,
}

pub struct SessionStore {
    session_path: PathBuf,
    export_dir: PathBuf,
}

impl SessionStore {
    pub fn new() -> Self {
        let proj_dirs = ProjectDirs::from("org", "permacommons", "causerie")
            .expect("Failed to determine data directory");
        Self {
            session_path: proj_dirs.data_dir().join(SESSION_FILE_NAME),
            export_dir: PathBuf::from("."),
        }
    }

    /// Store rooted at an explicit directory (session file and exports both).
    pub fn at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            session_path: root.join(SESSION_FILE_NAME),
            export_dir: root,
        }
    }

    pub fn session_path(&self) -> &Path {
        &self.session_path
    }

    /// Full-state overwrite of the snapshot, atomic via temp-file persist.
    pub fn save(&self, session: &PersistedSession) -> Result<(), SessionError> {
        let parent = self
            .session_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty());
        if let Some(dir) = parent {
            fs::create_dir_all(dir).map_err(SessionError::from_io)?;
        }

        let contents = serde_json::to_string_pretty(session).map_err(SessionError::Serialize)?;

        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        }
        .map_err(SessionError::from_io)?;
        temp_file
            .write_all(contents.as_bytes())
            .map_err(SessionError::from_io)?;
        temp_file
            .as_file_mut()
            .sync_all()
            .map_err(SessionError::from_io)?;
        temp_file
            .persist(&self.session_path)
            .map_err(|err| SessionError::from_io(err.error))?;
        Ok(())
    }

    /// Restore the snapshot. Malformed or unreadable data never fails
    /// startup; it degrades to [`SessionLoad::Malformed`] with a diagnostic.
    pub fn load(&self) -> SessionLoad {
        let contents = match fs::read_to_string(&self.session_path) {
            Ok(contents) => contents,
            Err(source) if source.kind() == ErrorKind::NotFound => return SessionLoad::Missing,
            Err(source) => {
                warn!(path = %self.session_path.display(), error = %source, "failed to read persisted session");
                return SessionLoad::Malformed;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(session) => SessionLoad::Restored(session),
            Err(source) => {
                warn!(path = %self.session_path.display(), error = %source, "persisted session is malformed");
                SessionLoad::Malformed
            }
        }
    }

    /// Write a rendered export where the host can pick it up.
    pub fn deliver_export(&self, filename: &str, content: &str) -> Result<PathBuf, SessionError> {
        let path = self.export_dir.join(filename);
        fs::write(&path, content).map_err(SessionError::from_io)?;
        Ok(path)
    }
}

/// Periodic snapshot task. Owned by the host and cancelled deterministically
/// through the token at teardown; failures are recorded, never surfaced.
pub fn spawn_auto_save(
    session: Arc<Mutex<ChatSession>>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // interval fires immediately; consume that tick so the first save
        // happens one full period after startup
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => session.lock().await.auto_save(),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models;
    use tempfile::tempdir;

    fn sample_conversation() -> Conversation {
        let mut convo = Conversation::new(models::default_model());
        convo.append_user("hi");
        convo.complete_request("hello!");
        convo.change_model("google/gemini-pro");
        convo
    }

    #[test]
    fn round_trips_content_order_model_and_page() {
        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path());
        let convo = sample_conversation();
        let saved = PersistedSession::capture(&convo);

        store.save(&saved).unwrap();
        let restored = match store.load() {
            SessionLoad::Restored(session) => session,
            other => panic!("expected restored session, got {other:?}"),
        };

        assert_eq!(restored.current_page, saved.current_page);
        assert_eq!(restored.selected_model, "google/gemini-pro");
        assert_eq!(restored.messages.len(), saved.messages.len());
        for (restored, original) in restored.messages.iter().zip(saved.messages.iter()) {
            assert_eq!(restored.id, original.id);
            assert_eq!(restored.role, original.role);
            assert_eq!(restored.content, original.content);
            assert_eq!(restored.timestamp, original.timestamp);
        }
    }

    #[test]
    fn missing_snapshot_loads_as_missing() {
        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path());
        assert!(matches!(store.load(), SessionLoad::Missing));
    }

    #[test]
    fn malformed_snapshot_degrades_without_error() {
        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path());
        fs::write(store.session_path(), "{not json").unwrap();
        assert!(matches!(store.load(), SessionLoad::Malformed));
    }

    #[test]
    fn save_overwrites_the_previous_snapshot() {
        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path());

        let mut convo = sample_conversation();
        store.save(&PersistedSession::capture(&convo)).unwrap();
        convo.append_user("another");
        store.save(&PersistedSession::capture(&convo)).unwrap();

        match store.load() {
            SessionLoad::Restored(session) => {
                assert_eq!(session.messages.len(), convo.len());
            }
            other => panic!("expected restored session, got {other:?}"),
        }
    }

    #[test]
    fn exports_are_delivered_to_the_store_root() {
        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path());
        let path = store
            .deliver_export("chat-export-2024-01-01-0900.txt", "# Chat History Export\n")
            .unwrap();
        assert!(path.starts_with(dir.path()));
        let contents = fs::read_to_string(path).unwrap();
        assert!(contents.starts_with("# Chat History Export"));
    }
}
