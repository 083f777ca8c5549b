//! Conversation store
//!
//! The central state machine: an ordered, append-only message log plus the
//! pagination cursor, selected model, in-flight flags and last error. All
//! mutating operations live here and each is atomic from the caller's
//! perspective; the store performs no I/O of its own.
//!
//! Invariants maintained by every operation:
//! - `current_page` stays within `[1, total_pages]`
//! - `total_pages == max(1, ceil(len / page_size))`
//! - `selected_model` is always a member of the built-in allow-list

use std::fmt;
use std::str::FromStr;

use crate::api::ChatMessage;
use crate::core::constants::{CLEARED_MESSAGE, MESSAGES_PER_PAGE, OUTBOUND_HISTORY_LEN, WELCOME_MESSAGE};
use crate::core::message::Message;
use crate::core::models;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

impl fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrollDirection::Up => write!(f, "up"),
            ScrollDirection::Down => write!(f, "down"),
        }
    }
}

impl FromStr for ScrollDirection {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "up" => Ok(ScrollDirection::Up),
            "down" => Ok(ScrollDirection::Down),
            _ => Err(()),
        }
    }
}

pub struct Conversation {
    messages: Vec<Message>,
    current_page: usize,
    selected_model: String,
    is_loading: bool,
    is_typing: bool,
    last_error: Option<String>,
    page_size: usize,
}

impl Conversation {
    /// Fresh session seeded with the welcome message.
    pub fn new(model: impl Into<String>) -> Self {
        let mut conversation = Self::empty(model);
        conversation.append_system(WELCOME_MESSAGE);
        conversation
    }

    fn empty(model: impl Into<String>) -> Self {
        let model = model.into();
        let selected_model = if models::is_allowed(&model) {
            model
        } else {
            models::default_model().to_string()
        };
        Self {
            messages: Vec::new(),
            current_page: 1,
            selected_model,
            is_loading: false,
            is_typing: false,
            last_error: None,
            page_size: MESSAGES_PER_PAGE,
        }
    }

    /// Rebuild from persisted parts, clamping the cursor into range and
    /// falling back to the default model if the snapshot names an unknown one.
    pub fn from_parts(messages: Vec<Message>, current_page: usize, model: impl Into<String>) -> Self {
        let mut conversation = Self::empty(model);
        conversation.messages = messages;
        conversation.current_page = current_page.clamp(1, conversation.total_pages());
        conversation
    }

    #[cfg(test)]
    pub(crate) fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self.current_page = self.current_page.clamp(1, self.total_pages());
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn selected_model(&self) -> &str {
        &self.selected_model
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.messages.len().div_ceil(self.page_size).max(1)
    }

    /// The messages visible on `page` (1-based). Out-of-range pages are empty.
    pub fn page_messages(&self, page: usize) -> &[Message] {
        if page == 0 {
            return &[];
        }
        let start = (page - 1) * self.page_size;
        if start >= self.messages.len() {
            return &[];
        }
        let end = (start + self.page_size).min(self.messages.len());
        &self.messages[start..end]
    }

    /// Append an already-sanitized user message and land the cursor on it.
    pub fn append_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
        self.current_page = self.total_pages();
    }

    pub fn append_system(&mut self, content: impl Into<String>) {
        self.messages.push(Message::system(content));
    }

    /// In-flight guard: refuse a second request while one is outstanding.
    /// On success clears the previous error and raises both activity flags.
    pub fn begin_request(&mut self) -> bool {
        if self.is_loading {
            return false;
        }
        self.is_loading = true;
        self.is_typing = true;
        self.last_error = None;
        true
    }

    /// Append the assistant reply, land on the final page and settle flags.
    pub fn complete_request(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
        self.current_page = self.total_pages();
        self.is_loading = false;
        self.is_typing = false;
    }

    /// Record a failed request: error is kept on the store and echoed into
    /// the transcript so no failure is silent.
    pub fn fail_request(&mut self, error: impl Into<String>) {
        let error = error.into();
        self.append_system(format!("Error: {error}"));
        self.last_error = Some(error);
        self.is_loading = false;
        self.is_typing = false;
    }

    /// Record an error that did not come from a completion request.
    pub fn record_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }

    /// Wipe the log down to a single fresh system message.
    pub fn clear(&mut self) {
        self.messages = vec![Message::system(CLEARED_MESSAGE)];
        self.current_page = 1;
    }

    /// Switch models; unknown ids leave the selection untouched.
    pub fn change_model(&mut self, id: &str) -> bool {
        match models::find_model(id) {
            Some(model) => {
                self.selected_model = model.id.to_string();
                true
            }
            None => false,
        }
    }

    /// Truncate the log so the most recent user message is its tail, ready
    /// to be re-sent. The retained entry is reused in place rather than
    /// duplicated; its content was sanitized when it first entered the log.
    ///
    /// Returns `false` (after appending a notice) when no user message exists.
    pub fn prepare_regenerate(&mut self) -> bool {
        let Some(last_user) = self.messages.iter().rposition(Message::is_user) else {
            self.append_system("No previous message found to regenerate.");
            return false;
        };
        self.messages.truncate(last_user + 1);
        self.current_page = self.total_pages();
        true
    }

    /// Move one page and report the page reached in the transcript.
    pub fn scroll(&mut self, direction: ScrollDirection) {
        let total = self.total_pages();
        self.current_page = match direction {
            ScrollDirection::Up => self.current_page.saturating_sub(1).max(1),
            ScrollDirection::Down => (self.current_page + 1).min(total),
        };
        self.append_system(format!(
            "Scrolled {direction} to page {} of {total}",
            self.current_page
        ));
    }

    /// Outbound request history: non-system messages only, capped at the
    /// most recent ten ahead of the trailing (user) message.
    pub fn outbound_history(&self) -> Vec<ChatMessage> {
        let non_system: Vec<&Message> = self.messages.iter().filter(|m| !m.is_system()).collect();
        let Some((tail, earlier)) = non_system.split_last() else {
            return Vec::new();
        };

        let skip = earlier.len().saturating_sub(OUTBOUND_HISTORY_LEN);
        let mut wire: Vec<ChatMessage> = earlier[skip..].iter().map(|m| to_wire(m)).collect();
        wire.push(to_wire(tail));
        wire
    }
}

fn to_wire(message: &Message) -> ChatMessage {
    ChatMessage {
        role: message.role.as_str().to_string(),
        content: message.content.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Role;

    fn conversation() -> Conversation {
        Conversation::new(models::default_model())
    }

    fn fill(conversation: &mut Conversation, count: usize) {
        for i in 0..count {
            conversation.append_user(format!("message {i}"));
        }
    }

    #[test]
    fn new_session_is_seeded_with_the_welcome_message() {
        let convo = conversation();
        assert_eq!(convo.len(), 1);
        assert!(convo.messages()[0].is_system());
        assert_eq!(convo.current_page(), 1);
    }

    #[test]
    fn unknown_model_falls_back_to_default() {
        let convo = Conversation::new("makers/nonexistent");
        assert_eq!(convo.selected_model(), models::default_model());
    }

    #[test]
    fn change_model_accepts_allow_listed_ids_only() {
        let mut convo = conversation();
        assert!(convo.change_model("anthropic/claude-3-haiku"));
        assert_eq!(convo.selected_model(), "anthropic/claude-3-haiku");

        assert!(!convo.change_model("made-up/model"));
        assert_eq!(convo.selected_model(), "anthropic/claude-3-haiku");
    }

    #[test]
    fn page_count_formula_holds_after_every_append() {
        let mut convo = Conversation::new(models::default_model()).with_page_size(5);
        for i in 0..23 {
            convo.append_user(format!("m{i}"));
            let len = convo.len();
            assert_eq!(convo.total_pages(), len.div_ceil(5).max(1));
            assert!(convo.current_page() >= 1);
            assert!(convo.current_page() <= convo.total_pages());
        }
    }

    #[test]
    fn twenty_one_messages_span_two_pages() {
        let mut convo = Conversation::new(models::default_model()).with_page_size(20);
        convo.clear();
        fill(&mut convo, 20);
        assert_eq!(convo.len(), 21);
        assert_eq!(convo.total_pages(), 2);

        let last_id = convo.messages().last().unwrap().id.clone();
        assert!(convo.page_messages(2).iter().any(|m| m.id == last_id));
        assert!(!convo.page_messages(1).iter().any(|m| m.id == last_id));
    }

    #[test]
    fn appending_lands_the_cursor_on_the_new_last_message() {
        let mut convo = Conversation::new(models::default_model()).with_page_size(2);
        fill(&mut convo, 5);
        assert_eq!(convo.current_page(), convo.total_pages());
    }

    #[test]
    fn scroll_up_floors_at_page_one() {
        let mut convo = conversation();
        convo.scroll(ScrollDirection::Up);
        convo.scroll(ScrollDirection::Up);
        assert_eq!(convo.current_page(), 1);
    }

    #[test]
    fn scroll_down_caps_at_the_last_page() {
        let mut convo = Conversation::new(models::default_model()).with_page_size(3);
        fill(&mut convo, 7);
        let total = convo.total_pages();
        for _ in 0..10 {
            convo.scroll(ScrollDirection::Down);
        }
        assert_eq!(convo.current_page(), total);
    }

    #[test]
    fn scroll_reports_the_page_reached() {
        let mut convo = Conversation::new(models::default_model()).with_page_size(2);
        fill(&mut convo, 4);
        convo.scroll(ScrollDirection::Up);
        let last = convo.messages().last().unwrap();
        assert!(last.is_system());
        assert!(last.content.starts_with("Scrolled up to page "));
    }

    #[test]
    fn clear_leaves_exactly_one_system_message_on_page_one() {
        let mut convo = conversation();
        fill(&mut convo, 30);
        convo.scroll(ScrollDirection::Up);
        convo.clear();
        assert_eq!(convo.len(), 1);
        assert!(convo.messages()[0].is_system());
        assert_eq!(convo.current_page(), 1);
        assert_eq!(convo.total_pages(), 1);
    }

    #[test]
    fn begin_request_guards_against_overlap() {
        let mut convo = conversation();
        assert!(convo.begin_request());
        assert!(convo.is_loading());
        assert!(convo.is_typing());
        // A second request while one is outstanding is refused
        assert!(!convo.begin_request());
    }

    #[test]
    fn begin_request_clears_the_previous_error() {
        let mut convo = conversation();
        convo.fail_request("boom");
        assert_eq!(convo.last_error(), Some("boom"));
        assert!(convo.begin_request());
        assert_eq!(convo.last_error(), None);
    }

    #[test]
    fn complete_request_appends_and_settles_flags() {
        let mut convo = Conversation::new(models::default_model()).with_page_size(2);
        convo.append_user("question");
        convo.begin_request();
        convo.complete_request("answer");

        assert!(!convo.is_loading());
        assert!(!convo.is_typing());
        let last = convo.messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(convo.current_page(), convo.total_pages());
    }

    #[test]
    fn fail_request_records_and_echoes_the_error() {
        let mut convo = conversation();
        convo.append_user("question");
        convo.begin_request();
        convo.fail_request("Rate limit exceeded. Please try again later.");

        assert!(!convo.is_loading());
        assert!(!convo.is_typing());
        assert_eq!(
            convo.last_error(),
            Some("Rate limit exceeded. Please try again later.")
        );
        let last = convo.messages().last().unwrap();
        assert!(last.is_system());
        assert!(last.content.starts_with("Error: "));
    }

    #[test]
    fn regenerate_with_no_user_message_appends_one_notice_only() {
        let mut convo = conversation();
        let before = convo.len();
        assert!(!convo.prepare_regenerate());
        assert_eq!(convo.len(), before + 1);
        assert!(convo.messages().last().unwrap().is_system());
        // Everything before the notice is untouched
        assert!(convo.messages()[..before].iter().all(Message::is_system));
    }

    #[test]
    fn regenerate_truncates_to_the_last_user_message() {
        let mut convo = conversation();
        convo.append_user("first");
        convo.complete_request("reply one");
        convo.append_user("second");
        convo.complete_request("reply two");
        convo.append_system("Scrolled down to page 1 of 1");

        let user_id = convo
            .messages()
            .iter()
            .rev()
            .find(|m| m.is_user())
            .unwrap()
            .id
            .clone();

        assert!(convo.prepare_regenerate());
        let last = convo.messages().last().unwrap();
        assert!(last.is_user());
        // Replace-in-place: the retained entry keeps its identity
        assert_eq!(last.id, user_id);
        assert_eq!(last.content, "second");
    }

    #[test]
    fn regenerate_truncation_clamps_the_cursor() {
        let mut convo = Conversation::new(models::default_model()).with_page_size(2);
        fill(&mut convo, 9);
        convo.append_system("padding");
        convo.append_system("padding");
        let before = convo.current_page();
        // Drop the trailing system messages; the cursor must stay in range
        assert!(convo.prepare_regenerate());
        assert!(convo.current_page() <= convo.total_pages());
        assert!(convo.current_page() <= before);
    }

    #[test]
    fn outbound_history_excludes_system_messages() {
        let mut convo = conversation();
        convo.append_user("hello");
        convo.append_system("Scrolled up to page 1 of 1");
        let wire = convo.outbound_history();
        assert!(wire.iter().all(|m| m.role != "system"));
    }

    #[test]
    fn outbound_history_caps_at_ten_plus_the_new_message() {
        let mut convo = conversation();
        for i in 0..15 {
            convo.append_user(format!("q{i}"));
            convo.complete_request(format!("a{i}"));
        }
        convo.append_user("latest");

        let wire = convo.outbound_history();
        assert_eq!(wire.len(), OUTBOUND_HISTORY_LEN + 1);
        assert_eq!(wire.last().unwrap().content, "latest");
        // The ten entries before the tail are the most recent ones
        assert_eq!(wire[0].content, "q10");
    }

    #[test]
    fn outbound_history_of_a_fresh_session_is_empty() {
        let convo = conversation();
        assert!(convo.outbound_history().is_empty());
    }

    #[test]
    fn snapshot_parts_clamp_cursor_and_model() {
        let messages = vec![Message::system("w"), Message::user("hi")];
        let convo = Conversation::from_parts(messages, 99, "bogus/model");
        assert_eq!(convo.current_page(), convo.total_pages());
        assert_eq!(convo.selected_model(), models::default_model());
    }
}
