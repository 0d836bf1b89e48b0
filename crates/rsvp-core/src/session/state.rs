//! Conversation state keyed by phone number

use std::sync::Arc;

use tracing::info;

use crate::llm::{HISTORY_WINDOW, Message};

use super::kv::{DashMapStore, KeyValueStore};

/// Event awaiting `!borrar confirmar`
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDeletion {
    pub event_id: Option<i64>,
    pub event_name: Option<String>,
}

/// Guest reply held back until the guest picks one of the listed events
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReply {
    pub text: String,
    /// Event ids in the order they were listed to the guest
    pub event_ids: Vec<i64>,
}

impl PendingReply {
    /// Event id behind a 1-based choice from the listed prompt
    pub fn event_for_choice(&self, choice: usize) -> Option<i64> {
        choice.checked_sub(1).and_then(|i| self.event_ids.get(i)).copied()
    }
}

/// Everything the bot remembers about one phone number between messages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Event an organizer is currently working on
    pub active_event: Option<i64>,
    /// A numbered event list was sent and an index is expected next
    pub awaiting_selection: bool,
    /// Set while a deletion waits for confirmation
    pub pending_deletion: Option<PendingDeletion>,
    /// Recent assistant turns, oldest first
    pub history: Vec<Message>,
    /// Set while a multi-event guest is asked which event a reply is for
    pub pending_reply: Option<PendingReply>,
}

/// Session store over an injectable key-value backend
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore<SessionState>>,
}

impl SessionStore {
    /// Create a session store backed by an in-memory concurrent map
    pub fn new() -> Self {
        Self::with_backend(Arc::new(DashMapStore::new()))
    }

    pub fn with_backend(backend: Arc<dyn KeyValueStore<SessionState>>) -> Self {
        Self { backend }
    }

    /// Current state for `number`; an empty state when none exists
    pub fn get(&self, number: &str) -> SessionState {
        self.backend.get(number).unwrap_or_default()
    }

    fn update(&self, number: &str, mut f: impl FnMut(&mut SessionState)) {
        self.backend.update(number, &mut |state| f(state));
    }

    pub fn set_active_event(&self, number: &str, event_id: i64) {
        self.update(number, |state| state.active_event = Some(event_id));
        info!("Active event set for {}: {}", number, event_id);
    }

    pub fn clear_active_event(&self, number: &str) {
        self.update(number, |state| state.active_event = None);
    }

    pub fn active_event(&self, number: &str) -> Option<i64> {
        self.get(number).active_event
    }

    pub fn set_waiting_for_selection(&self, number: &str, waiting: bool) {
        self.update(number, |state| state.awaiting_selection = waiting);
    }

    pub fn is_waiting_for_selection(&self, number: &str) -> bool {
        self.get(number).awaiting_selection
    }

    /// Start (`confirming = true`) or cancel a pending deletion.
    ///
    /// Cancelling drops the stored target as well.
    pub fn set_confirming_deletion(
        &self,
        number: &str,
        event_id: Option<i64>,
        event_name: Option<String>,
        confirming: bool,
    ) {
        self.update(number, |state| {
            state.pending_deletion = confirming.then(|| PendingDeletion {
                event_id,
                event_name: event_name.clone(),
            });
        });
    }

    pub fn is_confirming_deletion(&self, number: &str) -> bool {
        self.get(number).pending_deletion.is_some()
    }

    /// Target of the pending deletion, `(None, None)` if there is none
    pub fn event_to_delete(&self, number: &str) -> (Option<i64>, Option<String>) {
        match self.get(number).pending_deletion {
            Some(pending) => (pending.event_id, pending.event_name),
            None => (None, None),
        }
    }

    /// Assistant history, oldest first
    pub fn history(&self, number: &str) -> Vec<Message> {
        self.get(number).history
    }

    /// Append an exchange, keeping only the last entries of the window
    pub fn push_history(&self, number: &str, user: &str, assistant: &str) {
        self.update(number, |state| {
            state.history.push(Message::user(user));
            state.history.push(Message::assistant(assistant));
            let overflow = state.history.len().saturating_sub(HISTORY_WINDOW);
            state.history.drain(..overflow);
        });
    }

    pub fn set_pending_reply(&self, number: &str, reply: PendingReply) {
        self.update(number, |state| state.pending_reply = Some(reply.clone()));
    }

    /// Take the held-back guest reply, leaving none behind
    pub fn take_pending_reply(&self, number: &str) -> Option<PendingReply> {
        let mut taken = None;
        self.update(number, |state| taken = state.pending_reply.take());
        taken
    }

    pub fn clear(&self, number: &str) {
        if self.backend.delete(number).is_some() {
            info!("Session cleared for {}", number);
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_number_reads_empty_state() {
        let store = SessionStore::new();
        assert_eq!(store.get("5551"), SessionState::default());
        assert_eq!(store.active_event("5551"), None);
        assert!(!store.is_waiting_for_selection("5551"));
    }

    #[test]
    fn test_active_event_and_selection_flag() {
        let store = SessionStore::new();
        store.set_active_event("5551", 7);
        store.set_waiting_for_selection("5551", true);

        assert_eq!(store.active_event("5551"), Some(7));
        assert!(store.is_waiting_for_selection("5551"));

        store.set_waiting_for_selection("5551", false);
        assert!(!store.is_waiting_for_selection("5551"));
        assert_eq!(store.active_event("5551"), Some(7));

        store.clear_active_event("5551");
        assert_eq!(store.active_event("5551"), None);
    }

    #[test]
    fn test_confirming_deletion_roundtrip() {
        let store = SessionStore::new();
        store.set_confirming_deletion("5551", Some(3), Some("Boda".to_string()), true);
        assert!(store.is_confirming_deletion("5551"));
        assert_eq!(store.event_to_delete("5551"), (Some(3), Some("Boda".to_string())));

        store.set_confirming_deletion("5551", None, None, false);
        assert!(!store.is_confirming_deletion("5551"));
        assert_eq!(store.event_to_delete("5551"), (None, None));
    }

    #[test]
    fn test_history_is_bounded() {
        let store = SessionStore::new();
        for i in 0..8 {
            store.push_history("5551", &format!("q{}", i), &format!("a{}", i));
        }
        let history = store.history("5551");
        assert_eq!(history.len(), HISTORY_WINDOW);
        assert_eq!(history.last().unwrap().content, "a7");
        assert_eq!(history.first().unwrap().content, "q3");
    }

    #[test]
    fn test_take_pending_reply_clears_it() {
        let store = SessionStore::new();
        store.set_pending_reply(
            "5551",
            PendingReply {
                text: "sí voy".to_string(),
                event_ids: vec![4, 9],
            },
        );

        let pending = store.take_pending_reply("5551").unwrap();
        assert_eq!(pending.text, "sí voy");
        assert_eq!(store.take_pending_reply("5551"), None);
    }

    #[test]
    fn test_pending_reply_choice_follows_listed_order() {
        let pending = PendingReply {
            text: "no voy".to_string(),
            event_ids: vec![9, 4],
        };
        assert_eq!(pending.event_for_choice(1), Some(9));
        assert_eq!(pending.event_for_choice(2), Some(4));
        assert_eq!(pending.event_for_choice(0), None);
        assert_eq!(pending.event_for_choice(3), None);
    }

    #[test]
    fn test_clear_removes_state() {
        let store = SessionStore::new();
        store.set_active_event("5551", 1);
        store.clear("5551");
        assert_eq!(store.active_event("5551"), None);
    }
}
