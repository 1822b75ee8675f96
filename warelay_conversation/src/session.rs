//! A session is one user's bounded conversation window.
//!
//! The first two history entries are always the fixed system instruction
//! and its acknowledgment; they are never evicted. Everything after them
//! is a sliding window of user/model exchange pairs.

use chrono::{DateTime, Duration, Utc};

use warelay_core::ChatMessage;

/// Fixed instruction/acknowledgment pair seeded into every fresh session.
#[derive(Debug, Clone)]
pub struct Preamble {
    pub instruction: String,
    pub acknowledgment: String,
}

impl Preamble {
    #[must_use]
    pub fn new(instruction: impl Into<String>, acknowledgment: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            acknowledgment: acknowledgment.into(),
        }
    }
}

/// Conversation state for a single user.
#[derive(Debug, Clone)]
pub struct Session {
    user_id: String,
    history: Vec<ChatMessage>,
    last_active: DateTime<Utc>,
    max_context_messages: usize,
}

impl Session {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        preamble: &Preamble,
        max_context_messages: usize,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            history: vec![
                ChatMessage::user(preamble.instruction.clone()),
                ChatMessage::model(preamble.acknowledgment.clone()),
            ],
            last_active: now,
            max_context_messages,
        }
    }

    /// Append a user turn, evicting the oldest post-preamble pair first
    /// when the window is full.
    pub fn append_user(&mut self, text: impl Into<String>) {
        if self.history.len() >= self.capacity() {
            self.history.drain(2..4);
        }
        self.history.push(ChatMessage::user(text));
        self.last_active = Utc::now();
    }

    /// Append a model turn.
    pub fn append_model(&mut self, text: impl Into<String>) {
        self.history.push(ChatMessage::model(text));
        self.last_active = Utc::now();
    }

    #[must_use]
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub const fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    #[must_use]
    pub fn is_idle_beyond(&self, timeout: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_active > timeout
    }

    /// Upper bound on history length: the preamble pair plus
    /// `max_context_messages` exchange pairs.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        2 * self.max_context_messages + 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warelay_core::Role;

    fn preamble() -> Preamble {
        Preamble::new("Be nice.", "Okay, ready.")
    }

    fn session(max_context: usize) -> Session {
        Session::new("972000000000", &preamble(), max_context, Utc::now())
    }

    #[test]
    fn fresh_session_is_seeded_with_preamble() {
        let session = session(5);
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[0].role, Role::User);
        assert_eq!(session.history()[0].text, "Be nice.");
        assert_eq!(session.history()[1].role, Role::Model);
        assert_eq!(session.history()[1].text, "Okay, ready.");
    }

    #[test]
    fn history_never_exceeds_bound() {
        let mut session = session(5);
        for i in 0..50 {
            session.append_user(format!("question {i}"));
            session.append_model(format!("answer {i}"));
            assert!(session.history().len() <= session.capacity());
        }
        assert_eq!(session.history().len(), 2 * 5 + 2);
    }

    #[test]
    fn preamble_survives_eviction() {
        let mut session = session(2);
        for i in 0..20 {
            session.append_user(format!("question {i}"));
            session.append_model(format!("answer {i}"));
        }
        assert_eq!(session.history()[0].text, "Be nice.");
        assert_eq!(session.history()[1].text, "Okay, ready.");
    }

    #[test]
    fn eviction_drops_oldest_pair_first() {
        let mut session = session(2);
        session.append_user("q0");
        session.append_model("a0");
        session.append_user("q1");
        session.append_model("a1");
        // Window full: next user turn must push out (q0, a0).
        session.append_user("q2");
        let texts: Vec<&str> = session.history().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["Be nice.", "Okay, ready.", "q1", "a1", "q2"]);
    }

    #[test]
    fn idle_check_uses_timeout() {
        let session = session(5);
        let now = Utc::now();
        assert!(!session.is_idle_beyond(Duration::minutes(15), now));
        assert!(session.is_idle_beyond(Duration::minutes(15), now + Duration::minutes(16)));
    }
}
