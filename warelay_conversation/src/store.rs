//! Process-wide map from user id to live session.
//!
//! Expiry happens twice: lazily when `get_or_create` finds a stale entry,
//! and proactively from a periodic sweep so idle memory stays bounded even
//! with no further traffic. Each entry is an `Arc<Mutex<Session>>`; the
//! pipeline holds that lock for the whole exchange, which serializes
//! near-simultaneous messages from the same user.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::session::{Preamble, Session};

pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
    preamble: Preamble,
    max_context_messages: usize,
    timeout: Duration,
}

impl SessionStore {
    #[must_use]
    pub fn new(preamble: Preamble, max_context_messages: usize, timeout_minutes: i64) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            preamble,
            max_context_messages,
            timeout: Duration::minutes(timeout_minutes),
        }
    }

    /// Live session for this user, discarding an idle-expired one first.
    pub async fn get_or_create(&self, user_id: &str) -> Arc<Mutex<Session>> {
        self.get_or_create_at(user_id, Utc::now()).await
    }

    pub async fn get_or_create_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.lock().await;

        if let Some(entry) = sessions.get(user_id) {
            // A held lock means the session is mid-exchange, hence not idle.
            let expired = entry
                .try_lock()
                .map(|session| session.is_idle_beyond(self.timeout, now))
                .unwrap_or(false);

            if expired {
                debug!("Discarding expired session for {user_id}");
            } else {
                return Arc::clone(entry);
            }
        }

        let fresh = Arc::new(Mutex::new(Session::new(
            user_id,
            &self.preamble,
            self.max_context_messages,
            now,
        )));
        sessions.insert(user_id.to_string(), Arc::clone(&fresh));
        fresh
    }

    /// Remove every session idle beyond the timeout. Returns how many.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();

        sessions.retain(|user_id, entry| {
            let expired = entry
                .try_lock()
                .map(|session| session.is_idle_beyond(self.timeout, now))
                .unwrap_or(false);
            if expired {
                info!("Session expired for {user_id}");
            }
            !expired
        });

        before - sessions.len()
    }

    /// Run `sweep_expired` on a fixed interval, independent of traffic.
    pub fn spawn_sweeper(self: &Arc<Self>, every: std::time::Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                store.sweep_expired(Utc::now()).await;
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
