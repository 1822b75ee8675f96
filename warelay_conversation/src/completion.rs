//! Adapter between a session and the completion provider.
//!
//! Owns the retry discipline: transient upstream failures are retried with
//! linear backoff up to a cap, then degraded to a canned apology so the
//! pipeline still answers. Permanent failures propagate untouched. On
//! success the reply is appended to the session as a model turn before it
//! is returned; callers (and mock providers in tests) rely on that append
//! happening here.

use anyhow::anyhow;
use tracing::{debug, warn};

use warelay_core::{CompletionError, CompletionProvider};
use warelay_providers::retry::{RetryPolicy, retry_transient};

use crate::session::Session;

pub struct CompletionClient {
    policy: RetryPolicy,
    apology_text: String,
}

impl CompletionClient {
    #[must_use]
    pub fn new(policy: RetryPolicy, apology_text: impl Into<String>) -> Self {
        Self {
            policy,
            apology_text: apology_text.into(),
        }
    }

    /// Produce the next reply for `user_input`, mutating the session.
    ///
    /// Appends the user turn (bound-evicting), calls the provider with the
    /// full history, and on success appends the model turn. Exhausted
    /// transient retries yield the apology text, not an error; the apology
    /// is never recorded in history.
    pub async fn reply(
        &self,
        provider: &dyn CompletionProvider,
        session: &mut Session,
        user_input: &str,
    ) -> Result<String, CompletionError> {
        session.append_user(user_input);

        let history = session.history();
        let outcome = retry_transient(|| provider.generate(history), &self.policy).await;

        match outcome {
            Ok(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    return Err(CompletionError::Permanent(anyhow!(
                        "empty completion for user {}",
                        session.user_id()
                    )));
                }
                debug!("Completion succeeded for user {}", session.user_id());
                session.append_model(text.clone());
                Ok(text)
            }
            Err(CompletionError::Transient(reason)) => {
                warn!(
                    "Completion exhausted {} attempts for user {}: {reason}. Sending apology.",
                    self.policy.max_attempts,
                    session.user_id()
                );
                Ok(self.apology_text.clone())
            }
            Err(err) => Err(err),
        }
    }
}
