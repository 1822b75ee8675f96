//! Per-message reply pipeline.
//!
//! Each inbound message runs this state machine independently:
//! extract text, validate size, check the sender allow-list, wait the
//! reply delay, re-check the schedule gate and delivery status, then
//! drive the session through the completion adapter and send the reply.
//! Every failure is scoped to the one message being handled.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use warelay_config::Config;
use warelay_core::TransportSender;
use warelay_conversation::{CompletionClient, SessionStore};
use warelay_providers::KeyPool;

use crate::error::Error;
use crate::message::InboundMessage;
use crate::schedule::ScheduleGate;
use crate::status::DeliveryTracker;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_message_chars: usize,
    /// Wait between receipt and dispatch so read receipts can settle.
    pub reply_delay: Duration,
    /// Empty means no sender restriction.
    pub allowed_senders: Vec<String>,
    pub too_long_text: String,
    pub technical_error_text: String,
}

impl PipelineConfig {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_message_chars: config.gateway.max_message_chars,
            reply_delay: Duration::from_secs(config.gateway.reply_delay_secs),
            allowed_senders: config.gateway.allowed_senders.clone(),
            too_long_text: config.texts.too_long.clone(),
            technical_error_text: config.texts.technical_error.clone(),
        }
    }
}

/// Terminal state of one message's handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Self-sent or no extractable text; dropped silently.
    Ignored,
    /// Over the length cap; the fixed notice was sent.
    TooLong,
    /// Sender not on the allow-list; dropped silently.
    Unauthorized,
    /// Schedule gate or read-status check stopped the dispatch.
    Suppressed,
    Replied,
    Failed,
}

pub struct ReplyPipeline {
    config: PipelineConfig,
    gate: ScheduleGate,
    store: Arc<SessionStore>,
    pool: Arc<KeyPool>,
    tracker: Arc<DeliveryTracker>,
    completion: CompletionClient,
    transport: Arc<dyn TransportSender>,
}

impl ReplyPipeline {
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        gate: ScheduleGate,
        store: Arc<SessionStore>,
        pool: Arc<KeyPool>,
        tracker: Arc<DeliveryTracker>,
        completion: CompletionClient,
        transport: Arc<dyn TransportSender>,
    ) -> Self {
        Self {
            config,
            gate,
            store,
            pool,
            tracker,
            completion,
            transport,
        }
    }

    fn is_allowed(&self, user_id: &str) -> bool {
        self.config.allowed_senders.is_empty()
            || self.config.allowed_senders.iter().any(|s| s == user_id)
    }

    async fn send(&self, jid: &str, text: &str) -> crate::error::Result<()> {
        self.transport
            .send_text(jid, text)
            .await
            .map_err(Error::Transport)
    }

    pub async fn handle(&self, message: InboundMessage) -> Outcome {
        if message.from_me {
            return Outcome::Ignored;
        }

        let Some(text) = message.text() else {
            return Outcome::Ignored;
        };
        let text = text.trim();
        if text.is_empty() {
            return Outcome::Ignored;
        }

        if text.chars().count() > self.config.max_message_chars {
            if let Err(err) = self.send(&message.chat_jid, &self.config.too_long_text).await {
                error!("Failed to send length notice: {err}");
            }
            return Outcome::TooLong;
        }

        let user_id = message.user_id().to_string();
        if !self.is_allowed(&user_id) {
            debug!("Blocked message from unauthorized number: {user_id}");
            return Outcome::Unauthorized;
        }

        // Deliberate pause before dispatch; the gate and the status cache
        // are re-checked after it, not before.
        sleep(self.config.reply_delay).await;

        if !self.gate.allows_now() {
            debug!("Outside response window, suppressing reply to {user_id}");
            return Outcome::Suppressed;
        }
        if self.tracker.is_read(&message.id).await {
            debug!("Message {} already read, suppressing reply", message.id);
            return Outcome::Suppressed;
        }

        let entry = self.store.get_or_create(&user_id).await;
        let provider = self.pool.provider_for(&user_id).await;
        let mut session = entry.lock().await;

        match self
            .completion
            .reply(provider.as_ref(), &mut session, text)
            .await
        {
            Ok(reply) => match self.send(&message.chat_jid, &reply).await {
                Ok(()) => Outcome::Replied,
                Err(err) => {
                    error!("Failed to deliver reply to {user_id}: {err}");
                    Outcome::Failed
                }
            },
            Err(err) => {
                warn!("Completion error for {user_id}: {err}");
                if let Err(send_err) = self
                    .send(&message.chat_jid, &self.config.technical_error_text)
                    .await
                {
                    error!("Failed to send error notice: {send_err}");
                }
                Outcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageContent;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;
    use warelay_core::{ChatMessage, CompletionError, CompletionProvider};
    use warelay_conversation::Preamble;
    use warelay_providers::RetryPolicy;

    const REPLY: &str = "mock reply";
    const TOO_LONG: &str = "too long";
    const TECH_ERROR: &str = "technical error";
    const APOLOGY: &str = "apology";

    struct MockProvider {
        calls: Arc<AtomicUsize>,
        fail_permanently: bool,
    }

    #[async_trait]
    impl CompletionProvider for MockProvider {
        async fn generate(&self, _history: &[ChatMessage]) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_permanently {
                Err(CompletionError::Permanent(anyhow!("invalid key")))
            } else {
                Ok(REPLY.to_string())
            }
        }
    }

    #[derive(Default)]
    struct MockTransport {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl TransportSender for MockTransport {
        async fn send_text(&self, jid: &str, text: &str) -> anyhow::Result<()> {
            self.sent.lock().await.push((jid.to_string(), text.to_string()));
            Ok(())
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl TransportSender for FailingTransport {
        async fn send_text(&self, _jid: &str, _text: &str) -> anyhow::Result<()> {
            Err(anyhow!("socket closed"))
        }
    }

    struct Harness {
        pipeline: ReplyPipeline,
        store: Arc<SessionStore>,
        transport: Arc<MockTransport>,
        tracker: Arc<DeliveryTracker>,
        calls: Arc<AtomicUsize>,
    }

    fn allow_all_gate() -> ScheduleGate {
        ScheduleGate::new(chrono_tz::UTC, vec![0, 1, 2, 3, 4, 5, 6], 0, 24)
    }

    fn deny_all_gate() -> ScheduleGate {
        ScheduleGate::new(chrono_tz::UTC, Vec::new(), 0, 24)
    }

    fn pipeline_config(allowed_senders: Vec<String>) -> PipelineConfig {
        PipelineConfig {
            max_message_chars: 100,
            reply_delay: Duration::ZERO,
            allowed_senders,
            too_long_text: TOO_LONG.to_string(),
            technical_error_text: TECH_ERROR.to_string(),
        }
    }

    fn harness_with(
        gate: ScheduleGate,
        allowed_senders: Vec<String>,
        fail_permanently: bool,
    ) -> Harness {
        let calls = Arc::new(AtomicUsize::new(0));
        let providers: Vec<Arc<dyn CompletionProvider>> = vec![Arc::new(MockProvider {
            calls: Arc::clone(&calls),
            fail_permanently,
        })];
        let pool = Arc::new(KeyPool::new(providers).expect("non-empty pool"));
        let store = Arc::new(SessionStore::new(Preamble::new("Be nice.", "Okay."), 5, 15));
        let tracker = Arc::new(DeliveryTracker::new());
        let transport = Arc::new(MockTransport::default());
        let completion =
            CompletionClient::new(RetryPolicy::new(5, Duration::ZERO), APOLOGY);

        let pipeline = ReplyPipeline::new(
            pipeline_config(allowed_senders),
            gate,
            Arc::clone(&store),
            pool,
            Arc::clone(&tracker),
            completion,
            transport.clone() as Arc<dyn TransportSender>,
        );

        Harness {
            pipeline,
            store,
            transport: transport.clone(),
            tracker,
            calls,
        }
    }

    fn harness() -> Harness {
        harness_with(allow_all_gate(), Vec::new(), false)
    }

    fn text_message(text: &str) -> InboundMessage {
        InboundMessage {
            id: "MSG1".to_string(),
            chat_jid: "972111111111@s.whatsapp.net".to_string(),
            sender_jid: "972111111111@s.whatsapp.net".to_string(),
            participant_jid: None,
            from_me: false,
            content: MessageContent::Text(text.to_string()),
        }
    }

    #[tokio::test]
    async fn replies_to_a_plain_text_message() {
        let h = harness();
        let outcome = h.pipeline.handle(text_message("hello")).await;

        assert_eq!(outcome, Outcome::Replied);
        assert_eq!(h.calls.load(Ordering::SeqCst), 1);
        let sent = h.transport.sent.lock().await;
        assert_eq!(
            *sent,
            vec![("972111111111@s.whatsapp.net".to_string(), REPLY.to_string())]
        );
        assert_eq!(h.store.len().await, 1);
    }

    #[tokio::test]
    async fn ignores_self_sent_messages() {
        let h = harness();
        let mut msg = text_message("hello");
        msg.from_me = true;

        assert_eq!(h.pipeline.handle(msg).await, Outcome::Ignored);
        assert!(h.transport.sent.lock().await.is_empty());
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ignores_whitespace_only_and_textless_content() {
        let h = harness();
        assert_eq!(h.pipeline.handle(text_message("   ")).await, Outcome::Ignored);

        let mut msg = text_message("");
        msg.content = MessageContent::Other;
        assert_eq!(h.pipeline.handle(msg).await, Outcome::Ignored);

        assert!(h.transport.sent.lock().await.is_empty());
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn oversized_message_gets_notice_and_never_reaches_completion() {
        let h = harness();
        let outcome = h.pipeline.handle(text_message(&"x".repeat(101))).await;

        assert_eq!(outcome, Outcome::TooLong);
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
        assert!(h.store.is_empty().await);
        let sent = h.transport.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, TOO_LONG);
    }

    #[tokio::test]
    async fn message_at_the_cap_passes() {
        let h = harness();
        let outcome = h.pipeline.handle(text_message(&"x".repeat(100))).await;
        assert_eq!(outcome, Outcome::Replied);
    }

    #[tokio::test]
    async fn unauthorized_sender_causes_no_sends_and_no_session() {
        let h = harness_with(allow_all_gate(), vec!["972999999999".to_string()], false);
        let outcome = h.pipeline.handle(text_message("hello")).await;

        assert_eq!(outcome, Outcome::Unauthorized);
        assert!(h.transport.sent.lock().await.is_empty());
        assert!(h.store.is_empty().await);
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn allow_list_admits_configured_sender() {
        let h = harness_with(allow_all_gate(), vec!["972111111111".to_string()], false);
        assert_eq!(h.pipeline.handle(text_message("hello")).await, Outcome::Replied);
    }

    #[tokio::test]
    async fn gate_denial_suppresses_after_validation() {
        let h = harness_with(deny_all_gate(), Vec::new(), false);
        let outcome = h.pipeline.handle(text_message("hello")).await;

        assert_eq!(outcome, Outcome::Suppressed);
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
        assert!(h.transport.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn read_message_is_not_answered() {
        let h = harness();
        h.tracker.record("MSG1", crate::status::STATUS_READ).await;

        let outcome = h.pipeline.handle(text_message("hello")).await;

        assert_eq!(outcome, Outcome::Suppressed);
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
        assert!(h.transport.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn lower_delivery_status_does_not_suppress() {
        let h = harness();
        h.tracker.record("MSG1", 2).await;
        assert_eq!(h.pipeline.handle(text_message("hello")).await, Outcome::Replied);
    }

    #[tokio::test]
    async fn permanent_completion_failure_sends_error_notice() {
        let h = harness_with(allow_all_gate(), Vec::new(), true);
        let outcome = h.pipeline.handle(text_message("hello")).await;

        assert_eq!(outcome, Outcome::Failed);
        let sent = h.transport.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, TECH_ERROR);
    }

    #[tokio::test]
    async fn delivery_failure_is_abandoned_without_retry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let providers: Vec<Arc<dyn CompletionProvider>> = vec![Arc::new(MockProvider {
            calls: Arc::clone(&calls),
            fail_permanently: false,
        })];
        let pool = Arc::new(KeyPool::new(providers).expect("non-empty pool"));
        let store = Arc::new(SessionStore::new(Preamble::new("Be nice.", "Okay."), 5, 15));
        let pipeline = ReplyPipeline::new(
            pipeline_config(Vec::new()),
            allow_all_gate(),
            store,
            pool,
            Arc::new(DeliveryTracker::new()),
            CompletionClient::new(RetryPolicy::new(5, Duration::ZERO), APOLOGY),
            Arc::new(FailingTransport),
        );

        assert_eq!(pipeline.handle(text_message("hello")).await, Outcome::Failed);
        // The completion ran; only delivery failed.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn successive_messages_share_one_session() {
        let h = harness();
        h.pipeline.handle(text_message("first")).await;
        h.pipeline.handle(text_message("second")).await;

        assert_eq!(h.store.len().await, 1);
        let entry = h.store.get_or_create("972111111111").await;
        let session = entry.lock().await;
        // Preamble + two exchanges.
        assert_eq!(session.history().len(), 6);
    }
}
