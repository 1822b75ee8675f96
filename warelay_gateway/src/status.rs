//! Last observed delivery status per message id.
//!
//! The transport feeds status updates in; the pipeline consults the cache
//! at dispatch time to avoid auto-replying to a message the user already
//! read through other means while the reply delay was pending.

use std::collections::HashMap;
use tokio::sync::RwLock;

/// Status code the transport reports once the user has read a message.
pub const STATUS_READ: u32 = 4;

#[derive(Default)]
pub struct DeliveryTracker {
    statuses: RwLock<HashMap<String, u32>>,
}

impl DeliveryTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, message_id: impl Into<String>, status: u32) {
        self.statuses.write().await.insert(message_id.into(), status);
    }

    pub async fn status_of(&self, message_id: &str) -> Option<u32> {
        self.statuses.read().await.get(message_id).copied()
    }

    pub async fn is_read(&self, message_id: &str) -> bool {
        self.status_of(message_id).await == Some(STATUS_READ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_message_is_not_read() {
        let tracker = DeliveryTracker::new();
        assert!(!tracker.is_read("MSG1").await);
    }

    #[tokio::test]
    async fn keeps_last_observed_status() {
        let tracker = DeliveryTracker::new();
        tracker.record("MSG1", 2).await;
        assert!(!tracker.is_read("MSG1").await);

        tracker.record("MSG1", STATUS_READ).await;
        assert!(tracker.is_read("MSG1").await);
        assert_eq!(tracker.status_of("MSG1").await, Some(STATUS_READ));
    }
}
