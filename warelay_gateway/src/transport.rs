//! Transport-facing event plumbing.
//!
//! The concrete transport (socket, pairing, credential persistence,
//! reconnection) lives out of tree; it feeds this event stream and
//! implements [`warelay_core::TransportSender`] for the outbound half.
//! Connection lifecycle events are consumed here for observability only —
//! reconnect and re-pair policy is owned by the transport itself, which
//! persists its credentials under the per-deployment auth directory.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::message::InboundMessage;
use crate::pipeline::ReplyPipeline;
use crate::status::DeliveryTracker;

#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    Open,
    Closed { logged_out: bool },
    PairingCode(String),
}

#[derive(Debug, Clone)]
pub enum TransportEvent {
    Connection(ConnectionEvent),
    Message(InboundMessage),
    Status { message_id: String, status: u32 },
}

/// Drain the transport's event stream until it closes.
///
/// Every inbound message becomes its own task; two messages never block
/// each other here. Ordering between messages of the same user is the
/// transport's guarantee, serialization of their session mutation is the
/// pipeline's.
pub async fn run_events(
    pipeline: Arc<ReplyPipeline>,
    tracker: Arc<DeliveryTracker>,
    mut events: mpsc::Receiver<TransportEvent>,
) {
    while let Some(event) = events.recv().await {
        match event {
            TransportEvent::Message(message) => {
                let pipeline = Arc::clone(&pipeline);
                tokio::spawn(async move {
                    pipeline.handle(message).await;
                });
            }
            TransportEvent::Status { message_id, status } => {
                tracker.record(message_id, status).await;
            }
            TransportEvent::Connection(ConnectionEvent::Open) => {
                info!("Transport connected");
            }
            TransportEvent::Connection(ConnectionEvent::Closed { logged_out }) => {
                warn!("Transport connection closed (logged_out: {logged_out})");
            }
            TransportEvent::Connection(ConnectionEvent::PairingCode(code)) => {
                info!("Transport pairing code: {code}");
            }
        }
    }
    info!("Transport event stream ended");
}
