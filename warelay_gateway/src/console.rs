//! Stdin/stdout transport for local development.
//!
//! Each line typed becomes one inbound message from a fixed sender JID,
//! so the whole pipeline — validation, gating, sessions, completion —
//! runs exactly as it would against the production transport.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use uuid::Uuid;

use warelay_core::TransportSender;

use crate::message::{InboundMessage, MessageContent};
use crate::transport::{ConnectionEvent, TransportEvent};

pub struct ConsoleTransport;

impl ConsoleTransport {
    /// Start reading stdin; returns the sender half and the event stream.
    #[must_use]
    pub fn start(user_jid: impl Into<String>) -> (Arc<Self>, mpsc::Receiver<TransportEvent>) {
        let jid = user_jid.into();
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let _ = tx
                .send(TransportEvent::Connection(ConnectionEvent::Open))
                .await;

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let message = InboundMessage {
                    id: Uuid::now_v7().to_string(),
                    chat_jid: jid.clone(),
                    sender_jid: jid.clone(),
                    participant_jid: None,
                    from_me: false,
                    content: MessageContent::Text(line),
                };
                if tx.send(TransportEvent::Message(message)).await.is_err() {
                    break;
                }
            }

            let _ = tx
                .send(TransportEvent::Connection(ConnectionEvent::Closed {
                    logged_out: false,
                }))
                .await;
        });

        (Arc::new(Self), rx)
    }
}

#[async_trait]
impl TransportSender for ConsoleTransport {
    async fn send_text(&self, _jid: &str, text: &str) -> anyhow::Result<()> {
        println!("{text}");
        Ok(())
    }
}
