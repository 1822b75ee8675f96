//! Inbound message model and plain-text extraction.

/// Content shapes the transport can deliver text in.
#[derive(Debug, Clone)]
pub enum MessageContent {
    Text(String),
    ExtendedText(String),
    Image { caption: Option<String> },
    Video { caption: Option<String> },
    Document { caption: Option<String> },
    Other,
}

/// One message as delivered by the transport.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Stable per-message identifier, also the delivery-status key.
    pub id: String,
    /// Chat the reply goes back to.
    pub chat_jid: String,
    pub sender_jid: String,
    /// Set for group-style sources; takes precedence over `sender_jid`
    /// when deriving the user id.
    pub participant_jid: Option<String>,
    pub from_me: bool,
    pub content: MessageContent,
}

impl InboundMessage {
    /// Plain text carried by the message, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) | MessageContent::ExtendedText(text) => Some(text),
            MessageContent::Image { caption }
            | MessageContent::Video { caption }
            | MessageContent::Document { caption } => caption.as_deref(),
            MessageContent::Other => None,
        }
    }

    /// Stable user id: the phone part of the participant (group sources)
    /// or sender address.
    #[must_use]
    pub fn user_id(&self) -> &str {
        let jid = self.participant_jid.as_deref().unwrap_or(&self.sender_jid);
        phone_from_jid(jid)
    }
}

/// Digits before the `@` of a JID-style address.
#[must_use]
pub fn phone_from_jid(jid: &str) -> &str {
    jid.split('@').next().unwrap_or(jid)
}
