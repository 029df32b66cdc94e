//! Message relay: local sends out to the topic, passkey-matched transcripts
//! in to the log.

use std::time::{SystemTime, UNIX_EPOCH};

use trx_core::error::Result;
use trx_core::message::Message;
use trx_core::wire::{Envelope, EnvelopeKind};
use trx_services::{MessageLog, SessionState};

use crate::dispatch::EnvelopeService;
use crate::medium::Publisher;

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Clone)]
pub struct MessageRelay {
    session: SessionState,
    log: MessageLog,
}

impl MessageRelay {
    pub fn new(session: SessionState, log: MessageLog) -> Self {
        Self { session, log }
    }

    /// Record `text` locally and, when a topic is bound, publish it to the
    /// other members. Whitespace-only text is ignored and yields `None`.
    pub fn send(
        &self,
        user_name: &str,
        text: &str,
        topic: Option<&Publisher>,
    ) -> Result<Option<Message>> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let message = Message::local(user_name, text, now_ms());
        self.log.append(message.clone());

        match (topic, self.session.passkey()) {
            (Some(publisher), Some(passkey)) => {
                publisher.publish(&Envelope::transcript(&passkey, message.clone()))?;
                tracing::debug!(topic = publisher.topic(), id = %message.id, "transcript sent");
            }
            _ => tracing::trace!(id = %message.id, "message kept local, no topic bound"),
        }

        Ok(Some(message))
    }
}

impl EnvelopeService for MessageRelay {
    fn name(&self) -> &'static str {
        "message-relay"
    }

    fn kinds(&self) -> &'static [EnvelopeKind] {
        &[EnvelopeKind::Transcript]
    }

    fn handle(&self, envelope: &Envelope, _reply: &Publisher) -> Result<()> {
        let Envelope::Transcript { payload } = envelope else {
            return Ok(());
        };
        let Some(passkey) = self.session.passkey() else {
            return Ok(());
        };

        if !passkey.matches(&payload.passkey) {
            tracing::trace!("transcript for another passkey dropped");
            return Ok(());
        }

        let message = payload.transcript_data.clone().into_remote();
        tracing::debug!(id = %message.id, from = %message.user_name, "transcript received");
        self.log.append(message);
        Ok(())
    }
}
