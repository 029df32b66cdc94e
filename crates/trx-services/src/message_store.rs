use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use trx_core::message::Message;

/// In-memory, append-only message log for one context.
///
/// Order is arrival/creation order and is never re-sorted. Each context owns
/// its own log; there is no merged view across contexts.
#[derive(Clone)]
pub struct MessageLog {
    messages: Arc<Mutex<Vec<Message>>>,
    appended: broadcast::Sender<Message>,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageLog {
    pub fn new() -> Self {
        let (appended, _) = broadcast::channel(256);
        Self {
            messages: Arc::new(Mutex::new(Vec::new())),
            appended,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Message>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a message. No deduplication.
    pub fn append(&self, message: Message) {
        self.lock().push(message.clone());
        // No subscribers is fine.
        let _ = self.appended.send(message);
    }

    /// Every message, oldest first.
    pub fn snapshot(&self) -> Vec<Message> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every message.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Receive each message as it is appended.
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.appended.subscribe()
    }

    /// Plain-text export, one `[HH:MM:SS] user: text` line per message.
    pub fn export_text(&self) -> String {
        self.lock()
            .iter()
            .map(format_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// `[HH:MM:SS] user: text`, time in UTC.
pub fn format_line(message: &Message) -> String {
    format!(
        "[{}] {}: {}",
        format_time(message.timestamp),
        message.user_name,
        message.text
    )
}

pub(crate) fn format_time(timestamp_ms: u64) -> String {
    i64::try_from(timestamp_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}
