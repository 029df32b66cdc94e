//! A single utterance in a channel log.

use serde::{Deserialize, Serialize};

/// `user_id` carried by every locally produced message.
pub const LOCAL_USER_ID: &str = "local";

/// Shown in place of a blank user name.
pub const ANONYMOUS: &str = "Anonymous";

/// One spoken or typed utterance.
///
/// `is_local` is never serialized: it is a property of the copy, not of the
/// utterance. Anything decoded off the wire comes back with `is_local = false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Opaque unique id: hex(blake3(nonce || timestamp_le || user_name || text)).
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub text: String,
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    #[serde(skip)]
    pub is_local: bool,
}

impl Message {
    /// Create a message produced by this context.
    pub fn local(user_name: &str, text: &str, timestamp: u64) -> Self {
        let user_name = if user_name.trim().is_empty() {
            ANONYMOUS
        } else {
            user_name
        };

        Self {
            id: Self::generate_id(user_name, timestamp, text),
            user_id: LOCAL_USER_ID.to_string(),
            user_name: user_name.to_string(),
            text: text.to_string(),
            timestamp,
            is_local: true,
        }
    }

    /// The copy a receiving context stores.
    pub fn into_remote(mut self) -> Self {
        self.is_local = false;
        self
    }

    fn generate_id(user_name: &str, timestamp: u64, text: &str) -> String {
        let nonce: [u8; 16] = rand::random();

        let mut hasher = blake3::Hasher::new();
        hasher.update(&nonce);
        hasher.update(&timestamp.to_le_bytes());
        hasher.update(user_name.as_bytes());
        hasher.update(text.as_bytes());

        hex::encode(&hasher.finalize().as_bytes()[..16])
    }
}
