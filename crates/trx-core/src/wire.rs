//! Transceiver wire format: the envelopes exchanged over slot topics.
//!
//! These types ARE the protocol. Every context bound to a slot topic parses
//! exactly these shapes; the JSON field names (`type`, `requestId`,
//! `slotId`, `transcriptData`, ...) are part of the format and must not
//! change without bumping `TOPIC_PREFIX`.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrxError};
use crate::message::Message;

// ── Fixed parameters ─────────────────────────────────────────────────────────

/// Number of pre-enumerated slots. Slot ids run 1..=SLOT_COUNT.
pub const SLOT_COUNT: u8 = 5;

/// Topic names are `TOPIC_PREFIX` followed by the decimal slot id.
pub const TOPIC_PREFIX: &str = "transceiver-v3-slot-";

/// How long a discovery probe stays bound collecting pongs.
pub const PROBE_WINDOW_MS: u64 = 1000;

/// Period between discovery scan cycles.
pub const SCAN_INTERVAL_MS: u64 = 3000;

/// How long a guest waits for a JOIN_RESPONSE.
pub const JOIN_TIMEOUT_MS: u64 = 2000;

/// Passkeys are exactly this many ASCII digits.
pub const PASSKEY_LEN: usize = 6;

// ── Slot ──────────────────────────────────────────────────────────────────────

/// One of the fixed channel slots. Always in 1..=SLOT_COUNT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Slot(u8);

impl Slot {
    pub fn new(id: u8) -> Result<Self> {
        if (1..=SLOT_COUNT).contains(&id) {
            Ok(Self(id))
        } else {
            Err(TrxError::InvalidSlot(id))
        }
    }

    /// Every slot, in ascending order.
    pub fn all() -> impl Iterator<Item = Slot> {
        (1..=SLOT_COUNT).map(Slot)
    }

    pub fn id(self) -> u8 {
        self.0
    }

    /// The topic this slot's traffic lives on. Injective: the decimal id is
    /// the only varying part.
    pub fn topic_name(self) -> String {
        format!("{TOPIC_PREFIX}{}", self.0)
    }

    /// Display name a slot shows while nobody hosts it.
    pub fn default_name(self) -> String {
        format!("Transceiver {:02}", self.0)
    }
}

impl TryFrom<u8> for Slot {
    type Error = TrxError;

    fn try_from(id: u8) -> Result<Self> {
        Slot::new(id)
    }
}

impl From<Slot> for u8 {
    fn from(slot: Slot) -> u8 {
        slot.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Passkey ───────────────────────────────────────────────────────────────────

/// A six-digit shared value.
///
/// This partitions traffic on a topic by mutual agreement. It is sent in
/// plaintext on every transcript, so any context bound to the topic can read
/// it: it is not access control.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Passkey(String);

impl Passkey {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.len() == PASSKEY_LEN && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(raw.to_string()))
        } else {
            Err(TrxError::InvalidPasskey)
        }
    }

    /// A uniformly random passkey for a new channel.
    pub fn generate() -> Self {
        let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
        Self(format!("{n:06}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact string equality against a value received off the wire.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }
}

impl fmt::Debug for Passkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passkey(******)")
    }
}

// ── Envelope ──────────────────────────────────────────────────────────────────

/// Every payload published on a slot topic, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Envelope {
    /// Scanner → host: "is anyone hosting this slot?"
    DiscoveryPing,

    /// Host → scanner: channel metadata. Carries no passkey.
    DiscoveryPong { payload: DiscoveryInfo },

    /// Guest → host: passkey check, correlated by `requestId`.
    #[serde(rename_all = "camelCase")]
    JoinRequest {
        request_id: String,
        payload: JoinPayload,
    },

    /// Host → guest: verdict for one `requestId`.
    #[serde(rename_all = "camelCase")]
    JoinResponse {
        request_id: String,
        status: JoinStatus,
    },

    /// Member → members: one message, tagged with the sender's passkey.
    Transcript { payload: TranscriptPayload },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryInfo {
    pub slot_id: Slot,
    pub name: String,
    pub host_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPayload {
    /// Raw guest input. Compared verbatim, not parsed.
    pub passkey: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinStatus {
    Ok,
    WrongPass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptPayload {
    pub passkey: String,
    pub transcript_data: Message,
}

/// Discriminant of an [`Envelope`], used for routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    DiscoveryPing,
    DiscoveryPong,
    JoinRequest,
    JoinResponse,
    Transcript,
}

impl Envelope {
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Envelope::DiscoveryPing => EnvelopeKind::DiscoveryPing,
            Envelope::DiscoveryPong { .. } => EnvelopeKind::DiscoveryPong,
            Envelope::JoinRequest { .. } => EnvelopeKind::JoinRequest,
            Envelope::JoinResponse { .. } => EnvelopeKind::JoinResponse,
            Envelope::Transcript { .. } => EnvelopeKind::Transcript,
        }
    }

    pub fn join_request(request_id: String, passkey: &str) -> Self {
        Envelope::JoinRequest {
            request_id,
            payload: JoinPayload {
                passkey: passkey.to_string(),
            },
        }
    }

    pub fn transcript(passkey: &Passkey, message: Message) -> Self {
        Envelope::Transcript {
            payload: TranscriptPayload {
                passkey: passkey.as_str().to_string(),
                transcript_data: message,
            },
        }
    }

    /// Serialize for publication on a topic.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(TrxError::Encode)
    }

    /// Deserialize a payload received from a topic.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(TrxError::Decode)
    }
}

/// A fresh correlation id for one join attempt.
pub fn new_request_id() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}
