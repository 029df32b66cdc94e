//! Errors surfaced to callers of the session lifecycle.
//!
//! Handshake and safety failures are returned, never retried. Silence on the
//! medium (a probe nobody answers, a transcript that never arrives) is not an
//! error and has no variant here.

#[derive(Debug, thiserror::Error)]
pub enum TrxError {
    /// Join timed out: no host answered on the slot's topic.
    #[error("no response from host")]
    NoHostResponse,

    /// The host answered and rejected the passkey.
    #[error("wrong passkey")]
    WrongPasskey,

    /// The content safety check rejected a user-supplied string.
    #[error("unsafe content in {0}")]
    UnsafeContent(&'static str),

    /// The broadcast medium is not available in this context.
    #[error("broadcast medium unavailable")]
    MediumUnavailable,

    #[error("slot {0} out of range 1..={}", crate::wire::SLOT_COUNT)]
    InvalidSlot(u8),

    #[error("passkey must be exactly {} digits", crate::wire::PASSKEY_LEN)]
    InvalidPasskey,

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("no active session")]
    NoActiveSession,

    #[error("only the host can do that")]
    NotHost,

    #[error("already in a session on slot {0}")]
    AlreadyInSession(u8),

    #[error("slot {0} already has a host")]
    SlotOccupied(u8),

    #[error("failed to encode envelope: {0}")]
    Encode(serde_json::Error),

    #[error("failed to decode envelope: {0}")]
    Decode(serde_json::Error),
}

pub type Result<T, E = TrxError> = std::result::Result<T, E>;
