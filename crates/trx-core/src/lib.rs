//! trx-core: shared types, wire format, and configuration.
//! All other transceiver crates depend on this one.

pub mod config;
pub mod error;
pub mod message;
pub mod wire;

pub use error::TrxError;
pub use message::Message;
pub use wire::{Envelope, JoinStatus, Passkey, Slot};
