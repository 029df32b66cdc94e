//! Session layer: join handshake (guest side) and host responder.

pub mod handshake;
pub mod responder;
mod state;

pub use handshake::JoinHandshake;
pub use responder::HostResponder;
pub use state::{PendingJoins, SharedPending};
