//! trxd: same-device walkie-talkie channels over a topic broadcast medium.
//!
//! A [`Node`] is one context: it scans for hosted channels, hosts or joins
//! one, and relays messages with the other members. Nodes that share a
//! [`Medium`] can hear each other.

pub mod discovery;
pub mod dispatch;
pub mod medium;
pub mod node;
pub mod relay;
pub mod session;

pub use medium::{Endpoint, Medium, Publisher};
pub use node::Node;
