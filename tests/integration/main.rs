//! Transceiver integration test harness.
//!
//! Every test builds its own medium, so contexts in different tests never
//! hear each other. Nodes sharing a medium play separate browser contexts on
//! one device. Tests run on paused tokio time: the 1000/2000/3000ms protocol
//! timers elapse instantly.

use std::time::Duration;

use anyhow::{bail, Result};

use trx_core::config::{DirectoryPolicy, TrxConfig};
use trx_core::message::Message;
use trx_core::wire::{Envelope, Slot};
use trxd::{Endpoint, Medium, Node};

mod discovery;
mod messaging;
mod sessions;

// ── Harness ───────────────────────────────────────────────────────────────────

pub const PASSKEY: &str = "123456";

pub fn slot(id: u8) -> Slot {
    Slot::new(id).expect("slot in range")
}

pub fn config(policy: DirectoryPolicy) -> TrxConfig {
    let mut config = TrxConfig::default();
    config.protocol.directory_policy = policy;
    config
}

/// `count` nodes on one shared medium, default config.
pub fn nodes(count: usize) -> (Medium, Vec<Node>) {
    nodes_with(count, &TrxConfig::default())
}

pub fn nodes_with(count: usize, config: &TrxConfig) -> (Medium, Vec<Node>) {
    let medium = Medium::default();
    let nodes = (0..count).map(|_| Node::new(config, medium.clone())).collect();
    (medium, nodes)
}

/// Host "Ops" on slot 3 with the shared passkey, then let `guest` discover
/// it and join.
pub async fn host_and_join(host: &Node, guest: &Node) -> Result<()> {
    host.create(slot(3), "Kai", "Ops", PASSKEY).await?;
    guest.scan().await;
    guest.join(slot(3), "Mei", PASSKEY).await?;
    Ok(())
}

/// Let routers drain anything already published.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Next envelope on a raw endpoint, if one arrives within `ms`.
pub async fn next_envelope(ep: &mut Endpoint, ms: u64) -> Option<Envelope> {
    tokio::time::timeout(Duration::from_millis(ms), ep.recv())
        .await
        .ok()
        .flatten()
}

/// The only remote message in `log`, failing on zero or several.
pub fn single_remote(log: &[Message]) -> Result<Message> {
    let remote: Vec<&Message> = log.iter().filter(|m| !m.is_local).collect();
    match remote.as_slice() {
        [one] => Ok((*one).clone()),
        other => bail!("expected one remote message, got {}", other.len()),
    }
}
