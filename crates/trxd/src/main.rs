//! trxd: runs a host and a guest transceiver on one in-process medium.
//!
//! Usage: `trxd [slot] [channel-name]`. Lines read from stdin are spoken by
//! the host; the guest prints what it hears. On EOF or Ctrl-C both leave,
//! after printing the host's log and its summary.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use trx_core::config::TrxConfig;
use trx_core::wire::{Passkey, Slot};
use trxd::{Medium, Node};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = TrxConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = TrxConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        TrxConfig::default()
    });

    let mut args = std::env::args().skip(1);
    let slot = match args.next() {
        Some(raw) => {
            let id: u8 = raw.parse().with_context(|| format!("invalid slot {raw:?}"))?;
            Slot::new(id)?
        }
        None => Slot::new(1)?,
    };
    let channel_name = args.next().unwrap_or_else(|| slot.default_name());
    let host_name = match config.identity.user_name.trim() {
        "" => "Host".to_string(),
        name => name.to_string(),
    };

    let medium = Medium::from_config(&config.medium);
    let host = Node::new(&config, medium.clone());
    let guest = Node::new(&config, medium);

    // ── Host ────────────────────────────────────────────────────────────────

    let passkey = Passkey::generate();
    host.create(slot, &host_name, &channel_name, passkey.as_str())
        .await
        .context("failed to create channel")?;
    println!("hosting {channel_name:?} on slot {slot}, passkey {}", passkey.as_str());

    // ── Guest: discover, then join ──────────────────────────────────────────

    let scanner_task = guest.spawn_scanner();
    let mut directory = guest.directory().subscribe();
    let wait = config.protocol.scan_interval() + config.protocol.probe_window();
    tokio::time::timeout(wait * 2, async {
        while !directory.borrow_and_update().iter().any(|c| c.slot_id == slot && c.is_active) {
            if directory.changed().await.is_err() {
                break;
            }
        }
    })
    .await
    .context("channel never showed up in discovery")?;

    for status in guest.directory().snapshot() {
        let state = if status.is_active { "live" } else { "idle" };
        println!("  slot {} [{state}] {}", status.slot_id, status.name);
    }

    guest
        .join(slot, "Guest", passkey.as_str())
        .await
        .context("guest failed to join")?;
    println!("guest joined slot {slot}");

    let mut heard = guest.log().subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(message) = heard.recv().await {
            if !message.is_local {
                println!("guest heard [{}]: {}", message.user_name, message.text);
            }
        }
    });

    // ── Relay stdin ─────────────────────────────────────────────────────────

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }

            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else { break };
                if let Err(e) = host.send(&line).await {
                    tracing::warn!(error = %e, "send failed");
                }
            }
        }
    }

    // Let in-flight transcripts land before tearing down.
    tokio::time::sleep(Duration::from_millis(50)).await;

    println!("--- log ---\n{}", host.export_log());
    println!("--- summary ---\n{}", host.summarize().await);

    guest.shutdown().await;
    host.shutdown().await;
    printer.abort();
    match scanner_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "scanner exited with error"),
        Err(e) => tracing::error!(error = %e, "scanner task failed"),
    }

    tracing::info!("trxd stopped");
    Ok(())
}
