//! Periodic discovery scan.
//!
//! Every `interval`, probes all slots concurrently: bind the slot topic,
//! publish a DISCOVERY_PING, collect DISCOVERY_PONGs for `window`, release
//! the topic. Pongs are merged into the channel directory.

use std::time::Duration;

use futures::future::join_all;
use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use trx_core::wire::{Envelope, Slot};
use trx_services::ChannelDirectory;

use crate::medium::Medium;

pub struct DiscoveryScanner {
    medium: Medium,
    directory: ChannelDirectory,
    interval: Duration,
    window: Duration,
    shutdown: broadcast::Receiver<()>,
}

impl DiscoveryScanner {
    pub fn new(
        medium: Medium,
        directory: ChannelDirectory,
        interval: Duration,
        window: Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            medium,
            directory,
            interval,
            window,
            shutdown,
        }
    }

    /// Scan until shutdown. The first cycle starts immediately.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            window_ms = self.window.as_millis() as u64,
            policy = ?self.directory.policy(),
            "discovery scanner starting"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("discovery scanner shutting down");
                    return Ok(());
                }

                _ = interval.tick() => {
                    let pongs = self.scan_once().await;
                    tracing::debug!(
                        pongs,
                        active = self.directory.active_count(),
                        "scan cycle complete"
                    );
                }
            }
        }
    }

    /// One full cycle over every slot. Returns the number of pongs merged.
    pub async fn scan_once(&self) -> usize {
        self.directory.begin_cycle();
        let pongs: usize = join_all(Slot::all().map(|slot| self.probe(slot)))
            .await
            .into_iter()
            .sum();
        let cleared = self.directory.end_cycle();
        if !cleared.is_empty() {
            tracing::debug!(slots = ?cleared, "channels went silent");
        }
        pongs
    }

    /// Probe one slot. Always occupies the full window; failures stay local
    /// to this slot.
    async fn probe(&self, slot: Slot) -> usize {
        let deadline = Instant::now() + self.window;

        let mut endpoint = match self.medium.bind_slot(slot) {
            Ok(ep) => ep,
            Err(e) => {
                tracing::warn!(slot = %slot, error = %e, "probe bind failed");
                return 0;
            }
        };

        if let Err(e) = endpoint.publish(&Envelope::DiscoveryPing) {
            tracing::warn!(slot = %slot, error = %e, "probe ping failed");
            return 0;
        }

        let mut pongs = 0;
        while let Ok(Some(envelope)) = time::timeout_at(deadline, endpoint.recv()).await {
            let Envelope::DiscoveryPong { payload } = envelope else {
                continue;
            };
            if payload.slot_id != slot {
                tracing::trace!(slot = %slot, claimed = %payload.slot_id, "pong for another slot ignored");
                continue;
            }
            self.directory.merge(&payload);
            pongs += 1;
        }

        endpoint.close();
        pongs
    }
}
