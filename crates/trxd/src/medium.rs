//! Broadcast medium: same-device publish/subscribe keyed by topic name.
//!
//! Every context sharing one `Medium` is on the same device. A publish on a
//! topic reaches every *other* endpoint bound to that topic at the moment of
//! publishing. There is no persistence: with nobody listening, an envelope is
//! simply lost. Ordering holds per publisher per topic, nothing more.
//!
//! Endpoints release their binding when dropped, so every exit path
//! (early return, `?`, task abort) unbinds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use trx_core::config::MediumConfig;
use trx_core::error::{Result, TrxError};
use trx_core::wire::{Envelope, Slot};

/// Default per-topic buffer, in envelopes.
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
struct Delivery {
    /// Endpoint id of the publisher, so it can skip its own envelopes.
    from: u64,
    payload: Bytes,
}

type TopicTable = Arc<DashMap<String, broadcast::Sender<Delivery>>>;

/// Handle to the medium. Cheap to clone; clones share topics.
#[derive(Clone)]
pub struct Medium {
    /// None = the broadcast capability is missing in this context.
    topics: Option<TopicTable>,
    next_id: Arc<AtomicU64>,
    capacity: usize,
}

impl Default for Medium {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Medium {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Some(Arc::new(DashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            capacity: capacity.max(1),
        }
    }

    /// A medium on which every bind fails with `MediumUnavailable`.
    pub fn unavailable() -> Self {
        Self {
            topics: None,
            next_id: Arc::new(AtomicU64::new(1)),
            capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn from_config(config: &MediumConfig) -> Self {
        if config.enabled {
            Self::new(config.capacity)
        } else {
            Self::unavailable()
        }
    }

    pub fn is_available(&self) -> bool {
        self.topics.is_some()
    }

    /// Open an endpoint on `topic`.
    pub fn bind(&self, topic: &str) -> Result<Endpoint> {
        let topics = self.topics.as_ref().ok_or(TrxError::MediumUnavailable)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // Subscribe while holding the entry so a concurrent close cannot
        // prune the topic between lookup and subscribe.
        let (tx, rx) = {
            let entry = topics
                .entry(topic.to_string())
                .or_insert_with(|| broadcast::channel(self.capacity).0);
            (entry.clone(), entry.subscribe())
        };

        tracing::trace!(topic, endpoint = id, "endpoint bound");

        Ok(Endpoint {
            publisher: Publisher {
                topic: Arc::from(topic),
                id,
                tx,
            },
            rx,
            topics: topics.clone(),
        })
    }

    pub fn bind_slot(&self, slot: Slot) -> Result<Endpoint> {
        self.bind(&slot.topic_name())
    }

    /// Number of endpoints currently bound to `topic`.
    pub fn bound_count(&self, topic: &str) -> usize {
        self.topics
            .as_ref()
            .and_then(|t| t.get(topic).map(|tx| tx.receiver_count()))
            .unwrap_or(0)
    }
}

/// The sending half of an endpoint. Cloned into services that reply.
#[derive(Clone)]
pub struct Publisher {
    topic: Arc<str>,
    id: u64,
    tx: broadcast::Sender<Delivery>,
}

impl Publisher {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publish to every other endpoint bound to this topic.
    pub fn publish(&self, envelope: &Envelope) -> Result<()> {
        let payload = Bytes::from(envelope.to_bytes()?);
        // Err only means nobody is bound; that is not an error on this medium.
        match self.tx.send(Delivery {
            from: self.id,
            payload,
        }) {
            Ok(receivers) => tracing::trace!(
                topic = %self.topic,
                kind = ?envelope.kind(),
                receivers = receivers.saturating_sub(1),
                "envelope published"
            ),
            Err(_) => tracing::trace!(topic = %self.topic, "published with no listeners"),
        }
        Ok(())
    }
}

/// A bound endpoint: one publisher plus the single inbound stream.
pub struct Endpoint {
    publisher: Publisher,
    rx: broadcast::Receiver<Delivery>,
    topics: TopicTable,
}

impl Endpoint {
    pub fn topic(&self) -> &str {
        self.publisher.topic()
    }

    pub fn publisher(&self) -> Publisher {
        self.publisher.clone()
    }

    pub fn publish(&self, envelope: &Envelope) -> Result<()> {
        self.publisher.publish(envelope)
    }

    /// Next envelope from another endpoint on this topic.
    ///
    /// Own publishes are skipped. Undecodable payloads are dropped with a
    /// trace. If this endpoint falls more than `capacity` envelopes behind,
    /// the oldest are lost and a warning is logged.
    pub async fn recv(&mut self) -> Option<Envelope> {
        loop {
            let delivery = match self.rx.recv().await {
                Ok(d) => d,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(topic = %self.topic(), skipped, "endpoint lagged, envelopes lost");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            };

            if delivery.from == self.publisher.id {
                continue;
            }

            match Envelope::from_bytes(&delivery.payload) {
                Ok(envelope) => return Some(envelope),
                Err(e) => {
                    tracing::trace!(topic = %self.topic(), error = %e, "ignoring undecodable payload");
                }
            }
        }
    }

    /// Release the endpoint. Same as dropping it.
    pub fn close(self) {}
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        // Our own receiver is still alive here, hence `<= 1`.
        let topic: &str = &self.publisher.topic;
        self.topics
            .remove_if(topic, |_, tx| tx.receiver_count() <= 1);
        tracing::trace!(topic, endpoint = self.publisher.id, "endpoint closed");
    }
}
