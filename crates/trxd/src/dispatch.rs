//! Routes incoming envelopes to the appropriate service based on their kind.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::oneshot;

use trx_core::error::Result;
use trx_core::wire::{Envelope, EnvelopeKind};

use crate::medium::{Endpoint, Publisher};

/// A handler for one or more envelope kinds on a bound slot topic.
pub trait EnvelopeService: Send + Sync {
    fn name(&self) -> &'static str;

    /// Kinds this service wants delivered.
    fn kinds(&self) -> &'static [EnvelopeKind];

    /// Handle one envelope. `reply` publishes on the same topic.
    fn handle(&self, envelope: &Envelope, reply: &Publisher) -> Result<()>;
}

/// Maps envelope kinds to services and dispatches incoming envelopes.
#[derive(Default)]
pub struct Router {
    by_kind: HashMap<EnvelopeKind, Arc<dyn EnvelopeService>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service for every kind it declares. A later registration
    /// for the same kind replaces the earlier one.
    pub fn register(&mut self, service: Arc<dyn EnvelopeService>) {
        for kind in service.kinds() {
            self.by_kind.insert(*kind, service.clone());
        }
    }

    pub fn handles(&self, kind: EnvelopeKind) -> bool {
        self.by_kind.contains_key(&kind)
    }

    /// Dispatch one envelope. Returns false if no service handles its kind.
    pub fn dispatch(&self, envelope: &Envelope, reply: &Publisher) -> bool {
        let Some(service) = self.by_kind.get(&envelope.kind()) else {
            return false;
        };
        if let Err(e) = service.handle(envelope, reply) {
            tracing::warn!(
                service = service.name(),
                kind = ?envelope.kind(),
                error = %e,
                "envelope handling failed"
            );
        }
        true
    }

    /// Drive an endpoint until `stop` fires or the medium closes.
    /// The endpoint is released on return.
    pub async fn serve(self, mut endpoint: Endpoint, mut stop: oneshot::Receiver<()>) {
        let reply = endpoint.publisher();
        tracing::debug!(topic = endpoint.topic(), "router started");

        loop {
            tokio::select! {
                _ = &mut stop => break,

                incoming = endpoint.recv() => {
                    let Some(envelope) = incoming else { break };
                    if !self.dispatch(&envelope, &reply) {
                        tracing::trace!(kind = ?envelope.kind(), "no service for envelope");
                    }
                }
            }
        }

        tracing::debug!(topic = endpoint.topic(), "router stopped");
    }
}
