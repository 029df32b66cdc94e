//! Host side: answers discovery pings and join requests on the bound slot.

use trx_core::error::Result;
use trx_core::wire::{DiscoveryInfo, Envelope, EnvelopeKind, JoinStatus};
use trx_services::{Role, SessionState};

use crate::dispatch::EnvelopeService;
use crate::medium::Publisher;

/// Replies on behalf of the local session while it is the host.
/// Reads the session at reply time, so a rename shows up in the next pong.
pub struct HostResponder {
    session: SessionState,
}

impl HostResponder {
    pub fn new(session: SessionState) -> Self {
        Self { session }
    }
}

impl EnvelopeService for HostResponder {
    fn name(&self) -> &'static str {
        "host-responder"
    }

    fn kinds(&self) -> &'static [EnvelopeKind] {
        &[EnvelopeKind::DiscoveryPing, EnvelopeKind::JoinRequest]
    }

    fn handle(&self, envelope: &Envelope, reply: &Publisher) -> Result<()> {
        let Some(session) = self.session.current().filter(|s| s.role == Role::Host) else {
            return Ok(());
        };

        match envelope {
            Envelope::DiscoveryPing => {
                tracing::trace!(slot = %session.slot, "answering discovery ping");
                reply.publish(&Envelope::DiscoveryPong {
                    payload: DiscoveryInfo {
                        slot_id: session.slot,
                        name: session.channel_name,
                        host_name: session.user_name,
                    },
                })
            }
            Envelope::JoinRequest {
                request_id,
                payload,
            } => {
                let status = if session.passkey.matches(&payload.passkey) {
                    JoinStatus::Ok
                } else {
                    JoinStatus::WrongPass
                };
                tracing::info!(slot = %session.slot, request_id = %request_id, ?status, "join request answered");
                reply.publish(&Envelope::JoinResponse {
                    request_id: request_id.clone(),
                    status,
                })
            }
            _ => Ok(()),
        }
    }
}
