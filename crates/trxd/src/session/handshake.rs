//! Guest side of the join handshake.
//!
//! One JOIN_REQUEST per attempt, one verdict or a timeout. No retries.

use std::time::Duration;

use trx_core::error::{Result, TrxError};
use trx_core::wire::{new_request_id, Envelope, JoinStatus, Slot};

use crate::medium::Medium;

use super::state::{PendingGuard, SharedPending};

pub struct JoinHandshake {
    medium: Medium,
    pending: SharedPending,
    timeout: Duration,
}

impl JoinHandshake {
    pub fn new(medium: Medium, pending: SharedPending, timeout: Duration) -> Self {
        Self {
            medium,
            pending,
            timeout,
        }
    }

    pub fn pending(&self) -> &SharedPending {
        &self.pending
    }

    /// Ask whoever hosts `slot` to accept `passkey`.
    ///
    /// Binds a temporary endpoint for the duration of the attempt and
    /// releases it on every exit path. The timeout runs from the moment the
    /// request is published. A response arriving after the deadline has no
    /// effect.
    pub async fn join(&self, slot: Slot, passkey: &str) -> Result<()> {
        let mut endpoint = self.medium.bind_slot(slot)?;

        let request_id = new_request_id();
        let mut verdict = self.pending.register(&request_id);
        let _guard = PendingGuard::new(self.pending.clone(), request_id.clone());

        endpoint.publish(&Envelope::join_request(request_id.clone(), passkey))?;
        tracing::debug!(slot = %slot, request_id = %request_id, "join request sent");

        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);
        let mut open = true;

        let outcome = loop {
            tokio::select! {
                biased;

                status = &mut verdict => break status.ok(),

                incoming = endpoint.recv(), if open => match incoming {
                    Some(Envelope::JoinResponse { request_id: id, status }) => {
                        self.pending.resolve(&id, status);
                    }
                    Some(_) => {}
                    None => open = false,
                },

                _ = &mut deadline => {
                    if self.pending.cancel(&request_id) {
                        break None;
                    }
                    // Resolved in the same instant the deadline fired.
                    break verdict.try_recv().ok();
                }
            }
        };

        match outcome {
            Some(JoinStatus::Ok) => {
                tracing::info!(slot = %slot, "join accepted");
                Ok(())
            }
            Some(JoinStatus::WrongPass) => {
                tracing::info!(slot = %slot, "join rejected: wrong passkey");
                Err(TrxError::WrongPasskey)
            }
            None => {
                tracing::info!(slot = %slot, timeout_ms = self.timeout.as_millis() as u64, "join timed out");
                Err(TrxError::NoHostResponse)
            }
        }
    }
}
