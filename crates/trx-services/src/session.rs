//! Session record: who this context is on which slot, and in what role.

use std::sync::Arc;

use tokio::sync::watch;

use trx_core::error::{Result, TrxError};
use trx_core::wire::{Passkey, Slot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Created the channel; answers discovery and join requests.
    Host,
    /// Joined an existing channel after the host accepted the passkey.
    Guest,
}

/// The local record for one communication period.
///
/// Immutable while the topic is bound, except `channel_name`, which the host
/// may rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_name: String,
    pub slot: Slot,
    pub channel_name: String,
    pub passkey: Passkey,
    pub role: Role,
}

/// Shared, observable holder of the current session.
///
/// Written only by user actions (begin, rename, end). The host responder and
/// message relay read it when an envelope arrives.
#[derive(Clone)]
pub struct SessionState {
    current: Arc<watch::Sender<Option<Session>>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            current: Arc::new(current),
        }
    }

    /// Install a session. Fails if one is already active.
    pub fn begin(&self, session: Session) -> Result<()> {
        let mut existing = None;
        self.current.send_if_modified(|current| match current {
            Some(active) => {
                existing = Some(active.slot);
                false
            }
            None => {
                *current = Some(session);
                true
            }
        });
        match existing {
            Some(slot) => Err(TrxError::AlreadyInSession(slot.id())),
            None => Ok(()),
        }
    }

    /// Replace the channel name. Host only.
    pub fn rename(&self, channel_name: &str) -> Result<()> {
        let mut outcome = Err(TrxError::NoActiveSession);
        self.current.send_if_modified(|current| match current {
            Some(session) if session.role == Role::Host => {
                session.channel_name = channel_name.to_string();
                outcome = Ok(());
                true
            }
            Some(_) => {
                outcome = Err(TrxError::NotHost);
                false
            }
            None => false,
        });
        outcome
    }

    /// Drop the session, returning what it was.
    pub fn end(&self) -> Option<Session> {
        self.current.send_replace(None)
    }

    pub fn current(&self) -> Option<Session> {
        self.current.borrow().clone()
    }

    pub fn passkey(&self) -> Option<Passkey> {
        self.current.borrow().as_ref().map(|s| s.passkey.clone())
    }

    pub fn is_host(&self) -> bool {
        matches!(self.current.borrow().as_ref(), Some(s) if s.role == Role::Host)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.current.subscribe()
    }
}
