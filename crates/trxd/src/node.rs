//! One transceiver context: directory, log, session, and the tasks that
//! keep them in sync with the medium.
//!
//! Lifecycle: `create` or `join` binds the slot topic and starts a router;
//! `leave` stops the router, releases the topic, ends the session and clears
//! the log. At most one topic is bound at a time.
//!
//! The link lock is never held across an await. A slot is reserved while
//! names are vetted and the handshake runs, so `send` and friends stay
//! responsive and a second `create`/`join` is refused meanwhile.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

use trx_core::config::TrxConfig;
use trx_core::error::{Result, TrxError};
use trx_core::message::Message;
use trx_core::wire::{Passkey, Slot};
use trx_services::{
    safety, ChannelDirectory, ContentSafety, DigestSummarizer, MessageLog, Role, Session,
    SessionState, Summarizer,
};

use crate::discovery::DiscoveryScanner;
use crate::dispatch::Router;
use crate::medium::{Medium, Publisher};
use crate::relay::MessageRelay;
use crate::session::{HostResponder, JoinHandshake, PendingJoins};

/// The topic currently bound for the session, and the router serving it.
struct Binding {
    slot: Slot,
    publisher: Publisher,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// What the node is doing with the medium right now.
enum Link {
    Idle,
    /// Creating, joining or leaving `slot`; nothing is bound yet (or any more).
    Pending(Slot),
    Bound(Binding),
}

impl Link {
    fn slot(&self) -> Option<Slot> {
        match self {
            Link::Idle => None,
            Link::Pending(slot) => Some(*slot),
            Link::Bound(binding) => Some(binding.slot),
        }
    }
}

/// Holds `Link::Pending` until committed; reverts to `Idle` on drop.
struct Reservation<'a> {
    link: &'a Mutex<Link>,
    armed: bool,
}

impl Reservation<'_> {
    fn commit(mut self, binding: Binding) {
        *lock(self.link) = Link::Bound(binding);
        self.armed = false;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut link = lock(self.link);
            if matches!(*link, Link::Pending(_)) {
                *link = Link::Idle;
            }
        }
    }
}

fn lock(link: &Mutex<Link>) -> MutexGuard<'_, Link> {
    link.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Node {
    config: TrxConfig,
    medium: Medium,
    directory: ChannelDirectory,
    log: MessageLog,
    session: SessionState,
    safety: Arc<dyn ContentSafety>,
    summarizer: Arc<dyn Summarizer>,
    handshake: JoinHandshake,
    relay: MessageRelay,
    link: Mutex<Link>,
    shutdown: broadcast::Sender<()>,
}

impl Node {
    pub fn new(config: &TrxConfig, medium: Medium) -> Self {
        let session = SessionState::new();
        let log = MessageLog::new();
        let (shutdown, _) = broadcast::channel(1);

        Self {
            config: config.clone(),
            directory: ChannelDirectory::new(config.protocol.directory_policy),
            safety: safety::from_config(&config.safety),
            summarizer: Arc::new(DigestSummarizer),
            handshake: JoinHandshake::new(
                medium.clone(),
                PendingJoins::shared(),
                config.protocol.join_timeout(),
            ),
            relay: MessageRelay::new(session.clone(), log.clone()),
            medium,
            log,
            session,
            link: Mutex::new(Link::Idle),
            shutdown,
        }
    }

    pub fn with_safety(mut self, safety: Arc<dyn ContentSafety>) -> Self {
        self.safety = safety;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn config(&self) -> &TrxConfig {
        &self.config
    }

    pub fn medium(&self) -> &Medium {
        &self.medium
    }

    pub fn directory(&self) -> &ChannelDirectory {
        &self.directory
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn current_session(&self) -> Option<Session> {
        self.session.current()
    }

    /// Slot whose topic is bound right now, if any.
    pub fn bound_slot(&self) -> Option<Slot> {
        match &*lock(&self.link) {
            Link::Bound(binding) => Some(binding.slot),
            _ => None,
        }
    }

    // ── Discovery ─────────────────────────────────────────────────────────

    fn scanner(&self) -> DiscoveryScanner {
        DiscoveryScanner::new(
            self.medium.clone(),
            self.directory.clone(),
            self.config.protocol.scan_interval(),
            self.config.protocol.probe_window(),
            self.shutdown.subscribe(),
        )
    }

    /// Start periodic discovery. Stops on `shutdown`.
    pub fn spawn_scanner(&self) -> JoinHandle<anyhow::Result<()>> {
        tokio::spawn(self.scanner().run())
    }

    /// Run a single discovery cycle now. Returns the number of pongs merged.
    pub async fn scan(&self) -> usize {
        self.scanner().scan_once().await
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Host a new channel on `slot`.
    pub async fn create(
        &self,
        slot: Slot,
        user_name: &str,
        channel_name: &str,
        passkey: &str,
    ) -> Result<Session> {
        let reservation = self.reserve(slot)?;

        let user_name = non_blank(user_name, "user name")?;
        let channel_name = non_blank(channel_name, "channel name")?;
        let passkey = Passkey::parse(passkey)?;
        if self.directory.get(slot).is_active {
            return Err(TrxError::SlotOccupied(slot.id()));
        }

        self.vet(user_name, "user name").await?;
        self.vet(channel_name, "channel name").await?;

        let session = Session {
            user_name: user_name.to_string(),
            slot,
            channel_name: channel_name.to_string(),
            passkey,
            role: Role::Host,
        };
        reservation.commit(self.bind(session.clone())?);

        tracing::info!(slot = %slot, channel = channel_name, host = user_name, "channel created");
        Ok(session)
    }

    /// Join the channel hosted on `slot`.
    pub async fn join(&self, slot: Slot, user_name: &str, passkey: &str) -> Result<Session> {
        let reservation = self.reserve(slot)?;

        let user_name = non_blank(user_name, "user name")?;
        let passkey = Passkey::parse(passkey)?;

        self.vet(user_name, "user name").await?;

        self.handshake.join(slot, passkey.as_str()).await?;

        let session = Session {
            user_name: user_name.to_string(),
            slot,
            channel_name: self.directory.get(slot).name,
            passkey,
            role: Role::Guest,
        };
        reservation.commit(self.bind(session.clone())?);

        tracing::info!(slot = %slot, channel = %session.channel_name, "joined channel");
        Ok(session)
    }

    /// Rename the hosted channel. Blank names are ignored and yield `false`.
    /// Nothing changes unless every check passes.
    pub async fn rename(&self, channel_name: &str) -> Result<bool> {
        if channel_name.trim().is_empty() {
            return Ok(false);
        }

        match self.session.current() {
            None => return Err(TrxError::NoActiveSession),
            Some(s) if s.role != Role::Host => return Err(TrxError::NotHost),
            Some(_) => {}
        }

        self.vet(channel_name, "channel name").await?;
        self.session.rename(channel_name)?;

        tracing::info!(channel = channel_name, "channel renamed");
        Ok(true)
    }

    /// Say something. Whitespace-only text is ignored.
    pub async fn send(&self, text: &str) -> Result<Option<Message>> {
        let user_name = self
            .session
            .current()
            .map(|s| s.user_name)
            .unwrap_or_else(|| self.config.identity.user_name.clone());
        let publisher = match &*lock(&self.link) {
            Link::Bound(binding) => Some(binding.publisher.clone()),
            _ => None,
        };

        self.relay.send(&user_name, text, publisher.as_ref())
    }

    /// Stop serving the topic, release it, end the session, clear the log.
    /// A pending `create` or `join` is left alone.
    pub async fn leave(&self) -> Option<Session> {
        let binding = {
            let mut link = lock(&self.link);
            match std::mem::replace(&mut *link, Link::Idle) {
                Link::Bound(binding) => {
                    *link = Link::Pending(binding.slot);
                    Some(binding)
                }
                Link::Pending(slot) => {
                    *link = Link::Pending(slot);
                    return None;
                }
                Link::Idle => None,
            }
        };
        // Reverts the link to `Idle` once the session is torn down.
        let _leaving = Reservation {
            link: &self.link,
            armed: binding.is_some(),
        };

        if let Some(binding) = binding {
            // The router may already be gone; either way it is stopped.
            let _ = binding.stop.send(());
            if let Err(e) = binding.task.await {
                tracing::warn!(slot = %binding.slot, error = %e, "router task failed");
            }
        }

        let ended = self.session.end();
        self.log.clear();
        if let Some(s) = &ended {
            tracing::info!(slot = %s.slot, role = ?s.role, "left channel");
        }
        ended
    }

    /// Leave any channel and stop background discovery.
    pub async fn shutdown(&self) {
        self.leave().await;
        // No scanner running is fine.
        let _ = self.shutdown.send(());
    }

    // ── Log ───────────────────────────────────────────────────────────────

    pub fn export_log(&self) -> String {
        self.log.export_text()
    }

    pub fn clear_log(&self) {
        self.log.clear();
    }

    pub async fn summarize(&self) -> String {
        let messages = self.log.snapshot();
        self.summarizer.summarize(&messages).await
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Claim the link for `slot`, or report what already holds it.
    fn reserve(&self, slot: Slot) -> Result<Reservation<'_>> {
        let mut link = lock(&self.link);
        if let Some(active) = link.slot() {
            return Err(TrxError::AlreadyInSession(active.id()));
        }
        *link = Link::Pending(slot);
        Ok(Reservation {
            link: &self.link,
            armed: true,
        })
    }

    async fn vet(&self, text: &str, field: &'static str) -> Result<()> {
        if self.safety.check(text).await {
            Ok(())
        } else {
            tracing::info!(field, "rejected by content safety");
            Err(TrxError::UnsafeContent(field))
        }
    }

    /// Bind the session's topic, install the session, start the router.
    fn bind(&self, session: Session) -> Result<Binding> {
        let slot = session.slot;
        let role = session.role;
        let endpoint = self.medium.bind_slot(slot)?;
        let publisher = endpoint.publisher();

        self.session.begin(session)?;

        let mut router = Router::new();
        if role == Role::Host {
            router.register(Arc::new(HostResponder::new(self.session.clone())));
        }
        router.register(Arc::new(self.relay.clone()));

        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(router.serve(endpoint, stop_rx));

        Ok(Binding {
            slot,
            publisher,
            stop,
            task,
        })
    }
}

/// Names are kept as typed; only all-whitespace input is refused.
fn non_blank<'a>(value: &'a str, field: &'static str) -> Result<&'a str> {
    if value.trim().is_empty() {
        Err(TrxError::EmptyField(field))
    } else {
        Ok(value)
    }
}
