//! Peer session manager.
//!
//! Owns the lifecycle of the link to the paired device:
//!
//! ```text
//! Inactive ──activate──▶ Activating ──completed──▶ Active ⇄ Unreachable
//!     ▲                      ▲                         │
//!     └──activation failed   └──────deactivated────────┘
//! ```
//!
//! Reachability is re-read from the transport on every send; the
//! `Active`/`Unreachable` state only mirrors the last reported change.

use crate::config::LinkConfig;
use crate::error::{LinkError, LinkResult};
use crate::protocol::{AlertEnvelope, Topic};
use crate::transport::{PeerTransport, TransportEvent};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Lifecycle state of the peer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not activated, or the transport is unsupported.
    Inactive,
    /// Activation requested, completion pending.
    Activating,
    /// Activated and the peer was last reported reachable.
    Active,
    /// Activated but the peer was last reported unreachable.
    Unreachable,
}

impl SessionState {
    /// Returns whether activation has completed.
    pub fn is_activated(self) -> bool {
        matches!(self, Self::Active | Self::Unreachable)
    }
}

/// Callback invoked for every inbound envelope.
pub type ReceiveHandler = Arc<dyn Fn(AlertEnvelope) + Send + Sync>;

/// Manages the single session to the paired peer.
pub struct SessionManager {
    transport: Arc<dyn PeerTransport>,
    state: watch::Sender<SessionState>,
    /// Serializes activation and reactivation.
    lifecycle: tokio::sync::Mutex<()>,
    handler: RwLock<Option<ReceiveHandler>>,
    activation_requests: AtomicUsize,
    send_timeout: Duration,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state())
            .field("activation_requests", &self.activation_count())
            .field("send_timeout", &self.send_timeout)
            .finish()
    }
}

impl SessionManager {
    /// Creates a session manager over `transport`. Call [`start`](Self::start)
    /// to begin processing transport events.
    pub fn new(transport: Arc<dyn PeerTransport>, config: &LinkConfig) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::Inactive);
        Arc::new(Self {
            transport,
            state,
            lifecycle: tokio::sync::Mutex::new(()),
            handler: RwLock::new(None),
            activation_requests: AtomicUsize::new(0),
            send_timeout: Duration::from_millis(config.send_timeout_ms),
            event_loop: Mutex::new(None),
        })
    }

    /// Returns the current state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Returns a receiver that observes state changes.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Number of activation requests issued to the transport.
    pub fn activation_count(&self) -> usize {
        self.activation_requests.load(Ordering::SeqCst)
    }

    /// Returns whether the transport supports a peer session.
    pub fn is_supported(&self) -> bool {
        self.transport.is_supported()
    }

    /// Spawns the transport event loop. Calling it again is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut slot = self.event_loop.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return;
        }

        let transport = self.transport.clone();
        let manager = Arc::downgrade(self);
        *slot = Some(tokio::spawn(run_event_loop(transport, manager)));
    }

    /// Stops the transport event loop.
    pub fn shutdown(&self) {
        if let Some(handle) = self
            .event_loop
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }

    /// Activates the session.
    ///
    /// Idempotent: does nothing while activating or active. On a device
    /// without peer support this is a permanent no-op and the state stays
    /// `Inactive`.
    pub async fn activate(&self) -> LinkResult<()> {
        let _guard = self.lifecycle.lock().await;

        if !self.transport.is_supported() {
            info!("peer transport unsupported; fall alerts will not leave this device");
            return Ok(());
        }
        if self.state() != SessionState::Inactive {
            debug!(state = ?self.state(), "activate ignored");
            return Ok(());
        }

        self.request_activation().await
    }

    /// Re-issues activation after the platform deactivated the session.
    async fn reactivate(&self) -> LinkResult<()> {
        let _guard = self.lifecycle.lock().await;
        if !self.transport.is_supported() {
            return Ok(());
        }
        info!("session deactivated; reactivating");
        self.request_activation().await
    }

    /// Caller must hold the lifecycle lock.
    async fn request_activation(&self) -> LinkResult<()> {
        self.set_state(SessionState::Activating);
        self.activation_requests.fetch_add(1, Ordering::SeqCst);

        if let Err(e) = self.transport.activate().await {
            warn!("session activation failed: {e}");
            self.set_state(SessionState::Inactive);
            return Err(e);
        }
        Ok(())
    }

    /// Sends `payload` on `topic` with at-most-once semantics.
    ///
    /// Fails immediately with [`LinkError::PeerUnreachable`] if the session is
    /// not activated or the peer is not reachable right now. Nothing is
    /// queued and nothing is retried.
    pub async fn send(&self, topic: Topic, payload: Vec<u8>) -> LinkResult<()> {
        if !self.transport.is_supported() {
            return Err(LinkError::TransportUnsupported);
        }
        if !self.state().is_activated() || !self.transport.is_reachable() {
            debug!(%topic, state = ?self.state(), "peer unreachable; message not sent");
            return Err(LinkError::PeerUnreachable);
        }

        let envelope = AlertEnvelope::single(topic, payload);
        match tokio::time::timeout(self.send_timeout, self.transport.send_message(envelope)).await {
            Ok(Ok(())) => {
                debug!(%topic, "message handed to peer transport");
                Ok(())
            }
            Ok(Err(LinkError::SendFailed(cause))) => Err(LinkError::SendFailed(cause)),
            Ok(Err(e)) => Err(LinkError::SendFailed(e.to_string())),
            Err(_) => Err(LinkError::SendFailed(format!(
                "no response within {} ms",
                self.send_timeout.as_millis()
            ))),
        }
    }

    /// Registers the handler for inbound envelopes, replacing any previous one.
    pub fn on_receive<F>(&self, handler: F)
    where
        F: Fn(AlertEnvelope) + Send + Sync + 'static,
    {
        *self.handler.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(handler));
    }

    fn set_state(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(?previous, ?next, "session state changed");
        }
    }

    async fn handle_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::ActivationCompleted(Ok(())) => {
                let _guard = self.lifecycle.lock().await;
                let next = if self.transport.is_reachable() {
                    SessionState::Active
                } else {
                    SessionState::Unreachable
                };
                info!(state = ?next, "session activated");
                self.set_state(next);
            }
            TransportEvent::ActivationCompleted(Err(reason)) => {
                let _guard = self.lifecycle.lock().await;
                warn!("session activation completed with error: {reason}");
                self.set_state(SessionState::Inactive);
            }
            TransportEvent::ReachabilityChanged(reachable) => {
                let _guard = self.lifecycle.lock().await;
                if self.state().is_activated() {
                    self.set_state(if reachable {
                        SessionState::Active
                    } else {
                        SessionState::Unreachable
                    });
                }
            }
            TransportEvent::BecameInactive => {
                debug!("session became inactive");
            }
            TransportEvent::Deactivated => {
                // Error already logged by request_activation.
                let _ = self.reactivate().await;
            }
            TransportEvent::Message(envelope) => self.deliver(envelope),
        }
    }

    fn deliver(&self, envelope: AlertEnvelope) {
        let handler = self
            .handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match handler {
            Some(handler) => {
                if std::panic::catch_unwind(AssertUnwindSafe(|| handler(envelope))).is_err() {
                    warn!("receive handler panicked");
                }
            }
            None => debug!("no receive handler registered; dropping message"),
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_event_loop(transport: Arc<dyn PeerTransport>, manager: Weak<SessionManager>) {
    while let Some(event) = transport.next_event().await {
        let Some(manager) = manager.upgrade() else {
            break;
        };
        manager.handle_event(event).await;
    }
    debug!("session event loop stopped");
}
