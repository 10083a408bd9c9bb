//! Transport layer abstraction.
//!
//! Defines the single logical message channel to the paired peer. The
//! platform link (watch connectivity, BLE, a socket in tests) implements
//! [`PeerTransport`]; the session manager drives it.

use crate::error::LinkResult;
use crate::protocol::AlertEnvelope;
use async_trait::async_trait;

/// Something the transport reports asynchronously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A previous `activate` call finished.
    ActivationCompleted(Result<(), String>),
    /// The peer became reachable or stopped being reachable.
    ReachabilityChanged(bool),
    /// The session is about to deactivate (peer switching, app backgrounded).
    BecameInactive,
    /// The session was deactivated and must be activated again.
    Deactivated,
    /// A message arrived from the peer.
    Message(AlertEnvelope),
}

/// A link to the paired peer device.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Returns whether this device can host a peer session at all.
    fn is_supported(&self) -> bool;

    /// Requests activation. Completion is reported as
    /// [`TransportEvent::ActivationCompleted`].
    async fn activate(&self) -> LinkResult<()>;

    /// Returns whether the peer can accept a message right now.
    fn is_reachable(&self) -> bool;

    /// Makes a single attempt to deliver `envelope` to the peer.
    async fn send_message(&self, envelope: AlertEnvelope) -> LinkResult<()>;

    /// Receives the next transport event.
    /// Returns `None` if the transport is shutting down.
    async fn next_event(&self) -> Option<TransportEvent>;
}

/// A mock transport for testing.
pub mod mock {
    use super::*;
    use crate::error::LinkError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Mutex, PoisonError};
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// An in-memory peer link. Two endpoints created with [`MockTransport::pair`]
    /// deliver sent envelopes to each other as [`TransportEvent::Message`].
    #[derive(Debug)]
    pub struct MockTransport {
        supported: AtomicBool,
        reachable: AtomicBool,
        fail_sends: AtomicBool,
        send_delay: Mutex<Option<Duration>>,
        activations: AtomicUsize,
        events_tx: mpsc::UnboundedSender<TransportEvent>,
        events_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<TransportEvent>>,
        peer_tx: Option<mpsc::UnboundedSender<TransportEvent>>,
        sent: Mutex<Vec<AlertEnvelope>>,
    }

    impl MockTransport {
        fn build(
            events_tx: mpsc::UnboundedSender<TransportEvent>,
            events_rx: mpsc::UnboundedReceiver<TransportEvent>,
            peer_tx: Option<mpsc::UnboundedSender<TransportEvent>>,
        ) -> Self {
            Self {
                supported: AtomicBool::new(true),
                reachable: AtomicBool::new(true),
                fail_sends: AtomicBool::new(false),
                send_delay: Mutex::new(None),
                activations: AtomicUsize::new(0),
                events_tx,
                events_rx: tokio::sync::Mutex::new(events_rx),
                peer_tx,
                sent: Mutex::new(Vec::new()),
            }
        }

        /// Creates an endpoint with no peer attached. Sends are recorded only.
        pub fn new() -> Self {
            let (tx, rx) = mpsc::unbounded_channel();
            Self::build(tx, rx, None)
        }

        /// Creates an endpoint on a device without peer support.
        pub fn unsupported() -> Self {
            let transport = Self::new();
            transport.supported.store(false, Ordering::SeqCst);
            transport
        }

        /// Creates a pair of linked endpoints (wearable, companion).
        pub fn pair() -> (Self, Self) {
            let (tx_a, rx_a) = mpsc::unbounded_channel();
            let (tx_b, rx_b) = mpsc::unbounded_channel();

            let a = Self::build(tx_a.clone(), rx_a, Some(tx_b.clone()));
            let b = Self::build(tx_b, rx_b, Some(tx_a));
            (a, b)
        }

        /// Changes peer reachability and reports it.
        pub fn set_reachable(&self, reachable: bool) {
            self.reachable.store(reachable, Ordering::SeqCst);
            self.push(TransportEvent::ReachabilityChanged(reachable));
        }

        /// Changes peer reachability without reporting it, as a platform
        /// link does between callbacks.
        pub fn set_reachable_silently(&self, reachable: bool) {
            self.reachable.store(reachable, Ordering::SeqCst);
        }

        /// Makes every following send fail at the transport level.
        pub fn set_fail_sends(&self, fail: bool) {
            self.fail_sends.store(fail, Ordering::SeqCst);
        }

        /// Makes every following send take `delay` before completing.
        pub fn set_send_delay(&self, delay: Option<Duration>) {
            *self.send_delay.lock().unwrap_or_else(PoisonError::into_inner) = delay;
        }

        /// Simulates the platform tearing the session down.
        pub fn deactivate(&self) {
            self.push(TransportEvent::BecameInactive);
            self.push(TransportEvent::Deactivated);
        }

        /// Queues an inbound envelope as if the peer had sent it.
        pub fn inject(&self, envelope: AlertEnvelope) {
            self.push(TransportEvent::Message(envelope));
        }

        /// Number of `activate` calls that reached the transport.
        pub fn activation_count(&self) -> usize {
            self.activations.load(Ordering::SeqCst)
        }

        /// Envelopes successfully handed to the link.
        pub fn sent_messages(&self) -> Vec<AlertEnvelope> {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        fn push(&self, event: TransportEvent) {
            // The receiver lives as long as `self`.
            let _ = self.events_tx.send(event);
        }
    }

    impl Default for MockTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl PeerTransport for MockTransport {
        fn is_supported(&self) -> bool {
            self.supported.load(Ordering::SeqCst)
        }

        async fn activate(&self) -> LinkResult<()> {
            if !self.is_supported() {
                return Err(LinkError::TransportUnsupported);
            }
            self.activations.fetch_add(1, Ordering::SeqCst);
            self.push(TransportEvent::ActivationCompleted(Ok(())));
            Ok(())
        }

        fn is_reachable(&self) -> bool {
            self.reachable.load(Ordering::SeqCst)
        }

        async fn send_message(&self, envelope: AlertEnvelope) -> LinkResult<()> {
            let delay = *self.send_delay.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_sends.load(Ordering::SeqCst) {
                return Err(LinkError::SendFailed("injected transport failure".into()));
            }
            if let Some(peer_tx) = &self.peer_tx {
                peer_tx
                    .send(TransportEvent::Message(envelope.clone()))
                    .map_err(|_| LinkError::SendFailed("peer endpoint closed".into()))?;
            }
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(envelope);
            Ok(())
        }

        async fn next_event(&self) -> Option<TransportEvent> {
            self.events_rx.lock().await.recv().await
        }
    }
}
