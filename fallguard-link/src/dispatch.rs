//! Alert dispatcher.
//!
//! Wearable side: detection → encode → send on `fallDetected`.
//! Companion side: inbound envelope → decode → publish on the local bus.
//!
//! Failures end here. A failed send is logged and dropped; the wearable has
//! already alerted the wearer locally, and a late fall alert is worthless.

use crate::bus::LocalEventBus;
use crate::codec;
use crate::error::LinkResult;
use crate::protocol::{AlertEnvelope, Topic};
use crate::sensor::{FallEvent, FallEventSource};
use crate::session::SessionManager;
use fallguard_types::Caregiver;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Coordinates detection, transport and local fan-out.
#[derive(Debug)]
pub struct AlertDispatcher {
    session: Arc<SessionManager>,
    bus: Arc<LocalEventBus<Caregiver>>,
    alert: Caregiver,
}

impl AlertDispatcher {
    /// Creates a dispatcher that sends `alert` for every detection.
    pub fn new(
        session: Arc<SessionManager>,
        bus: Arc<LocalEventBus<Caregiver>>,
        alert: Caregiver,
    ) -> Self {
        Self {
            session,
            bus,
            alert,
        }
    }

    /// The caregiver record sent with every alert.
    pub fn alert(&self) -> &Caregiver {
        &self.alert
    }

    /// Encodes the alert and makes a single send attempt.
    ///
    /// The error is returned for inspection only; it has already been logged
    /// and nothing retries it.
    pub async fn handle_detection(&self, event: &FallEvent) -> LinkResult<()> {
        info!(detected_at = %event.detected_at, caregiver = %self.alert.id(), "fall detected; alerting peer");

        let result = match codec::encode(&self.alert) {
            Ok(payload) => self.session.send(Topic::FallDetected, payload).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => info!("fall alert sent"),
            Err(e) => warn!("fall alert not delivered: {e}"),
        }
        result
    }

    /// Routes an inbound envelope. Returns whether an alert was published.
    ///
    /// Envelopes with an unknown or extra key and payloads that fail to
    /// decode are dropped without surfacing an error.
    pub fn handle_inbound(&self, envelope: &AlertEnvelope) -> bool {
        let Some((topic, payload)) = envelope.sole_entry() else {
            debug!(keys = ?envelope.keys().collect::<Vec<_>>(), "ignoring unrecognised envelope");
            return false;
        };

        match topic {
            Topic::FallDetected => match codec::decode(payload) {
                Ok(caregiver) => {
                    info!(caregiver = %caregiver.id(), name = caregiver.name(), "fall alert received");
                    self.bus.publish(topic, caregiver);
                    true
                }
                Err(e) => {
                    debug!("dropping malformed fall alert: {e}");
                    false
                }
            },
        }
    }

    /// Routes every inbound envelope of the session through this dispatcher.
    ///
    /// The session only holds a weak reference back to the dispatcher.
    pub fn attach_receiver(self: &Arc<Self>) {
        let dispatcher = Arc::downgrade(self);
        self.session.on_receive(move |envelope| {
            if let Some(dispatcher) = dispatcher.upgrade() {
                dispatcher.handle_inbound(&envelope);
            }
        });
    }

    /// Sends an alert for every detection reported by `source`.
    ///
    /// The send runs on its own task so the main context is not held for the
    /// transport timeout; the event is acknowledged once the attempt ends.
    pub fn attach_source(self: &Arc<Self>, source: &FallEventSource) -> LinkResult<()> {
        let dispatcher = self.clone();
        source.on_fall_detected(move |event, token| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                // Already logged; no retry.
                let _ = dispatcher.handle_detection(&event).await;
                token.complete();
            });
        })
    }
}
