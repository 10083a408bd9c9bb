//! Fall event source.
//!
//! Adapts the platform motion engine, which detects falls, into the alert
//! pipeline. The engine itself is an external collaborator behind
//! [`MotionSensor`]. Its callbacks arrive on engine-owned threads; the
//! [`FallEventSource`] hands every result to the [`MainContext`] before the
//! consumer sees it, and acknowledges every event exactly once.

use crate::context::MainContext;
use crate::error::{LinkError, LinkResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Authorization state of fall detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    Authorized,
    Denied,
    NotDetermined,
    Restricted,
    /// The engine returned a value this build does not know.
    Unknown,
}

impl AuthorizationStatus {
    pub fn is_authorized(self) -> bool {
        self == Self::Authorized
    }

    /// Maps the status onto the error taxonomy.
    ///
    /// `Unknown` is treated as not determined: the wearer may still be asked.
    pub fn into_result(self) -> LinkResult<()> {
        match self {
            Self::Authorized => Ok(()),
            Self::Denied => Err(LinkError::AuthorizationDenied),
            Self::Restricted => Err(LinkError::AuthorizationRestricted),
            Self::NotDetermined | Self::Unknown => Err(LinkError::AuthorizationNotDetermined),
        }
    }
}

/// A single physical fall detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallEvent {
    pub detected_at: DateTime<Utc>,
}

impl FallEvent {
    pub fn new(detected_at: DateTime<Utc>) -> Self {
        Self { detected_at }
    }
}

/// Acknowledgement owed to the motion engine for one event.
///
/// The engine stops reporting falls until the previous event is
/// acknowledged. The token acknowledges on [`complete`](Self::complete) or,
/// failing that, when dropped; never twice.
pub struct CompletionToken {
    ack: Option<Box<dyn FnOnce() + Send>>,
}

impl CompletionToken {
    pub fn new<F>(ack: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            ack: Some(Box::new(ack)),
        }
    }

    /// Acknowledges the event.
    pub fn complete(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(ack) = self.ack.take() {
            ack();
        }
    }
}

impl Drop for CompletionToken {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for CompletionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionToken")
            .field("pending", &self.ack.is_some())
            .finish()
    }
}

/// Callback the motion engine invokes per detection.
pub type SensorEventHandler = Box<dyn Fn(FallEvent, CompletionToken) + Send + Sync>;

/// The platform motion engine.
#[async_trait]
pub trait MotionSensor: Send + Sync {
    /// Returns whether fall detection exists on this device.
    fn is_available(&self) -> bool;

    /// Asks the wearer for access. May complete on any thread.
    async fn request_authorization(&self) -> AuthorizationStatus;

    /// Installs the detection callback, replacing any previous one.
    fn set_event_handler(&self, handler: SensorEventHandler);
}

type FallHandler = Arc<dyn Fn(FallEvent, CompletionToken) + Send + Sync>;

/// Translates motion engine callbacks into [`FallEvent`]s on the main context.
#[derive(Clone)]
pub struct FallEventSource {
    sensor: Arc<dyn MotionSensor>,
    context: MainContext,
}

impl FallEventSource {
    pub fn new(sensor: Arc<dyn MotionSensor>, context: MainContext) -> Self {
        Self { sensor, context }
    }

    pub fn is_available(&self) -> bool {
        self.sensor.is_available()
    }

    /// Requests authorization and runs `then` with the result on the main
    /// context. Returns whatever `then` returns.
    pub async fn request_authorization<F, R>(&self, then: F) -> LinkResult<R>
    where
        F: FnOnce(AuthorizationStatus) -> R + Send + 'static,
        R: Send + 'static,
    {
        let status = self.sensor.request_authorization().await;
        self.context
            .run(move || {
                info!(?status, "fall detection authorization resolved");
                then(status)
            })
            .await
    }

    /// Registers `handler` for every detection.
    ///
    /// The handler runs on the main context and owns the event's
    /// [`CompletionToken`]. It may move the token into work that continues
    /// elsewhere; the engine is acknowledged when the token completes or is
    /// dropped, including when the handler panics or the main context has
    /// shut down. Events are neither filtered nor retried.
    pub fn on_fall_detected<F>(&self, handler: F) -> LinkResult<()>
    where
        F: Fn(FallEvent, CompletionToken) + Send + Sync + 'static,
    {
        if !self.sensor.is_available() {
            warn!("fall detection unavailable on this device");
            return Err(LinkError::SensorUnavailable);
        }

        let handler: FallHandler = Arc::new(handler);
        let context = self.context.clone();
        self.sensor.set_event_handler(Box::new(move |event: FallEvent, token: CompletionToken| {
            debug!(detected_at = %event.detected_at, "fall event received from sensor");
            let handler = handler.clone();
            if let Err(e) = context.dispatch(async move { handler(event, token) }) {
                // The job and its token were dropped, which acknowledged the event.
                warn!("fall event not processed: {e}");
            }
        }));
        Ok(())
    }
}

impl std::fmt::Debug for FallEventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallEventSource")
            .field("available", &self.sensor.is_available())
            .finish()
    }
}

/// A mock motion engine for testing.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Mutex, PoisonError};
    use tokio::sync::oneshot;

    /// A motion engine driven by the test.
    pub struct MockMotionSensor {
        available: AtomicBool,
        status: Mutex<AuthorizationStatus>,
        handler: Mutex<Option<Arc<SensorEventHandler>>>,
        acks: Arc<AtomicUsize>,
    }

    impl MockMotionSensor {
        /// An available sensor that grants authorization.
        pub fn new() -> Self {
            Self::with_status(AuthorizationStatus::Authorized)
        }

        /// An available sensor that answers authorization with `status`.
        pub fn with_status(status: AuthorizationStatus) -> Self {
            Self {
                available: AtomicBool::new(true),
                status: Mutex::new(status),
                handler: Mutex::new(None),
                acks: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// A sensor on hardware without fall detection.
        pub fn unavailable() -> Self {
            let sensor = Self::new();
            sensor.available.store(false, Ordering::SeqCst);
            sensor
        }

        /// Returns whether a detection handler is installed.
        pub fn has_handler(&self) -> bool {
            self.handler
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_some()
        }

        /// Total acknowledgements received.
        pub fn ack_count(&self) -> usize {
            self.acks.load(Ordering::SeqCst)
        }

        /// Reports a fall, as the engine would from its own thread.
        ///
        /// The returned receiver resolves when the event is acknowledged.
        /// Returns `None` if no handler is installed.
        pub fn fire(&self, detected_at: DateTime<Utc>) -> Option<oneshot::Receiver<()>> {
            let handler = self
                .handler
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()?;

            let (tx, rx) = oneshot::channel();
            let acks = self.acks.clone();
            let token = CompletionToken::new(move || {
                acks.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(());
            });
            handler(FallEvent::new(detected_at), token);
            Some(rx)
        }
    }

    impl Default for MockMotionSensor {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl MotionSensor for MockMotionSensor {
        fn is_available(&self) -> bool {
            self.available.load(Ordering::SeqCst)
        }

        async fn request_authorization(&self) -> AuthorizationStatus {
            *self.status.lock().unwrap_or_else(PoisonError::into_inner)
        }

        fn set_event_handler(&self, handler: SensorEventHandler) {
            *self.handler.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(handler));
        }
    }
}
