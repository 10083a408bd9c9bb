//! Process-scoped alert runtime.
//!
//! Builds and wires the session, main context, bus, fall event source and
//! dispatcher. One runtime per process; pass it (or its parts) to whatever
//! needs them.

use crate::bus::LocalEventBus;
use crate::config::LinkConfig;
use crate::context::MainContext;
use crate::dispatch::AlertDispatcher;
use crate::error::{LinkError, LinkResult};
use crate::sensor::{AuthorizationStatus, FallEventSource, MotionSensor};
use crate::session::SessionManager;
use crate::transport::PeerTransport;
use fallguard_types::Caregiver;
use std::sync::Arc;
use tracing::{info, warn};

/// The running alert pipeline of one device.
#[derive(Debug)]
pub struct AlertRuntime {
    config: LinkConfig,
    context: MainContext,
    session: Arc<SessionManager>,
    bus: Arc<LocalEventBus<Caregiver>>,
    dispatcher: Arc<AlertDispatcher>,
    authorization: Option<AuthorizationStatus>,
}

impl AlertRuntime {
    /// Starts the pipeline.
    ///
    /// Pass a `sensor` on the wearable; the companion passes `None` and only
    /// receives. Unsupported transports, denied authorization and missing
    /// sensors degrade the runtime but do not fail it.
    pub async fn start(
        config: LinkConfig,
        transport: Arc<dyn PeerTransport>,
        sensor: Option<Arc<dyn MotionSensor>>,
    ) -> LinkResult<Self> {
        let alert = config
            .sentinel_caregiver()
            .map_err(|e| LinkError::Config(e.to_string()))?;

        let context = MainContext::spawn();
        let session = SessionManager::new(transport, &config);
        let bus = Arc::new(LocalEventBus::new(context.clone()));
        let dispatcher = Arc::new(AlertDispatcher::new(session.clone(), bus.clone(), alert));

        dispatcher.attach_receiver();
        session.start();
        if let Err(e) = session.activate().await {
            warn!("peer session unavailable: {e}");
        }

        let authorization = match sensor {
            Some(sensor) => {
                let source = FallEventSource::new(sensor, context.clone());
                Some(Self::enable_detection(&source, &dispatcher).await?)
            }
            None => None,
        };

        info!(device = %config.device_name, "alert runtime started");
        Ok(Self {
            config,
            context,
            session,
            bus,
            dispatcher,
            authorization,
        })
    }

    async fn enable_detection(
        source: &FallEventSource,
        dispatcher: &Arc<AlertDispatcher>,
    ) -> LinkResult<AuthorizationStatus> {
        let handoff_source = source.clone();
        let dispatcher = dispatcher.clone();
        source
            .request_authorization(move |status| {
                match status.into_result() {
                    Ok(()) => {
                        if let Err(e) = dispatcher.attach_source(&handoff_source) {
                            warn!("fall detection disabled: {e}");
                        }
                    }
                    Err(e) => warn!("fall detection disabled: {e}"),
                }
                status
            })
            .await
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn context(&self) -> &MainContext {
        &self.context
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// The bus on which received alerts are published.
    pub fn bus(&self) -> &Arc<LocalEventBus<Caregiver>> {
        &self.bus
    }

    pub fn dispatcher(&self) -> &Arc<AlertDispatcher> {
        &self.dispatcher
    }

    /// Authorization result, or `None` when running without a sensor.
    /// Anything but `Authorized` should be surfaced to the wearer.
    pub fn authorization(&self) -> Option<AuthorizationStatus> {
        self.authorization
    }

    /// Stops the session loop and the main context.
    pub fn shutdown(&self) {
        self.session.shutdown();
        self.context.shutdown();
        info!(device = %self.config.device_name, "alert runtime stopped");
    }
}
