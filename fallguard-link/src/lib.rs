//! Fall alert delivery between a wearable and its paired companion device.
//!
//! # Architecture
//!
//! ## Components
//!
//! - **Codec**: JSON encoding of the [`Caregiver`](fallguard_types::Caregiver) alert record
//! - **Protocol**: topic-keyed envelopes exchanged with the peer
//! - **Transport**: abstracts over the platform peer link
//! - **Session**: activation, reachability and reactivation of the peer link
//! - **Sensor**: adapts the motion engine's fall callbacks
//! - **Bus**: fans received alerts out to local subscribers
//! - **Dispatch**: ties the above together on both devices
//!
//! ## Alert flow
//!
//! 1. **Detect**: the motion engine reports a fall on the wearable
//! 2. **Encode**: the alert record is serialized
//! 3. **Send**: one attempt on the `fallDetected` topic, only if the peer is reachable
//! 4. **Decode**: the companion decodes the payload, dropping anything malformed
//! 5. **Publish**: subscribers on the companion are notified on the main context
//!
//! # Example
//!
//! ```
//! use fallguard_link::{codec, LinkConfig};
//!
//! let config = LinkConfig::default();
//! let alert = config.sentinel_caregiver().unwrap();
//!
//! let bytes = codec::encode(&alert).unwrap();
//! assert_eq!(codec::decode(&bytes).unwrap(), alert);
//! ```

pub mod bus;
pub mod codec;
mod config;
pub mod context;
mod dispatch;
mod error;
pub mod protocol;
mod runtime;
pub mod sensor;
pub mod session;
pub mod transport;

pub use bus::{LocalEventBus, Subscriber, SubscriptionHandle};
pub use config::LinkConfig;
pub use context::MainContext;
pub use dispatch::AlertDispatcher;
pub use error::{LinkError, LinkResult};
pub use protocol::{AlertEnvelope, Topic, FALL_DETECTED_KEY};
pub use runtime::AlertRuntime;
pub use sensor::{
    AuthorizationStatus, CompletionToken, FallEvent, FallEventSource, MotionSensor,
    SensorEventHandler,
};
pub use session::{ReceiveHandler, SessionManager, SessionState};
pub use transport::{PeerTransport, TransportEvent};
