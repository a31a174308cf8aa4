//! Media transport boundary.
//!
//! - [`session`] - capability traits a transport implements
//! - [`events`] - events the transport raises
//! - [`observers`] - observer registry with idempotent unsubscribe
//! - [`adapter`] - `SessionAdapter`, the orchestrator's view of one session

pub mod adapter;
pub mod events;
pub mod observers;
pub mod session;

pub use adapter::SessionAdapter;
pub use events::{EventKind, InboundSignal, MediaKind, OutboundSignal, RemoteStream, RtcEvent};
pub use observers::{EventSink, ObserverRegistry, Subscription};
pub use session::{
    ConnectionInfo, LocalHandle, PublishSettings, RtcError, RtcSession, RtcSessionFactory,
};
