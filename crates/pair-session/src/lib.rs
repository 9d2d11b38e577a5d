//! Peer-to-peer session handling: the transport contract, the per-role
//! connection state machine with its retry policy, an async driver and the
//! pair exchange flow that runs on top of it.

pub mod error;
pub mod flow;
pub mod manager;
pub mod mock;
pub mod session;
pub mod transport;

pub use error::{SessionError, TransportError};
pub use flow::{FlowAction, PairFlow};
pub use manager::{ConnectionManager, SessionOptions, SessionSnapshot, SessionStatus};
pub use session::{spawn_session, SessionHandle};
pub use transport::{
    ChannelEvent, ChannelKey, DataChannel, EventSink, PeerEvent, PeerHandle, Stamped, Transport, TransportEvent,
};
