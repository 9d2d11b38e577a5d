//! WebSocket rendezvous relay. Peers register under an id (the owner uses the
//! session id), dial each other by id and exchange JSON over relayed channels.
//! [`RelayTransport`] is the matching client side of the session transport.

pub mod client;
pub mod error;
pub mod frames;
pub mod registry;
pub mod server;

pub use client::RelayTransport;
pub use error::RelayError;
pub use frames::{ClientFrame, RelayFrame};
pub use registry::PeerRegistry;
pub use server::{build_router, start, RelayConfig, RelayHandle, RelayState};
