//! The transport contract, expressed as typed events on one channel instead of
//! callback registration.
//!
//! A transport opens a peer identity and reports everything that happens to it
//! (identity assigned, incoming channel, channel open/data/close/error) through
//! the [`EventSink`] it was given. Every sink carries the generation of the
//! manager that created it so events from a torn-down identity can be told
//! apart from live ones.

use std::fmt;

use pair_core::{PeerId, PeerMessage, SessionId};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Identifies one data channel within a peer handle.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ChannelKey(String);

impl ChannelKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub enum PeerEvent {
    /// The identity is registered and reachable under `peer_id`.
    Open { peer_id: PeerId },
    /// A remote peer dialed us.
    Connection(Box<dyn DataChannel>),
    Error(TransportError),
}

impl fmt::Debug for PeerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { peer_id } => f.debug_struct("Open").field("peer_id", peer_id).finish(),
            Self::Connection(channel) => f.debug_tuple("Connection").field(channel.key()).finish(),
            Self::Error(e) => f.debug_tuple("Error").field(e).finish(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChannelEvent {
    Open,
    /// Raw inbound value, not yet validated.
    Data(Value),
    Close,
    Error(TransportError),
}

#[derive(Debug)]
pub enum TransportEvent {
    Peer(PeerEvent),
    Channel { key: ChannelKey, event: ChannelEvent },
}

/// A transport event tagged with the manager generation it belongs to.
#[derive(Debug)]
pub struct Stamped {
    pub generation: u64,
    pub event: TransportEvent,
}

/// Where a transport delivers its events.
#[derive(Clone, Debug)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<Stamped>,
}

impl EventSink {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<Stamped>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns false once the receiving manager is gone.
    pub fn peer(&self, event: PeerEvent) -> bool {
        self.emit(TransportEvent::Peer(event))
    }

    pub fn channel(&self, key: &ChannelKey, event: ChannelEvent) -> bool {
        self.emit(TransportEvent::Channel {
            key: key.clone(),
            event,
        })
    }

    fn emit(&self, event: TransportEvent) -> bool {
        self.tx
            .send(Stamped {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// Opens peer identities.
pub trait Transport: Send {
    /// Register an identity. `Some(id)` asks for that exact peer id; `None`
    /// lets the transport assign one, reported later via [`PeerEvent::Open`].
    fn open(
        &mut self,
        session_id: Option<&SessionId>,
        sink: EventSink,
    ) -> Result<Box<dyn PeerHandle>, TransportError>;
}

/// A live peer identity.
pub trait PeerHandle: Send {
    /// Dial a remote peer. The returned channel reports `Open` on the sink
    /// once the remote accepted.
    fn connect(&mut self, remote: &PeerId) -> Result<Box<dyn DataChannel>, TransportError>;

    /// Release the identity. Must be safe to call more than once.
    fn destroy(&mut self);
}

pub trait DataChannel: Send {
    fn key(&self) -> &ChannelKey;
    fn send(&mut self, message: &PeerMessage) -> Result<(), TransportError>;
    fn close(&mut self);
}
