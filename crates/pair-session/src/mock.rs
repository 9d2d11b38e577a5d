use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use pair_core::{PeerId, PeerMessage, SessionId};

use crate::error::TransportError;
use crate::transport::{ChannelEvent, ChannelKey, DataChannel, EventSink, PeerEvent, PeerHandle, Transport};

/// Scripted result of one `connect` call.
#[derive(Clone, Debug)]
pub enum ConnectOutcome {
    /// Hand back a channel and report it open.
    Accept,
    /// Hand back a channel that never reports anything.
    Pending,
    /// Hand back a channel that immediately reports this error.
    ErrorEvent(TransportError),
    /// Fail the connect call itself.
    Fail(TransportError),
}

#[derive(Default)]
struct MockState {
    opens: Vec<Option<SessionId>>,
    sinks: Vec<EventSink>,
    connects: Vec<PeerId>,
    sent: Vec<(ChannelKey, PeerMessage)>,
    closed: Vec<ChannelKey>,
    destroyed: usize,
    script: VecDeque<ConnectOutcome>,
    fallback: Option<ConnectOutcome>,
    open_error: Option<TransportError>,
    next_channel: u64,
}

impl MockState {
    fn channel(&mut self, shared: &Arc<Mutex<MockState>>) -> MockChannel {
        self.next_channel += 1;
        MockChannel {
            key: ChannelKey::new(format!("mock-{}", self.next_channel)),
            state: Arc::clone(shared),
        }
    }
}

/// In-memory transport for deterministic tests. Clones share state, so a test
/// keeps one clone to script outcomes and inspect what the manager did.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue outcomes for the next `connect` calls, in order.
    pub fn script(&self, outcomes: impl IntoIterator<Item = ConnectOutcome>) {
        self.state.lock().script.extend(outcomes);
    }

    /// Outcome used once the script runs out. Defaults to `Accept`.
    pub fn always(&self, outcome: ConnectOutcome) {
        self.state.lock().fallback = Some(outcome);
    }

    /// Make the next `open` call fail.
    pub fn fail_open(&self, error: TransportError) {
        self.state.lock().open_error = Some(error);
    }

    pub fn opened_with(&self) -> Vec<Option<SessionId>> {
        self.state.lock().opens.clone()
    }

    pub fn connect_targets(&self) -> Vec<PeerId> {
        self.state.lock().connects.clone()
    }

    pub fn connect_count(&self) -> usize {
        self.state.lock().connects.len()
    }

    pub fn sent(&self) -> Vec<(ChannelKey, PeerMessage)> {
        self.state.lock().sent.clone()
    }

    pub fn sent_messages(&self) -> Vec<PeerMessage> {
        self.state.lock().sent.iter().map(|(_, m)| m.clone()).collect()
    }

    pub fn closed(&self) -> Vec<ChannelKey> {
        self.state.lock().closed.clone()
    }

    pub fn destroyed(&self) -> usize {
        self.state.lock().destroyed
    }

    /// Sink handed to the most recent `open`.
    pub fn last_sink(&self) -> Option<EventSink> {
        self.state.lock().sinks.last().cloned()
    }

    pub fn sink(&self, index: usize) -> Option<EventSink> {
        self.state.lock().sinks.get(index).cloned()
    }

    /// Simulate a remote peer dialing the latest identity.
    pub fn incoming(&self) -> Option<ChannelKey> {
        let mut state = self.state.lock();
        let sink = state.sinks.last().cloned()?;
        let channel = state.channel(&self.state);
        let key = channel.key.clone();
        drop(state);
        sink.peer(PeerEvent::Connection(Box::new(channel)));
        Some(key)
    }

    pub fn emit_channel(&self, key: &ChannelKey, event: ChannelEvent) -> bool {
        self.last_sink().is_some_and(|sink| sink.channel(key, event))
    }

    pub fn emit_data(&self, key: &ChannelKey, value: Value) -> bool {
        self.emit_channel(key, ChannelEvent::Data(value))
    }
}

impl Transport for MockTransport {
    fn open(
        &mut self,
        session_id: Option<&SessionId>,
        sink: EventSink,
    ) -> Result<Box<dyn PeerHandle>, TransportError> {
        let mut state = self.state.lock();
        state.opens.push(session_id.cloned());
        if let Some(error) = state.open_error.take() {
            return Err(error);
        }
        state.sinks.push(sink.clone());
        drop(state);

        let peer_id = session_id.map(PeerId::from).unwrap_or_default();
        sink.peer(PeerEvent::Open { peer_id });
        Ok(Box::new(MockHandle {
            state: Arc::clone(&self.state),
            sink,
        }))
    }
}

struct MockHandle {
    state: Arc<Mutex<MockState>>,
    sink: EventSink,
}

impl PeerHandle for MockHandle {
    fn connect(&mut self, remote: &PeerId) -> Result<Box<dyn DataChannel>, TransportError> {
        let mut state = self.state.lock();
        state.connects.push(remote.clone());
        let outcome = state
            .script
            .pop_front()
            .or_else(|| state.fallback.clone())
            .unwrap_or(ConnectOutcome::Accept);
        if let ConnectOutcome::Fail(error) = outcome {
            return Err(error);
        }
        let channel = state.channel(&self.state);
        drop(state);

        match outcome {
            ConnectOutcome::Accept => {
                self.sink.channel(&channel.key, ChannelEvent::Open);
            }
            ConnectOutcome::ErrorEvent(error) => {
                self.sink.channel(&channel.key, ChannelEvent::Error(error));
            }
            ConnectOutcome::Pending | ConnectOutcome::Fail(_) => {}
        }
        Ok(Box::new(channel))
    }

    fn destroy(&mut self) {
        self.state.lock().destroyed += 1;
    }
}

struct MockChannel {
    key: ChannelKey,
    state: Arc<Mutex<MockState>>,
}

impl DataChannel for MockChannel {
    fn key(&self) -> &ChannelKey {
        &self.key
    }

    fn send(&mut self, message: &PeerMessage) -> Result<(), TransportError> {
        self.state.lock().sent.push((self.key.clone(), message.clone()));
        Ok(())
    }

    fn close(&mut self) {
        self.state.lock().closed.push(self.key.clone());
    }
}
