//! Per-role connection state machine.
//!
//! The manager is synchronous: it reacts to operations, transport events and
//! retry deadlines handed to it, and never blocks. [`crate::session`] drives it
//! from a tokio task; tests drive it directly with synthetic events.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use pair_core::{parse_message, PeerId, PeerMessage, Role, SessionId};

use crate::error::SessionError;
use crate::transport::{
    ChannelEvent, DataChannel, EventSink, PeerEvent, PeerHandle, Stamped, Transport, TransportEvent,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    /// Initiator only: identity registered, waiting to be dialed.
    Listening,
    Connecting,
    Retrying,
    Connected,
    Error,
}

impl SessionStatus {
    pub fn initial(role: Role) -> Self {
        match role {
            Role::Owner => Self::Listening,
            Role::Guest => Self::Idle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Connecting => "connecting",
            Self::Retrying => "retrying",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub role: Role,
    pub session_id: Option<SessionId>,
    /// 0 means unbounded.
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Open the transport identity immediately.
    pub auto_start: bool,
}

impl SessionOptions {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            session_id: None,
            max_retries: 3,
            retry_delay: Duration::from_millis(2500),
            auto_start: true,
        }
    }

    pub fn owner(session_id: SessionId) -> Self {
        Self::new(Role::Owner).with_session_id(session_id)
    }

    pub fn guest(session_id: SessionId) -> Self {
        Self::new(Role::Guest).with_session_id(session_id)
    }

    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }
}

/// Observable state of one manager.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub peer_id: Option<PeerId>,
    pub status: SessionStatus,
    pub error: Option<String>,
    pub retry_count: u32,
    pub last_message: Option<PeerMessage>,
}

impl SessionSnapshot {
    fn initial(role: Role) -> Self {
        Self {
            peer_id: None,
            status: SessionStatus::initial(role),
            error: None,
            retry_count: 0,
            last_message: None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct PendingRetry {
    token: u64,
    due: Instant,
}

pub struct ConnectionManager<T: Transport> {
    transport: T,
    options: SessionOptions,
    events: mpsc::UnboundedSender<Stamped>,
    handle: Option<Box<dyn PeerHandle>>,
    channel: Option<Box<dyn DataChannel>>,
    /// Explicit target from the last `connect`, preferred over the configured id.
    target: Option<SessionId>,
    generation: u64,
    snapshot: SessionSnapshot,
    retry: Option<PendingRetry>,
    retry_tokens: u64,
    /// Guest identity dropped after a peer-level failure; the next retry
    /// reopens it before dialing.
    identity_lost: bool,
}

impl<T: Transport> ConnectionManager<T> {
    /// Build a manager whose transport reports into `events`. Opens the
    /// identity right away when `auto_start` is set.
    pub fn new(transport: T, options: SessionOptions, events: mpsc::UnboundedSender<Stamped>) -> Self {
        let snapshot = SessionSnapshot::initial(options.role);
        let mut manager = Self {
            transport,
            options,
            events,
            handle: None,
            channel: None,
            target: None,
            generation: 0,
            snapshot,
            retry: None,
            retry_tokens: 0,
            identity_lost: false,
        };
        if manager.options.auto_start {
            manager.start();
        }
        manager
    }

    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.snapshot
    }

    pub fn status(&self) -> SessionStatus {
        self.snapshot.status
    }

    pub fn role(&self) -> Role {
        self.options.role
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Open the transport identity if none is live.
    pub fn start(&mut self) {
        self.open_identity();
        self.reconcile_retry();
    }

    fn open_identity(&mut self) {
        if self.handle.is_some() {
            return;
        }
        let session_id = match self.options.role {
            Role::Owner => self.options.session_id.clone(),
            Role::Guest => None,
        };
        let sink = EventSink::new(self.generation, self.events.clone());
        match self.transport.open(session_id.as_ref(), sink) {
            Ok(handle) => {
                debug!(role = %self.options.role, session_id = ?session_id, generation = self.generation, "transport opened");
                self.handle = Some(handle);
                self.identity_lost = false;
            }
            Err(e) => {
                warn!(role = %self.options.role, error = %e, kind = e.error_kind(), "transport open failed");
                self.fail(e.into());
            }
        }
    }

    /// Dial `remote`, or the configured session id when `None`.
    pub fn connect(&mut self, remote: Option<&SessionId>) {
        if let Some(remote) = remote {
            self.target = Some(remote.clone());
        }
        // a manual attempt restarts the retry delay
        self.retry = None;
        if self.handle.is_none() && self.identity_lost {
            self.open_identity();
        }
        self.attempt_connect();
        self.reconcile_retry();
    }

    fn attempt_connect(&mut self) {
        if self.handle.is_none() {
            self.fail(SessionError::NotReady);
            return;
        }
        let Some(target) = self.target.clone().or_else(|| self.options.session_id.clone()) else {
            self.fail(SessionError::MissingTarget);
            return;
        };
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        let result = handle.connect(&PeerId::from(&target));
        self.set_status(SessionStatus::Connecting);
        match result {
            Ok(channel) => {
                debug!(session_id = %target, channel = %channel.key(), "dialing");
                self.replace_channel(channel);
            }
            Err(e) => {
                warn!(session_id = %target, error = %e, kind = e.error_kind(), "connect failed");
                self.fail(e.into());
            }
        }
    }

    /// Send when connected; dropped otherwise. Returns whether the message
    /// was handed to the channel.
    pub fn send(&mut self, message: &PeerMessage) -> bool {
        if self.snapshot.status != SessionStatus::Connected {
            debug!(kind = message.kind(), status = %self.snapshot.status, "dropping send while not connected");
            return false;
        }
        let Some(channel) = self.channel.as_mut() else {
            return false;
        };
        match channel.send(message) {
            Ok(()) => {
                trace!(kind = message.kind(), "sent");
                true
            }
            Err(e) => {
                warn!(kind = message.kind(), error = %e, "send failed");
                false
            }
        }
    }

    /// Close the channel and release the identity. Safe from any state.
    pub fn disconnect(&mut self) {
        self.teardown();
        self.set_status(SessionStatus::Idle);
    }

    /// Tear down and reopen a fresh identity with the role's initial state.
    pub fn restart(&mut self) {
        info!(role = %self.options.role, "restarting session");
        self.teardown();
        self.target = None;
        self.snapshot = SessionSnapshot::initial(self.options.role);
        self.start();
    }

    fn teardown(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        if let Some(mut handle) = self.handle.take() {
            handle.destroy();
        }
        if self.retry.take().is_some() {
            debug!("pending retry cancelled");
        }
        self.identity_lost = false;
        self.generation += 1;
    }

    /// Release a guest identity whose transport failed. Target and retry
    /// count survive; events from the old identity become stale.
    fn drop_identity(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        if let Some(mut handle) = self.handle.take() {
            handle.destroy();
        }
        self.identity_lost = true;
        self.generation += 1;
        debug!(generation = self.generation, "guest identity released");
    }

    /// Apply one transport event. Returns an inbound message that passed
    /// validation.
    pub fn handle_event(&mut self, stamped: Stamped) -> Option<PeerMessage> {
        if stamped.generation != self.generation {
            trace!(generation = stamped.generation, current = self.generation, "ignoring stale event");
            if let TransportEvent::Peer(PeerEvent::Connection(mut channel)) = stamped.event {
                channel.close();
            }
            return None;
        }

        let mut inbound = None;
        match stamped.event {
            TransportEvent::Peer(event) => self.on_peer_event(event),
            TransportEvent::Channel { key, event } => {
                if self.channel.as_ref().map(|c| c.key()) != Some(&key) {
                    trace!(channel = %key, "ignoring event for inactive channel");
                    return None;
                }
                inbound = self.on_channel_event(event);
            }
        }
        self.reconcile_retry();
        inbound
    }

    fn on_peer_event(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::Open { peer_id } => {
                debug!(peer_id = %peer_id, "peer identity open");
                self.snapshot.peer_id = Some(peer_id);
                if self.options.role == Role::Owner && self.snapshot.status == SessionStatus::Idle {
                    self.set_status(SessionStatus::Listening);
                }
            }
            PeerEvent::Connection(mut channel) => match self.options.role {
                Role::Owner => {
                    debug!(channel = %channel.key(), "incoming connection");
                    self.replace_channel(channel);
                }
                Role::Guest => {
                    debug!(channel = %channel.key(), "closing unexpected incoming connection");
                    channel.close();
                }
            },
            PeerEvent::Error(e) => {
                warn!(error = %e, kind = e.error_kind(), "peer error");
                if self.options.role == Role::Guest {
                    self.drop_identity();
                }
                self.fail(e.into());
            }
        }
    }

    fn on_channel_event(&mut self, event: ChannelEvent) -> Option<PeerMessage> {
        match event {
            ChannelEvent::Open => {
                self.snapshot.retry_count = 0;
                self.snapshot.error = None;
                self.set_status(SessionStatus::Connected);
                None
            }
            ChannelEvent::Data(value) => {
                let message = parse_message(&value)?;
                trace!(kind = message.kind(), "received");
                self.snapshot.last_message = Some(message.clone());
                Some(message)
            }
            ChannelEvent::Close => {
                self.channel = None;
                if self.snapshot.status != SessionStatus::Error {
                    self.set_status(SessionStatus::Idle);
                }
                None
            }
            ChannelEvent::Error(e) => {
                warn!(error = %e, kind = e.error_kind(), "channel error");
                if let Some(mut channel) = self.channel.take() {
                    channel.close();
                }
                self.fail(e.into());
                None
            }
        }
    }

    fn replace_channel(&mut self, channel: Box<dyn DataChannel>) {
        if let Some(mut previous) = self.channel.replace(channel) {
            debug!(channel = %previous.key(), "closing replaced channel");
            previous.close();
        }
    }

    fn fail(&mut self, error: SessionError) {
        self.snapshot.error = Some(error.to_string());
        self.set_status(SessionStatus::Error);
    }

    fn set_status(&mut self, status: SessionStatus) {
        if self.snapshot.status != status {
            debug!(from = %self.snapshot.status, to = %status, "status change");
            self.snapshot.status = status;
        }
    }

    fn retry_allowed(&self) -> bool {
        let budget_left = self.options.max_retries == 0 || self.snapshot.retry_count < self.options.max_retries;
        self.options.role == Role::Guest
            && (self.handle.is_some() || self.identity_lost)
            && (self.target.is_some() || self.options.session_id.is_some())
            && matches!(
                self.snapshot.status,
                SessionStatus::Error | SessionStatus::Idle | SessionStatus::Retrying
            )
            && budget_left
    }

    /// Keep at most one retry pending, and only while one is warranted.
    fn reconcile_retry(&mut self) {
        if !self.retry_allowed() {
            if self.retry.take().is_some() {
                debug!("pending retry cancelled");
            }
            return;
        }
        if self.retry.is_none() {
            self.retry_tokens += 1;
            let due = Instant::now() + self.options.retry_delay;
            self.retry = Some(PendingRetry {
                token: self.retry_tokens,
                due,
            });
            debug!(
                retry = self.snapshot.retry_count + 1,
                delay_ms = self.options.retry_delay.as_millis() as u64,
                "retry scheduled"
            );
        }
    }

    /// Deadline and token of the pending retry, if any.
    pub fn next_retry(&self) -> Option<(Instant, u64)> {
        self.retry.map(|r| (r.due, r.token))
    }

    /// Fire the retry identified by `token`. Tokens of cancelled or replaced
    /// retries are ignored.
    pub fn fire_retry(&mut self, token: u64) {
        match self.retry {
            Some(pending) if pending.token == token => self.retry = None,
            _ => {
                trace!(token, "ignoring stale retry");
                return;
            }
        }
        self.snapshot.retry_count += 1;
        info!(
            retry = self.snapshot.retry_count,
            max_retries = self.options.max_retries,
            "reconnecting"
        );
        self.set_status(SessionStatus::Retrying);
        if self.handle.is_none() && self.identity_lost {
            info!("reopening guest identity");
            self.open_identity();
        }
        if self.handle.is_some() {
            self.attempt_connect();
        }
        self.reconcile_retry();
    }
}

impl<T: Transport> Drop for ConnectionManager<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::mock::{ConnectOutcome, MockTransport};
    use crate::transport::ChannelKey;
    use pair_core::UserAnswers;
    use serde_json::json;

    type Events = mpsc::UnboundedReceiver<Stamped>;

    fn manager(transport: &MockTransport, options: SessionOptions) -> (ConnectionManager<MockTransport>, Events) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionManager::new(transport.clone(), options, tx), rx)
    }

    /// Feed every queued event; returns validated inbound messages.
    fn pump(manager: &mut ConnectionManager<MockTransport>, events: &mut Events) -> Vec<PeerMessage> {
        let mut inbound = Vec::new();
        while let Ok(stamped) = events.try_recv() {
            inbound.extend(manager.handle_event(stamped));
        }
        inbound
    }

    fn active_key(transport: &MockTransport) -> ChannelKey {
        transport.sent().last().map(|(k, _)| k.clone()).unwrap_or_else(|| ChannelKey::new("mock-1"))
    }

    #[test]
    fn owner_opens_with_session_id_and_listens() {
        let transport = MockTransport::new();
        let (mut m, mut rx) = manager(&transport, SessionOptions::owner(SessionId::from_raw("sid-123")));
        pump(&mut m, &mut rx);
        assert_eq!(transport.opened_with(), vec![Some(SessionId::from_raw("sid-123"))]);
        assert_eq!(m.status(), SessionStatus::Listening);
        assert_eq!(m.snapshot().peer_id.as_ref().map(|p| p.as_str()), Some("sid-123"));
        assert!(m.next_retry().is_none());
    }

    #[test]
    fn guest_connects_to_remote_id() {
        let transport = MockTransport::new();
        let (mut m, mut rx) = manager(&transport, SessionOptions::guest(SessionId::from_raw("remote-id")));
        pump(&mut m, &mut rx);
        assert_eq!(transport.opened_with(), vec![None]);
        assert_eq!(m.status(), SessionStatus::Idle);

        m.connect(None);
        assert_eq!(transport.connect_targets(), vec![PeerId::from_raw("remote-id")]);
        assert_eq!(m.status(), SessionStatus::Connecting);
        pump(&mut m, &mut rx);
        assert_eq!(m.status(), SessionStatus::Connected);
        assert_eq!(m.snapshot().retry_count, 0);
        assert!(m.next_retry().is_none());
    }

    #[test]
    fn explicit_remote_overrides_configured_id() {
        let transport = MockTransport::new();
        let (mut m, _rx) = manager(&transport, SessionOptions::guest(SessionId::from_raw("configured")));
        m.connect(Some(&SessionId::from_raw("explicit")));
        assert_eq!(transport.connect_targets(), vec![PeerId::from_raw("explicit")]);
    }

    #[test]
    fn connect_without_handle_reports_not_ready() {
        let transport = MockTransport::new();
        let options = SessionOptions::guest(SessionId::from_raw("remote-id")).with_auto_start(false);
        let (mut m, _rx) = manager(&transport, options);
        m.connect(None);
        assert_eq!(m.status(), SessionStatus::Error);
        assert_eq!(m.snapshot().error.as_deref(), Some("peer is not ready"));
        assert_eq!(transport.connect_count(), 0);
        // no identity, nothing to retry with
        assert!(m.next_retry().is_none());
    }

    #[test]
    fn connect_without_target_reports_missing_target() {
        let transport = MockTransport::new();
        let (mut m, _rx) = manager(&transport, SessionOptions::new(Role::Guest));
        m.connect(None);
        assert_eq!(m.status(), SessionStatus::Error);
        assert_eq!(m.snapshot().error.as_deref(), Some("remote peer id missing"));
        assert!(m.next_retry().is_none());
    }

    #[test]
    fn failed_open_surfaces_error() {
        let transport = MockTransport::new();
        transport.fail_open(TransportError::IdTaken("sid-1".into()));
        let (m, _rx) = manager(&transport, SessionOptions::owner(SessionId::from_raw("sid-1")));
        assert_eq!(m.status(), SessionStatus::Error);
        assert!(m.snapshot().error.as_deref().unwrap().contains("already taken"));
    }

    #[test]
    fn retries_stop_after_budget() {
        let transport = MockTransport::new();
        transport.always(ConnectOutcome::Fail(TransportError::PeerUnavailable("remote-id".into())));
        let (mut m, mut rx) = manager(&transport, SessionOptions::guest(SessionId::from_raw("remote-id")));
        pump(&mut m, &mut rx);

        m.connect(None);
        assert_eq!(m.status(), SessionStatus::Error);

        let mut fired = 0;
        while let Some((_, token)) = m.next_retry() {
            m.fire_retry(token);
            pump(&mut m, &mut rx);
            fired += 1;
            assert!(fired <= 10, "retry loop did not stop");
        }
        assert_eq!(fired, 3);
        assert_eq!(m.snapshot().retry_count, 3);
        assert_eq!(m.status(), SessionStatus::Error);
        assert_eq!(transport.connect_count(), 4);
    }

    #[test]
    fn error_events_also_drive_retries() {
        let transport = MockTransport::new();
        transport.always(ConnectOutcome::ErrorEvent(TransportError::Network("reset".into())));
        let options = SessionOptions::guest(SessionId::from_raw("remote-id")).with_max_retries(2);
        let (mut m, mut rx) = manager(&transport, options);
        m.connect(None);
        pump(&mut m, &mut rx);
        let mut fired = 0;
        while let Some((_, token)) = m.next_retry() {
            m.fire_retry(token);
            pump(&mut m, &mut rx);
            fired += 1;
        }
        assert_eq!(fired, 2);
        assert_eq!(m.status(), SessionStatus::Error);
    }

    #[test]
    fn unbounded_retries_keep_scheduling() {
        let transport = MockTransport::new();
        transport.always(ConnectOutcome::Fail(TransportError::Network("down".into())));
        let options = SessionOptions::guest(SessionId::from_raw("remote-id")).with_max_retries(0);
        let (mut m, _rx) = manager(&transport, options);
        m.connect(None);
        for _ in 0..20 {
            let (_, token) = m.next_retry().expect("retry pending");
            m.fire_retry(token);
        }
        assert_eq!(m.snapshot().retry_count, 20);
        assert!(m.next_retry().is_some());
    }

    #[test]
    fn idle_guest_with_target_schedules_reconnect() {
        let transport = MockTransport::new();
        let (mut m, mut rx) = manager(&transport, SessionOptions::guest(SessionId::from_raw("remote-id")));
        pump(&mut m, &mut rx);
        let (_, token) = m.next_retry().expect("idle guest should schedule a dial");
        m.fire_retry(token);
        pump(&mut m, &mut rx);
        assert_eq!(m.status(), SessionStatus::Connected);
        assert_eq!(m.snapshot().retry_count, 0);
    }

    #[test]
    fn guest_reopens_identity_after_peer_error() {
        let transport = MockTransport::new();
        transport.script([ConnectOutcome::Pending]);
        let (mut m, mut rx) = manager(&transport, SessionOptions::guest(SessionId::from_raw("remote-id")));
        m.connect(None);
        pump(&mut m, &mut rx);
        let first_sink = transport.last_sink().unwrap();

        // the relay socket died under the pending dial
        first_sink.peer(PeerEvent::Error(TransportError::Network("relay connection closed".into())));
        pump(&mut m, &mut rx);
        assert_eq!(m.status(), SessionStatus::Error);
        assert_eq!(transport.destroyed(), 1);
        assert_eq!(transport.closed(), vec![ChannelKey::new("mock-1")]);
        assert_eq!(m.generation(), 1);

        // a late event from the dead identity changes nothing
        first_sink.channel(&ChannelKey::new("mock-1"), ChannelEvent::Open);
        pump(&mut m, &mut rx);
        assert_eq!(m.status(), SessionStatus::Error);

        let (_, token) = m.next_retry().expect("retry pending after identity loss");
        m.fire_retry(token);
        assert_eq!(transport.opened_with(), vec![None, None]);
        assert_eq!(m.snapshot().retry_count, 1);
        pump(&mut m, &mut rx);
        assert_eq!(transport.connect_targets(), vec![PeerId::from_raw("remote-id"); 2]);
        assert_eq!(m.status(), SessionStatus::Connected);
        assert_eq!(m.snapshot().retry_count, 0);
        assert!(m.next_retry().is_none());
    }

    #[test]
    fn guest_keeps_reopening_while_transport_is_down() {
        let transport = MockTransport::new();
        let options = SessionOptions::guest(SessionId::from_raw("remote-id")).with_max_retries(2);
        let (mut m, mut rx) = manager(&transport, options);
        pump(&mut m, &mut rx);
        transport.last_sink().unwrap().peer(PeerEvent::Error(TransportError::Network("refused".into())));
        pump(&mut m, &mut rx);

        transport.fail_open(TransportError::Network("refused".into()));
        let (_, token) = m.next_retry().unwrap();
        m.fire_retry(token);
        assert_eq!(m.status(), SessionStatus::Error);
        assert_eq!(transport.connect_count(), 0);

        let (_, token) = m.next_retry().expect("budget not spent yet");
        m.fire_retry(token);
        pump(&mut m, &mut rx);
        assert_eq!(transport.opened_with().len(), 3);
        assert_eq!(m.status(), SessionStatus::Connected);
    }

    #[test]
    fn owner_keeps_identity_on_peer_error() {
        let transport = MockTransport::new();
        let (mut m, mut rx) = manager(&transport, SessionOptions::owner(SessionId::from_raw("sid-1")));
        transport.last_sink().unwrap().peer(PeerEvent::Error(TransportError::Network("blip".into())));
        pump(&mut m, &mut rx);
        assert_eq!(m.status(), SessionStatus::Error);
        assert_eq!(transport.destroyed(), 0);
        assert!(m.next_retry().is_none());
    }

    #[test]
    fn stale_retry_token_is_ignored() {
        let transport = MockTransport::new();
        transport.always(ConnectOutcome::Fail(TransportError::Network("down".into())));
        let (mut m, _rx) = manager(&transport, SessionOptions::guest(SessionId::from_raw("remote-id")));
        m.connect(None);
        let (_, token) = m.next_retry().unwrap();
        m.restart();
        m.fire_retry(token);
        assert_eq!(m.snapshot().retry_count, 0);
        assert_eq!(transport.connect_count(), 1);
    }

    #[test]
    fn close_returns_to_idle_unless_errored() {
        let transport = MockTransport::new();
        transport.script([ConnectOutcome::Accept]);
        let options = SessionOptions::guest(SessionId::from_raw("remote-id")).with_max_retries(1);
        let (mut m, mut rx) = manager(&transport, options);
        m.connect(None);
        pump(&mut m, &mut rx);
        assert_eq!(m.status(), SessionStatus::Connected);

        let key = ChannelKey::new("mock-1");
        transport.emit_channel(&key, ChannelEvent::Close);
        pump(&mut m, &mut rx);
        assert_eq!(m.status(), SessionStatus::Idle);
        assert!(m.snapshot().error.is_none());
    }

    #[test]
    fn validated_messages_are_forwarded_and_junk_dropped() {
        let transport = MockTransport::new();
        let (mut m, mut rx) = manager(&transport, SessionOptions::guest(SessionId::from_raw("remote-id")));
        m.connect(None);
        pump(&mut m, &mut rx);
        let key = ChannelKey::new("mock-1");

        transport.emit_data(
            &key,
            json!({"kind": "ANSWER_SUMMARY", "payload": {"answers": {}, "keyAnswerValue": 0, "keyQuestionId": 0}}),
        );
        transport.emit_data(&key, json!({"kind": "UNKNOWN"}));
        transport.emit_data(&key, json!("garbage"));
        let inbound = pump(&mut m, &mut rx);

        assert_eq!(inbound.len(), 1);
        let PeerMessage::AnswerSummary(answers) = &inbound[0] else {
            panic!("expected summary");
        };
        assert_eq!(answers.key_answer_value, Some(0));
        assert_eq!(m.status(), SessionStatus::Connected);
        assert!(m.snapshot().error.is_none());
        assert_eq!(m.snapshot().last_message, Some(inbound[0].clone()));
    }

    #[test]
    fn send_is_dropped_unless_connected() {
        let transport = MockTransport::new();
        transport.script([ConnectOutcome::Pending]);
        let (mut m, mut rx) = manager(&transport, SessionOptions::guest(SessionId::from_raw("remote-id")));
        let message = PeerMessage::AnswerSummary(UserAnswers::new().answer(1, 1));
        assert!(!m.send(&message));
        m.connect(None);
        pump(&mut m, &mut rx);
        assert!(!m.send(&message));
        assert!(transport.sent().is_empty());

        transport.emit_channel(&ChannelKey::new("mock-1"), ChannelEvent::Open);
        pump(&mut m, &mut rx);
        assert!(m.send(&message));
        assert_eq!(transport.sent_messages(), vec![message]);
        assert_eq!(active_key(&transport).as_str(), "mock-1");
    }

    #[test]
    fn events_from_old_generation_are_ignored() {
        let transport = MockTransport::new();
        let (mut m, mut rx) = manager(&transport, SessionOptions::guest(SessionId::from_raw("remote-id")));
        m.connect(None);
        let old_sink = transport.last_sink().unwrap();
        m.restart();
        pump(&mut m, &mut rx);
        assert_eq!(m.status(), SessionStatus::Idle);

        old_sink.channel(&ChannelKey::new("mock-1"), ChannelEvent::Open);
        old_sink.peer(PeerEvent::Error(TransportError::Network("late".into())));
        pump(&mut m, &mut rx);
        assert_eq!(m.status(), SessionStatus::Idle);
        assert!(m.snapshot().error.is_none());
    }

    #[test]
    fn events_for_inactive_channel_are_ignored() {
        let transport = MockTransport::new();
        transport.script([ConnectOutcome::Pending]);
        let (mut m, mut rx) = manager(&transport, SessionOptions::guest(SessionId::from_raw("remote-id")));
        m.connect(None);
        transport.emit_channel(&ChannelKey::new("someone-else"), ChannelEvent::Open);
        pump(&mut m, &mut rx);
        assert_eq!(m.status(), SessionStatus::Connecting);
    }

    #[test]
    fn disconnect_is_idempotent_and_terminal() {
        let transport = MockTransport::new();
        let (mut m, mut rx) = manager(&transport, SessionOptions::guest(SessionId::from_raw("remote-id")));
        m.connect(None);
        pump(&mut m, &mut rx);

        m.disconnect();
        m.disconnect();
        assert_eq!(m.status(), SessionStatus::Idle);
        assert_eq!(transport.closed().len(), 1);
        assert_eq!(transport.destroyed(), 1);
        assert!(m.next_retry().is_none());

        m.connect(None);
        assert_eq!(m.snapshot().error.as_deref(), Some("peer is not ready"));
    }

    #[test]
    fn restart_reopens_with_fresh_state() {
        let transport = MockTransport::new();
        transport.always(ConnectOutcome::Fail(TransportError::Network("down".into())));
        let (mut m, _rx) = manager(&transport, SessionOptions::guest(SessionId::from_raw("remote-id")));
        m.connect(None);
        let (_, token) = m.next_retry().unwrap();
        m.fire_retry(token);
        assert_eq!(m.snapshot().retry_count, 1);

        m.restart();
        assert_eq!(transport.opened_with().len(), 2);
        assert_eq!(transport.destroyed(), 1);
        assert_eq!(m.status(), SessionStatus::Idle);
        assert_eq!(m.snapshot().retry_count, 0);
        assert!(m.snapshot().error.is_none());
        assert_eq!(m.generation(), 1);
    }

    #[test]
    fn restart_opens_even_without_auto_start() {
        let transport = MockTransport::new();
        let options = SessionOptions::owner(SessionId::from_raw("sid-9")).with_auto_start(false);
        let (mut m, _rx) = manager(&transport, options);
        assert!(transport.opened_with().is_empty());
        m.restart();
        assert_eq!(transport.opened_with(), vec![Some(SessionId::from_raw("sid-9"))]);
        assert_eq!(m.status(), SessionStatus::Listening);
    }

    #[test]
    fn owner_accepts_incoming_and_replaces_previous() {
        let transport = MockTransport::new();
        let (mut m, mut rx) = manager(&transport, SessionOptions::owner(SessionId::from_raw("sid-123")));
        let first = transport.incoming().unwrap();
        transport.emit_channel(&first, ChannelEvent::Open);
        pump(&mut m, &mut rx);
        assert_eq!(m.status(), SessionStatus::Connected);

        let second = transport.incoming().unwrap();
        pump(&mut m, &mut rx);
        assert_eq!(transport.closed(), vec![first.clone()]);

        // the replaced channel can no longer move the state machine
        transport.emit_channel(&first, ChannelEvent::Close);
        pump(&mut m, &mut rx);
        assert_eq!(m.status(), SessionStatus::Connected);

        transport.emit_channel(&second, ChannelEvent::Close);
        pump(&mut m, &mut rx);
        assert_eq!(m.status(), SessionStatus::Idle);
        assert!(m.next_retry().is_none());
    }

    #[test]
    fn guest_closes_unexpected_incoming() {
        let transport = MockTransport::new();
        let (mut m, mut rx) = manager(&transport, SessionOptions::guest(SessionId::from_raw("remote-id")));
        let key = transport.incoming().unwrap();
        pump(&mut m, &mut rx);
        assert_eq!(transport.closed(), vec![key]);
    }

    #[test]
    fn drop_releases_identity() {
        let transport = MockTransport::new();
        let (m, _rx) = manager(&transport, SessionOptions::owner(SessionId::from_raw("sid-1")));
        drop(m);
        assert_eq!(transport.destroyed(), 1);
    }
}
