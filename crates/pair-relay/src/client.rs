//! Client side of the relay: a [`Transport`] over one WebSocket per identity.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use pair_core::{PeerId, PeerMessage, SessionId};
use pair_session::{
    ChannelEvent, ChannelKey, DataChannel, EventSink, PeerEvent, PeerHandle, Transport, TransportError,
};

use crate::error::transport_error;
use crate::frames::{ClientFrame, RelayFrame};

enum Outgoing {
    Frame(ClientFrame),
    Shutdown,
}

/// Opens identities on a relay reachable at `endpoint` (`ws://host:port/peer`).
#[derive(Clone, Debug)]
pub struct RelayTransport {
    endpoint: String,
}

impl RelayTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    fn url(&self, id: Option<&SessionId>) -> String {
        match id {
            Some(id) => format!("{}?id={}", self.endpoint, id),
            None => self.endpoint.clone(),
        }
    }
}

impl Transport for RelayTransport {
    fn open(
        &mut self,
        session_id: Option<&SessionId>,
        sink: EventSink,
    ) -> Result<Box<dyn PeerHandle>, TransportError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TransportError::Network(format!("no async runtime: {e}")))?;
        // frames queue here until the socket is up
        let (tx, rx) = mpsc::unbounded_channel();
        let url = self.url(session_id);
        let subject = session_id.map(|s| s.to_string()).unwrap_or_default();
        tracing::debug!(url = %url, "opening relay connection");
        runtime.spawn(run_connection(url, subject, sink, tx.clone(), rx));
        Ok(Box::new(RelayHandle { outgoing: tx }))
    }
}

struct RelayHandle {
    outgoing: mpsc::UnboundedSender<Outgoing>,
}

impl PeerHandle for RelayHandle {
    fn connect(&mut self, remote: &PeerId) -> Result<Box<dyn DataChannel>, TransportError> {
        let key = ChannelKey::new(Uuid::now_v7().to_string());
        self.outgoing
            .send(Outgoing::Frame(ClientFrame::Dial {
                channel: key.to_string(),
                target: remote.to_string(),
            }))
            .map_err(|_| TransportError::Network("relay connection closed".into()))?;
        Ok(Box::new(RelayChannel::new(key, self.outgoing.clone())))
    }

    fn destroy(&mut self) {
        let _ = self.outgoing.send(Outgoing::Shutdown);
    }
}

struct RelayChannel {
    key: ChannelKey,
    outgoing: mpsc::UnboundedSender<Outgoing>,
    closed: bool,
}

impl RelayChannel {
    fn new(key: ChannelKey, outgoing: mpsc::UnboundedSender<Outgoing>) -> Self {
        Self {
            key,
            outgoing,
            closed: false,
        }
    }
}

impl DataChannel for RelayChannel {
    fn key(&self) -> &ChannelKey {
        &self.key
    }

    fn send(&mut self, message: &PeerMessage) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::ChannelClosed);
        }
        let payload = serde_json::to_value(message).map_err(|e| TransportError::Protocol(e.to_string()))?;
        self.outgoing
            .send(Outgoing::Frame(ClientFrame::Data {
                channel: self.key.to_string(),
                payload,
            }))
            .map_err(|_| TransportError::ChannelClosed)
    }

    fn close(&mut self) {
        if std::mem::replace(&mut self.closed, true) {
            return;
        }
        let _ = self.outgoing.send(Outgoing::Frame(ClientFrame::Close {
            channel: self.key.to_string(),
        }));
    }
}

async fn run_connection(
    url: String,
    subject: String,
    sink: EventSink,
    outgoing_tx: mpsc::UnboundedSender<Outgoing>,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
) {
    let ws = match connect_async(url.as_str()).await {
        Ok((ws, _)) => ws,
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "relay connect failed");
            sink.peer(PeerEvent::Error(TransportError::Network(e.to_string())));
            return;
        }
    };
    let (mut ws_tx, mut ws_rx) = ws.split();

    loop {
        tokio::select! {
            next = outgoing.recv() => match next {
                Some(Outgoing::Frame(frame)) => {
                    let text = match serde_json::to_string(&frame) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!(error = %e, "failed to encode client frame");
                            continue;
                        }
                    };
                    if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                        sink.peer(PeerEvent::Error(TransportError::Network(e.to_string())));
                        break;
                    }
                }
                Some(Outgoing::Shutdown) | None => {
                    let _ = ws_tx.close().await;
                    break;
                }
            },
            incoming = ws_rx.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if !dispatch(text.as_str(), &subject, &sink, &outgoing_tx) {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    sink.peer(PeerEvent::Error(TransportError::Network("relay connection closed".into())));
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    sink.peer(PeerEvent::Error(TransportError::Network(e.to_string())));
                    break;
                }
            },
        }
    }
    tracing::debug!(url = %url, "relay connection ended");
}

/// Translate one relay frame into transport events. Returns false when the
/// connection should end: the manager is gone or the relay refused us.
fn dispatch(
    text: &str,
    subject: &str,
    sink: &EventSink,
    outgoing: &mpsc::UnboundedSender<Outgoing>,
) -> bool {
    let frame: RelayFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring malformed relay frame");
            return true;
        }
    };
    match frame {
        RelayFrame::Open { id } => sink.peer(PeerEvent::Open {
            peer_id: PeerId::from_raw(id),
        }),
        RelayFrame::Incoming { channel, from } => {
            tracing::debug!(from = %from, channel = %channel, "incoming channel");
            let key = ChannelKey::new(channel);
            let accepted = sink.peer(PeerEvent::Connection(Box::new(RelayChannel::new(
                key.clone(),
                outgoing.clone(),
            ))));
            accepted && sink.channel(&key, ChannelEvent::Open)
        }
        RelayFrame::Accepted { channel } => sink.channel(&ChannelKey::new(channel), ChannelEvent::Open),
        RelayFrame::Data { channel, payload } => sink.channel(&ChannelKey::new(channel), ChannelEvent::Data(payload)),
        RelayFrame::Closed { channel } => sink.channel(&ChannelKey::new(channel), ChannelEvent::Close),
        RelayFrame::Error {
            channel: Some(channel),
            message,
        } => {
            let error = transport_error(&message, &channel);
            sink.channel(&ChannelKey::new(channel), ChannelEvent::Error(error))
        }
        RelayFrame::Error { channel: None, message } => {
            let error = transport_error(&message, subject);
            let fatal = !error.is_retryable();
            sink.peer(PeerEvent::Error(error)) && !fatal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{start, RelayConfig};
    use pair_core::UserAnswers;
    use pair_session::{spawn_session, SessionOptions, SessionStatus, Stamped, TransportEvent};
    use std::time::Duration;

    async fn relay() -> (crate::server::RelayHandle, String) {
        let handle = start(RelayConfig {
            bind_host: "127.0.0.1".into(),
            port: 0,
            ..Default::default()
        })
        .await
        .unwrap();
        let endpoint = format!("ws://127.0.0.1:{}/peer", handle.port);
        (handle, endpoint)
    }

    async fn within<F: std::future::Future>(f: F) -> F::Output {
        tokio::time::timeout(Duration::from_secs(10), f).await.expect("timed out")
    }

    #[test]
    fn dispatch_maps_frames_to_events() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Stamped>();
        let sink = EventSink::new(4, tx);
        let (out_tx, _out_rx) = mpsc::unbounded_channel();

        assert!(dispatch(r#"{"type":"accepted","channel":"c1"}"#, "", &sink, &out_tx));
        assert!(dispatch(r#"{"type":"error","channel":"c2","message":"peer-unavailable"}"#, "", &sink, &out_tx));
        assert!(dispatch("garbage", "", &sink, &out_tx));
        assert!(!dispatch(r#"{"type":"error","message":"id-taken"}"#, "sid-1", &sink, &out_tx));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.generation, 4);
        assert!(matches!(
            first.event,
            TransportEvent::Channel { ref key, event: ChannelEvent::Open } if key.as_str() == "c1"
        ));
        let second = rx.try_recv().unwrap();
        assert!(matches!(
            second.event,
            TransportEvent::Channel { event: ChannelEvent::Error(TransportError::PeerUnavailable(_)), .. }
        ));
        let third = rx.try_recv().unwrap();
        assert!(matches!(
            third.event,
            TransportEvent::Peer(PeerEvent::Error(TransportError::IdTaken(ref id))) if id == "sid-1"
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn owner_and_guest_connect_through_relay() {
        let (relay, endpoint) = relay().await;
        let sid = SessionId::from_raw("sid-relay-test");

        let (owner, mut owner_inbound, _t1) =
            spawn_session(RelayTransport::new(&endpoint), SessionOptions::owner(sid.clone()));
        within(owner.wait_for(|s| s.peer_id.is_some())).await.unwrap();

        let (guest, _guest_inbound, _t2) = spawn_session(
            RelayTransport::new(&endpoint),
            SessionOptions::guest(sid.clone()).with_retry_delay(Duration::from_millis(200)),
        );
        guest.connect(None);
        within(guest.wait_for(|s| s.status == SessionStatus::Connected)).await.unwrap();
        within(owner.wait_for(|s| s.status == SessionStatus::Connected)).await.unwrap();

        let summary = PeerMessage::AnswerSummary(UserAnswers::new().answer(1, 2).key(101, 1));
        assert!(guest.send(summary.clone()).await);
        assert_eq!(within(owner_inbound.recv()).await, Some(summary));
        assert_eq!(relay.registry.count(), 2);

        guest.disconnect();
        within(owner.wait_for(|s| s.status == SessionStatus::Idle)).await.unwrap();
        relay.shutdown();
    }

    #[tokio::test]
    async fn dialing_absent_peer_reports_error() {
        let (relay, endpoint) = relay().await;
        let (guest, _inbound, _task) = spawn_session(
            RelayTransport::new(&endpoint),
            SessionOptions::guest(SessionId::from_raw("nobody-home")).with_max_retries(1),
        );
        within(guest.wait_for(|s| s.peer_id.is_some())).await.unwrap();
        guest.connect(None);
        let snapshot = within(guest.wait_for(|s| s.status == SessionStatus::Error)).await.unwrap();
        assert!(snapshot.error.unwrap().contains("peer unavailable"));
        relay.shutdown();
    }

    #[tokio::test]
    async fn guest_recovers_once_relay_comes_up() {
        let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let endpoint = format!("ws://127.0.0.1:{port}/peer");
        let sid = SessionId::from_raw("sid-late-relay");

        let (guest, _guest_inbound, _t1) = spawn_session(
            RelayTransport::new(&endpoint),
            SessionOptions::guest(sid.clone())
                .with_max_retries(0)
                .with_retry_delay(Duration::from_millis(100)),
        );
        within(guest.wait_for(|s| s.status == SessionStatus::Error)).await.unwrap();

        let relay = start(RelayConfig {
            bind_host: "127.0.0.1".into(),
            port,
            ..Default::default()
        })
        .await
        .unwrap();
        let (owner, _owner_inbound, _t2) =
            spawn_session(RelayTransport::new(&endpoint), SessionOptions::owner(sid));
        within(owner.wait_for(|s| s.peer_id.is_some())).await.unwrap();

        let snapshot = within(guest.wait_for(|s| s.status == SessionStatus::Connected)).await.unwrap();
        assert!(snapshot.error.is_none());
        within(owner.wait_for(|s| s.status == SessionStatus::Connected)).await.unwrap();
        relay.shutdown();
    }

    #[tokio::test]
    async fn taken_session_id_is_refused() {
        let (relay, endpoint) = relay().await;
        let sid = SessionId::from_raw("sid-dup");
        let (first, _i1, _t1) = spawn_session(RelayTransport::new(&endpoint), SessionOptions::owner(sid.clone()));
        within(first.wait_for(|s| s.peer_id.is_some())).await.unwrap();

        let (second, _i2, _t2) = spawn_session(RelayTransport::new(&endpoint), SessionOptions::owner(sid));
        let snapshot = within(second.wait_for(|s| s.status == SessionStatus::Error)).await.unwrap();
        assert!(snapshot.error.unwrap().contains("already taken"));
        relay.shutdown();
    }
}
