//! Async driver: owns a [`ConnectionManager`] on a tokio task and exposes it
//! through a cloneable [`SessionHandle`].

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep_until;
use tracing::debug;

use pair_core::{PeerMessage, SessionId};

use crate::manager::{ConnectionManager, SessionOptions, SessionSnapshot, SessionStatus};
use crate::transport::Transport;

enum Command {
    Connect(Option<SessionId>),
    Send(PeerMessage, oneshot::Sender<bool>),
    Disconnect,
    Restart,
}

#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub fn connect(&self, remote: Option<SessionId>) {
        let _ = self.commands.send(Command::Connect(remote));
    }

    /// Resolves to whether the message reached a connected channel.
    pub async fn send(&self, message: PeerMessage) -> bool {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Send(message, tx)).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    pub fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect);
    }

    pub fn restart(&self) {
        let _ = self.commands.send(Command::Restart);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.snapshot.borrow().status
    }

    /// A receiver that wakes on every published snapshot change.
    pub fn status_changes(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Wait until the snapshot satisfies `predicate`. `None` once the driver
    /// has stopped.
    pub async fn wait_for(&self, predicate: impl Fn(&SessionSnapshot) -> bool) -> Option<SessionSnapshot> {
        let mut rx = self.snapshot.clone();
        rx.wait_for(|s| predicate(s)).await.ok().map(|s| (*s).clone())
    }
}

/// Spawn the driver task. Validated inbound messages arrive on the returned
/// receiver. Dropping every [`SessionHandle`] disconnects and ends the task.
pub fn spawn_session<T>(
    transport: T,
    options: SessionOptions,
) -> (SessionHandle, mpsc::UnboundedReceiver<PeerMessage>, JoinHandle<()>)
where
    T: Transport + 'static,
{
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let (commands_tx, mut commands_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

    let mut manager = ConnectionManager::new(transport, options, events_tx);
    let (snapshot_tx, snapshot_rx) = watch::channel(manager.snapshot().clone());

    let task = tokio::spawn(async move {
        loop {
            let retry = manager.next_retry();
            let retry_due = async {
                match retry {
                    Some((due, _)) => sleep_until(due).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                command = commands_rx.recv() => match command {
                    Some(Command::Connect(remote)) => manager.connect(remote.as_ref()),
                    Some(Command::Send(message, reply)) => {
                        let _ = reply.send(manager.send(&message));
                    }
                    Some(Command::Disconnect) => manager.disconnect(),
                    Some(Command::Restart) => manager.restart(),
                    None => {
                        debug!("all session handles dropped, shutting down");
                        manager.disconnect();
                        publish(&snapshot_tx, &manager);
                        break;
                    }
                },
                Some(stamped) = events_rx.recv() => {
                    if let Some(message) = manager.handle_event(stamped) {
                        let _ = inbound_tx.send(message);
                    }
                }
                () = retry_due => {
                    if let Some((_, token)) = retry {
                        manager.fire_retry(token);
                    }
                }
            }
            publish(&snapshot_tx, &manager);
        }
    });

    (
        SessionHandle {
            commands: commands_tx,
            snapshot: snapshot_rx,
        },
        inbound_rx,
        task,
    )
}

fn publish<T: Transport>(tx: &watch::Sender<SessionSnapshot>, manager: &ConnectionManager<T>) {
    tx.send_if_modified(|current| {
        if current == manager.snapshot() {
            false
        } else {
            *current = manager.snapshot().clone();
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::mock::{ConnectOutcome, MockTransport};
    use crate::transport::ChannelKey;
    use pair_core::UserAnswers;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn guest_connects_and_exchanges_messages() {
        let transport = MockTransport::new();
        let (handle, mut inbound, _task) =
            spawn_session(transport.clone(), SessionOptions::guest(SessionId::from_raw("remote-id")));

        handle.connect(None);
        let snapshot = handle.wait_for(|s| s.status == SessionStatus::Connected).await.unwrap();
        assert_eq!(snapshot.retry_count, 0);

        let summary = PeerMessage::AnswerSummary(UserAnswers::new().answer(3, 1));
        assert!(handle.send(summary.clone()).await);
        assert_eq!(transport.sent_messages(), vec![summary]);

        let key = ChannelKey::new("mock-1");
        transport.emit_data(&key, json!({"kind": "UNKNOWN"}));
        transport.emit_data(&key, json!({"kind": "PAIR_RESULT", "payload": 9}));
        assert_eq!(inbound.recv().await, Some(PeerMessage::PairResult(9)));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_follow_the_delay_and_stop_at_budget() {
        let transport = MockTransport::new();
        transport.always(ConnectOutcome::Fail(TransportError::PeerUnavailable("remote-id".into())));
        let options = SessionOptions::guest(SessionId::from_raw("remote-id"))
            .with_retry_delay(Duration::from_millis(2500));
        let (handle, _inbound, _task) = spawn_session(transport.clone(), options);

        handle.connect(None);
        handle.wait_for(|s| s.status == SessionStatus::Error).await.unwrap();
        assert_eq!(transport.connect_count(), 1);

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(transport.connect_count(), 1);

        let done = handle.wait_for(|s| s.retry_count == 3).await.unwrap();
        assert_eq!(done.status, SessionStatus::Error);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.connect_count(), 4);
        assert_eq!(handle.snapshot().retry_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn send_before_connected_is_dropped() {
        let transport = MockTransport::new();
        let (handle, _inbound, _task) =
            spawn_session(transport.clone(), SessionOptions::owner(SessionId::from_raw("sid-123")));
        assert!(!handle.send(PeerMessage::PairResult(1)).await);
        assert!(transport.sent().is_empty());
        assert_eq!(handle.status(), SessionStatus::Listening);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_resets_through_the_handle() {
        let transport = MockTransport::new();
        transport.always(ConnectOutcome::Fail(TransportError::Network("down".into())));
        let (handle, _inbound, _task) =
            spawn_session(transport.clone(), SessionOptions::guest(SessionId::from_raw("remote-id")));
        handle.connect(None);
        handle.wait_for(|s| s.status == SessionStatus::Error).await.unwrap();

        handle.restart();
        let snapshot = handle.wait_for(|s| s.status == SessionStatus::Idle).await.unwrap();
        assert!(snapshot.error.is_none());
        assert_eq!(transport.opened_with().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handles_disconnects() {
        let transport = MockTransport::new();
        let (handle, _inbound, task) =
            spawn_session(transport.clone(), SessionOptions::owner(SessionId::from_raw("sid-123")));
        let second = handle.clone();
        drop(handle);
        drop(second);
        task.await.unwrap();
        assert_eq!(transport.destroyed(), 1);
    }
}
