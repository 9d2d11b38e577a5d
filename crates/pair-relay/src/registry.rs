use dashmap::DashMap;
use tokio::sync::mpsc;

use pair_core::PeerId;

use crate::error::RelayError;
use crate::frames::RelayFrame;

/// A relayed channel between the dialing peer and its target.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Route {
    dialer: PeerId,
    target: PeerId,
}

impl Route {
    fn counterpart(&self, of: &PeerId) -> Option<&PeerId> {
        if &self.dialer == of {
            Some(&self.target)
        } else if &self.target == of {
            Some(&self.dialer)
        } else {
            None
        }
    }
}

/// Registry of connected peers and the channels between them.
pub struct PeerRegistry {
    peers: DashMap<PeerId, mpsc::Sender<String>>,
    routes: DashMap<String, Route>,
    max_send_queue: usize,
}

impl PeerRegistry {
    pub fn new(max_send_queue: usize) -> Self {
        Self {
            peers: DashMap::new(),
            routes: DashMap::new(),
            max_send_queue,
        }
    }

    /// Register under `requested`, or a generated id. Fails if the id is live.
    pub fn register(&self, requested: Option<PeerId>) -> Result<(PeerId, mpsc::Receiver<String>), RelayError> {
        let id = requested.unwrap_or_default();
        let (tx, rx) = mpsc::channel(self.max_send_queue);
        match self.peers.entry(id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(RelayError::IdTaken(id.to_string())),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(tx);
                Ok((id, rx))
            }
        }
    }

    /// Remove a peer and report every channel it took part in as closed to
    /// the other side.
    pub fn unregister(&self, id: &PeerId) {
        self.peers.remove(id);
        let channels: Vec<String> = self
            .routes
            .iter()
            .filter(|entry| entry.value().counterpart(id).is_some())
            .map(|entry| entry.key().clone())
            .collect();
        for channel in channels {
            if let Some((_, route)) = self.routes.remove(&channel) {
                if let Some(other) = route.counterpart(id) {
                    self.send_to(other, &RelayFrame::Closed { channel });
                }
            }
        }
    }

    pub fn dial(&self, from: &PeerId, channel: &str, target: &PeerId) -> Result<(), RelayError> {
        if !self.peers.contains_key(target) || target == from {
            return Err(RelayError::PeerUnavailable(target.to_string()));
        }
        match self.routes.entry(channel.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => return Err(RelayError::ChannelTaken(channel.to_string())),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Route {
                    dialer: from.clone(),
                    target: target.clone(),
                });
            }
        }
        tracing::debug!(from = %from, target = %target, channel, "channel opened");
        self.send_to(
            target,
            &RelayFrame::Incoming {
                channel: channel.to_string(),
                from: from.to_string(),
            },
        );
        self.send_to(
            from,
            &RelayFrame::Accepted {
                channel: channel.to_string(),
            },
        );
        Ok(())
    }

    pub fn forward(&self, from: &PeerId, channel: &str, payload: serde_json::Value) -> Result<(), RelayError> {
        let other = self.counterpart(from, channel)?;
        self.send_to(
            &other,
            &RelayFrame::Data {
                channel: channel.to_string(),
                payload,
            },
        );
        Ok(())
    }

    pub fn close(&self, from: &PeerId, channel: &str) -> Result<(), RelayError> {
        let other = self.counterpart(from, channel)?;
        self.routes.remove(channel);
        self.send_to(
            &other,
            &RelayFrame::Closed {
                channel: channel.to_string(),
            },
        );
        Ok(())
    }

    fn counterpart(&self, from: &PeerId, channel: &str) -> Result<PeerId, RelayError> {
        self.routes
            .get(channel)
            .and_then(|route| route.counterpart(from).cloned())
            .ok_or_else(|| RelayError::UnknownChannel(channel.to_string()))
    }

    /// Queue a frame for one peer. Drops it if the queue is full.
    pub fn send_to(&self, id: &PeerId, frame: &RelayFrame) -> bool {
        let Some(tx) = self.peers.get(id).map(|entry| entry.value().clone()) else {
            return false;
        };
        let text = match serde_json::to_string(frame) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(peer_id = %id, error = %e, "failed to encode relay frame");
                return false;
            }
        };
        match tx.try_send(text) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(msg)) => {
                tracing::warn!(peer_id = %id, msg_len = msg.len(), "send queue full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Number of connected peers.
    pub fn count(&self) -> usize {
        self.peers.len()
    }

    pub fn channel_count(&self) -> usize {
        self.routes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(rx: &mut mpsc::Receiver<String>) -> RelayFrame {
        serde_json::from_str(&rx.try_recv().unwrap()).unwrap()
    }

    #[test]
    fn register_and_unregister() {
        let registry = PeerRegistry::new(32);
        let (a, _rx_a) = registry.register(Some(PeerId::from_raw("sid-1"))).unwrap();
        let (b, _rx_b) = registry.register(None).unwrap();
        assert_eq!(a.as_str(), "sid-1");
        assert!(b.as_str().starts_with("peer-"));
        assert_eq!(registry.count(), 2);

        registry.unregister(&a);
        registry.unregister(&b);
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn duplicate_id_is_refused() {
        let registry = PeerRegistry::new(32);
        let _first = registry.register(Some(PeerId::from_raw("sid-1"))).unwrap();
        let err = registry.register(Some(PeerId::from_raw("sid-1"))).unwrap_err();
        assert_eq!(err.code(), "id-taken");
    }

    #[test]
    fn dial_notifies_both_sides_and_forwards() {
        let registry = PeerRegistry::new(32);
        let (owner, mut rx_owner) = registry.register(Some(PeerId::from_raw("sid-1"))).unwrap();
        let (guest, mut rx_guest) = registry.register(None).unwrap();

        registry.dial(&guest, "c1", &owner).unwrap();
        assert_eq!(
            frame(&mut rx_owner),
            RelayFrame::Incoming {
                channel: "c1".into(),
                from: guest.to_string()
            }
        );
        assert_eq!(frame(&mut rx_guest), RelayFrame::Accepted { channel: "c1".into() });

        registry.forward(&owner, "c1", json!({"kind": "PAIR_RESULT", "payload": 3})).unwrap();
        assert_eq!(
            frame(&mut rx_guest),
            RelayFrame::Data {
                channel: "c1".into(),
                payload: json!({"kind": "PAIR_RESULT", "payload": 3})
            }
        );
    }

    #[test]
    fn dial_absent_peer_is_unavailable() {
        let registry = PeerRegistry::new(32);
        let (guest, _rx) = registry.register(None).unwrap();
        let err = registry.dial(&guest, "c1", &PeerId::from_raw("nobody")).unwrap_err();
        assert_eq!(err.code(), "peer-unavailable");
        assert_eq!(registry.channel_count(), 0);
    }

    #[test]
    fn outsiders_cannot_use_a_channel() {
        let registry = PeerRegistry::new(32);
        let (owner, _rx1) = registry.register(Some(PeerId::from_raw("sid-1"))).unwrap();
        let (guest, _rx2) = registry.register(None).unwrap();
        let (outsider, _rx3) = registry.register(None).unwrap();
        registry.dial(&guest, "c1", &owner).unwrap();
        assert!(registry.forward(&outsider, "c1", json!(1)).is_err());
        assert!(registry.close(&outsider, "c1").is_err());
        assert!(registry.dial(&outsider, "c1", &owner).is_err());
    }

    #[test]
    fn unregister_closes_counterpart_channels() {
        let registry = PeerRegistry::new(32);
        let (owner, mut rx_owner) = registry.register(Some(PeerId::from_raw("sid-1"))).unwrap();
        let (guest, mut rx_guest) = registry.register(None).unwrap();
        registry.dial(&guest, "c1", &owner).unwrap();
        let _ = frame(&mut rx_owner);
        let _ = frame(&mut rx_guest);

        registry.unregister(&guest);
        assert_eq!(frame(&mut rx_owner), RelayFrame::Closed { channel: "c1".into() });
        assert_eq!(registry.channel_count(), 0);
    }

    #[test]
    fn full_queue_drops() {
        let registry = PeerRegistry::new(1);
        let (id, _rx) = registry.register(None).unwrap();
        assert!(registry.send_to(&id, &RelayFrame::Closed { channel: "a".into() }));
        assert!(!registry.send_to(&id, &RelayFrame::Closed { channel: "b".into() }));
    }
}
