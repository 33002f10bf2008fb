//! Stroke synchronization over the relay.
//!
//! Bridges local commits to the relay and relay messages back to the board.
//! Delivery is best effort: nothing is acknowledged, retried or queued.

use uuid::Uuid;

use crate::error::{SyncError, SyncResult};
use crate::protocol::{ConnectionState, RelayEvent, SyncMessage};
use crate::stroke::Stroke;
use crate::transport::{Connector, Relay};

/// Lifecycle of the single relay connection.
enum Link<R> {
    /// No connection attempt yet.
    Uninitialized,
    /// Connection created; it may still be connecting or have dropped.
    Attached(R),
    /// The connector failed. The board stays local-only.
    Unavailable,
}

/// Publishes committed strokes and collects strokes drawn by peers.
pub struct SyncClient<C: Connector> {
    /// Tag stamped on every outgoing message.
    client_id: Uuid,
    url: String,
    topic: String,
    connector: C,
    link: Link<C::Relay>,
}

impl<C: Connector> SyncClient<C> {
    /// Create a client. No connection is made until first use.
    pub fn new(connector: C, url: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            client_id: Uuid::new_v4(),
            url: url.into(),
            topic: topic.into(),
            connector,
            link: Link::Uninitialized,
        }
    }

    /// Id this client tags its messages with.
    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    /// Topic strokes are exchanged on.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        match &self.link {
            Link::Attached(relay) => relay.state(),
            Link::Uninitialized | Link::Unavailable => ConnectionState::Disconnected,
        }
    }

    /// Open the relay connection if that has not been tried yet.
    ///
    /// Only the first call connects; later calls return whether a
    /// connection exists.
    pub fn initialize(&mut self) -> bool {
        if let Link::Uninitialized = self.link {
            self.link = match self.connector.connect(&self.url) {
                Ok(relay) => {
                    log::info!("Relay connection opened to {}", self.url);
                    Link::Attached(relay)
                }
                Err(e) => {
                    log::warn!("Relay unavailable ({}), drawing locally only", e);
                    Link::Unavailable
                }
            };
        }
        matches!(self.link, Link::Attached(_))
    }

    /// Mutable access to the connection, opening it on first use.
    pub fn relay_mut(&mut self) -> Option<&mut C::Relay> {
        self.initialize();
        match &mut self.link {
            Link::Attached(relay) => Some(relay),
            Link::Uninitialized | Link::Unavailable => None,
        }
    }

    /// Send a committed stroke to the other clients.
    pub fn publish_stroke(&mut self, stroke: &Stroke) -> SyncResult<()> {
        let msg = SyncMessage::Draw {
            origin: self.client_id,
            stroke: stroke.clone(),
        };
        let payload = serde_json::to_value(&msg)?;
        let topic = self.topic.clone();
        let relay = self.relay_mut().ok_or(SyncError::NotConnected)?;
        relay.publish(&topic, payload)
    }

    /// Drain relay events and return the strokes peers have drawn.
    pub fn poll(&mut self) -> Vec<Stroke> {
        let client_id = self.client_id;
        let topic = self.topic.clone();
        let Some(relay) = self.relay_mut() else {
            return Vec::new();
        };

        let mut strokes = Vec::new();
        for event in relay.poll_events() {
            match event {
                RelayEvent::Connected => {
                    log::info!("Relay connected, subscribing to {}", topic);
                    if let Err(e) = relay.subscribe(&topic) {
                        log::warn!("Subscribe to {} failed: {}", topic, e);
                    }
                }
                RelayEvent::Disconnected => {
                    log::info!("Relay disconnected, drawing locally only");
                }
                RelayEvent::Subscribed {
                    topic: subscribed,
                    peer_count,
                } => {
                    log::info!("Subscribed to {} ({} peers)", subscribed, peer_count);
                }
                RelayEvent::Message {
                    topic: received,
                    from,
                    payload,
                } => {
                    if received != topic {
                        continue;
                    }
                    match serde_json::from_value::<SyncMessage>(payload) {
                        Ok(SyncMessage::Draw { origin, stroke }) => {
                            if origin == client_id {
                                log::debug!("Ignoring echo of own stroke");
                                continue;
                            }
                            strokes.push(stroke);
                        }
                        Err(e) => {
                            log::debug!("Dropping malformed message from {}: {}", from, e);
                        }
                    }
                }
                RelayEvent::Error { message } => {
                    log::warn!("Relay rejected a frame: {}", message);
                }
                RelayEvent::Failed { reason } => {
                    log::warn!("Relay connection failed ({}), drawing locally only", reason);
                }
            }
        }
        strokes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryHub;
    use kurbo::Point;
    use serde_json::json;

    struct FailingConnector;

    impl Connector for FailingConnector {
        type Relay = crate::transport::MemoryRelay;

        fn connect(&mut self, url: &str) -> SyncResult<Self::Relay> {
            Err(SyncError::InvalidUrl(url.to_string()))
        }
    }

    fn client(hub: &MemoryHub) -> SyncClient<MemoryHub> {
        let mut client = SyncClient::new(hub.clone(), "memory://", "draw");
        // Connected -> subscribe, then Subscribed
        client.poll();
        client.poll();
        client
    }

    fn sample() -> Stroke {
        Stroke::from_points(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_connects_once_on_first_use() {
        let hub = MemoryHub::new();
        let mut client = SyncClient::new(hub.clone(), "memory://", "draw");
        assert_eq!(hub.peer_count(), 0);
        assert!(client.initialize());
        assert!(client.initialize());
        assert_eq!(hub.peer_count(), 1);
    }

    #[test]
    fn test_stroke_reaches_peer() {
        let hub = MemoryHub::new();
        let mut a = client(&hub);
        let mut b = client(&hub);

        a.publish_stroke(&sample()).unwrap();

        assert_eq!(b.poll(), vec![sample()]);
        assert!(a.poll().is_empty());
    }

    #[test]
    fn test_own_echo_is_filtered() {
        let hub = MemoryHub::with_echo();
        let mut a = client(&hub);
        let mut b = client(&hub);

        a.publish_stroke(&sample()).unwrap();

        assert!(a.poll().is_empty());
        assert_eq!(b.poll().len(), 1);
    }

    #[test]
    fn test_malformed_payload_is_dropped() {
        let hub = MemoryHub::new();
        let mut a = client(&hub);
        let mut raw = hub.join();
        raw.poll_events();
        raw.subscribe("draw").unwrap();
        raw.poll_events();

        raw.publish("draw", json!({"kind": "draw", "stroke": "nope"})).unwrap();
        raw.publish("draw", json!([1, 2, 3])).unwrap();
        assert!(a.poll().is_empty());
    }

    #[test]
    fn test_unreachable_relay_degrades_to_local() {
        let mut client = SyncClient::new(FailingConnector, "ws://nowhere", "draw");
        assert!(!client.initialize());
        assert!(matches!(
            client.publish_stroke(&sample()),
            Err(SyncError::NotConnected)
        ));
        assert!(client.poll().is_empty());
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_publish_before_connected_is_dropped() {
        let hub = MemoryHub::new();
        let mut a = SyncClient::new(hub.clone(), "memory://", "draw");
        let mut b = client(&hub);

        // Connected event not yet polled
        assert!(a.publish_stroke(&sample()).is_err());
        a.poll();
        assert!(b.poll().is_empty());
    }
}
