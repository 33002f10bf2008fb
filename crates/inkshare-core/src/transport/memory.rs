//! In-process relay for tests and embedding.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use serde_json::Value;

use super::{Connector, Relay};
use crate::error::{SyncError, SyncResult};
use crate::protocol::{ConnectionState, RelayEvent, next_state};

type Inbox = Rc<RefCell<Vec<RelayEvent>>>;

struct Peer {
    topics: HashSet<String>,
    inbox: Inbox,
}

#[derive(Default)]
struct HubState {
    next_peer: u64,
    peers: HashMap<String, Peer>,
    echo: bool,
}

/// A single-threaded publish/subscribe bus.
///
/// Delivery follows the relay server: a publish reaches every other
/// subscriber of the topic. [`MemoryHub::with_echo`] builds a hub that also
/// delivers to the publisher.
#[derive(Clone, Default)]
pub struct MemoryHub {
    state: Rc<RefCell<HubState>>,
}

impl MemoryHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hub that echoes publishes back to their sender.
    pub fn with_echo() -> Self {
        let hub = Self::default();
        hub.state.borrow_mut().echo = true;
        hub
    }

    /// Attach a new connection. Its first polled event is `Connected`.
    pub fn join(&self) -> MemoryRelay {
        let mut state = self.state.borrow_mut();
        state.next_peer += 1;
        let id = format!("peer-{}", state.next_peer);
        let inbox: Inbox = Rc::new(RefCell::new(vec![RelayEvent::Connected]));
        state.peers.insert(
            id.clone(),
            Peer {
                topics: HashSet::new(),
                inbox: inbox.clone(),
            },
        );
        MemoryRelay {
            id,
            hub: self.clone(),
            inbox,
            state: ConnectionState::Connecting,
        }
    }

    /// Number of attached connections.
    pub fn peer_count(&self) -> usize {
        self.state.borrow().peers.len()
    }
}

impl Connector for MemoryHub {
    type Relay = MemoryRelay;

    fn connect(&mut self, _url: &str) -> SyncResult<MemoryRelay> {
        Ok(self.join())
    }
}

/// One connection to a [`MemoryHub`].
pub struct MemoryRelay {
    id: String,
    hub: MemoryHub,
    inbox: Inbox,
    state: ConnectionState,
}

impl MemoryRelay {
    /// Relay-assigned id of this connection.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Detach from the hub. A `Disconnected` event follows on the next poll.
    pub fn close(&mut self) {
        if self.hub.state.borrow_mut().peers.remove(&self.id).is_some() {
            self.inbox.borrow_mut().push(RelayEvent::Disconnected);
        }
    }
}

impl Relay for MemoryRelay {
    fn subscribe(&mut self, topic: &str) -> SyncResult<()> {
        let mut hub = self.hub.state.borrow_mut();
        let peer = hub.peers.get_mut(&self.id).ok_or(SyncError::NotConnected)?;
        peer.topics.insert(topic.to_string());
        let peer_count = hub
            .peers
            .values()
            .filter(|peer| peer.topics.contains(topic))
            .count();
        self.inbox.borrow_mut().push(RelayEvent::Subscribed {
            topic: topic.to_string(),
            peer_count,
        });
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: Value) -> SyncResult<()> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }
        let hub = self.hub.state.borrow();
        if !hub.peers.contains_key(&self.id) {
            return Err(SyncError::NotConnected);
        }
        for (id, peer) in &hub.peers {
            if (id == &self.id && !hub.echo) || !peer.topics.contains(topic) {
                continue;
            }
            peer.inbox.borrow_mut().push(RelayEvent::Message {
                topic: topic.to_string(),
                from: self.id.clone(),
                payload: payload.clone(),
            });
        }
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<RelayEvent> {
        let events = std::mem::take(&mut *self.inbox.borrow_mut());
        for event in &events {
            self.state = next_state(self.state, event);
        }
        events
    }

    fn state(&self) -> ConnectionState {
        self.state
    }
}

impl Drop for MemoryRelay {
    fn drop(&mut self) {
        if let Ok(mut hub) = self.hub.state.try_borrow_mut() {
            hub.peers.remove(&self.id);
        }
    }
}
