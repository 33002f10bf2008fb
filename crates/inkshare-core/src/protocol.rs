//! Wire formats: the stroke message and the relay's publish/subscribe frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::stroke::Stroke;

/// Payload published on the draw topic.
///
/// ```json
/// { "kind": "draw", "origin": "<client uuid>", "stroke": [{ "x": 0.0, "y": 0.0 }] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncMessage {
    /// One committed stroke.
    Draw {
        /// Client that drew the stroke.
        origin: Uuid,
        stroke: Stroke,
    },
}

/// Frames sent to the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start receiving messages published on a topic.
    Subscribe { topic: String },
    /// Broadcast a payload to the other subscribers of a topic.
    Publish { topic: String, payload: Value },
}

/// Frames received from the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Subscription confirmed.
    Subscribed { topic: String, peer_count: usize },
    /// A payload published by another connection.
    Message {
        topic: String,
        from: String,
        payload: Value,
    },
    /// Error message
    Error { message: String },
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Events surfaced by a relay transport.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// Connected to the relay
    Connected,
    /// Disconnected from the relay
    Disconnected,
    /// Subscription confirmed
    Subscribed { topic: String, peer_count: usize },
    /// Payload published by someone else
    Message {
        topic: String,
        from: String,
        payload: Value,
    },
    /// The relay rejected a frame; the connection stays up
    Error { message: String },
    /// The socket itself failed; the connection is gone
    Failed { reason: String },
}

impl From<ServerMessage> for RelayEvent {
    fn from(msg: ServerMessage) -> Self {
        match msg {
            ServerMessage::Subscribed { topic, peer_count } => {
                RelayEvent::Subscribed { topic, peer_count }
            }
            ServerMessage::Message {
                topic,
                from,
                payload,
            } => RelayEvent::Message {
                topic,
                from,
                payload,
            },
            ServerMessage::Error { message } => RelayEvent::Error { message },
        }
    }
}

/// Track connection state from a stream of events.
pub(crate) fn next_state(current: ConnectionState, event: &RelayEvent) -> ConnectionState {
    match event {
        RelayEvent::Connected => ConnectionState::Connected,
        RelayEvent::Disconnected | RelayEvent::Failed { .. } => ConnectionState::Disconnected,
        RelayEvent::Subscribed { .. } | RelayEvent::Message { .. } | RelayEvent::Error { .. } => {
            current
        }
    }
}
