//! InkShare WebSocket Relay Server
//!
//! A topic-based publish/subscribe relay. Clients subscribe to a topic and
//! every payload published on it is forwarded to the other subscribers.
//! Payloads are opaque JSON; the relay never inspects them.
//!
//! ## Protocol
//!
//! ```json
//! { "type": "subscribe", "topic": "draw" }
//! { "type": "publish", "topic": "draw", "payload": { ... } }
//! ```
//!
//! The server answers with `subscribed`, `message` and `error` frames.

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::HashSet, net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, sync::broadcast};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;

/// Environment variable holding the listen address.
pub const ADDR_ENV: &str = "INKSHARE_ADDR";

/// Port the relay listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 3001;

/// A frame sent by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to a topic, leaving the previous one
    Subscribe { topic: String },
    /// Publish a payload to a topic
    Publish { topic: String, payload: Value },
}

/// A frame sent to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirm a subscription
    Subscribed { topic: String, peer_count: usize },
    /// Payload published by another peer
    Message {
        topic: String,
        from: String,
        payload: Value,
    },
    /// Error message
    Error { message: String },
}

/// Relay settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
        }
    }
}

impl ServerConfig {
    /// Read the listen address from `INKSHARE_ADDR`, falling back to the default.
    pub fn from_env() -> Result<Self, std::net::AddrParseError> {
        match std::env::var(ADDR_ENV) {
            Ok(value) => Self::from_addr(&value),
            Err(_) => Ok(Self::default()),
        }
    }

    fn from_addr(value: &str) -> Result<Self, std::net::AddrParseError> {
        Ok(Self {
            addr: value.trim().parse()?,
        })
    }
}

/// Topic state
struct Topic {
    /// Broadcast channel for this topic
    tx: broadcast::Sender<(String, ServerMessage)>,
    /// Subscribed peer IDs
    peers: HashSet<String>,
}

impl Topic {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            peers: HashSet::new(),
        }
    }
}

/// Shared relay state.
#[derive(Default)]
pub struct AppState {
    /// Topics with at least one subscriber
    topics: DashMap<String, Topic>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active topics.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Number of peers subscribed to `topic`.
    pub fn peer_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, |t| t.peers.len())
    }

    /// Add peer to topic
    fn subscribe(
        &self,
        topic: &str,
        peer_id: &str,
    ) -> (broadcast::Receiver<(String, ServerMessage)>, usize) {
        let mut entry = self
            .topics
            .entry(topic.to_string())
            .or_insert_with(Topic::new);
        entry.peers.insert(peer_id.to_string());
        (entry.tx.subscribe(), entry.peers.len())
    }

    /// Remove peer from topic
    fn unsubscribe(&self, topic: &str, peer_id: &str) {
        if let Some(mut entry) = self.topics.get_mut(topic) {
            entry.peers.remove(peer_id);
            if entry.peers.is_empty() {
                drop(entry);
                self.topics.remove_if(topic, |_, t| t.peers.is_empty());
            }
        }
    }

    /// Broadcast message to topic subscribers
    fn broadcast(&self, topic: &str, from: &str, msg: ServerMessage) {
        if let Some(entry) = self.topics.get(topic) {
            // No receivers is fine
            let _ = entry.tx.send((from.to_string(), msg));
        }
    }
}

/// Build the relay router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the relay on an already bound listener.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}

/// Index page
async fn index() -> &'static str {
    "InkShare Relay Server - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn encode(msg: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!("Failed to encode server message: {}", e);
            None
        }
    }
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let peer_id = Uuid::new_v4().to_string();
    info!("New connection: {}", peer_id);

    let (mut sender, mut receiver) = socket.split();
    let mut current_topic: Option<String> = None;
    let mut topic_rx: Option<broadcast::Receiver<(String, ServerMessage)>> = None;

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Subscribe { topic }) => {
                                if let Some(old) = current_topic.take() {
                                    state.unsubscribe(&old, &peer_id);
                                }
                                let (rx, peer_count) = state.subscribe(&topic, &peer_id);
                                topic_rx = Some(rx);
                                current_topic = Some(topic.clone());
                                info!("Peer {} subscribed to {}", peer_id, topic);
                                Some(ServerMessage::Subscribed { topic, peer_count })
                            }
                            Ok(ClientMessage::Publish { topic, payload }) => {
                                state.broadcast(&topic, &peer_id, ServerMessage::Message {
                                    topic: topic.clone(),
                                    from: peer_id.clone(),
                                    payload,
                                });
                                None
                            }
                            Err(e) => {
                                warn!("Invalid message from {}: {}", peer_id, e);
                                Some(ServerMessage::Error {
                                    message: format!("Invalid message: {}", e),
                                })
                            }
                        };

                        if let Some(frame) = reply.as_ref().and_then(encode) {
                            if sender.send(frame).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // Ignore binary and ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", peer_id, e);
                        break;
                    }
                }
            }

            msg = async {
                match &mut topic_rx {
                    Some(rx) => Some(rx.recv().await),
                    None => std::future::pending().await,
                }
            } => {
                match msg {
                    Some(Ok((from, server_msg))) => {
                        // Don't echo back to sender
                        if from == peer_id {
                            continue;
                        }
                        if let Some(frame) = encode(&server_msg) {
                            if sender.send(frame).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                        debug!("Peer {} lagged, skipped {} messages", peer_id, skipped);
                    }
                    Some(Err(broadcast::error::RecvError::Closed)) | None => {
                        topic_rx = None;
                    }
                }
            }
        }
    }

    if let Some(ref topic) = current_topic {
        state.unsubscribe(topic, &peer_id);
    }
    info!("Connection closed: {}", peer_id);
}
