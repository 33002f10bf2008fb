//! Relay transports.
//!
//! The sync client only needs a publish/subscribe bus. [`Relay`] is that
//! contract; the WebSocket clients talk to `inkshare-server`, and
//! [`MemoryRelay`] connects boards living in the same process.

mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod native;

#[cfg(target_arch = "wasm32")]
mod wasm;

pub use memory::{MemoryHub, MemoryRelay};

#[cfg(not(target_arch = "wasm32"))]
pub use native::NativeWebSocket;

#[cfg(target_arch = "wasm32")]
pub use wasm::WasmWebSocket;

use serde_json::Value;

use crate::error::SyncResult;
use crate::protocol::{ConnectionState, RelayEvent};

/// A publish/subscribe connection to the relay.
///
/// Implementations never block: outgoing frames are handed off and incoming
/// ones are collected until the owner calls [`Relay::poll_events`].
pub trait Relay {
    /// Ask the relay for messages published on `topic`.
    fn subscribe(&mut self, topic: &str) -> SyncResult<()>;

    /// Broadcast `payload` to the other subscribers of `topic`.
    fn publish(&mut self, topic: &str, payload: Value) -> SyncResult<()>;

    /// Drain pending events (non-blocking).
    fn poll_events(&mut self) -> Vec<RelayEvent>;

    /// Get current connection state.
    fn state(&self) -> ConnectionState;

    /// Check if connected.
    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}

/// Opens relay connections.
pub trait Connector {
    type Relay: Relay;

    /// Open a connection to `url`.
    fn connect(&mut self, url: &str) -> SyncResult<Self::Relay>;
}

/// Platform-specific WebSocket client type.
#[cfg(target_arch = "wasm32")]
pub type PlatformWebSocket = WasmWebSocket;

#[cfg(not(target_arch = "wasm32"))]
pub type PlatformWebSocket = NativeWebSocket;

/// Connects over WebSocket using the platform client.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    type Relay = PlatformWebSocket;

    fn connect(&mut self, url: &str) -> SyncResult<PlatformWebSocket> {
        let mut ws = PlatformWebSocket::new();
        ws.connect(url)?;
        Ok(ws)
    }
}
