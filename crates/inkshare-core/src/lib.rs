//! InkShare Core Library
//!
//! Platform-agnostic view transform, stroke store and stroke synchronization
//! for the InkShare shared whiteboard.

pub mod board;
pub mod camera;
pub mod config;
pub mod error;
pub mod input;
pub mod protocol;
pub mod render;
pub mod store;
pub mod stroke;
pub mod sync;
pub mod transport;

pub use board::Board;
pub use camera::{Camera, MAX_ZOOM, MIN_ZOOM};
pub use config::BoardConfig;
pub use error::{ConfigError, SyncError};
pub use input::{Modifiers, MouseButton, PointerEvent, WheelEvent};
pub use protocol::{ConnectionState, RelayEvent, SyncMessage};
pub use render::{DisplayList, DrawCommand, Surface};
pub use store::StrokeStore;
pub use stroke::Stroke;
pub use sync::SyncClient;
pub use transport::{
    Connector, MemoryHub, MemoryRelay, PlatformWebSocket, Relay, WebSocketConnector,
};
