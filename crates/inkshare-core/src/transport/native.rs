//! Native WebSocket client.

use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::Value;
use tungstenite::{Message, connect};
use url::Url;

use super::Relay;
use crate::error::{SyncError, SyncResult};
use crate::protocol::{ClientMessage, ConnectionState, RelayEvent, ServerMessage, next_state};

/// Commands sent to the WebSocket thread.
enum WsCommand {
    Send(String),
    Close,
}

/// WebSocket client for native platforms.
///
/// Uses a background thread for non-blocking operation.
pub struct NativeWebSocket {
    state: ConnectionState,
    /// Channel to send commands to the WebSocket thread.
    cmd_tx: Option<Sender<WsCommand>>,
    /// Channel to receive events from the WebSocket thread.
    event_rx: Option<Receiver<RelayEvent>>,
    _thread: Option<JoinHandle<()>>,
}

impl NativeWebSocket {
    /// Create a new disconnected WebSocket client.
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            cmd_tx: None,
            event_rx: None,
            _thread: None,
        }
    }

    /// Connect to a relay.
    pub fn connect(&mut self, url: &str) -> SyncResult<()> {
        if self.cmd_tx.is_some() {
            return Err(SyncError::AlreadyConnected);
        }

        let parsed_url = Url::parse(url).map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
        if parsed_url.scheme() != "ws" && parsed_url.scheme() != "wss" {
            return Err(SyncError::InvalidUrl(format!(
                "unsupported scheme: {}",
                parsed_url.scheme()
            )));
        }

        self.state = ConnectionState::Connecting;

        let (cmd_tx, cmd_rx) = channel::<WsCommand>();
        let (event_tx, event_rx) = channel::<RelayEvent>();
        let url = url.to_string();

        let handle = thread::spawn(move || run_socket(&url, &cmd_rx, &event_tx));

        self.cmd_tx = Some(cmd_tx);
        self.event_rx = Some(event_rx);
        self._thread = Some(handle);

        Ok(())
    }

    /// Disconnect from the relay.
    pub fn disconnect(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(WsCommand::Close);
        }
        self.event_rx = None;
        self._thread = None;
        self.state = ConnectionState::Disconnected;
    }

    fn send(&self, msg: &ClientMessage) -> SyncResult<()> {
        let tx = self.cmd_tx.as_ref().ok_or(SyncError::NotConnected)?;
        let json = serde_json::to_string(msg)?;
        tx.send(WsCommand::Send(json))
            .map_err(|e| SyncError::Send(e.to_string()))
    }
}

impl Relay for NativeWebSocket {
    fn subscribe(&mut self, topic: &str) -> SyncResult<()> {
        self.send(&ClientMessage::Subscribe {
            topic: topic.to_string(),
        })
    }

    fn publish(&mut self, topic: &str, payload: Value) -> SyncResult<()> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }
        self.send(&ClientMessage::Publish {
            topic: topic.to_string(),
            payload,
        })
    }

    fn poll_events(&mut self) -> Vec<RelayEvent> {
        let mut events = Vec::new();
        if let Some(ref rx) = self.event_rx {
            loop {
                let event = match rx.try_recv() {
                    Ok(event) => event,
                    Err(TryRecvError::Empty) => break,
                    // Socket thread is gone without saying goodbye
                    Err(TryRecvError::Disconnected)
                        if self.state != ConnectionState::Disconnected =>
                    {
                        RelayEvent::Disconnected
                    }
                    Err(TryRecvError::Disconnected) => break,
                };
                self.state = next_state(self.state, &event);
                events.push(event);
            }
        }
        events
    }

    fn state(&self) -> ConnectionState {
        self.state
    }
}

impl Default for NativeWebSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NativeWebSocket {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Outgoing frames are logged up to this many characters.
const LOG_PREVIEW_CHARS: usize = 100;

/// At most `max_chars` leading characters of `msg`.
fn preview(msg: &str, max_chars: usize) -> &str {
    match msg.char_indices().nth(max_chars) {
        Some((end, _)) => &msg[..end],
        None => msg,
    }
}

/// Socket thread body: connect, then alternate between outgoing commands
/// and incoming frames until either side closes.
fn run_socket(url: &str, cmd_rx: &Receiver<WsCommand>, event_tx: &Sender<RelayEvent>) {
    log::info!("WebSocket thread: connecting to {}", url);

    let (mut socket, response) = match connect(url) {
        Ok(connected) => connected,
        Err(e) => {
            log::error!("WebSocket connection failed: {}", e);
            let _ = event_tx.send(RelayEvent::Failed {
                reason: format!("Connection failed: {}", e),
            });
            return;
        }
    };

    log::info!("WebSocket connected, status: {}", response.status());
    let _ = event_tx.send(RelayEvent::Connected);

    // Short read timeout keeps the command channel responsive
    match socket.get_mut() {
        tungstenite::stream::MaybeTlsStream::Plain(tcp) => {
            let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
            let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
        }
        #[allow(unreachable_patterns)]
        _ => {
            log::debug!("TLS or other stream - using default timeout handling");
        }
    }

    loop {
        match cmd_rx.try_recv() {
            Ok(WsCommand::Send(msg)) => {
                log::debug!("WebSocket sending: {}", preview(&msg, LOG_PREVIEW_CHARS));
                if let Err(e) = socket.send(Message::Text(msg)) {
                    log::error!("WebSocket send error: {}", e);
                    let _ = event_tx.send(RelayEvent::Failed {
                        reason: format!("Send failed: {}", e),
                    });
                    break;
                }
            }
            Ok(WsCommand::Close) => {
                log::info!("WebSocket close requested");
                let _ = socket.close(None);
                break;
            }
            Err(TryRecvError::Disconnected) => {
                log::info!("WebSocket command channel disconnected");
                break;
            }
            Err(TryRecvError::Empty) => {}
        }

        match socket.read() {
            Ok(Message::Text(txt)) => match serde_json::from_str::<ServerMessage>(&txt) {
                Ok(server_msg) => {
                    let _ = event_tx.send(server_msg.into());
                }
                Err(e) => log::warn!("Failed to parse relay frame: {}", e),
            },
            Ok(Message::Ping(data)) => {
                let _ = socket.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                log::info!("WebSocket received close frame");
                break;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => {
                log::error!("WebSocket read error: {}", e);
                let _ = event_tx.send(RelayEvent::Failed {
                    reason: format!("Read failed: {}", e),
                });
                break;
            }
        }
    }

    log::info!("WebSocket thread exiting");
    let _ = event_tx.send(RelayEvent::Disconnected);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    /// Minimal relay on an ephemeral port: optionally sends `greeting` right
    /// after the handshake, then forwards every text frame it receives.
    fn local_relay(greeting: Option<&'static str>) -> (String, Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (frame_tx, frame_rx) = channel();
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut ws = tungstenite::accept(stream).unwrap();
            if let Some(text) = greeting {
                ws.send(Message::Text(text.to_string())).unwrap();
            }
            while let Ok(msg) = ws.read() {
                if let Message::Text(text) = msg {
                    if frame_tx.send(text).is_err() {
                        break;
                    }
                }
            }
        });
        (format!("ws://{addr}/ws"), frame_rx)
    }

    fn poll_until(
        ws: &mut NativeWebSocket,
        done: impl Fn(&[RelayEvent]) -> bool,
    ) -> Vec<RelayEvent> {
        let mut events = Vec::new();
        for _ in 0..300 {
            events.extend(ws.poll_events());
            if done(&events) {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        events
    }

    fn next_frame(frames: &Receiver<String>) -> Value {
        let text = frames.recv_timeout(Duration::from_secs(3)).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_relay_error_frame_does_not_block_publishing() {
        let (url, frames) =
            local_relay(Some(r#"{"type":"error","message":"Invalid message: x"}"#));
        let mut ws = NativeWebSocket::new();
        ws.connect(&url).unwrap();

        let events = poll_until(&mut ws, |events| {
            events.iter().any(|e| matches!(e, RelayEvent::Error { .. }))
        });
        assert_eq!(events.first(), Some(&RelayEvent::Connected));
        assert!(events.contains(&RelayEvent::Error {
            message: "Invalid message: x".to_string()
        }));
        assert_eq!(ws.state(), ConnectionState::Connected);

        ws.publish("draw", serde_json::json!({"n": 1})).unwrap();
        let sent = next_frame(&frames);
        assert_eq!(sent["type"], "publish");
        assert_eq!(sent["payload"]["n"], 1);
    }

    #[test]
    fn test_multibyte_topic_survives_debug_logging() {
        log::set_max_level(log::LevelFilter::Debug);
        let topic = "画板".repeat(20);
        let (url, frames) = local_relay(None);
        let mut ws = NativeWebSocket::new();
        ws.connect(&url).unwrap();
        poll_until(&mut ws, |events| events.contains(&RelayEvent::Connected));
        assert!(ws.is_connected());

        ws.subscribe(&topic).unwrap();
        assert_eq!(next_frame(&frames)["topic"], topic.as_str());

        ws.publish(&topic, Value::Null).unwrap();
        assert_eq!(next_frame(&frames)["type"], "publish");
        assert!(ws.poll_events().is_empty());
        assert_eq!(ws.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_unreachable_relay_reports_failure() {
        // Bind then drop to get a port nobody listens on
        let addr = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let mut ws = NativeWebSocket::new();
        ws.connect(&format!("ws://{addr}/ws")).unwrap();

        let events = poll_until(&mut ws, |events| {
            events.iter().any(|e| matches!(e, RelayEvent::Failed { .. }))
        });
        assert!(matches!(events.first(), Some(RelayEvent::Failed { .. })));
        assert_eq!(ws.state(), ConnectionState::Disconnected);
        assert!(ws.publish("draw", Value::Null).is_err());
    }

    #[test]
    fn test_dead_socket_thread_reads_as_disconnected() {
        let (event_tx, event_rx) = channel::<RelayEvent>();
        let (cmd_tx, _cmd_rx) = channel::<WsCommand>();
        event_tx.send(RelayEvent::Connected).unwrap();
        drop(event_tx);
        let mut ws = NativeWebSocket {
            state: ConnectionState::Connecting,
            cmd_tx: Some(cmd_tx),
            event_rx: Some(event_rx),
            _thread: None,
        };

        assert_eq!(
            ws.poll_events(),
            vec![RelayEvent::Connected, RelayEvent::Disconnected]
        );
        assert_eq!(ws.state(), ConnectionState::Disconnected);
        assert!(ws.poll_events().is_empty());
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        let long = "画板".repeat(60);
        assert_eq!(preview(&long, LOG_PREVIEW_CHARS).chars().count(), LOG_PREVIEW_CHARS);
        assert_eq!(preview("abc", LOG_PREVIEW_CHARS), "abc");
        assert_eq!(preview("héllo", 2), "hé");
    }

    #[test]
    fn test_rejects_non_websocket_url() {
        let mut ws = NativeWebSocket::new();
        assert!(matches!(
            ws.connect("http://localhost:3001/ws"),
            Err(SyncError::InvalidUrl(_))
        ));
        assert!(matches!(ws.connect("not a url"), Err(SyncError::InvalidUrl(_))));
        assert_eq!(ws.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_publish_before_connect_is_rejected() {
        let mut ws = NativeWebSocket::new();
        assert!(matches!(
            ws.publish("draw", Value::Null),
            Err(SyncError::NotConnected)
        ));
        assert!(ws.poll_events().is_empty());
    }
}
