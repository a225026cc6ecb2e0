//! Minimal JSON hub client for the runner's persistent bidirectional channel.
//!
//! Frames are JSON documents terminated by the `0x1E` record separator,
//! carried over a WebSocket. After a `{"protocol":"json","version":1}`
//! handshake the runner pushes named invocations (type 1) and accepts named
//! invocations back; completions (type 3) report per-call errors, ping (6)
//! keeps the link warm and close (7) ends the session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use std::{error::Error, fmt};

use anyhow::Context;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<Result<(), RemoteCallError>>>>>;

/// Every JSON frame ends with this byte.
const RECORD_SEPARATOR: char = '\u{1e}';

const FRAME_INVOCATION: u64 = 1;
const FRAME_COMPLETION: u64 = 3;
const FRAME_PING: u64 = 6;
const FRAME_CLOSE: u64 = 7;

/// Keeps the runner from dropping us while we idle in the lobby waiting for
/// a match to start.
const PING_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubState {
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
}

/// A named server-to-client invocation with its raw argument list.
#[derive(Debug, Clone)]
pub struct HubEvent {
    pub target: String,
    pub arguments: Vec<Value>,
}

/// Error the runner reported for a single outbound call. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCallError(pub String);

impl fmt::Display for RemoteCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "remote call failed: {}", self.0)
    }
}

impl Error for RemoteCallError {}

#[derive(Clone)]
pub struct HubConnection {
    outbound: mpsc::UnboundedSender<Message>,
    state_tx: Arc<watch::Sender<HubState>>,
    state_rx: watch::Receiver<HubState>,
    pending: PendingMap,
    next_invocation_id: Arc<AtomicU64>,
}

impl HubConnection {
    /// Opens the socket and completes the hub handshake. Returns the handle
    /// plus the stream of inbound invocations. A failure here is fatal to
    /// the session; there is no retry.
    pub async fn connect(url: &str) -> anyhow::Result<(Self, mpsc::UnboundedReceiver<HubEvent>)> {
        let (state_tx, state_rx) = watch::channel(HubState::Connecting);
        let state_tx = Arc::new(state_tx);

        let (socket, _) = connect_async(url)
            .await
            .with_context(|| format!("connect to runner hub at {url}"))?;
        let (mut sink, mut stream) = socket.split();

        sink.send(Message::Text(frame(&json!({"protocol": "json", "version": 1}))))
            .await
            .context("send hub handshake")?;

        // The first frame back is the handshake response; an empty object
        // means the protocol was accepted.
        let mut buffer = FrameBuffer::default();
        let response = loop {
            let message = stream
                .next()
                .await
                .context("connection closed during hub handshake")?
                .context("read hub handshake response")?;
            if let Message::Text(text) = message {
                buffer.push(&text);
                if let Some(first) = buffer.pop() {
                    break first;
                }
            }
        };
        let response: Value =
            serde_json::from_str(&response).context("parse hub handshake response")?;
        if let Some(error) = response.get("error").and_then(Value::as_str) {
            anyhow::bail!("hub handshake rejected: {error}");
        }
        state_tx.send_replace(HubState::Connected);

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        tokio::spawn(write_loop(sink, outbound_rx));
        tokio::spawn(read_loop(
            stream,
            buffer,
            events_tx,
            Arc::clone(&state_tx),
            Arc::clone(&pending),
        ));

        Ok((
            Self {
                outbound,
                state_tx,
                state_rx,
                pending,
                next_invocation_id: Arc::new(AtomicU64::new(0)),
            },
            events_rx,
        ))
    }

    pub fn state(&self) -> HubState {
        *self.state_rx.borrow()
    }

    /// Resolves once the connection reaches its terminal state. The reader
    /// task publishes that transition exactly once, at its single exit
    /// point, whichever path gets there first.
    pub async fn closed(&self) {
        let mut rx = self.state_rx.clone();
        let _ = rx.wait_for(|s| *s == HubState::Disconnected).await;
    }

    /// Invokes a named call on the runner and returns a receiver for the
    /// eventual completion. The receiver errors out if the connection dies
    /// before the completion arrives.
    pub async fn invoke(
        &self,
        target: &str,
        arguments: Vec<Value>,
    ) -> oneshot::Receiver<Result<(), RemoteCallError>> {
        let id = self
            .next_invocation_id
            .fetch_add(1, Ordering::Relaxed)
            .to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        let message = json!({
            "type": FRAME_INVOCATION,
            "invocationId": id,
            "target": target,
            "arguments": arguments,
        });
        if self.outbound.send(Message::Text(frame(&message))).is_err() {
            // Writer already gone; the pending entry is cleared when the
            // reader drains the map on exit.
            debug!(call = target, "dropping call, connection is down");
        }
        rx
    }

    /// Best-effort dispatch, the policy the session loop sends with: invoke,
    /// then log the completion error if the runner reports one. Never
    /// retries, never blocks the caller.
    pub fn best_effort(&self, target: &'static str, arguments: Vec<Value>) {
        let hub = self.clone();
        tokio::spawn(async move {
            let completion = hub.invoke(target, arguments).await;
            match completion.await {
                Ok(Err(error)) => warn!(call = target, %error, "call rejected by runner"),
                // A dropped channel means we disconnected mid-flight.
                Ok(Ok(())) | Err(_) => {}
            }
        });
    }

    /// Asks the transport to close. The terminal state is still published by
    /// the reader once the socket actually goes down.
    pub fn stop(&self) {
        self.state_tx.send_if_modified(|s| {
            if *s == HubState::Connected {
                *s = HubState::Disconnecting;
                true
            } else {
                false
            }
        });
        let _ = self.outbound.send(Message::Close(None));
    }
}

async fn write_loop(mut sink: SplitSink<Socket, Message>, mut outbound: mpsc::UnboundedReceiver<Message>) {
    let mut ping = tokio::time::interval(PING_INTERVAL);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(message) = message else { break };
                let closing = matches!(message, Message::Close(_));
                if sink.send(message).await.is_err() {
                    break;
                }
                if closing {
                    break;
                }
            }
            _ = ping.tick() => {
                let ping_frame = Message::Text(frame(&json!({"type": FRAME_PING})));
                if sink.send(ping_frame).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn read_loop(
    mut stream: SplitStream<Socket>,
    mut buffer: FrameBuffer,
    events: mpsc::UnboundedSender<HubEvent>,
    state: Arc<watch::Sender<HubState>>,
    pending: PendingMap,
) {
    'outer: loop {
        // The handshake read may have buffered frames already; drain before
        // waiting on the socket.
        while let Some(raw) = buffer.pop() {
            match serde_json::from_str::<Value>(&raw) {
                Ok(value) => {
                    if handle_frame(value, &events, &state, &pending).await {
                        break 'outer;
                    }
                }
                Err(error) => debug!(%error, "discarding unparseable hub frame"),
            }
        }

        let message = match stream.next().await {
            Some(Ok(message)) => message,
            Some(Err(error)) => {
                warn!(%error, "hub socket error");
                break;
            }
            None => break,
        };
        match message {
            Message::Text(text) => buffer.push(&text),
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Exactly one terminal transition, at the reader's single exit point.
    state.send_replace(HubState::Disconnected);
    pending.lock().await.clear();
}

/// Applies one inbound frame. Returns true when the frame ends the session.
async fn handle_frame(
    value: Value,
    events: &mpsc::UnboundedSender<HubEvent>,
    state: &watch::Sender<HubState>,
    pending: &PendingMap,
) -> bool {
    match value.get("type").and_then(Value::as_u64) {
        Some(FRAME_INVOCATION) => {
            let target = value.get("target").and_then(Value::as_str);
            let arguments = value.get("arguments").and_then(Value::as_array);
            match (target, arguments) {
                (Some(target), Some(arguments)) => {
                    let _ = events.send(HubEvent {
                        target: target.to_string(),
                        arguments: arguments.clone(),
                    });
                }
                _ => debug!("invocation frame without target or arguments"),
            }
            false
        }
        Some(FRAME_COMPLETION) => {
            if let Some(id) = value.get("invocationId").and_then(Value::as_str) {
                if let Some(tx) = pending.lock().await.remove(id) {
                    let result = match value.get("error").and_then(Value::as_str) {
                        Some(error) => Err(RemoteCallError(error.to_string())),
                        None => Ok(()),
                    };
                    let _ = tx.send(result);
                }
            }
            false
        }
        Some(FRAME_PING) => false,
        Some(FRAME_CLOSE) => {
            match value.get("error").and_then(Value::as_str) {
                Some(error) => warn!(error, "runner closed the session"),
                None => info!("runner closed the session"),
            }
            state.send_if_modified(|s| {
                if *s == HubState::Connected {
                    *s = HubState::Disconnecting;
                    true
                } else {
                    false
                }
            });
            true
        }
        other => {
            debug!(?other, "unhandled hub frame type");
            false
        }
    }
}

fn frame(value: &Value) -> String {
    format!("{value}{RECORD_SEPARATOR}")
}

/// Reassembles `0x1E`-delimited frames across socket message boundaries.
#[derive(Debug, Default)]
struct FrameBuffer {
    partial: String,
}

impl FrameBuffer {
    fn push(&mut self, chunk: &str) {
        self.partial.push_str(chunk);
    }

    fn pop(&mut self) -> Option<String> {
        let end = self.partial.find(RECORD_SEPARATOR)?;
        let frame = self.partial[..end].to_string();
        self.partial.drain(..=end);
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_end_with_the_record_separator() {
        let encoded = frame(&json!({"type": 6}));
        assert!(encoded.ends_with(RECORD_SEPARATOR));
        assert_eq!(&encoded[..encoded.len() - RECORD_SEPARATOR.len_utf8()], "{\"type\":6}");
    }

    #[test]
    fn frame_buffer_reassembles_split_frames() {
        let mut buffer = FrameBuffer::default();
        buffer.push("{\"type\":");
        assert_eq!(buffer.pop(), None);
        buffer.push("6}\u{1e}{\"type\":7}\u{1e}");
        assert_eq!(buffer.pop().as_deref(), Some("{\"type\":6}"));
        assert_eq!(buffer.pop().as_deref(), Some("{\"type\":7}"));
        assert_eq!(buffer.pop(), None);
    }

    #[tokio::test]
    async fn invocation_frames_become_events() {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(HubState::Connected);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        let closing = handle_frame(
            json!({"type": 1, "target": "Registered", "arguments": ["abc"]}),
            &events_tx,
            &state,
            &pending,
        )
        .await;
        assert!(!closing);

        let event = events_rx.recv().await.expect("event");
        assert_eq!(event.target, "Registered");
        assert_eq!(event.arguments, vec![json!("abc")]);
    }

    #[tokio::test]
    async fn completion_frames_resolve_pending_calls() {
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(HubState::Connected);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        let (tx, rx) = oneshot::channel();
        pending.lock().await.insert("3".to_string(), tx);

        handle_frame(
            json!({"type": 3, "invocationId": "3", "error": "nope"}),
            &events_tx,
            &state,
            &pending,
        )
        .await;

        assert_eq!(
            rx.await.expect("completion"),
            Err(RemoteCallError("nope".to_string()))
        );
        assert!(pending.lock().await.is_empty());
    }

    #[tokio::test]
    async fn close_frames_end_the_session() {
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let (state, state_rx) = watch::channel(HubState::Connected);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        let closing = handle_frame(json!({"type": 7}), &events_tx, &state, &pending).await;
        assert!(closing);
        assert_eq!(*state_rx.borrow(), HubState::Disconnecting);
    }
}
