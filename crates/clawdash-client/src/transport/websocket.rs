//! WebSocket transport: one JSON document per text frame.
//!
//! `connect` performs the handshake and spawns a pump task that owns the
//! socket. The session talks to the pump through an unbounded outbound queue
//! (so sends never suspend) and receives [`TransportEvent`]s in order.

use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use clawdash_core::{DashError, DashResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Capacity of the inbound event queue.
const EVENT_CAPACITY: usize = 256;

/// What the pump reports back to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame (or a UTF-8 binary frame).
    Frame(String),
    /// The socket closed, with the peer's reason if any.
    Closed(Option<String>),
    /// The socket failed.
    Failed(String),
}

enum Outbound {
    Text(String),
    Close,
}

/// Non-blocking handle for writing to the socket.
#[derive(Debug, Clone)]
pub struct OutboundHandle {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl std::fmt::Debug for Outbound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(t) => write!(f, "Text({} bytes)", t.len()),
            Self::Close => f.write_str("Close"),
        }
    }
}

impl OutboundHandle {
    /// Queue a text frame.
    pub fn send_text(&self, text: String) -> DashResult<()> {
        self.tx
            .send(Outbound::Text(text))
            .map_err(|_| DashError::Transport("outbound channel closed".into()))
    }

    /// Ask the pump to close the socket.
    pub fn close(&self) {
        let _ = self.tx.send(Outbound::Close);
    }
}

/// An open WebSocket link.
pub struct Connection {
    pub outbound: OutboundHandle,
    pub events: mpsc::Receiver<TransportEvent>,
    pub pump: JoinHandle<()>,
}

/// Dial `url` and start pumping frames.
pub async fn connect(url: &str, timeout: Duration) -> DashResult<Connection> {
    let (ws_stream, _response) = match time::timeout(timeout, connect_async(url)).await {
        Ok(Ok(v)) => v,
        Ok(Err(e)) => return Err(connect_error(e)),
        Err(_) => return Err(DashError::Timeout),
    };

    tracing::info!("WebSocket connected to {}", url);

    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::channel(EVENT_CAPACITY);
    let pump = tokio::spawn(pump(ws_stream, out_rx, event_tx));

    Ok(Connection {
        outbound: OutboundHandle { tx: out_tx },
        events: event_rx,
        pump,
    })
}

/// Address and TLS problems mean no socket could be built at all.
fn connect_error(e: tungstenite::Error) -> DashError {
    match e {
        tungstenite::Error::Url(e) => DashError::TransportConstruction(e.to_string()),
        tungstenite::Error::Tls(e) => DashError::TransportConstruction(format!("TLS: {e}")),
        other => DashError::Transport(format!("WebSocket connect error: {other}")),
    }
}

async fn pump(
    ws_stream: WsStream,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::Sender<TransportEvent>,
) {
    let (mut sink, mut stream) = ws_stream.split();
    let mut closing = false;

    let end = loop {
        let step = tokio::select! {
            cmd = outbound.recv(), if !closing => write(&mut sink, cmd, &mut closing).await,
            msg = stream.next() => read(msg, &mut sink, &events).await,
        };
        if let Some(end) = step {
            break end;
        }
    };

    tracing::debug!(?end, "WebSocket pump ended");
    let _ = events.send(end).await;
}

async fn write(
    sink: &mut WsSink,
    cmd: Option<Outbound>,
    closing: &mut bool,
) -> Option<TransportEvent> {
    match cmd {
        Some(Outbound::Text(text)) => sink
            .send(Message::Text(text))
            .await
            .err()
            .map(|e| TransportEvent::Failed(format!("WebSocket send error: {e}"))),
        // The session dropped every handle or asked to close.
        Some(Outbound::Close) | None => {
            *closing = true;
            match sink.send(Message::Close(None)).await {
                Ok(()) => None,
                Err(e) => Some(TransportEvent::Closed(Some(e.to_string()))),
            }
        }
    }
}

async fn read(
    msg: Option<Result<Message, tungstenite::Error>>,
    sink: &mut WsSink,
    events: &mpsc::Sender<TransportEvent>,
) -> Option<TransportEvent> {
    let text = match msg {
        Some(Ok(Message::Text(text))) => text,
        Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
            Ok(text) => text,
            Err(_) => {
                tracing::warn!("ignoring non-UTF-8 binary frame");
                return None;
            }
        },
        Some(Ok(Message::Ping(payload))) => {
            let _ = sink.send(Message::Pong(payload)).await;
            return None;
        }
        Some(Ok(Message::Close(frame))) => {
            tracing::debug!("WebSocket close frame received");
            return Some(TransportEvent::Closed(
                frame.map(|f| f.reason.into_owned()).filter(|r| !r.is_empty()),
            ));
        }
        Some(Ok(_)) => return None,
        Some(Err(e)) => {
            return Some(TransportEvent::Failed(format!("WebSocket read error: {e}")));
        }
        None => return Some(TransportEvent::Closed(None)),
    };

    if events.send(TransportEvent::Frame(text)).await.is_err() {
        // Nobody is routing frames any more.
        return Some(TransportEvent::Closed(None));
    }
    None
}
