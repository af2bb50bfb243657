//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! The engine speaks its protocol over a WebSocket at
//! `ws://host:port/<api path>`. Only binary frames are valid; a text frame is
//! a protocol violation that closes the connection.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::{Connection, ConnectionId, Dialer, TransportError};

/// Path the engine serves its API on.
pub const DEFAULT_API_PATH: &str = "/sc2api";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Dials engines over WebSocket.
#[derive(Debug, Clone)]
pub struct WebSocketDialer {
    path: String,
}

impl WebSocketDialer {
    /// Creates a dialer that connects to `ws://host:port{path}`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for WebSocketDialer {
    fn default() -> Self {
        Self::new(DEFAULT_API_PATH)
    }
}

#[async_trait]
impl Dialer for WebSocketDialer {
    async fn dial(
        &self,
        host: &str,
        port: u16,
    ) -> Result<Arc<dyn Connection>, TransportError> {
        let url = format!("ws://{host}:{port}{}", self.path);
        let conn = WebSocketConnection::connect(&url).await?;
        Ok(Arc::new(conn))
    }
}

/// A single client-side WebSocket connection.
///
/// The stream is split so that the writer and the reader never contend for
/// the same lock: a reader parked in `recv` must not block a concurrent
/// `send`.
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    /// Connects to the given `ws://` URL.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectFailed {
                addr: url.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ),
            })?;

        let id = ConnectionId::next();
        tracing::debug!(%id, url, "WebSocket connection established");

        let (sink, stream) = ws.split();
        Ok(Self {
            id,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }

    async fn reject(&self, kind: &'static str) -> TransportError {
        tracing::warn!(id = %self.id, kind, "non-binary frame, closing");
        let frame = CloseFrame {
            code: CloseCode::Unsupported,
            reason: "expected binary message".into(),
        };
        let _ = self.sink.lock().await.send(Message::Close(Some(frame))).await;
        TransportError::UnexpectedFrame(kind)
    }
}

#[async_trait]
impl Connection for WebSocketConnection {
    async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        let msg = Message::Binary(frame.to_vec().into());
        self.sink.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            let msg = self.stream.lock().await.next().await;
            match msg {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Text(_))) => {
                    return Err(self.reject("text").await);
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
