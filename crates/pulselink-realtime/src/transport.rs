//! Transport seam: the channel state machine drives any bidirectional
//! text-frame connection, with a tokio-tungstenite implementation for
//! production and in-memory fakes in tests.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Handshake deadline for a single dial.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("send failed: {0}")]
    Send(String),

    #[error("receive failed: {0}")]
    Recv(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Dials new connections to an endpoint.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Connection>, TransportError>;
}

/// One established bidirectional text-frame connection.
#[async_trait]
pub trait Connection: Send {
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Next inbound text frame. `None` once the peer has closed.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    async fn close(&mut self);
}

// ---------------------------------------------------------------------------
// WebSocket Transport
// ---------------------------------------------------------------------------

/// Production transport over `tokio_tungstenite`.
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Connection>, TransportError> {
        let dial = tokio_tungstenite::connect_async(endpoint);
        let (ws_stream, _) = tokio::time::timeout(CONNECT_TIMEOUT, dial)
            .await
            .map_err(|_| TransportError::ConnectTimeout(CONNECT_TIMEOUT))?
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (sink, stream) = ws_stream.split();
        Ok(Box::new(WsConnection { sink, stream }))
    }
}

struct WsConnection {
    sink: SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>,
    stream: SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

#[async_trait]
impl Connection for WsConnection {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.sink
            .send(WsMessage::Text(frame.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => return Some(Ok(text.to_string())),
                Ok(WsMessage::Ping(data)) => {
                    let _ = self.sink.send(WsMessage::Pong(data)).await;
                }
                Ok(WsMessage::Close(_)) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(TransportError::Recv(e.to_string()))),
            }
        }
        None
    }

    async fn close(&mut self) {
        let _ = self.sink.send(WsMessage::Close(None)).await;
    }
}
