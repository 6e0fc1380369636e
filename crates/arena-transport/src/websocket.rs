//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! The listener runs in a background task: every TCP connection gets its
//! own upgrade task, so a slow or stalled client never holds up the
//! accept loop. Finished upgrades are queued for [`Transport::accept`].

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Upper bound on upgraded connections waiting for `accept`.
const PENDING_CONNECTIONS: usize = 128;

const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    local_addr: SocketAddr,
    incoming: mpsc::Receiver<WebSocketConnection>,
}

impl WebSocketTransport {
    /// Binds a WebSocket transport that accepts upgrades on any path.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        Self::bind_with(addr, None, DEFAULT_HANDSHAKE_TIMEOUT).await
    }

    /// Binds a WebSocket transport.
    ///
    /// When `path` is set, upgrade requests for any other path are answered
    /// with `404 Not Found`. Upgrades that take longer than
    /// `handshake_timeout` are dropped.
    pub async fn bind_with(
        addr: &str,
        path: Option<String>,
        handshake_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await.map_err(|source| {
            TransportError::BindFailed {
                addr: addr.to_string(),
                source,
            }
        })?;
        let local_addr = listener.local_addr().map_err(|source| {
            TransportError::BindFailed {
                addr: addr.to_string(),
                source,
            }
        })?;
        tracing::info!(%local_addr, path = path.as_deref().unwrap_or("*"), "WebSocket transport listening");

        let (tx, rx) = mpsc::channel(PENDING_CONNECTIONS);
        tokio::spawn(accept_loop(listener, path, handshake_timeout, tx));

        Ok(Self {
            local_addr,
            incoming: rx,
        })
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        self.incoming.recv().await.ok_or_else(|| {
            TransportError::ConnectionClosed("listener stopped".into())
        })
    }

    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// Accepts TCP connections until the owning transport is dropped.
async fn accept_loop(
    listener: TcpListener,
    path: Option<String>,
    handshake_timeout: Duration,
    tx: mpsc::Sender<WebSocketConnection>,
) {
    loop {
        let accepted = tokio::select! {
            _ = tx.closed() => break,
            accepted = listener.accept() => accepted,
        };

        let (stream, peer) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(error = %e, "TCP accept failed");
                continue;
            }
        };

        let path = path.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            match upgrade(stream, peer, path, handshake_timeout).await {
                Ok(conn) => {
                    tracing::debug!(id = %conn.id, %peer, "accepted WebSocket connection");
                    let _ = tx.send(conn).await;
                }
                Err(e) => {
                    tracing::debug!(%peer, error = %e, "WebSocket upgrade failed");
                }
            }
        });
    }
    tracing::debug!("WebSocket accept loop stopped");
}

/// Performs the HTTP upgrade, rejecting requests for the wrong path.
async fn upgrade(
    stream: TcpStream,
    peer: SocketAddr,
    path: Option<String>,
    handshake_timeout: Duration,
) -> Result<WebSocketConnection, TransportError> {
    let check_path =
        move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            match &path {
                Some(expected) if req.uri().path() != expected => {
                    let mut rejection = ErrorResponse::new(Some(format!(
                        "no WebSocket endpoint at {}",
                        req.uri().path()
                    )));
                    *rejection.status_mut() = StatusCode::NOT_FOUND;
                    Err(rejection)
                }
                _ => Ok(resp),
            }
        };

    let ws = tokio::time::timeout(
        handshake_timeout,
        tokio_tungstenite::accept_hdr_async(stream, check_path),
    )
    .await
    .map_err(|_| TransportError::HandshakeTimeout)?
    .map_err(|e| {
        TransportError::AcceptFailed(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            e,
        ))
    })?;

    let id =
        ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
    let (sink, stream) = ws.split();

    Ok(WebSocketConnection {
        id,
        peer,
        sink: Mutex::new(sink),
        stream: Mutex::new(stream),
    })
}

/// A single WebSocket connection.
///
/// The socket is split so the outbound half can be written while another
/// task is parked on the inbound half.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, text: &str) -> Result<(), Self::Error> {
        self.sink
            .lock()
            .await
            .send(Message::text(text.to_owned()))
            .await
            .map_err(|e| {
                TransportError::SendFailed(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    e,
                ))
            })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(io::Error::new(
                io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}
