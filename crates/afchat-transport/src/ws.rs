//! Secure websocket transport.
//!
//! Thin wrapper around `tokio-tungstenite`: [`WsConnector`] performs the TLS
//! and websocket handshakes and returns a [`Connection`] whose halves can be
//! driven from separate loops.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};

use crate::error::{Result, TransportError};
use crate::tls::{client_config, TlsVerification};
use crate::traits::{ChatTarget, Connection, FrameSink, FrameStream, TransportConnector};

type WsInner = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Configuration for [`WsConnector`].
#[derive(Debug, Clone, Default)]
pub struct WsConfig {
    /// Server certificate policy.
    pub tls: TlsVerification,
}

/// Opens `wss://` chat connections with the `chat` sub-protocol.
#[derive(Debug, Clone, Default)]
pub struct WsConnector {
    config: WsConfig,
}

impl WsConnector {
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WsConfig {
        &self.config
    }
}

#[async_trait]
impl TransportConnector for WsConnector {
    async fn connect(&self, target: &ChatTarget) -> Result<Connection> {
        let url = target.url();
        let mut request =
            url.as_str()
                .into_client_request()
                .map_err(|err| TransportError::InvalidTarget {
                    url: url.clone(),
                    reason: err.to_string(),
                })?;
        request.headers_mut().insert(
            SEC_WEBSOCKET_PROTOCOL,
            HeaderValue::from_static(ChatTarget::SUBPROTOCOL),
        );

        if !self.config.tls.is_verified() {
            warn!(%url, "tls certificate and hostname verification disabled");
        }
        let tls = client_config(self.config.tls)?;

        let (stream, response) = tokio_tungstenite::connect_async_tls_with_config(
            request,
            None,
            false,
            Some(Connector::Rustls(tls)),
        )
        .await
        .map_err(|err| TransportError::Connect {
            url: url.clone(),
            source: Box::new(err),
        })?;
        debug!(%url, status = %response.status(), "websocket connected");

        let (sink, stream) = stream.split();
        Ok(Connection::new(
            WsSink {
                sink,
                closed: false,
            },
            WsStream { stream },
        ))
    }
}

/// Write half of a websocket chat connection.
pub struct WsSink {
    sink: SplitSink<WsInner, Message>,
    closed: bool,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, frame: &[u8]) -> Result<()> {
        if self.closed {
            return Err(TransportError::Shutdown);
        }
        self.sink
            .send(outbound_message(frame))
            .await
            .map_err(|err| TransportError::Send(Box::new(err)))
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.sink.close().await {
            Ok(()) => Ok(()),
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(err) => Err(TransportError::Send(Box::new(err))),
        }
    }
}

/// Read half of a websocket chat connection.
pub struct WsStream {
    stream: SplitStream<WsInner>,
}

#[async_trait]
impl FrameStream for WsStream {
    async fn recv(&mut self) -> Result<Option<Bytes>> {
        loop {
            let message = match self.stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(
                    tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed,
                ))
                | None => return Ok(None),
                Some(Err(err)) => return Err(TransportError::Receive(Box::new(err))),
            };

            match inbound_frame(message) {
                Inbound::Frame(frame) => return Ok(Some(frame)),
                Inbound::Skip => continue,
                Inbound::Closed => return Ok(None),
            }
        }
    }
}

/// Control frames are plain text; anything else goes out as binary.
fn outbound_message(frame: &[u8]) -> Message {
    match std::str::from_utf8(frame) {
        Ok(text) => Message::Text(text.to_owned()),
        Err(_) => Message::Binary(frame.to_vec()),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Inbound {
    Frame(Bytes),
    Skip,
    Closed,
}

fn inbound_frame(message: Message) -> Inbound {
    match message {
        Message::Text(text) => Inbound::Frame(Bytes::from(text)),
        Message::Binary(data) => Inbound::Frame(Bytes::from(data)),
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
            trace!("skipping websocket control message");
            Inbound::Skip
        }
        Message::Close(frame) => {
            debug!(?frame, "close frame received");
            Inbound::Closed
        }
    }
}
