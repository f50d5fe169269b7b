use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Where a chat session connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTarget {
    /// Chat server host name (already lowercased by resolution).
    pub host: String,
    /// Control port.
    pub port: u16,
    /// Broadcaster id used as the websocket path segment.
    pub broadcaster_id: String,
}

impl ChatTarget {
    /// Websocket sub-protocol the chat server expects.
    pub const SUBPROTOCOL: &'static str = "chat";

    pub fn new(host: impl Into<String>, port: u16, broadcaster_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            broadcaster_id: broadcaster_id.into(),
        }
    }

    /// `wss://{host}:{port}/Websocket/{broadcaster_id}`
    pub fn url(&self) -> String {
        format!(
            "wss://{}:{}/Websocket/{}",
            self.host, self.port, self.broadcaster_id
        )
    }
}

impl fmt::Display for ChatTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Write half of a chat connection.
///
/// Implementations need not serialize concurrent callers; the session holds
/// the sink behind a lock.
#[async_trait]
pub trait FrameSink: Send {
    /// Send one complete frame.
    async fn send(&mut self, frame: &[u8]) -> Result<()>;

    /// Close the connection. Calling this more than once is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Read half of a chat connection.
#[async_trait]
pub trait FrameStream: Send {
    /// Receive the next complete frame.
    ///
    /// Returns `Ok(None)` once the peer has closed the connection.
    async fn recv(&mut self) -> Result<Option<Bytes>>;
}

/// An open chat connection, split into independently usable halves.
pub struct Connection {
    pub sink: Box<dyn FrameSink>,
    pub stream: Box<dyn FrameStream>,
}

impl Connection {
    pub fn new(sink: impl FrameSink + 'static, stream: impl FrameStream + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            stream: Box::new(stream),
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

/// Opens chat connections.
#[async_trait]
pub trait TransportConnector: Send + Sync {
    async fn connect(&self, target: &ChatTarget) -> Result<Connection>;
}
