/// Errors that can occur in chat transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The target could not be turned into a websocket request.
    #[error("invalid websocket target {url}: {reason}")]
    InvalidTarget { url: String, reason: String },

    /// TLS client configuration could not be built.
    #[error("tls configuration failed: {0}")]
    Tls(#[from] rustls::Error),

    /// Failed to open the connection to the specified address.
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },

    /// Sending a frame failed.
    #[error("transport send failed: {0}")]
    Send(Box<tokio_tungstenite::tungstenite::Error>),

    /// Receiving a frame failed.
    #[error("transport receive failed: {0}")]
    Receive(Box<tokio_tungstenite::tungstenite::Error>),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport has been shut down.
    #[error("transport shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, TransportError>;
