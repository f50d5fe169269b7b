//! In-process transport pair.
//!
//! [`pair`] returns a connector that hands out exactly one connection and the
//! [`MemoryPeer`] playing the server side of it. Frames sent by the client are
//! captured on the peer; frames pushed by the peer are delivered to the client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::{Result, TransportError};
use crate::traits::{ChatTarget, Connection, FrameSink, FrameStream, TransportConnector};

/// Create a connected client/server pair.
pub fn pair() -> (MemoryConnector, MemoryPeer) {
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let shared = Arc::new(Shared::default());

    let connector = MemoryConnector {
        parts: Mutex::new(Some((
            MemorySink {
                tx: Some(sent_tx),
                shared: Arc::clone(&shared),
            },
            MemoryStream { rx: inbound_rx },
        ))),
        refuse: false,
        shared: Arc::clone(&shared),
    };
    let peer = MemoryPeer {
        sent_rx,
        inbound_tx: Some(inbound_tx),
        shared,
    };
    (connector, peer)
}

#[derive(Debug, Default)]
struct Shared {
    targets: Mutex<Vec<ChatTarget>>,
    connects: AtomicUsize,
    closes: AtomicUsize,
}

/// Client side: hands out the connection created by [`pair`].
#[derive(Debug)]
pub struct MemoryConnector {
    parts: Mutex<Option<(MemorySink, MemoryStream)>>,
    refuse: bool,
    shared: Arc<Shared>,
}

impl MemoryConnector {
    /// A connector whose every attempt fails with `ConnectionRefused`.
    pub fn refusing() -> (Self, MemoryPeer) {
        let (mut connector, peer) = pair();
        connector.refuse = true;
        (connector, peer)
    }
}

#[async_trait]
impl TransportConnector for MemoryConnector {
    async fn connect(&self, target: &ChatTarget) -> Result<Connection> {
        self.shared.connects.fetch_add(1, Ordering::SeqCst);
        self.shared
            .targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(target.clone());

        if self.refuse {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("memory transport refused {target}"),
            )));
        }

        let parts = self
            .parts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match parts {
            Some((sink, stream)) => Ok(Connection::new(sink, stream)),
            None => Err(TransportError::Shutdown),
        }
    }
}

/// Server side of a memory connection.
#[derive(Debug)]
pub struct MemoryPeer {
    sent_rx: mpsc::UnboundedReceiver<Bytes>,
    inbound_tx: Option<mpsc::UnboundedSender<Bytes>>,
    shared: Arc<Shared>,
}

impl MemoryPeer {
    /// Next frame the client sent, or `None` once the client closed its sink.
    pub async fn next_sent(&mut self) -> Option<Bytes> {
        self.sent_rx.recv().await
    }

    /// Deliver a frame to the client. Returns false once closed.
    pub fn push(&self, frame: impl Into<Bytes>) -> bool {
        match &self.inbound_tx {
            Some(tx) => tx.send(frame.into()).is_ok(),
            None => false,
        }
    }

    /// Stop accepting client frames. Later client sends fail with `Shutdown`.
    pub fn stop_reading(&mut self) {
        let (_tx, closed) = mpsc::unbounded_channel();
        self.sent_rx = closed;
    }

    /// Close the server side; the client's stream ends after draining.
    pub fn close(&mut self) {
        self.inbound_tx = None;
    }

    /// Number of connection attempts made through the paired connector.
    pub fn connect_count(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    /// Number of times the client closed its sink.
    pub fn close_count(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    /// Targets the client asked to connect to.
    pub fn targets(&self) -> Vec<ChatTarget> {
        self.shared
            .targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Client write half of a memory connection.
#[derive(Debug)]
pub struct MemorySink {
    tx: Option<mpsc::UnboundedSender<Bytes>>,
    shared: Arc<Shared>,
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&mut self, frame: &[u8]) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(TransportError::Shutdown)?;
        tx.send(Bytes::copy_from_slice(frame))
            .map_err(|_| TransportError::Shutdown)
    }

    async fn close(&mut self) -> Result<()> {
        if self.tx.take().is_some() {
            self.shared.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Client read half of a memory connection.
#[derive(Debug)]
pub struct MemoryStream {
    rx: mpsc::UnboundedReceiver<Bytes>,
}

#[async_trait]
impl FrameStream for MemoryStream {
    async fn recv(&mut self) -> Result<Option<Bytes>> {
        Ok(self.rx.recv().await)
    }
}
