//! Status and message callbacks.
//!
//! The session calls its [`SessionObserver`] synchronously from the task that
//! drives it. Observers that feed another thread (a UI, a printer) forward the
//! events themselves; [`ChannelObserver`] does exactly that over an mpsc
//! channel.

use std::fmt;
use std::path::PathBuf;

use afchat_frame::ChatEvent;
use tokio::sync::mpsc;

use crate::state::SessionState;

/// Informational and lifecycle events raised by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// The session moved between lifecycle states.
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    /// The chat endpoint was resolved.
    Resolved {
        title: String,
        broadcaster_id: String,
        chat_url: String,
        log_path: Option<PathBuf>,
    },
    /// Connect and join frames were sent.
    Joined { channel_no: String },
    /// A frame was dropped because it did not decode.
    DecodeFailed { error: String },
    /// The chat log could not be opened or written.
    StorageFailed { error: String },
    /// The server closed the connection.
    TransportClosed,
    /// Reading from the connection failed.
    ReceiveFailed { error: String },
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StateChanged { to, .. } => match to {
                SessionState::Failed(reason) => write!(f, "Session failed: {reason}"),
                other => write!(f, "Session {other}"),
            },
            Self::Resolved {
                title,
                broadcaster_id,
                chat_url,
                log_path,
            } => {
                write!(f, "Broadcast '{title}' by {broadcaster_id} at {chat_url}")?;
                match log_path {
                    Some(path) => write!(f, ", logging to {}", path.display()),
                    None => f.write_str(", not logging"),
                }
            }
            Self::Joined { channel_no } => write!(f, "Joined chat channel {channel_no}"),
            Self::DecodeFailed { error } => write!(f, "Dropped undecodable frame: {error}"),
            Self::StorageFailed { error } => write!(f, "Chat log error: {error}"),
            Self::TransportClosed => f.write_str("Connection closed by server"),
            Self::ReceiveFailed { error } => write!(f, "Receive failed: {error}"),
        }
    }
}

/// Receives session callbacks.
pub trait SessionObserver: Send + Sync {
    /// Called on every transition, error and informational event.
    fn on_status(&self, status: &StatusEvent);

    /// Called once per classified chat message, only while active.
    fn on_message(&self, event: &ChatEvent);
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SessionObserver for NullObserver {
    fn on_status(&self, _status: &StatusEvent) {}

    fn on_message(&self, _event: &ChatEvent) {}
}

/// One observed callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Status(StatusEvent),
    Message(ChatEvent),
}

/// Forwards callbacks to an unbounded channel.
///
/// Events raised after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SessionObserver for ChannelObserver {
    fn on_status(&self, status: &StatusEvent) {
        let _ = self.tx.send(SessionEvent::Status(status.clone()));
    }

    fn on_message(&self, event: &ChatEvent) {
        let _ = self.tx.send(SessionEvent::Message(event.clone()));
    }
}
