//! Chat session lifecycle for the AfreecaTV chat protocol.
//!
//! A [`ChatSession`] resolves a broadcast URL, connects, sends the connect
//! and join frames, then runs a receive loop and a keepalive loop side by
//! side until stopped or disconnected. Chat messages go to a
//! [`SessionObserver`] and to a per-session [`ChatLog`].

pub mod chatlog;
pub mod config;
pub mod error;
pub mod observer;
pub mod session;
pub mod state;

pub use chatlog::{log_file_name, sanitize_title, ChatLog};
pub use config::{default_log_dir, SessionConfig, LOG_DIR_NAME};
pub use error::{Result, SessionError, StorageError};
pub use observer::{ChannelObserver, NullObserver, SessionEvent, SessionObserver, StatusEvent};
pub use session::{ChatSession, CloseReason, SessionHandle, SessionSummary};
pub use state::{FailureKind, FailureReason, SessionState};
