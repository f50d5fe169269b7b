use std::path::PathBuf;

/// Errors that end a chat session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The broadcast URL was rejected before anything was sent.
    #[error("invalid broadcast url: {0}")]
    InvalidUrl(#[from] afchat_resolve::UrlError),

    /// Endpoint resolution failed; no connection was attempted.
    #[error("endpoint resolution failed: {0}")]
    Resolution(#[from] afchat_resolve::ResolutionError),

    /// The chat server could not be reached.
    #[error("connect failed: {0}")]
    Connect(#[source] afchat_transport::TransportError),

    /// The handshake frames could not be built or sent.
    #[error("join failed: {0}")]
    Join(String),
}

/// Chat log failures. Reported, never fatal to the session.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The executable directory could not be determined.
    #[error("cannot locate log directory: {0}")]
    LogDir(#[source] std::io::Error),

    /// The log directory could not be created.
    #[error("failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The log file could not be created.
    #[error("failed to open log file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Appending to the log file failed.
    #[error("failed to write log file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The log was already closed.
    #[error("log file {0} already closed")]
    Closed(PathBuf),
}

pub type Result<T> = std::result::Result<T, SessionError>;
