use std::fmt;
use std::io;

use afchat_frame::FrameError;
use afchat_resolve::{ResolutionError, ResolutionErrorKind, UrlError};
use afchat_session::SessionError;
use afchat_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn url_error(err: UrlError) -> CliError {
    CliError::new(USAGE, err.to_string())
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        TransportError::InvalidTarget { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        TransportError::Tls(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn resolution_error(context: &str, err: ResolutionError) -> CliError {
    let code = match err.kind() {
        ResolutionErrorKind::Transport => TRANSPORT_ERROR,
        ResolutionErrorKind::MalformedResponse => DATA_INVALID,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::InvalidUtf8 { .. } | FrameError::PayloadTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(USAGE, format!("{context}: {other}")),
    }
}

pub fn session_error(err: SessionError) -> CliError {
    match err {
        SessionError::InvalidUrl(err) => url_error(err),
        SessionError::Resolution(err) => resolution_error("resolve failed", err),
        SessionError::Connect(err) => transport_error("connect failed", err),
        SessionError::Join(message) => {
            CliError::new(TRANSPORT_ERROR, format!("join failed: {message}"))
        }
    }
}
