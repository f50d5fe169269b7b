/// The broadcast URL could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    /// The input is not a URL at all.
    #[error("invalid broadcast url '{input}': {reason}")]
    Unparseable { input: String, reason: String },

    /// The path lacks a broadcaster id and broadcast number.
    #[error("broadcast url '{0}' must end with /<broadcaster-id>/<broadcast-no>")]
    MissingSegments(String),
}

/// Which side of resolution failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionErrorKind {
    /// Network failure or non-2xx response.
    Transport,
    /// The API answered but without the expected channel data.
    MalformedResponse,
}

/// Errors that can occur while resolving a chat endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// The HTTP client could not be built.
    #[error("http client setup failed: {0}")]
    Client(#[source] reqwest::Error),

    /// The request failed before a response arrived.
    #[error("live api request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("live api returned status {status}")]
    Status { status: reqwest::StatusCode },

    /// The response body was not the expected JSON document.
    #[error("live api response malformed: {0}")]
    MalformedResponse(String),
}

impl ResolutionError {
    pub fn kind(&self) -> ResolutionErrorKind {
        match self {
            Self::Client(_) | Self::Request(_) | Self::Status { .. } => {
                ResolutionErrorKind::Transport
            }
            Self::MalformedResponse(_) => ResolutionErrorKind::MalformedResponse,
        }
    }
}

pub type Result<T> = std::result::Result<T, ResolutionError>;
