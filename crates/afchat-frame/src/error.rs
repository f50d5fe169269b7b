/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A join frame was requested without a channel number.
    #[error("join frame requires a non-empty channel number")]
    EmptyChannel,

    /// The body does not fit the 6-digit length field.
    #[error("frame body too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The command code does not fit the 4-digit command field.
    #[error("command code {0} out of range")]
    InvalidCommand(u16),

    /// A decoded segment is not valid UTF-8.
    #[error("segment {index} is not valid UTF-8: {source}")]
    InvalidUtf8 {
        index: usize,
        source: std::str::Utf8Error,
    },
}

pub type Result<T> = std::result::Result<T, FrameError>;
