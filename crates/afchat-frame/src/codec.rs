use bytes::{BufMut, Bytes, BytesMut};

use crate::command::{CONNECT, JOIN, MAX_COMMAND, PING};
use crate::error::{FrameError, Result};

/// Escape prefix opening every control frame: ESC (0x1B) followed by TAB (0x09).
pub const ESCAPE: [u8; 2] = [0x1B, 0x09];

/// Field separator: form-feed (0x0C).
pub const FIELD_SEPARATOR: u8 = 0x0C;

/// Frame header: escape (2) + command (4) + body length (6) + option (2) = 14 bytes.
pub const HEADER_SIZE: usize = 14;

/// Largest body the 6-digit length field can describe.
pub const MAX_BODY_LEN: usize = 999_999;

/// Fixed overhead a join body adds around the channel number (one leading and
/// five trailing separators).
pub const JOIN_OVERHEAD: usize = 6;

const DEFAULT_OPTION: &[u8; 2] = b"00";
const CONNECT_BODY: &[u8] = b"\x0c\x0c\x0c16\x0c";
const PING_BODY: &[u8] = b"\x0c";
const JOIN_TRAILING_SEPARATORS: usize = 5;

/// An outgoing protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlFrame {
    /// Announces protocol version/capabilities.
    Connect,
    /// Joins the chat channel.
    Join { channel_no: String },
    /// Keepalive.
    Ping,
}

impl ControlFrame {
    /// Create a join frame for `channel_no`.
    pub fn join(channel_no: impl Into<String>) -> Self {
        Self::Join {
            channel_no: channel_no.into(),
        }
    }

    /// The command code written into the header.
    pub fn command(&self) -> u16 {
        match self {
            Self::Connect => CONNECT,
            Self::Join { .. } => JOIN,
            Self::Ping => PING,
        }
    }

    /// Encode this frame into `dst`.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        match self {
            Self::Connect => {
                put_control(CONNECT, CONNECT_BODY, dst);
                Ok(())
            }
            Self::Ping => {
                put_control(PING, PING_BODY, dst);
                Ok(())
            }
            Self::Join { channel_no } => {
                if channel_no.is_empty() {
                    return Err(FrameError::EmptyChannel);
                }
                let mut body = Vec::with_capacity(channel_no.len() + JOIN_OVERHEAD);
                body.push(FIELD_SEPARATOR);
                body.extend_from_slice(channel_no.as_bytes());
                body.extend_from_slice(&[FIELD_SEPARATOR; JOIN_TRAILING_SEPARATORS]);
                encode_control(JOIN, &body, dst)
            }
        }
    }

    /// Encode this frame into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }
}

/// The fixed connect frame.
pub fn encode_connect() -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + CONNECT_BODY.len());
    put_control(CONNECT, CONNECT_BODY, &mut buf);
    buf.freeze()
}

/// The join frame for `channel_no`.
///
/// Fails with [`FrameError::EmptyChannel`] when `channel_no` is empty, which
/// only happens if resolution produced a malformed endpoint.
pub fn encode_join(channel_no: &str) -> Result<Bytes> {
    ControlFrame::join(channel_no).to_bytes()
}

/// The fixed keepalive frame.
pub fn encode_ping() -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + PING_BODY.len());
    put_control(PING, PING_BODY, &mut buf);
    buf.freeze()
}

/// Encode an arbitrary control frame.
///
/// Wire format:
/// ```text
/// ┌───────────┬──────────┬─────────────┬──────────┬──────────────────┐
/// │ Escape    │ Command  │ Body length │ Option   │ Body             │
/// │ 0x1B 0x09 │ 4 digits │ 6 digits    │ "00"     │ FF-separated     │
/// └───────────┴──────────┴─────────────┴──────────┴──────────────────┘
/// ```
pub fn encode_control(command: u16, body: &[u8], dst: &mut BytesMut) -> Result<()> {
    if command > MAX_COMMAND {
        return Err(FrameError::InvalidCommand(command));
    }
    if body.len() > MAX_BODY_LEN {
        return Err(FrameError::PayloadTooLarge {
            size: body.len(),
            max: MAX_BODY_LEN,
        });
    }
    put_control(command, body, dst);
    Ok(())
}

fn put_control(command: u16, body: &[u8], dst: &mut BytesMut) {
    dst.reserve(HEADER_SIZE + body.len());
    dst.put_slice(&ESCAPE);
    dst.put_slice(format!("{command:04}{:06}", body.len()).as_bytes());
    dst.put_slice(DEFAULT_OPTION);
    dst.put_slice(body);
}

/// Header recovered from the first segment of a decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub command: u16,
    pub body_len: usize,
    pub option: u8,
}

impl FrameHeader {
    /// Parse the escape-prefixed header at the start of `segment`.
    ///
    /// Returns `None` when the segment does not start with a well-formed header.
    pub fn parse(segment: &str) -> Option<Self> {
        let rest = segment.as_bytes().strip_prefix(&ESCAPE[..])?;
        let digits = rest.get(..HEADER_SIZE - ESCAPE.len())?;
        if !digits.iter().all(u8::is_ascii_digit) {
            return None;
        }
        // All ASCII digits, so the slices below are valid UTF-8.
        let text = std::str::from_utf8(digits).ok()?;
        Some(Self {
            command: text[0..4].parse().ok()?,
            body_len: text[4..10].parse().ok()?,
            option: text[10..12].parse().ok()?,
        })
    }
}

/// Ordered, UTF-8 decoded segments of one inbound frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameFields {
    segments: Vec<String>,
}

impl FrameFields {
    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    /// Header carried by the first segment, if any.
    pub fn header(&self) -> Option<FrameHeader> {
        self.get(0).and_then(FrameHeader::parse)
    }
}

impl From<Vec<String>> for FrameFields {
    fn from(segments: Vec<String>) -> Self {
        Self { segments }
    }
}

/// Split `raw` on the field separator and decode each segment as UTF-8.
///
/// An empty input yields a single empty segment. Any segment that is not valid
/// UTF-8 fails the whole frame.
pub fn decode_frame(raw: &[u8]) -> Result<FrameFields> {
    let segments = raw
        .split(|byte| *byte == FIELD_SEPARATOR)
        .enumerate()
        .map(|(index, part)| {
            std::str::from_utf8(part)
                .map(str::to_owned)
                .map_err(|source| FrameError::InvalidUtf8 { index, source })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(FrameFields { segments })
}
