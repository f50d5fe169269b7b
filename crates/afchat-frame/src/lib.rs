//! Form-feed delimited framing for the AfreecaTV chat protocol.
//!
//! Outgoing control frames carry a fixed header:
//! - ESC TAB escape prefix
//! - a 4-digit command code
//! - a 6-digit zero-padded body length
//! - a 2-digit option field
//!
//! Incoming frames are split on the form-feed separator and classified by
//! content into chat events or control traffic.

pub mod codec;
pub mod command;
pub mod error;
pub mod event;

pub use codec::{
    decode_frame, encode_connect, encode_control, encode_join, encode_ping, ControlFrame,
    FrameFields, FrameHeader, ESCAPE, FIELD_SEPARATOR, HEADER_SIZE, JOIN_OVERHEAD, MAX_BODY_LEN,
};
pub use command::{command_name, CHAT, CONNECT, JOIN, PING};
pub use error::{FrameError, Result};
pub use event::{classify_chat_event, classify_chat_event_at, ChatEvent, MIN_CHAT_FIELDS};
