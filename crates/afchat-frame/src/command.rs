//! Command codes carried in the frame header.
//!
//! Only the codes this client sends are given meaning here; everything the
//! server pushes is classified by content, not by command.

/// Keepalive.
pub const PING: u16 = 0;

/// Session announcement sent right after the transport opens.
pub const CONNECT: u16 = 1;

/// Join a chat channel.
pub const JOIN: u16 = 2;

/// Chat message pushed by the server.
pub const CHAT: u16 = 5;

/// Largest command code that fits the 4-digit header field.
pub const MAX_COMMAND: u16 = 9999;

/// Returns a human-readable name for a command code.
pub fn command_name(code: u16) -> &'static str {
    match code {
        PING => "PING",
        CONNECT => "CONNECT",
        JOIN => "JOIN",
        CHAT => "CHAT",
        _ => "OTHER",
    }
}
