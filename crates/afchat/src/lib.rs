//! AfreecaTV chat protocol client.
//!
//! Resolves a broadcast's chat endpoint, joins its chat over a secure
//! websocket, keeps the session alive and records chat to a log file.
//!
//! # Crate Structure
//!
//! - [`frame`]: control-frame encoding, frame decoding and chat classification
//! - [`transport`]: connection seam, `wss://` connector and in-memory pair
//! - [`resolve`]: broadcast URL parsing and live API endpoint resolution
//! - [`session`]: session lifecycle, observers and the chat log

/// Re-export frame types.
pub mod frame {
    pub use afchat_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use afchat_transport::*;
}

/// Re-export resolution types.
pub mod resolve {
    pub use afchat_resolve::*;
}

/// Re-export session types.
pub mod session {
    pub use afchat_session::*;
}
