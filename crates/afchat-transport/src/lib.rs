//! Chat transport abstraction.
//!
//! Provides the seam between the session engine and the wire:
//! - [`TransportConnector`] opens a [`Connection`] to a [`ChatTarget`]
//! - [`FrameSink`] / [`FrameStream`] are its independently driven halves
//! - [`WsConnector`] is the production `wss://` implementation
//! - [`memory::pair`] is an in-process implementation for tests and tooling
//!
//! This is the lowest layer of afchat. Everything else builds on top of it.

pub mod error;
pub mod memory;
pub mod tls;
pub mod traits;
pub mod ws;

pub use error::{Result, TransportError};
pub use tls::TlsVerification;
pub use traits::{ChatTarget, Connection, FrameSink, FrameStream, TransportConnector};
pub use ws::{WsConfig, WsConnector};
