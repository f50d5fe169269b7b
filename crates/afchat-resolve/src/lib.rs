//! Broadcast URL parsing and chat endpoint resolution.
//!
//! A player URL names a broadcast by its last two path segments. The live
//! player API turns that into the chat server, port and channel to join.

pub mod api;
pub mod broadcast;
pub mod endpoint;
pub mod error;

pub use api::{parse_live_response, EndpointResolver, LiveApiResolver, DEFAULT_API_URL};
pub use broadcast::BroadcastRef;
pub use endpoint::ChatEndpoint;
pub use error::{ResolutionError, ResolutionErrorKind, Result, UrlError};
