use afchat_transport::ChatTarget;
use serde::Serialize;

use crate::broadcast::BroadcastRef;

/// Chat connection details resolved for one broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatEndpoint {
    /// Chat server host, lowercased.
    pub chat_domain: String,
    /// Channel joined after connecting.
    pub chat_channel_no: String,
    /// Opaque token reported alongside the channel.
    pub title_token: String,
    /// Broadcast title as reported, not sanitized.
    pub title: String,
    /// Broadcaster id as reported by the API.
    pub broadcaster_id: String,
    /// Control port: the reported port plus one.
    pub chat_port: u16,
}

impl ChatEndpoint {
    /// Transport target for this endpoint.
    ///
    /// The websocket path uses the broadcaster id from the broadcast URL.
    pub fn target(&self, broadcast: &BroadcastRef) -> ChatTarget {
        ChatTarget::new(
            self.chat_domain.clone(),
            self.chat_port,
            broadcast.broadcaster_id(),
        )
    }
}
