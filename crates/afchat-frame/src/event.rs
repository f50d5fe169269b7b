//! Chat events and the chat-vs-control classifier.
//!
//! The protocol has no message-type discriminator for server pushes, so chat
//! is told apart from control traffic by content alone:
//! - frames with fewer than [`MIN_CHAT_FIELDS`] segments are not chat
//! - a comment equal to `"-1"` or `"1"` is a server acknowledgement
//! - a comment containing `|` is a presence/ack message
//! - a comment containing `fw=` is a forwarding control message
//!
//! New server message shapes may be misclassified.

use std::fmt;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::codec::FrameFields;

/// Segment index of the comment text.
pub const COMMENT_INDEX: usize = 1;
/// Segment index of the sender id.
pub const USER_ID_INDEX: usize = 2;
/// Segment index of the sender nickname.
pub const NICKNAME_INDEX: usize = 6;
/// Minimum segment count of a chat frame.
pub const MIN_CHAT_FIELDS: usize = NICKNAME_INDEX + 1;

const ACK_COMMENTS: [&str; 2] = ["-1", "1"];
const PRESENCE_MARKER: char = '|';
const FORWARD_MARKER: &str = "fw=";

/// A decoded chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatEvent {
    pub timestamp: DateTime<Local>,
    pub nickname: String,
    pub user_id: String,
    pub comment: String,
}

impl fmt::Display for ChatEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}[{}] - {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.nickname,
            self.user_id,
            self.comment
        )
    }
}

/// Classify decoded fields, stamping the event with the current local time.
pub fn classify_chat_event(fields: &FrameFields) -> Option<ChatEvent> {
    classify_chat_event_at(fields, Local::now())
}

/// Classify decoded fields, stamping the event with `timestamp`.
///
/// Returns `None` when the frame is control traffic rather than chat.
pub fn classify_chat_event_at(
    fields: &FrameFields,
    timestamp: DateTime<Local>,
) -> Option<ChatEvent> {
    if fields.len() < MIN_CHAT_FIELDS {
        return None;
    }
    let comment = fields.get(COMMENT_INDEX)?;
    if is_control_comment(comment) {
        return None;
    }

    Some(ChatEvent {
        timestamp,
        nickname: fields.get(NICKNAME_INDEX)?.to_string(),
        user_id: fields.get(USER_ID_INDEX)?.to_string(),
        comment: comment.to_string(),
    })
}

fn is_control_comment(comment: &str) -> bool {
    ACK_COMMENTS.contains(&comment)
        || comment.contains(PRESENCE_MARKER)
        || comment.contains(FORWARD_MARKER)
}
