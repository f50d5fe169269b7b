use std::fmt;

use url::Url;

use crate::error::UrlError;

/// Identifies a broadcast: the last two path segments of its player URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BroadcastRef {
    broadcaster_id: String,
    broadcast_no: String,
}

impl BroadcastRef {
    /// Build a reference from already-known parts.
    pub fn new(
        broadcaster_id: impl Into<String>,
        broadcast_no: impl Into<String>,
    ) -> Result<Self, UrlError> {
        let broadcaster_id = broadcaster_id.into();
        let broadcast_no = broadcast_no.into();
        if broadcaster_id.is_empty() || broadcast_no.is_empty() {
            return Err(UrlError::MissingSegments(format!(
                "{broadcaster_id}/{broadcast_no}"
            )));
        }
        Ok(Self {
            broadcaster_id,
            broadcast_no,
        })
    }

    /// Parse a player URL such as `https://play.afreecatv.com/bjid/123456`.
    ///
    /// A missing scheme is tolerated. Query, fragment and empty path
    /// segments (trailing slash) are ignored.
    pub fn parse(input: &str) -> Result<Self, UrlError> {
        let trimmed = input.trim();
        let url = match Url::parse(trimmed) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{trimmed}"))
                .map_err(|err| unparseable(trimmed, err))?,
            Err(err) => return Err(unparseable(trimmed, err)),
        };

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            [.., broadcaster_id, broadcast_no] => Ok(Self {
                broadcaster_id: (*broadcaster_id).to_string(),
                broadcast_no: (*broadcast_no).to_string(),
            }),
            _ => Err(UrlError::MissingSegments(trimmed.to_string())),
        }
    }

    pub fn broadcaster_id(&self) -> &str {
        &self.broadcaster_id
    }

    pub fn broadcast_no(&self) -> &str {
        &self.broadcast_no
    }
}

impl fmt::Display for BroadcastRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.broadcaster_id, self.broadcast_no)
    }
}

fn unparseable(input: &str, err: url::ParseError) -> UrlError {
    UrlError::Unparseable {
        input: input.to_string(),
        reason: err.to_string(),
    }
}
