use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::broadcast::BroadcastRef;
use crate::endpoint::ChatEndpoint;
use crate::error::{ResolutionError, Result};

/// Live player API queried for chat endpoints.
pub const DEFAULT_API_URL: &str = "https://live.afreecatv.com/afreeca/player_live_api.php";

const USER_AGENT: &str = concat!("afchat/", env!("CARGO_PKG_VERSION"));

/// Turns a broadcast reference into a chat endpoint.
#[async_trait]
pub trait EndpointResolver: Send + Sync {
    async fn resolve(&self, broadcast: &BroadcastRef) -> Result<ChatEndpoint>;
}

/// Resolves chat endpoints through the public live player API.
#[derive(Debug, Clone)]
pub struct LiveApiResolver {
    client: Client,
    api_url: String,
}

impl LiveApiResolver {
    /// Resolver against [`DEFAULT_API_URL`].
    pub fn new() -> Result<Self> {
        Self::with_api_url(DEFAULT_API_URL)
    }

    /// Resolver against an explicit API URL.
    pub fn with_api_url(api_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(ResolutionError::Client)?;
        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl EndpointResolver for LiveApiResolver {
    async fn resolve(&self, broadcast: &BroadcastRef) -> Result<ChatEndpoint> {
        debug!(%broadcast, api = %self.api_url, "resolving chat endpoint");

        let response = self
            .client
            .post(&self.api_url)
            .query(&[("bjid", broadcast.broadcaster_id())])
            .form(&live_form(broadcast))
            .send()
            .await
            .map_err(ResolutionError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolutionError::Status { status });
        }

        let body = response.bytes().await.map_err(ResolutionError::Request)?;
        let endpoint = parse_live_response(&body)?;
        info!(
            domain = %endpoint.chat_domain,
            port = endpoint.chat_port,
            channel = %endpoint.chat_channel_no,
            "chat endpoint resolved"
        );
        Ok(endpoint)
    }
}

fn live_form(broadcast: &BroadcastRef) -> [(&'static str, &str); 10] {
    [
        ("bid", broadcast.broadcaster_id()),
        ("bno", broadcast.broadcast_no()),
        ("type", "live"),
        ("confirm_adult", "false"),
        ("player_type", "html5"),
        ("mode", "landing"),
        ("from_api", "0"),
        ("pwd", ""),
        ("stream_type", "common"),
        ("quality", "HD"),
    ]
}

/// Extract a [`ChatEndpoint`] from a live player API response body.
///
/// Password-protected, adult-only and offline broadcasts answer without the
/// channel fields and fail with [`ResolutionError::MalformedResponse`].
pub fn parse_live_response(body: &[u8]) -> Result<ChatEndpoint> {
    let document: Value = serde_json::from_slice(body)
        .map_err(|err| ResolutionError::MalformedResponse(format!("invalid json: {err}")))?;
    let channel = document
        .get("CHANNEL")
        .and_then(Value::as_object)
        .ok_or_else(|| ResolutionError::MalformedResponse("missing CHANNEL object".to_string()))?;

    let reported_port = port_field(channel)?;
    let chat_port = reported_port.checked_add(1).ok_or_else(|| {
        ResolutionError::MalformedResponse(format!("CHPT {reported_port} leaves no control port"))
    })?;

    Ok(ChatEndpoint {
        chat_domain: string_field(channel, "CHDOMAIN")?.to_lowercase(),
        chat_channel_no: string_field(channel, "CHATNO")?,
        title_token: string_field(channel, "FTK")?,
        title: string_field(channel, "TITLE")?,
        broadcaster_id: string_field(channel, "BJID")?,
        chat_port,
    })
}

fn string_field(channel: &Map<String, Value>, key: &str) -> Result<String> {
    channel
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| missing_field(channel, key))
}

fn port_field(channel: &Map<String, Value>) -> Result<u16> {
    let port = match channel.get("CHPT") {
        Some(Value::String(text)) => text.trim().parse::<u16>().ok(),
        Some(Value::Number(number)) => number.as_u64().and_then(|n| u16::try_from(n).ok()),
        _ => None,
    };
    port.ok_or_else(|| missing_field(channel, "CHPT"))
}

fn missing_field(channel: &Map<String, Value>, key: &str) -> ResolutionError {
    let message = match channel.get("RESULT") {
        Some(result) => format!("missing or invalid CHANNEL.{key} (RESULT={result})"),
        None => format!("missing or invalid CHANNEL.{key}"),
    };
    ResolutionError::MalformedResponse(message)
}
