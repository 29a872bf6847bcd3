use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::MaxConfig;
use crate::error::PlatformError;
use crate::platform::{BotIdentity, IncomingMessage, Platform, ReplyRequest, Update, UpdateBatch};
use crate::scope::Scope;

/// MAX rejects message bodies longer than this many characters.
pub const MAX_TEXT_LEN: usize = 4000;

/// Extra time the HTTP client waits beyond the long-poll timeout before giving up.
const POLL_GRACE: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct RawBotInfo {
    user_id: i64,
    #[serde(default)]
    name: String,
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUpdates {
    #[serde(default)]
    updates: Vec<Value>,
    marker: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    sender: Option<RawUser>,
    recipient: RawRecipient,
    body: Option<RawBody>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    user_id: i64,
}

#[derive(Debug, Deserialize)]
struct RawRecipient {
    chat_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawBody {
    text: Option<String>,
}

/// HTTP client for the MAX Bot API.
///
/// `reqwest::Client` pools connections and is safe to share, so one
/// `MaxClient` serves every worker.
pub struct MaxClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    poll_timeout_secs: u64,
    poll_limit: u32,
}

impl MaxClient {
    /// Build a client. No request is made until the first call.
    pub fn connect(config: &MaxConfig) -> Result<Self, PlatformError> {
        if config.token.trim().is_empty() {
            return Err(PlatformError::Auth("bot token is empty".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs) + POLL_GRACE)
            .build()
            .map_err(|e| PlatformError::Transient(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            poll_timeout_secs: config.poll_timeout_secs,
            poll_limit: config.poll_limit,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PlatformError> {
        let url = self.url(path);
        debug!("Sending request to MAX: GET {}", url);

        let response = self
            .http
            .get(&url)
            .header("Authorization", &self.token)
            .query(query)
            .send()
            .await
            .map_err(|e| PlatformError::Transient(format!("GET /{}: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify(
                status,
                format!("GET /{} ({}): {}", path, status, body),
                PlatformError::Transient,
            ));
        }

        response.json().await.map_err(|e| {
            PlatformError::Transient(format!("failed to parse /{} response: {}", path, e))
        })
    }
}

/// 401/403 mean the token is bad; anything else goes through `otherwise`.
fn classify(
    status: StatusCode,
    detail: String,
    otherwise: fn(String) -> PlatformError,
) -> PlatformError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        PlatformError::Auth(detail)
    } else {
        otherwise(detail)
    }
}

/// Narrow one raw MAX update to the bot's `Update` model.
fn parse_update(raw: Value) -> Update {
    let tag = raw
        .get("update_type")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    if tag != "message_created" {
        return Update::Other(tag);
    }

    let message = raw
        .get("message")
        .cloned()
        .map(serde_json::from_value::<RawMessage>);

    match message {
        Some(Ok(RawMessage {
            sender: Some(sender),
            recipient: RawRecipient {
                chat_id: Some(chat_id),
            },
            body,
        })) => Update::MessageCreated(IncomingMessage {
            sender_id: sender.user_id,
            chat_id,
            text: body.and_then(|b| b.text).unwrap_or_default(),
        }),
        other => {
            warn!("Undecodable message_created payload: {:?}", other.map(|r| r.err()));
            Update::Other("message_created(undecodable)".to_string())
        }
    }
}

/// Cut `text` to at most `max_chars` characters, on a char boundary.
fn clamp_text(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[async_trait]
impl Platform for MaxClient {
    async fn fetch_identity(&self, scope: &Scope) -> Result<BotIdentity, PlatformError> {
        let info: RawBotInfo = scope.run(self.get_json("me", &[])).await??;
        Ok(BotIdentity {
            user_id: info.user_id,
            name: info.name,
            username: info.username,
        })
    }

    async fn poll_updates(
        &self,
        scope: &Scope,
        marker: Option<i64>,
    ) -> Result<UpdateBatch, PlatformError> {
        let mut query = vec![
            ("limit", self.poll_limit.to_string()),
            ("timeout", self.poll_timeout_secs.to_string()),
        ];
        if let Some(marker) = marker {
            query.push(("marker", marker.to_string()));
        }

        let raw: RawUpdates = scope.run(self.get_json("updates", &query)).await??;
        Ok(UpdateBatch {
            updates: raw.updates.into_iter().map(parse_update).collect(),
            marker: raw.marker,
        })
    }

    async fn send(&self, scope: &Scope, reply: &ReplyRequest) -> Result<(), PlatformError> {
        let url = self.url("messages");
        let text = clamp_text(&reply.text, MAX_TEXT_LEN);
        if text.len() < reply.text.len() {
            warn!(
                "Reply to chat {} clamped to {} characters",
                reply.chat_id, MAX_TEXT_LEN
            );
        }

        let request = self
            .http
            .post(&url)
            .header("Authorization", &self.token)
            .query(&[("chat_id", reply.chat_id.to_string())])
            .json(&json!({ "text": text }));

        // Bound by the caller's deadline, not the long-poll client timeout.
        let request = match scope.remaining() {
            Some(remaining) => request.timeout(remaining),
            None => request,
        };

        let response = scope
            .run(request.send())
            .await?
            .map_err(|e| PlatformError::Send(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = scope
                .run(response.text())
                .await?
                .unwrap_or_default();
            return Err(classify(
                status,
                format!("POST /messages ({}): {}", status, body),
                PlatformError::Send,
            ));
        }

        Ok(())
    }
}
