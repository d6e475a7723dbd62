//! Backend access for chat replies
//!
//! `ReplyFetcher` is the seam the turn controller talks to. `HttpReplyFetcher`
//! is the real implementation: one JSON `POST /api/chat` per turn.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::Error as _, Deserialize, Serialize};
use serde_json::Value;

use crate::error::FetchError;

/// Substituted when the backend answers successfully but without reply text
pub const FALLBACK_REPLY: &str = "I apologize, but I cannot provide a response at the moment.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

/// Successful body of `POST /api/chat`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ChatReply {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
            status: Some("success".to_string()),
        }
    }

    /// Whether the backend supplied usable reply text
    pub fn has_text(&self) -> bool {
        self.response.as_deref().is_some_and(|r| !r.is_empty())
    }

    /// Decode a reply body. Anything but a JSON object is rejected, including
    /// arrays that serde would otherwise map onto the fields by position.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        match serde_json::from_slice(body)? {
            object @ Value::Object(_) => serde_json::from_value(object),
            other => Err(serde_json::Error::custom(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Reply text, or the fixed fallback when the field is absent or empty
    pub fn into_text(self) -> String {
        match self.response {
            Some(text) if !text.is_empty() => text,
            _ => FALLBACK_REPLY.to_string(),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Body of `GET /api/health`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Produces the bot's reply for one user message.
#[async_trait]
pub trait ReplyFetcher: Send + Sync {
    async fn fetch_reply(&self, message: &str) -> Result<ChatReply, FetchError>;
}

#[derive(Clone)]
pub struct HttpReplyFetcher {
    client: Client,
    base_url: String,
}

impl HttpReplyFetcher {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build a fetcher whose transport gives up after `timeout`
    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthStatus, FetchError> {
        let url = format!("{}/api/health", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl ReplyFetcher for HttpReplyFetcher {
    async fn fetch_reply(&self, message: &str) -> Result<ChatReply, FetchError> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { message })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        // Decode separately so a bad body is reported as malformed, not transport
        let body = response.bytes().await?;
        Ok(ChatReply::from_json(&body)?)
    }
}
