//! HTTP client for the queue server
//!
//! The spectator uses it as a [`DirectiveTransport`]; the performer CLI uses
//! the push and token calls.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tempra_core::{EntryId, ForceDirective, QueueEntry, TempraError, TempraResult, Token};
use tempra_queue::DirectiveTransport;

/// `GET /api/data/:token` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollResponse {
    pub entries: Vec<QueueEntry>,
}

/// `POST /api/data/:token` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushResponse {
    pub ok: bool,
    pub id: EntryId,
    pub queued: usize,
}

/// `POST /api/token` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: Token,
}

/// `POST /api/ack/:token` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckRequest {
    #[serde(rename = "forceId", alias = "id")]
    pub force_id: EntryId,
}

/// Client for one queue server
#[derive(Clone, Debug)]
pub struct HttpClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> TempraResult<Self> {
        Self::with_timeout(base_url, Duration::from_secs(5))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> TempraResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport_error)?;
        Ok(HttpClient {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn create_token(&self) -> TempraResult<Token> {
        let response = self
            .client
            .post(format!("{}/api/token", self.base_url))
            .send()
            .await
            .map_err(transport_error)?;
        let body: TokenResponse = decode(response, None).await?;
        Ok(body.token)
    }

    /// Performer push
    pub async fn push(
        &self,
        token: &Token,
        directive: &ForceDirective,
    ) -> TempraResult<PushResponse> {
        let response = self
            .client
            .post(format!("{}/api/data/{}", self.base_url, token))
            .json(&serde_json::json!({ "force": directive }))
            .send()
            .await
            .map_err(transport_error)?;
        decode(response, Some(token)).await
    }
}

#[async_trait]
impl DirectiveTransport for HttpClient {
    async fn fetch(&self, token: &Token) -> TempraResult<Vec<QueueEntry>> {
        let response = self
            .client
            .get(format!("{}/api/data/{}", self.base_url, token))
            .send()
            .await
            .map_err(transport_error)?;
        let body: PollResponse = decode(response, Some(token)).await?;
        Ok(body.entries)
    }

    async fn ack(&self, token: &Token, id: &EntryId) -> TempraResult<()> {
        let response = self
            .client
            .post(format!("{}/api/ack/{}", self.base_url, token))
            .json(&AckRequest { force_id: id.clone() })
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(TempraError::TransportError(format!(
                "ack returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    token: Option<&Token>,
) -> TempraResult<T> {
    let status = response.status();
    if status.is_success() {
        return response.json().await.map_err(transport_error);
    }

    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| status.to_string());

    match (status, token) {
        (StatusCode::NOT_FOUND, Some(token)) => Err(TempraError::TokenNotFound(token.clone())),
        (StatusCode::BAD_REQUEST, _) => Err(TempraError::InvalidDirective(message)),
        _ => Err(TempraError::TransportError(message)),
    }
}

fn transport_error(e: reqwest::Error) -> TempraError {
    TempraError::TransportError(e.to_string())
}
