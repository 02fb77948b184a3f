//! Request handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tempra_core::{EntryId, ForceDirective, Token};
use tempra_queue::DirectiveStore;
use tracing::{debug, info};

use super::error::ApiResult;
use super::state::AppState;
use crate::{PollResponse, PushResponse, TokenResponse};

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub ok: bool,
    pub removed: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub ok: bool,
    pub version: String,
    pub uptime_secs: i64,
    pub tokens: usize,
    pub queued: usize,
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let stats = state.store.stats();
    Json(StatusResponse {
        ok: true,
        version: state.version.clone(),
        uptime_secs: state.uptime_secs(),
        tokens: stats.tokens,
        queued: stats.queued,
    })
}

pub async fn create_token(State(state): State<AppState>) -> Json<TokenResponse> {
    Json(TokenResponse {
        token: state.store.create_token(),
    })
}

pub async fn delete_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Json<DeleteResponse> {
    let removed = state.store.delete_token(&Token::new(token));
    Json(DeleteResponse { ok: true, removed })
}

/// PUSH: accepts `{force: {...}}` or a bare directive
pub async fn push(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<PushResponse>> {
    let token = Token::new(token);
    let directive = ForceDirective::from_push_body(body)?;
    let mode = directive.mode;
    let (id, queued) = state.push(&token, directive)?;
    info!(%token, %id, %mode, queued, "force pushed");
    Ok(Json(PushResponse { ok: true, id, queued }))
}

/// POLL
pub async fn poll(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<PollResponse>> {
    let entries = state.store.fetch(&Token::new(token))?;
    Ok(Json(PollResponse { entries }))
}

/// ACK: always `{ok: true}`, whatever the token, id or body
pub async fn ack(
    State(state): State<AppState>,
    Path(token): Path<String>,
    body: Option<Json<Value>>,
) -> Json<OkResponse> {
    let id = body.and_then(|Json(value)| {
        value
            .get("forceId")
            .or_else(|| value.get("id"))
            .and_then(Value::as_str)
            .map(EntryId::new)
    });
    if let Some(id) = id {
        let token = Token::new(token);
        let removed = state.store.ack(&token, &id);
        debug!(%token, %id, removed, "ack received");
    }
    Json(OkResponse { ok: true })
}
