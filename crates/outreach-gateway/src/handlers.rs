// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the `/v1` REST API.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use outreach_campaign::BatchSummary;
use outreach_core::{
    Agent, BatchCallRecord, BatchCallRequest, BatchStats, ConversationRecord, MessageLogEntry,
    OutreachError, Recipient,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::server::GatewayState;

type ApiResult<T> = Result<T, ApiError>;

const DEFAULT_HISTORY_LIMIT: usize = 50;
const MAX_HISTORY_LIMIT: usize = 500;

/// Request body for `POST /v1/groups/{group_id}/batch`.
#[derive(Debug, Deserialize)]
pub struct StartBatchRequest {
    pub call_name: String,
    pub recipients: Vec<Recipient>,
    /// Phone number to call from. Empty falls back to the configured default.
    #[serde(default)]
    pub agent_phone_id: String,
    #[serde(default)]
    pub scheduled_time: Option<DateTime<Utc>>,
    /// Opaque caller data stored on the batch record.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub batch: BatchCallRecord,
    pub stats: BatchStats,
}

#[derive(Debug, Serialize)]
pub struct BatchListResponse {
    pub batches: Vec<BatchSummary>,
}

#[derive(Debug, Deserialize)]
pub struct AgentRequest {
    /// Generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub system_instruction: String,
    #[serde(default)]
    pub language: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub owner_id: String,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct AgentListResponse {
    pub agents: Vec<Agent>,
}

#[derive(Debug, Deserialize)]
pub struct BindAgentRequest {
    pub agent_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationRecord>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub conversation: ConversationRecord,
    /// Most recent log entries, oldest first.
    pub history: Vec<MessageLogEntry>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub contact_id: String,
    pub dropped_sessions: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub active_monitors: usize,
}

/// GET /health
pub async fn get_public_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        active_monitors: state.campaigns.monitor().active_count(),
    })
}

fn batch_response(state: &GatewayState, batch: BatchCallRecord) -> BatchResponse {
    let stats = state.campaigns.tracker().stats_for(&batch);
    BatchResponse { batch, stats }
}

/// POST /v1/groups/{group_id}/batch
pub async fn start_batch(
    State(state): State<GatewayState>,
    Path(group_id): Path<String>,
    Json(body): Json<StartBatchRequest>,
) -> ApiResult<(StatusCode, Json<BatchResponse>)> {
    let request = BatchCallRequest {
        group_id,
        call_name: body.call_name,
        recipients: body.recipients,
        agent_phone_id: body.agent_phone_id,
        scheduled_time: body.scheduled_time,
    };
    let record = state.campaigns.start(request, body.metadata).await?;
    Ok((StatusCode::CREATED, Json(batch_response(&state, record))))
}

/// GET /v1/groups/{group_id}/batch
///
/// A group that was never called answers with `has_been_called: false`.
pub async fn get_batch(
    State(state): State<GatewayState>,
    Path(group_id): Path<String>,
) -> ApiResult<Json<BatchStats>> {
    Ok(Json(state.campaigns.stats(&group_id).await?))
}

/// POST /v1/groups/{group_id}/batch/cancel
pub async fn cancel_batch(
    State(state): State<GatewayState>,
    Path(group_id): Path<String>,
) -> ApiResult<Json<BatchResponse>> {
    let record = state.campaigns.cancel(&group_id).await?;
    Ok(Json(batch_response(&state, record)))
}

/// POST /v1/groups/{group_id}/batch/retry
pub async fn retry_batch(
    State(state): State<GatewayState>,
    Path(group_id): Path<String>,
) -> ApiResult<(StatusCode, Json<BatchResponse>)> {
    let record = state.campaigns.retry(&group_id).await?;
    Ok((StatusCode::CREATED, Json(batch_response(&state, record))))
}

/// POST /v1/groups/{group_id}/batch/refresh
pub async fn refresh_batch(
    State(state): State<GatewayState>,
    Path(group_id): Path<String>,
) -> ApiResult<Json<BatchResponse>> {
    let record = state.campaigns.refresh(&group_id).await?;
    Ok(Json(batch_response(&state, record)))
}

/// GET /v1/batches
pub async fn list_batches(State(state): State<GatewayState>) -> ApiResult<Json<BatchListResponse>> {
    Ok(Json(BatchListResponse {
        batches: state.campaigns.list().await?,
    }))
}

/// POST /v1/agents
pub async fn save_agent(
    State(state): State<GatewayState>,
    Json(body): Json<AgentRequest>,
) -> ApiResult<Json<Agent>> {
    if body.name.trim().is_empty() {
        return Err(OutreachError::InvalidInput("agent name must not be empty".into()).into());
    }
    let now = Utc::now();
    let agent = Agent {
        id: body
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        name: body.name,
        system_instruction: body.system_instruction,
        language: body.language,
        is_active: body.is_active,
        owner_id: body.owner_id,
        created_at: now,
        updated_at: now,
    };
    Ok(Json(state.registry.save_agent(agent).await?))
}

/// GET /v1/agents
pub async fn list_agents(State(state): State<GatewayState>) -> ApiResult<Json<AgentListResponse>> {
    Ok(Json(AgentListResponse {
        agents: state.registry.agents().await?,
    }))
}

/// GET /v1/conversations
pub async fn list_conversations(
    State(state): State<GatewayState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ConversationListResponse>> {
    let limit = query.limit.unwrap_or(100).min(1000) as i64;
    Ok(Json(ConversationListResponse {
        conversations: state.registry.list(limit).await?,
    }))
}

/// GET /v1/conversations/{contact_id}
pub async fn get_conversation(
    State(state): State<GatewayState>,
    Path(contact_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ConversationResponse>> {
    let conversation = state
        .registry
        .get(&contact_id)
        .await?
        .ok_or_else(|| OutreachError::ConversationNotFound {
            contact_id: contact_id.clone(),
        })?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);
    let history = state.registry.history(&contact_id, limit).await?;
    Ok(Json(ConversationResponse {
        conversation,
        history,
    }))
}

/// POST /v1/conversations/{contact_id}/agent
pub async fn bind_agent(
    State(state): State<GatewayState>,
    Path(contact_id): Path<String>,
    Json(body): Json<BindAgentRequest>,
) -> ApiResult<Json<ConversationRecord>> {
    Ok(Json(
        state.registry.bind_agent(&contact_id, &body.agent_id).await?,
    ))
}

/// POST /v1/conversations/{contact_id}/messages
pub async fn send_message(
    State(state): State<GatewayState>,
    Path(contact_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<MessageLogEntry>)> {
    let sender = state.sender.as_ref().ok_or_else(|| OutreachError::Transport {
        message: "no messaging transport is configured".into(),
        source: None,
    })?;
    let entry = sender.send(&contact_id, &body.text).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// POST /v1/conversations/{contact_id}/reset
pub async fn reset_conversation(
    State(state): State<GatewayState>,
    Path(contact_id): Path<String>,
) -> Json<ResetResponse> {
    let dropped_sessions = state.router.reset_session(&contact_id);
    Json(ResetResponse {
        contact_id,
        dropped_sessions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_request_defaults_optional_fields() {
        let req: StartBatchRequest = serde_json::from_value(serde_json::json!({
            "call_name": "spring launch",
            "recipients": [{"contact_id": "+15550001"}]
        }))
        .unwrap();
        assert!(req.agent_phone_id.is_empty());
        assert!(req.scheduled_time.is_none());
        assert!(req.metadata.is_null());
        assert_eq!(req.recipients[0].name, None);
    }

    #[test]
    fn agent_request_is_active_by_default() {
        let req: AgentRequest = serde_json::from_value(serde_json::json!({
            "name": "Sales",
            "system_instruction": "Be brief."
        }))
        .unwrap();
        assert!(req.is_active);
        assert!(req.id.is_none());
    }

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
            uptime_secs: 42,
            active_monitors: 2,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"uptime_secs\":42"));
        assert!(json.contains("\"active_monitors\":2"));
    }
}
