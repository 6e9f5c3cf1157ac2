// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use outreach_bus::EventBus;
use outreach_campaign::CampaignService;
use outreach_config::model::GatewayConfig;
use outreach_core::OutreachError;
use outreach_session::{ConversationRegistry, OutboundSender, SessionRouter};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;
use crate::sse;
use crate::webhook::{self, WebhookConfig};

/// State for the unauthenticated health endpoint.
#[derive(Clone)]
pub struct HealthState {
    pub start_time: std::time::Instant,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            start_time: std::time::Instant::now(),
        }
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub campaigns: Arc<CampaignService>,
    pub registry: Arc<ConversationRegistry>,
    pub router: Arc<SessionRouter>,
    /// Outbound delivery. `None` when no messaging transport is configured.
    pub sender: Option<Arc<OutboundSender>>,
    pub bus: Arc<EventBus>,
    pub auth: AuthConfig,
    pub webhook: WebhookConfig,
    pub health: HealthState,
}

/// Builds the full route table.
///
/// - `GET /health` (public)
/// - `/v1/*` (bearer auth)
/// - `GET|POST /webhooks/whatsapp` (verify token / signature)
pub fn build_router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route(
            "/v1/groups/{group_id}/batch",
            post(handlers::start_batch).get(handlers::get_batch),
        )
        .route("/v1/groups/{group_id}/batch/cancel", post(handlers::cancel_batch))
        .route("/v1/groups/{group_id}/batch/retry", post(handlers::retry_batch))
        .route("/v1/groups/{group_id}/batch/refresh", post(handlers::refresh_batch))
        .route("/v1/batches", get(handlers::list_batches))
        .route(
            "/v1/agents",
            post(handlers::save_agent).get(handlers::list_agents),
        )
        .route("/v1/conversations", get(handlers::list_conversations))
        .route("/v1/conversations/{contact_id}", get(handlers::get_conversation))
        .route("/v1/conversations/{contact_id}/agent", post(handlers::bind_agent))
        .route("/v1/conversations/{contact_id}/messages", post(handlers::send_message))
        .route("/v1/conversations/{contact_id}/reset", post(handlers::reset_conversation))
        .route("/v1/events", get(sse::events))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state.clone());

    let webhook_routes = Router::new()
        .route(
            "/webhooks/whatsapp",
            get(webhook::verify).post(webhook::receive),
        )
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(webhook_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds to the configured host:port and serves until `shutdown` fires.
pub async fn start_server(
    config: &GatewayConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), OutreachError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| OutreachError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| OutreachError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
