// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud webhook endpoints.
//!
//! `GET` answers the subscription handshake. `POST` verifies the body
//! signature when an app secret is configured and routes every inbound text
//! message through the session router, which delivers any reply. Deliveries
//! are acknowledged with 200 even when routing fails, so the platform does
//! not redeliver them.

use std::collections::HashMap;

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use outreach_config::model::WhatsAppConfig;
use outreach_core::ReplyDelivery;
use outreach_whatsapp::{
    InboundText, SIGNATURE_HEADER, WebhookPayload, verify_signature, verify_subscription,
};
use tracing::{debug, error, info, warn};

use crate::error::ErrorResponse;
use crate::server::GatewayState;

#[derive(Clone, Default)]
pub struct WebhookConfig {
    pub app_secret: Option<String>,
    pub verify_token: Option<String>,
    /// Business number this deployment answers for.
    pub phone_number_id: Option<String>,
}

impl From<&WhatsAppConfig> for WebhookConfig {
    fn from(config: &WhatsAppConfig) -> Self {
        Self {
            app_secret: config.app_secret.clone().filter(|s| !s.is_empty()),
            verify_token: config.verify_token.clone().filter(|s| !s.is_empty()),
            phone_number_id: config.phone_number_id.clone(),
        }
    }
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("app_secret", &self.app_secret.as_ref().map(|_| "[redacted]"))
            .field("verify_token", &self.verify_token.as_ref().map(|_| "[redacted]"))
            .field("phone_number_id", &self.phone_number_id)
            .finish()
    }
}

fn forbidden(message: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(ErrorResponse {
            error: message.to_string(),
            kind: None,
        }),
    )
        .into_response()
}

/// GET /webhooks/whatsapp
pub async fn verify(
    State(state): State<GatewayState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let challenge = verify_subscription(
        params.get("hub.mode").map(String::as_str),
        params.get("hub.verify_token").map(String::as_str),
        params.get("hub.challenge").map(String::as_str),
        state.webhook.verify_token.as_deref(),
    );
    match challenge {
        Some(challenge) => {
            info!("whatsapp webhook verified");
            (StatusCode::OK, challenge).into_response()
        }
        None => {
            warn!("whatsapp webhook verification rejected");
            forbidden("invalid webhook verification token")
        }
    }
}

/// POST /webhooks/whatsapp
pub async fn receive(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = state.webhook.app_secret.as_deref() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());
        if !verify_signature(secret, signature, &body) {
            warn!("whatsapp webhook signature mismatch");
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "invalid webhook signature".to_string(),
                    kind: None,
                }),
            )
                .into_response();
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "malformed whatsapp webhook payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("malformed payload: {e}"),
                    kind: None,
                }),
            )
                .into_response();
        }
    };

    let messages = payload.text_messages(state.webhook.phone_number_id.as_deref());
    debug!(count = messages.len(), "whatsapp webhook delivery");
    for message in messages {
        route_inbound(&state, message).await;
    }
    StatusCode::OK.into_response()
}

async fn route_inbound(state: &GatewayState, message: InboundText) {
    let InboundText {
        contact_id,
        message_id,
        text,
    } = message;

    let outcome = match state
        .router
        .handle_inbound_with_id(&contact_id, &text, Some(message_id))
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(contact_id = %contact_id, error = %e, "inbound routing failed");
            return;
        }
    };

    match outcome.delivery {
        Some(ReplyDelivery::Delivered {
            external_message_id,
        }) => {
            debug!(contact_id = %contact_id, external_id = %external_message_id, "reply delivered")
        }
        // The router already logged the failure on the reply's log entry.
        Some(ReplyDelivery::Failed { .. }) => {}
        Some(ReplyDelivery::Pending) => {
            warn!(contact_id = %contact_id, "reply generated but no transport is configured")
        }
        None => {
            debug!(contact_id = %contact_id, kind = ?outcome.error_kind, "inbound message not answered")
        }
    }
}
