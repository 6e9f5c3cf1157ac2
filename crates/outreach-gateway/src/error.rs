// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of [`OutreachError`] onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use outreach_core::{ErrorKind, OutreachError};
use serde::Serialize;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

#[derive(Debug)]
pub struct ApiError(pub OutreachError);

impl From<OutreachError> for ApiError {
    fn from(err: OutreachError) -> Self {
        Self(err)
    }
}

pub fn status_for(err: &OutreachError) -> StatusCode {
    match err {
        OutreachError::AlreadyInProgress { .. } => StatusCode::CONFLICT,
        OutreachError::NoBatchStarted { .. }
        | OutreachError::AgentNotFound { .. }
        | OutreachError::NoAgentBound { .. }
        | OutreachError::ConversationNotFound { .. } => StatusCode::NOT_FOUND,
        OutreachError::AgentInactive { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        OutreachError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        OutreachError::GenerationFailed { .. } | OutreachError::Transport { .. } => {
            StatusCode::BAD_GATEWAY
        }
        OutreachError::ProviderUnavailable { .. } | OutreachError::Timeout { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        OutreachError::Config(_) | OutreachError::Storage { .. } | OutreachError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, status = %status, "request failed");
        } else {
            tracing::debug!(error = %self.0, status = %status, "request rejected");
        }
        let body = ErrorResponse {
            error: self.0.to_string(),
            kind: self.0.kind(),
        };
        (status, Json(body)).into_response()
    }
}
