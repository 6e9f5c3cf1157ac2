// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch-calling API request/response types.

use outreach_core::{CallStatus, OutreachError, ProviderSnapshot, RecipientCallState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest {
    pub call_name: String,
    pub agent_id: String,
    pub agent_phone_number_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_time_unix: Option<i64>,
    pub recipients: Vec<SubmitRecipient>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitRecipient {
    pub phone_number: String,
}

/// Batch object returned by submit, get, cancel and retry.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchResponse {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub total_calls_scheduled: Option<u32>,
    #[serde(default)]
    pub recipients: Vec<RecipientResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipientResponse {
    pub phone_number: String,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub detail: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ApiErrorDetail {
    Message { status: String, message: String },
    Text(String),
}

impl std::fmt::Display for ApiErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiErrorDetail::Message { status, message } => write!(f, "{status}: {message}"),
            ApiErrorDetail::Text(text) => f.write_str(text),
        }
    }
}

/// Maps a provider status string onto [`CallStatus`].
///
/// Unknown values are rejected rather than guessed: an unrecognized status
/// must never be mistaken for a terminal one.
pub fn parse_status(raw: &str) -> Result<CallStatus, OutreachError> {
    match raw {
        "pending" | "scheduled" => Ok(CallStatus::Pending),
        "initiated" | "in_progress" => Ok(CallStatus::InProgress),
        "completed" => Ok(CallStatus::Completed),
        "failed" => Ok(CallStatus::Failed),
        "cancelled" | "canceled" => Ok(CallStatus::Cancelled),
        other => Err(OutreachError::ProviderUnavailable {
            message: format!("unrecognized call status '{other}'"),
            source: None,
        }),
    }
}

impl BatchResponse {
    pub fn into_snapshot(self) -> Result<ProviderSnapshot, OutreachError> {
        let status = parse_status(&self.status)?;
        let recipients = self
            .recipients
            .into_iter()
            .map(|recipient| {
                Ok(RecipientCallState {
                    status: parse_status(&recipient.status)?,
                    contact_id: recipient.phone_number,
                })
            })
            .collect::<Result<Vec<_>, OutreachError>>()?;
        Ok(ProviderSnapshot {
            batch_id: self.id,
            status,
            recipients,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_statuses_parse() {
        assert_eq!(parse_status("initiated").unwrap(), CallStatus::InProgress);
        assert_eq!(parse_status("canceled").unwrap(), CallStatus::Cancelled);
        assert_eq!(parse_status("completed").unwrap(), CallStatus::Completed);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = parse_status("finished-ish").unwrap_err();
        assert!(err.is_transient());
        assert!(err.to_string().contains("finished-ish"));
    }

    #[test]
    fn batch_response_converts_to_snapshot() {
        let body = serde_json::json!({
            "id": "batch_12345",
            "status": "in_progress",
            "recipients": [
                {"phone_number": "+15550001", "status": "completed"},
                {"phone_number": "+15550002", "status": "initiated"}
            ]
        });
        let response: BatchResponse = serde_json::from_value(body).unwrap();
        let snapshot = response.into_snapshot().unwrap();
        assert_eq!(snapshot.batch_id, "batch_12345");
        assert_eq!(snapshot.status, CallStatus::InProgress);
        assert_eq!(snapshot.recipients[1].status, CallStatus::InProgress);
    }

    #[test]
    fn error_detail_formats_both_shapes() {
        let structured: ApiErrorResponse = serde_json::from_value(serde_json::json!({
            "detail": {"status": "invalid_agent", "message": "agent not found"}
        }))
        .unwrap();
        assert_eq!(structured.detail.to_string(), "invalid_agent: agent not found");

        let plain: ApiErrorResponse =
            serde_json::from_value(serde_json::json!({"detail": "Not Found"})).unwrap();
        assert_eq!(plain.detail.to_string(), "Not Found");
    }
}
