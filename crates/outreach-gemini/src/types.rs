// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! generateContent request/response types.

use outreach_core::{ChatRole, HistoryTurn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub status: String,
    pub message: String,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().map(|p| p.text.as_str()).collect();
        Some(text).filter(|t| !t.trim().is_empty())
    }
}

fn role_name(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "model",
    }
}

/// Builds the request for one reply.
///
/// The current message goes last as a user turn. Consecutive turns with the
/// same role are merged, since the API expects roles to alternate.
pub fn build_request(system_instruction: &str, history: &[HistoryTurn], message: &str) -> GenerateRequest {
    let mut contents: Vec<Content> = Vec::with_capacity(history.len() + 1);
    let turns = history
        .iter()
        .map(|turn| (role_name(turn.role), turn.content.as_str()))
        .chain(std::iter::once(("user", message)));

    for (role, text) in turns {
        match contents.last_mut() {
            Some(last) if last.role.as_deref() == Some(role) => {
                if let Some(part) = last.parts.first_mut() {
                    part.text.push('\n');
                    part.text.push_str(text);
                }
            }
            _ => contents.push(Content {
                role: Some(role.to_string()),
                parts: vec![Part {
                    text: text.to_string(),
                }],
            }),
        }
    }

    let system_instruction = Some(system_instruction.trim())
        .filter(|s| !s.is_empty())
        .map(|text| Content {
            role: None,
            parts: vec![Part {
                text: text.to_string(),
            }],
        });

    GenerateRequest {
        system_instruction,
        contents,
    }
}
