// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cloud API webhook payloads and the subscription handshake.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub phone_number_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub from: String,
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<TextBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextBody {
    pub body: String,
}

/// A text message extracted from a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundText {
    /// Contact identifier in `+<digits>` form.
    pub contact_id: String,
    pub message_id: String,
    pub text: String,
}

impl WebhookPayload {
    /// Text messages in delivery order.
    ///
    /// Changes addressed to a different business number than
    /// `phone_number_id` are skipped. Status callbacks and non-text messages
    /// carry nothing to route and are ignored.
    pub fn text_messages(&self, phone_number_id: Option<&str>) -> Vec<InboundText> {
        let expected = phone_number_id.unwrap_or("").trim();
        self.entry
            .iter()
            .flat_map(|entry| entry.changes.iter())
            .filter(|change| change.field.is_empty() || change.field == "messages")
            .filter(|change| {
                let reported = change
                    .value
                    .metadata
                    .as_ref()
                    .map_or("", |m| m.phone_number_id.as_str());
                expected.is_empty() || reported.is_empty() || reported == expected
            })
            .flat_map(|change| change.value.messages.iter())
            .filter(|message| message.kind == "text")
            .filter_map(|message| {
                let text = message.text.as_ref()?.body.trim();
                let contact_id = contact_id_from_wa(&message.from)?;
                (!text.is_empty()).then(|| InboundText {
                    contact_id,
                    message_id: message.id.clone(),
                    text: text.to_string(),
                })
            })
            .collect()
    }
}

/// `573138539155` -> `+573138539155`. Returns `None` when no digits remain.
pub fn contact_id_from_wa(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    (!digits.is_empty()).then(|| format!("+{digits}"))
}

/// `+57 313 853 9155` -> `573138539155`, the form the Graph API expects.
pub fn wa_id_from_contact(contact_id: &str) -> String {
    contact_id.chars().filter(char::is_ascii_digit).collect()
}

/// Answers the `hub.*` verification handshake.
///
/// Returns the challenge to echo when the mode is `subscribe` and the token
/// matches. An unset or empty expected token never matches.
pub fn verify_subscription(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    expected_token: Option<&str>,
) -> Option<String> {
    let expected = expected_token.filter(|t| !t.is_empty())?;
    let challenge = challenge.filter(|c| !c.is_empty())?;
    (mode == Some("subscribe") && token == Some(expected)).then(|| challenge.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> WebhookPayload {
        serde_json::from_value(serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "WABA_ID",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "metadata": {"display_phone_number": "15550000000", "phone_number_id": "PN_1"},
                        "contacts": [{"profile": {"name": "Ana"}, "wa_id": "573138539155"}],
                        "messages": [
                            {"from": "573138539155", "id": "wamid.A", "timestamp": "1700000000",
                             "type": "text", "text": {"body": "Hola"}},
                            {"from": "573138539155", "id": "wamid.B", "timestamp": "1700000001",
                             "type": "image", "image": {"id": "media-1"}}
                        ]
                    }
                }, {
                    "field": "messages",
                    "value": {
                        "metadata": {"phone_number_id": "PN_OTHER"},
                        "messages": [
                            {"from": "15550001", "id": "wamid.C", "type": "text", "text": {"body": "wrong number"}}
                        ]
                    }
                }]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn extracts_text_for_our_number() {
        let messages = payload().text_messages(Some("PN_1"));
        assert_eq!(
            messages,
            vec![InboundText {
                contact_id: "+573138539155".into(),
                message_id: "wamid.A".into(),
                text: "Hola".into(),
            }]
        );
    }

    #[test]
    fn without_number_filter_everything_text_is_kept() {
        assert_eq!(payload().text_messages(None).len(), 2);
    }

    #[test]
    fn status_callbacks_yield_nothing() {
        let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{"id": "W", "changes": [{"field": "messages", "value": {
                "statuses": [{"id": "wamid.X", "status": "delivered"}]
            }}]}]
        }))
        .unwrap();
        assert!(payload.text_messages(None).is_empty());
    }

    #[test]
    fn contact_id_conversions() {
        assert_eq!(contact_id_from_wa("573138539155").as_deref(), Some("+573138539155"));
        assert_eq!(contact_id_from_wa("n/a"), None);
        assert_eq!(wa_id_from_contact("+57 313 853 9155"), "573138539155");
    }

    #[test]
    fn handshake_requires_matching_token() {
        assert_eq!(
            verify_subscription(Some("subscribe"), Some("tok"), Some("123"), Some("tok")).as_deref(),
            Some("123")
        );
        assert!(verify_subscription(Some("subscribe"), Some("bad"), Some("123"), Some("tok")).is_none());
        assert!(verify_subscription(Some("subscribe"), Some(""), Some("123"), Some("")).is_none());
        assert!(verify_subscription(Some("subscribe"), Some("tok"), Some("123"), None).is_none());
        assert!(verify_subscription(Some("unsubscribe"), Some("tok"), Some("123"), Some("tok")).is_none());
    }
}
