// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events stream of bus events for `GET /v1/events`.
//!
//! `?topic=` takes a comma-separated list of topic names; without it every
//! topic is streamed. Each SSE event is named after its topic and carries the
//! JSON-serialized [`BusEvent`]:
//!
//! ```text
//! event: batch_update
//! data: {"type":"batch_update","group_id":"55","batch_id":"batch_12345","stats":{...}}
//! ```

use std::str::FromStr;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use outreach_bus::{BusEvent, Topic};
use outreach_core::OutreachError;
use serde::Deserialize;
use strum::IntoEnumIterator;

use crate::error::ApiError;
use crate::server::GatewayState;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub topic: Option<String>,
}

pub fn parse_topics(raw: Option<&str>) -> Result<Vec<Topic>, OutreachError> {
    let raw = raw.unwrap_or("").trim();
    if raw.is_empty() {
        return Ok(Topic::iter().collect());
    }
    let mut topics = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let topic = Topic::from_str(name)
            .map_err(|_| OutreachError::InvalidInput(format!("unknown topic `{name}`")))?;
        if !topics.contains(&topic) {
            topics.push(topic);
        }
    }
    Ok(topics)
}

fn to_sse(event: &BusEvent) -> Result<Event, axum::Error> {
    Event::default()
        .event(event.topic().to_string())
        .json_data(event)
}

/// GET /v1/events
///
/// Subscriptions are taken before the response is returned, so any event
/// published after the request is accepted is delivered.
pub async fn events(
    State(state): State<GatewayState>,
    Query(query): Query<EventsQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let topics = parse_topics(query.topic.as_deref())?;
    tracing::debug!(topics = ?topics, "event stream opened");

    let streams: Vec<BoxStream<'static, Result<Event, axum::Error>>> = topics
        .into_iter()
        .map(|topic| {
            let subscription = state.bus.subscribe(topic);
            stream::unfold(subscription, |mut subscription| async move {
                let event = subscription.recv().await?;
                Some((to_sse(&event), subscription))
            })
            .boxed()
        })
        .collect();

    Ok(Sse::new(stream::select_all(streams)).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_topic_means_all() {
        assert_eq!(parse_topics(None).unwrap().len(), 4);
        assert_eq!(parse_topics(Some(" ")).unwrap().len(), 4);
    }

    #[test]
    fn topics_are_comma_separated_and_deduplicated() {
        let topics = parse_topics(Some("new_message, batch_update,new_message")).unwrap();
        assert_eq!(topics, vec![Topic::NewMessage, Topic::BatchUpdate]);
    }

    #[test]
    fn unknown_topic_is_invalid() {
        let err = parse_topics(Some("new_message,gossip")).unwrap_err();
        assert!(matches!(err, OutreachError::InvalidInput(_)));
    }
}
