// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound routing, agent binding and outbound delivery over real SQLite
//! storage with mock collaborators.

use std::time::Duration;

use outreach_bus::{BusEvent, Topic};
use outreach_campaign::FollowUpHook;
use outreach_config::model::SessionConfig;
use outreach_core::{
    CallStatus, ChatRole, Direction, ErrorKind, MessageLogEntry, OutreachError,
    RecipientCallState, ReplyDelivery,
};
use outreach_session::router::LAST_RESPONSE_AT;
use outreach_session::OutboundFollowUp;
use outreach_test_utils::TestHarness;

const UNBOUND_CONTACT: &str = "+573138539155";

#[tokio::test]
#[tracing_test::traced_test]
async fn unbound_contact_is_logged_but_not_answered() {
    let harness = TestHarness::builder().build().await.unwrap();
    let mut created = harness.bus.subscribe(Topic::NewConversation);
    let mut messages = harness.bus.subscribe(Topic::NewMessage);
    let mut updates = harness.bus.subscribe(Topic::ConversationUpdate);

    let outcome = harness
        .router
        .handle_inbound(UNBOUND_CONTACT, "Hola, quiero información")
        .await
        .unwrap();
    assert!(!outcome.should_respond);
    assert!(outcome.reply_text.is_none());
    assert_eq!(outcome.error_kind, Some(ErrorKind::NoAgentBound));

    let history = harness.registry.history(UNBOUND_CONTACT, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].direction, Direction::Received);
    assert_eq!(history[0].content, "Hola, quiero información");

    let conversation = harness.registry.get(UNBOUND_CONTACT).await.unwrap().unwrap();
    assert!(conversation.bound_agent_id.is_none());
    assert!(conversation.has_started);

    assert!(matches!(created.recv().await, Some(BusEvent::NewConversation { .. })));
    assert!(matches!(messages.recv().await, Some(BusEvent::NewMessage { .. })));
    assert!(matches!(
        updates.recv().await,
        Some(BusEvent::ConversationUpdate { conversation }) if conversation.has_started
    ));
    assert_eq!(harness.generator.call_count().await, 0);
    assert!(logs_contain("inbound message without bound agent"));
}

#[tokio::test]
async fn bound_agent_replies_and_updates_conversation() {
    let harness = TestHarness::builder()
        .with_generator_replies(vec!["¡Hola! ¿En qué te ayudo?".into()])
        .build()
        .await
        .unwrap();
    let agent = harness.create_agent("agent-1", true).await.unwrap();
    harness.registry.bind_agent("+15550100", "agent-1").await.unwrap();

    let outcome = harness.router.handle_inbound("+15550100", "hola").await.unwrap();
    assert!(outcome.should_respond);
    assert_eq!(outcome.reply_text.as_deref(), Some("¡Hola! ¿En qué te ayudo?"));
    assert!(outcome.error_kind.is_none());

    let calls = harness.generator.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].system_instruction, agent.system_instruction);
    assert!(calls[0].history.is_empty());
    assert_eq!(calls[0].message, "hola");

    let history = harness.registry.history("+15550100", 10).await.unwrap();
    let directions: Vec<Direction> = history.iter().map(|e| e.direction).collect();
    assert_eq!(directions, vec![Direction::Received, Direction::Sent]);

    let conversation = harness.registry.get("+15550100").await.unwrap().unwrap();
    assert!(conversation.has_started);
    assert_eq!(
        conversation.last_outbound_text.as_deref(),
        Some("¡Hola! ¿En qué te ayudo?")
    );
    assert!(conversation.extra_state.contains_key(LAST_RESPONSE_AT));
}

#[tokio::test]
async fn delivered_reply_carries_the_transport_message_id() {
    let harness = TestHarness::builder()
        .with_generator_replies(vec!["Claro, te cuento más.".into()])
        .build()
        .await
        .unwrap();
    harness.create_agent("agent-1", true).await.unwrap();
    harness.registry.bind_agent("+15550100", "agent-1").await.unwrap();

    let outcome = harness.router.handle_inbound("+15550100", "hola").await.unwrap();
    let Some(ReplyDelivery::Delivered {
        external_message_id,
    }) = outcome.delivery
    else {
        panic!("expected a delivered reply, got {:?}", outcome.delivery);
    };
    assert_eq!(
        harness.transport.sent_messages().await,
        vec![("+15550100".to_string(), "Claro, te cuento más.".to_string())]
    );

    let history = harness.registry.history("+15550100", 10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(
        history[1].external_message_id.as_deref(),
        Some(external_message_id.as_str())
    );
    assert_eq!(history[1].metadata["delivery"]["state"], "delivered");
}

#[tokio::test]
#[tracing_test::traced_test]
async fn undelivered_reply_is_logged_as_failed() {
    let harness = TestHarness::builder()
        .with_generator_replies(vec!["Claro, te cuento más.".into()])
        .build()
        .await
        .unwrap();
    harness.create_agent("agent-1", true).await.unwrap();
    harness.registry.bind_agent("+15550100", "agent-1").await.unwrap();
    harness.transport.reject("+15550100").await;

    let outcome = harness.router.handle_inbound("+15550100", "hola").await.unwrap();
    assert!(matches!(outcome.delivery, Some(ReplyDelivery::Failed { .. })));
    assert_eq!(harness.transport.sent_count().await, 0);

    let history = harness.registry.history("+15550100", 10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].direction, Direction::Sent);
    assert!(history[1].external_message_id.is_none());
    assert_eq!(history[1].metadata["delivery"]["state"], "failed");
    assert!(history[1].metadata["delivery"]["error"]
        .as_str()
        .is_some_and(|error| error.contains("rejected")));

    let conversation = harness.registry.get("+15550100").await.unwrap().unwrap();
    assert!(conversation.last_outbound_text.is_none());
    assert!(logs_contain("reply delivery failed"));
}

#[tokio::test]
async fn generator_sees_only_the_ten_most_recent_prior_entries() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.create_agent("agent-1", true).await.unwrap();
    harness.registry.bind_agent("+15550100", "agent-1").await.unwrap();

    for i in 0..15 {
        let direction = if i % 2 == 0 {
            Direction::Received
        } else {
            Direction::Sent
        };
        let entry = MessageLogEntry::new("+15550100", direction, format!("message {i}"));
        harness.message_log.append(&entry).await.unwrap();
    }

    harness
        .router
        .handle_inbound("+15550100", "latest question")
        .await
        .unwrap();

    let calls = harness.generator.calls().await;
    let history = &calls[0].history;
    assert_eq!(history.len(), 10);
    assert_eq!(history[0].content, "message 5");
    assert_eq!(history[9].content, "message 14");
    assert_eq!(history[0].role, ChatRole::Assistant);
    assert_eq!(history[9].role, ChatRole::User);
    assert!(history.iter().all(|turn| turn.content != "latest question"));
    assert_eq!(calls[0].message, "latest question");
}

#[tokio::test]
async fn inactive_agent_declines_but_logs() {
    let harness = TestHarness::builder().build().await.unwrap();
    let mut agent = harness.create_agent("agent-1", true).await.unwrap();
    harness.registry.bind_agent("+15550100", "agent-1").await.unwrap();

    agent.is_active = false;
    harness.storage.upsert_agent(&agent).await.unwrap();

    let outcome = harness.router.handle_inbound("+15550100", "hi").await.unwrap();
    assert_eq!(outcome.error_kind, Some(ErrorKind::AgentInactive));
    assert!(!outcome.should_respond);
    assert_eq!(harness.registry.history("+15550100", 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn binding_requires_an_existing_active_agent() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.create_agent("sleepy", false).await.unwrap();

    let err = harness
        .registry
        .bind_agent("+15550100", "missing")
        .await
        .unwrap_err();
    assert!(matches!(err, OutreachError::AgentNotFound { .. }));

    let err = harness
        .registry
        .bind_agent("+15550100", "sleepy")
        .await
        .unwrap_err();
    assert!(matches!(err, OutreachError::AgentInactive { .. }));
    assert!(harness.registry.get("+15550100").await.unwrap().is_none());
}

#[tokio::test]
async fn generation_failure_records_no_reply() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.create_agent("agent-1", true).await.unwrap();
    harness.registry.bind_agent("+15550100", "agent-1").await.unwrap();
    harness.generator.fail_next().await;

    let outcome = harness.router.handle_inbound("+15550100", "hi").await.unwrap();
    assert_eq!(outcome.error_kind, Some(ErrorKind::GenerationFailed));

    let history = harness.registry.history("+15550100", 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].direction, Direction::Received);
    let conversation = harness.registry.get("+15550100").await.unwrap().unwrap();
    assert!(conversation.has_started);
    assert!(conversation.last_outbound_text.is_none());
    assert!(!conversation.extra_state.contains_key(LAST_RESPONSE_AT));
}

#[tokio::test]
async fn slow_generation_times_out() {
    let harness = TestHarness::builder()
        .with_session_config(SessionConfig {
            generation_timeout_secs: 1,
            ..SessionConfig::default()
        })
        .build()
        .await
        .unwrap();
    harness.create_agent("agent-1", true).await.unwrap();
    harness.registry.bind_agent("+15550100", "agent-1").await.unwrap();
    harness.generator.set_delay(Duration::from_secs(5)).await;

    let outcome = harness.router.handle_inbound("+15550100", "hi").await.unwrap();
    assert_eq!(outcome.error_kind, Some(ErrorKind::GenerationFailed));
    assert_eq!(harness.registry.history("+15550100", 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn rebinding_drops_warm_sessions() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.create_agent("agent-1", true).await.unwrap();
    harness.create_agent("agent-2", true).await.unwrap();
    harness.registry.bind_agent("+15550100", "agent-1").await.unwrap();
    harness.registry.bind_agent("+15550200", "agent-1").await.unwrap();

    harness.router.handle_inbound("+15550100", "hi").await.unwrap();
    harness.router.handle_inbound("+15550200", "hi").await.unwrap();
    assert_eq!(harness.registry.sessions().len(), 2);

    let record = harness.registry.bind_agent("+15550100", "agent-2").await.unwrap();
    assert_eq!(record.bound_agent_id.as_deref(), Some("agent-2"));
    assert_eq!(harness.registry.sessions().len(), 1);

    assert_eq!(harness.router.reset_session("+15550200"), 1);
    assert!(harness.registry.sessions().is_empty());
}

#[tokio::test]
async fn rebound_contact_is_answered_by_the_new_agent() {
    let harness = TestHarness::builder()
        .with_generator_replies(vec!["from A".into(), "from B".into()])
        .build()
        .await
        .unwrap();
    harness
        .create_agent_with_instruction("agent-a", "You are agent A.", true)
        .await
        .unwrap();
    harness
        .create_agent_with_instruction("agent-b", "You are agent B.", true)
        .await
        .unwrap();

    harness.registry.bind_agent("+15550100", "agent-a").await.unwrap();
    let first = harness.router.handle_inbound("+15550100", "hola").await.unwrap();
    assert_eq!(first.reply_text.as_deref(), Some("from A"));

    harness.registry.bind_agent("+15550100", "agent-b").await.unwrap();
    let second = harness.router.handle_inbound("+15550100", "¿sigues ahí?").await.unwrap();
    assert_eq!(second.reply_text.as_deref(), Some("from B"));

    let calls = harness.generator.calls().await;
    assert_eq!(calls.len(), 2);
    assert!(calls[0].system_instruction.contains("agent A"));
    assert!(calls[1].system_instruction.contains("agent B"));
    assert!(!calls[1].system_instruction.contains("agent A"));

    let history = harness.registry.history("+15550100", 10).await.unwrap();
    let replies: Vec<_> = history
        .iter()
        .filter(|entry| entry.direction == Direction::Sent)
        .map(|entry| entry.metadata["agent_id"].clone())
        .collect();
    assert_eq!(replies, vec![serde_json::json!("agent-a"), serde_json::json!("agent-b")]);
}

#[tokio::test]
async fn outbound_send_is_logged_with_transport_id() {
    let harness = TestHarness::builder().build().await.unwrap();
    let entry = harness.sender.send("+15550100", "Thanks for your time").await.unwrap();

    assert_eq!(entry.direction, Direction::Sent);
    let external_id = entry.external_message_id.clone().unwrap();
    assert!(external_id.starts_with("wamid.mock-"));
    assert_eq!(harness.transport.sent_count().await, 1);

    let history = harness.registry.history("+15550100", 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, entry.id);
    assert_eq!(history[0].external_message_id.as_deref(), Some(external_id.as_str()));
    let conversation = harness.registry.get("+15550100").await.unwrap().unwrap();
    assert!(conversation.has_started);
    assert_eq!(
        conversation.last_outbound_text.as_deref(),
        Some("Thanks for your time")
    );
}

#[tokio::test]
async fn rejected_outbound_send_logs_nothing() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.transport.reject("+15550100").await;

    let err = harness.sender.send("+15550100", "hello").await.unwrap_err();
    assert!(matches!(err, OutreachError::Transport { .. }));
    assert!(harness.registry.history("+15550100", 10).await.unwrap().is_empty());

    let err = harness.sender.send("+15550100", "   ").await.unwrap_err();
    assert!(matches!(err, OutreachError::InvalidInput(_)));
}

#[tokio::test]
async fn follow_up_hook_messages_the_recipient() {
    let harness = TestHarness::builder().build().await.unwrap();
    let hook = OutboundFollowUp::new(harness.sender.clone(), "We just called you!");

    hook.on_recipient_terminal(
        "batch_12345",
        &RecipientCallState {
            contact_id: "+15550100".into(),
            status: CallStatus::Completed,
        },
    )
    .await
    .unwrap();

    let sent = harness.transport.sent_messages().await;
    assert_eq!(
        sent,
        vec![("+15550100".to_string(), "We just called you!".to_string())]
    );
}

#[tokio::test]
async fn concurrent_inbound_for_one_contact_is_serialized() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.create_agent("agent-1", true).await.unwrap();
    harness.registry.bind_agent("+15550100", "agent-1").await.unwrap();

    let first = harness.router.clone();
    let second = harness.router.clone();
    let (a, b) = tokio::join!(
        first.handle_inbound("+15550100", "one"),
        second.handle_inbound("+15550100", "two"),
    );
    assert!(a.unwrap().should_respond);
    assert!(b.unwrap().should_respond);

    let history = harness.registry.history("+15550100", 10).await.unwrap();
    let directions: Vec<Direction> = history.iter().map(|e| e.direction).collect();
    assert_eq!(
        directions,
        vec![
            Direction::Received,
            Direction::Sent,
            Direction::Received,
            Direction::Sent
        ]
    );
}
