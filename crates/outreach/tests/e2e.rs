// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end: a batch call completes, every called recipient gets a
//! WhatsApp follow-up exactly once, and a reply from one of them is routed
//! to the bound agent.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use outreach_campaign::{CampaignService, FollowUpHook, MonitorSettings, ProgressMonitor};
use outreach_core::{CallStatus, Direction, FollowUpState, StorageAdapter};
use outreach_gateway::{AuthConfig, GatewayState, HealthState, WebhookConfig, build_router};
use outreach_session::OutboundFollowUp;
use outreach_test_utils::{TestHarness, snapshot};
use serde_json::json;
use tower::ServiceExt;

const FOLLOW_UP: &str = "Thanks for taking our call! Reply here with any questions.";

async fn wait_for<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(10), async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn call_follow_up_then_conversation() {
    let harness = TestHarness::builder()
        .with_batch_ids(&["batch_12345"])
        .with_generator_replies(vec!["Claro, te cuento más.".into()])
        .build()
        .await
        .unwrap();

    let hook: Arc<dyn FollowUpHook> =
        Arc::new(OutboundFollowUp::new(harness.sender.clone(), FOLLOW_UP));
    let monitor = Arc::new(ProgressMonitor::new(
        harness.tracker.clone(),
        harness.provider.clone(),
        harness.storage.clone(),
        hook,
        MonitorSettings {
            poll_interval: Duration::from_millis(10),
            max_duration: Duration::from_secs(30),
            max_polls: 500,
            fetch_timeout: Duration::from_secs(5),
        },
    ));
    let campaigns = Arc::new(CampaignService::new(
        harness.tracker.clone(),
        monitor.clone(),
        harness.provider.clone(),
    ));

    harness.create_agent("agent-1", true).await.unwrap();
    harness.registry.bind_agent("+15550000", "agent-1").await.unwrap();
    harness
        .provider
        .push_snapshot(snapshot(
            "batch_12345",
            CallStatus::Completed,
            &[(CallStatus::Completed, 2), (CallStatus::Failed, 1)],
        ))
        .await;

    let app = build_router(GatewayState {
        campaigns: campaigns.clone(),
        registry: harness.registry.clone(),
        router: harness.router.clone(),
        sender: Some(harness.sender.clone()),
        bus: harness.bus.clone(),
        auth: AuthConfig::new(Some("token".into())),
        webhook: WebhookConfig::default(),
        health: HealthState::default(),
    });

    let start = json!({
        "call_name": "spring launch",
        "recipients": [
            {"contact_id": "+15550000"},
            {"contact_id": "+15550001"},
            {"contact_id": "+15550002"}
        ]
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/groups/55/batch")
                .header(header::AUTHORIZATION, "Bearer token")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(start.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let storage = harness.storage.clone();
    wait_for(|| {
        let storage = storage.clone();
        async move {
            let ledger = storage.list_follow_ups("batch_12345").await.unwrap();
            ledger.len() == 3 && ledger.iter().all(|r| r.state == FollowUpState::Delivered)
        }
    })
    .await;
    monitor.drain().await;

    let stats = campaigns.stats("55").await.unwrap();
    assert_eq!(stats.completed_count, 2);
    assert_eq!(stats.failed_count, 1);
    assert_eq!(stats.success_rate, 67);

    let sent = harness.transport.sent_messages().await;
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|(_, text)| text == FOLLOW_UP));

    let inbound = json!({
        "object": "whatsapp_business_account",
        "entry": [{"id": "WABA", "changes": [{"field": "messages", "value": {
            "metadata": {"phone_number_id": "PN_1"},
            "messages": [{"from": "15550000", "id": "wamid.R1", "type": "text",
                          "text": {"body": "¿Qué incluye el plan?"}}]
        }}]}]
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/whatsapp")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(inbound.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let calls = harness.generator.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].message, "¿Qué incluye el plan?");
    assert_eq!(calls[0].history.len(), 1);
    assert_eq!(calls[0].history[0].content, FOLLOW_UP);

    let sent = harness.transport.sent_messages().await;
    assert_eq!(sent.len(), 4);
    assert_eq!(
        sent[3],
        ("+15550000".to_string(), "Claro, te cuento más.".to_string())
    );

    let history = harness.registry.history("+15550000", 10).await.unwrap();
    let directions: Vec<Direction> = history.iter().map(|e| e.direction).collect();
    assert_eq!(
        directions,
        vec![Direction::Sent, Direction::Received, Direction::Sent]
    );
}
