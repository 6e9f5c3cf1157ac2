// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `outreach serve` command implementation.
//!
//! Opens both SQLite stores, builds the provider, generator and (when
//! configured) WhatsApp clients, resumes monitors for batches left running
//! by a previous process, and serves the gateway until a shutdown signal.

use std::sync::Arc;

use outreach_bus::EventBus;
use outreach_calls::BatchCallingClient;
use outreach_campaign::{
    BatchTracker, CampaignService, FollowUpHook, MonitorSettings, NoopFollowUp, ProgressMonitor,
};
use outreach_config::OutreachConfig;
use outreach_core::{
    CallProvider, MessageLogAdapter, MessageTransport, OutreachError, PluginAdapter,
    ReplyGenerator, StorageAdapter,
};
use outreach_gateway::{AuthConfig, GatewayState, HealthState, WebhookConfig, start_server};
use outreach_gemini::GeminiClient;
use outreach_session::{
    ConversationRegistry, OutboundFollowUp, OutboundSender, RouterSettings, SessionRouter,
    WarmSessions,
};
use outreach_storage::{SqliteMessageLog, SqliteStorage};
use outreach_whatsapp::WhatsAppCloudTransport;
use tracing::{info, warn};

use crate::shutdown;

/// Crate targets that follow `service.log_level`. Everything else logs at
/// `warn`.
const LOG_TARGETS: &[&str] = &[
    "outreach",
    "outreach_bus",
    "outreach_calls",
    "outreach_campaign",
    "outreach_config",
    "outreach_gateway",
    "outreach_gemini",
    "outreach_session",
    "outreach_storage",
    "outreach_whatsapp",
];

pub async fn run_serve(config: OutreachConfig) -> Result<(), OutreachError> {
    init_tracing(&config.service.log_level);
    info!(name = %config.service.name, "starting outreach serve");

    let sqlite = SqliteStorage::new(config.storage.clone());
    sqlite.initialize().await?;
    let storage: Arc<dyn StorageAdapter> = Arc::new(sqlite);
    let log = SqliteMessageLog::new(config.storage.clone());
    log.initialize().await?;
    let message_log: Arc<dyn MessageLogAdapter> = Arc::new(log);

    let bus = Arc::new(EventBus::new(config.bus.capacity));
    let provider: Arc<dyn CallProvider> = Arc::new(BatchCallingClient::new(&config.calls)?);
    let generator: Arc<dyn ReplyGenerator> = Arc::new(GeminiClient::new(&config.gemini)?);

    let sessions = Arc::new(WarmSessions::from_config(&config.session));
    let registry = Arc::new(ConversationRegistry::new(
        storage.clone(),
        message_log.clone(),
        bus.clone(),
        sessions,
    ));
    let transport = build_transport(&config)?;
    let sender = transport.clone().map(|transport| {
        Arc::new(OutboundSender::new(
            registry.clone(),
            message_log.clone(),
            transport,
        ))
    });
    let hook: Arc<dyn FollowUpHook> = match &sender {
        Some(sender) => Arc::new(OutboundFollowUp::new(
            sender.clone(),
            config.whatsapp.follow_up_text.clone(),
        )),
        None => {
            warn!("whatsapp is not configured; call follow-ups are disabled");
            Arc::new(NoopFollowUp)
        }
    };

    let settings = MonitorSettings::from(&config.monitor);
    let tracker = Arc::new(BatchTracker::new(
        storage.clone(),
        bus.clone(),
        settings.max_duration,
    ));
    let monitor = Arc::new(ProgressMonitor::new(
        tracker.clone(),
        provider.clone(),
        storage.clone(),
        hook,
        settings,
    ));
    let campaigns = Arc::new(CampaignService::new(tracker, monitor, provider.clone()));
    let mut router = SessionRouter::new(
        registry.clone(),
        storage.clone(),
        message_log.clone(),
        generator.clone(),
        RouterSettings::from(&config.session),
    );
    if let Some(transport) = transport.clone() {
        router = router.with_transport(transport);
    }
    let router = Arc::new(router);

    let stale = campaigns.tracker().list_stale().await?;
    if !stale.is_empty() {
        warn!(count = stale.len(), "stale batches found; they will not be polled");
    }
    campaigns.resume_monitors().await?;

    let cancel = shutdown::install_signal_handler();
    let auth = AuthConfig::new(config.gateway.bearer_token.clone());
    if auth.bearer_token.is_none() {
        warn!("gateway.bearer_token is unset; every /v1 request will be rejected");
    }
    let state = GatewayState {
        campaigns: campaigns.clone(),
        registry,
        router,
        sender,
        bus,
        auth,
        webhook: WebhookConfig::from(&config.whatsapp),
        health: HealthState::default(),
    };

    let served = start_server(&config.gateway, state, cancel.clone()).await;
    cancel.cancel();

    info!("draining batch monitors");
    campaigns.shutdown().await;

    let mut shutdowns = vec![
        (provider.name().to_string(), provider.shutdown().await),
        (generator.name().to_string(), generator.shutdown().await),
    ];
    if let Some(transport) = transport {
        shutdowns.push((transport.name().to_string(), transport.shutdown().await));
    }
    for (adapter, result) in shutdowns {
        if let Err(e) = result {
            warn!(adapter = %adapter, error = %e, "adapter shutdown failed");
        }
    }
    message_log.close().await?;
    storage.close().await?;

    info!("outreach serve shutdown complete");
    served
}

/// The WhatsApp transport, when a phone number id is configured.
fn build_transport(
    config: &OutreachConfig,
) -> Result<Option<Arc<dyn MessageTransport>>, OutreachError> {
    if config.whatsapp.phone_number_id.is_none() {
        return Ok(None);
    }
    let transport = WhatsAppCloudTransport::new(&config.whatsapp)?;
    Ok(Some(Arc::new(transport)))
}

/// Prints a one-line status per integration for `check-config`.
pub fn print_config_summary(config: &OutreachConfig) {
    let set = |present: bool| if present { "configured" } else { "not configured" };
    println!("outreach: config OK (service.name={})", config.service.name);
    println!("  database:      {}", config.storage.database_path);
    println!("  message log:   {}", config.storage.message_log_path);
    println!(
        "  gateway:       {}:{} (bearer token {})",
        config.gateway.host,
        config.gateway.port,
        set(config.gateway.bearer_token.is_some())
    );
    println!(
        "  calls:         agent {}",
        set(config.calls.agent_id.is_some())
    );
    println!("  gemini:        model {}", config.gemini.model);
    println!(
        "  whatsapp:      {}",
        set(config.whatsapp.phone_number_id.is_some())
    );
    println!(
        "  monitor:       every {}s, ceiling {}s / {} polls",
        config.monitor.poll_interval_secs,
        config.monitor.max_duration_secs,
        config.monitor.max_polls
    );
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides the configured
/// level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

fn default_directives(log_level: &str) -> String {
    let mut directives: Vec<String> = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={log_level}"))
        .collect();
    directives.push("warn".to_string());
    directives.join(",")
}
