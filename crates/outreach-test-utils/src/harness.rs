// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the campaign and conversation stack over temp
//! SQLite databases with mock collaborators, wired the same way the binary
//! wires the real ones.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use outreach_bus::EventBus;
use outreach_campaign::{
    BatchTracker, CampaignService, FollowUpHook, MonitorSettings, ProgressMonitor,
};
use outreach_config::model::{SessionConfig, StorageConfig};
use outreach_core::{Agent, MessageLogAdapter, OutreachError, StorageAdapter};
use outreach_session::{
    ConversationRegistry, OutboundSender, RouterSettings, SessionRouter, WarmSessions,
};
use outreach_storage::{SqliteMessageLog, SqliteStorage};

use crate::mock_generator::MockGenerator;
use crate::mock_provider::MockCallProvider;
use crate::mock_transport::MockTransport;
use crate::recording_hook::RecordingHook;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    replies: Vec<String>,
    batch_ids: Vec<String>,
    monitor: MonitorSettings,
    session: SessionConfig,
    bus_capacity: usize,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            replies: Vec::new(),
            batch_ids: Vec::new(),
            monitor: MonitorSettings {
                poll_interval: Duration::from_millis(10),
                max_duration: Duration::from_secs(30),
                max_polls: 500,
                fetch_timeout: Duration::from_secs(5),
            },
            session: SessionConfig::default(),
            bus_capacity: 64,
        }
    }

    /// Set mock generator replies.
    pub fn with_generator_replies(mut self, replies: Vec<String>) -> Self {
        self.replies = replies;
        self
    }

    /// Batch ids the mock provider hands out, in order.
    pub fn with_batch_ids(mut self, ids: &[&str]) -> Self {
        self.batch_ids = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn with_monitor_settings(mut self, settings: MonitorSettings) -> Self {
        self.monitor = settings;
        self
    }

    pub fn with_session_config(mut self, config: SessionConfig) -> Self {
        self.session = config;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, OutreachError> {
        let temp_dir = tempfile::TempDir::new().map_err(OutreachError::storage)?;
        let storage_config = StorageConfig {
            database_path: temp_dir.path().join("outreach.db").to_string_lossy().to_string(),
            message_log_path: temp_dir.path().join("messages.db").to_string_lossy().to_string(),
            wal_mode: true,
        };

        let sqlite = SqliteStorage::new(storage_config.clone());
        sqlite.initialize().await?;
        let storage: Arc<dyn StorageAdapter> = Arc::new(sqlite);
        let log = SqliteMessageLog::new(storage_config);
        log.initialize().await?;
        let message_log: Arc<dyn MessageLogAdapter> = Arc::new(log);

        let bus = Arc::new(EventBus::new(self.bus_capacity));
        let provider = Arc::new(
            MockCallProvider::new()
                .with_batch_ids(&self.batch_ids.iter().map(String::as_str).collect::<Vec<_>>())
                .await,
        );
        let generator = Arc::new(MockGenerator::with_replies(self.replies));
        let transport = Arc::new(MockTransport::new());
        let hook = Arc::new(RecordingHook::new());

        let tracker = Arc::new(BatchTracker::new(
            storage.clone(),
            bus.clone(),
            self.monitor.max_duration,
        ));
        let monitor = Arc::new(ProgressMonitor::new(
            tracker.clone(),
            provider.clone(),
            storage.clone(),
            hook.clone() as Arc<dyn FollowUpHook>,
            self.monitor,
        ));
        let campaigns = Arc::new(CampaignService::new(
            tracker.clone(),
            monitor.clone(),
            provider.clone(),
        ));

        let sessions = Arc::new(WarmSessions::from_config(&self.session));
        let registry = Arc::new(ConversationRegistry::new(
            storage.clone(),
            message_log.clone(),
            bus.clone(),
            sessions,
        ));
        let router = Arc::new(SessionRouter::new(
            registry.clone(),
            storage.clone(),
            message_log.clone(),
            generator.clone(),
            RouterSettings::from(&self.session),
        )
        .with_transport(transport.clone()));
        let sender = Arc::new(OutboundSender::new(
            registry.clone(),
            message_log.clone(),
            transport.clone(),
        ));

        Ok(TestHarness {
            storage,
            message_log,
            bus,
            provider,
            generator,
            transport,
            hook,
            tracker,
            monitor,
            campaigns,
            registry,
            router,
            sender,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock collaborators and temp storage.
pub struct TestHarness {
    pub storage: Arc<dyn StorageAdapter>,
    pub message_log: Arc<dyn MessageLogAdapter>,
    pub bus: Arc<EventBus>,
    pub provider: Arc<MockCallProvider>,
    pub generator: Arc<MockGenerator>,
    pub transport: Arc<MockTransport>,
    /// Follow-up hook wired into the monitor.
    pub hook: Arc<RecordingHook>,
    pub tracker: Arc<BatchTracker>,
    pub monitor: Arc<ProgressMonitor>,
    pub campaigns: Arc<CampaignService>,
    pub registry: Arc<ConversationRegistry>,
    pub router: Arc<SessionRouter>,
    pub sender: Arc<OutboundSender>,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Stores an agent with a fixed instruction.
    pub async fn create_agent(&self, id: &str, is_active: bool) -> Result<Agent, OutreachError> {
        self.create_agent_with_instruction(id, "You are a friendly sales assistant.", is_active)
            .await
    }

    pub async fn create_agent_with_instruction(
        &self,
        id: &str,
        system_instruction: &str,
        is_active: bool,
    ) -> Result<Agent, OutreachError> {
        let now = Utc::now();
        let agent = Agent {
            id: id.to_string(),
            name: format!("Agent {id}"),
            system_instruction: system_instruction.to_string(),
            language: String::new(),
            is_active,
            owner_id: "owner-1".to_string(),
            created_at: now,
            updated_at: now,
        };
        self.storage.upsert_agent(&agent).await?;
        Ok(agent)
    }
}
