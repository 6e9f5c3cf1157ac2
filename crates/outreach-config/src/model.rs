// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Outreach campaign backend.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Outreach configuration.
///
/// Every section is optional and defaults to values suitable for a local
/// development instance. Credentials default to unset.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutreachConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Relational database and message log locations.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Batch progress monitor cadence and ceiling.
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Session router behavior.
    #[serde(default)]
    pub session: SessionConfig,

    /// Event fan-out settings.
    #[serde(default)]
    pub bus: BusConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// WhatsApp Cloud API settings.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Gemini generative API settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Batch-calling provider settings.
    #[serde(default)]
    pub calls: CallsConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "outreach".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the relational SQLite database.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Path to the append-only message log database.
    #[serde(default = "default_message_log_path")]
    pub message_log_path: String,

    /// Enable WAL journal mode on both databases.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            message_log_path: default_message_log_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("outreach").join("outreach.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("outreach.db"))
        .to_string_lossy()
        .to_string()
}

fn default_message_log_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("outreach").join("messages.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("messages.db"))
        .to_string_lossy()
        .to_string()
}

fn default_true() -> bool {
    true
}

/// Progress monitor configuration.
///
/// A monitor stops polling when either `max_duration_secs` has elapsed or
/// `max_polls` ticks have run, whichever comes first.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,

    #[serde(default = "default_max_polls")]
    pub max_polls: u32,

    /// Upper bound on a single provider status fetch.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            max_duration_secs: default_max_duration_secs(),
            max_polls: default_max_polls(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_max_duration_secs() -> u64 {
    3600
}

fn default_max_polls() -> u32 {
    120
}

fn default_fetch_timeout_secs() -> u64 {
    20
}

/// Session router configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Number of prior log entries replayed to the generator.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,

    /// Idle time after which a warm session is discarded.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    #[serde(default = "default_max_warm_sessions")]
    pub max_warm_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            generation_timeout_secs: default_generation_timeout_secs(),
            session_ttl_secs: default_session_ttl_secs(),
            max_warm_sessions: default_max_warm_sessions(),
        }
    }
}

fn default_history_window() -> usize {
    10
}

fn default_generation_timeout_secs() -> u64 {
    60
}

fn default_session_ttl_secs() -> u64 {
    1800
}

fn default_max_warm_sessions() -> usize {
    1024
}

/// Event bus configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    /// Per-topic buffer. Subscribers further behind than this lose events.
    #[serde(default = "default_bus_capacity")]
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: default_bus_capacity(),
        }
    }
}

fn default_bus_capacity() -> usize {
    256
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token required on `/v1/*`. When unset every API request is
    /// rejected.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// WhatsApp Cloud API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub phone_number_id: Option<String>,

    /// Meta app secret used to verify `X-Hub-Signature-256`.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Token echoed back during the webhook verification handshake.
    #[serde(default)]
    pub verify_token: Option<String>,

    #[serde(default = "default_graph_base_url")]
    pub base_url: String,

    #[serde(default = "default_graph_api_version")]
    pub api_version: String,

    /// Message sent to a recipient once their call reaches a terminal state.
    #[serde(default = "default_follow_up_text")]
    pub follow_up_text: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            phone_number_id: None,
            app_secret: None,
            verify_token: None,
            base_url: default_graph_base_url(),
            api_version: default_graph_api_version(),
            follow_up_text: default_follow_up_text(),
        }
    }
}

fn default_graph_base_url() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_graph_api_version() -> String {
    "v21.0".to_string()
}

fn default_follow_up_text() -> String {
    "Hi! We just tried to reach you by phone. Reply here any time if you have questions.".to_string()
}

/// Gemini API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
        }
    }
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

/// Batch-calling provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CallsConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_calls_base_url")]
    pub base_url: String,

    /// Voice agent that places the calls.
    #[serde(default)]
    pub agent_id: Option<String>,

    /// Phone number the calls are placed from.
    #[serde(default)]
    pub agent_phone_number_id: Option<String>,
}

impl Default for CallsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_calls_base_url(),
            agent_id: None,
            agent_phone_number_id: None,
        }
    }
}

fn default_calls_base_url() -> String {
    "https://api.elevenlabs.io".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = OutreachConfig::default();
        assert_eq!(config.service.name, "outreach");
        assert_eq!(config.monitor.poll_interval_secs, 30);
        assert_eq!(config.monitor.max_duration_secs, 3600);
        assert_eq!(config.monitor.max_polls, 120);
        assert_eq!(config.session.history_window, 10);
        assert_eq!(config.bus.capacity, 256);
        assert!(config.gateway.bearer_token.is_none());
        assert!(config.storage.wal_mode);
    }

    #[test]
    fn default_paths_end_with_database_names() {
        let storage = StorageConfig::default();
        assert!(storage.database_path.ends_with("outreach.db"));
        assert!(storage.message_log_path.ends_with("messages.db"));
    }

    #[test]
    fn config_serializes_for_figment_defaults() {
        let json = serde_json::to_value(OutreachConfig::default()).unwrap();
        assert_eq!(json["whatsapp"]["api_version"], "v21.0");
        assert_eq!(json["gemini"]["model"], "gemini-2.0-flash");
    }
}
