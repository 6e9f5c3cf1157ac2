// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::OutreachConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &OutreachConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        fail(format!(
            "service.log_level `{}` must be one of {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }
    if config.storage.message_log_path.trim().is_empty() {
        fail("storage.message_log_path must not be empty".to_string());
    }
    if !config.storage.database_path.trim().is_empty()
        && config.storage.database_path == config.storage.message_log_path
    {
        fail("storage.message_log_path must differ from storage.database_path".to_string());
    }

    let monitor = &config.monitor;
    if monitor.poll_interval_secs == 0 {
        fail("monitor.poll_interval_secs must be at least 1".to_string());
    }
    if monitor.max_polls == 0 {
        fail("monitor.max_polls must be at least 1".to_string());
    }
    if monitor.max_duration_secs < monitor.poll_interval_secs {
        fail(format!(
            "monitor.max_duration_secs ({}) must not be shorter than monitor.poll_interval_secs ({})",
            monitor.max_duration_secs, monitor.poll_interval_secs
        ));
    }
    if monitor.fetch_timeout_secs == 0 {
        fail("monitor.fetch_timeout_secs must be at least 1".to_string());
    }

    if config.session.history_window == 0 {
        fail("session.history_window must be at least 1".to_string());
    }
    if config.session.generation_timeout_secs == 0 {
        fail("session.generation_timeout_secs must be at least 1".to_string());
    }
    if config.session.max_warm_sessions == 0 {
        fail("session.max_warm_sessions must be at least 1".to_string());
    }

    if config.bus.capacity == 0 {
        fail("bus.capacity must be at least 1".to_string());
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        fail(format!(
            "gateway.host `{host}` is not a valid IP address or hostname"
        ));
    }
    if let Some(token) = &config.gateway.bearer_token
        && token.trim().is_empty()
    {
        fail("gateway.bearer_token must not be blank when set".to_string());
    }

    if config.whatsapp.follow_up_text.trim().is_empty() {
        fail("whatsapp.follow_up_text must not be empty".to_string());
    }

    for (key, url) in [
        ("gemini.base_url", &config.gemini.base_url),
        ("calls.base_url", &config.calls.base_url),
        ("whatsapp.base_url", &config.whatsapp.base_url),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            fail(format!("{key} `{url}` must be an http(s) URL"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&OutreachConfig::default()).is_ok());
    }

    #[test]
    fn zero_poll_interval_fails() {
        let mut config = OutreachConfig::default();
        config.monitor.poll_interval_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.to_string().contains("monitor.poll_interval_secs")));
    }

    #[test]
    fn ceiling_shorter_than_interval_fails() {
        let mut config = OutreachConfig::default();
        config.monitor.poll_interval_secs = 60;
        config.monitor.max_duration_secs = 30;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn shared_database_paths_fail() {
        let mut config = OutreachConfig::default();
        config.storage.message_log_path = config.storage.database_path.clone();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn collects_all_errors() {
        let mut config = OutreachConfig::default();
        config.service.log_level = "verbose".to_string();
        config.session.history_window = 0;
        config.bus.capacity = 0;
        config.gemini.base_url = "ftp://nowhere".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn blank_bearer_token_fails() {
        let mut config = OutreachConfig::default();
        config.gateway.bearer_token = Some("  ".to_string());
        assert!(validate_config(&config).is_err());
    }
}
