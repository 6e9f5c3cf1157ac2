// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading.
//!
//! Lookup order: `./outreach.toml` > `~/.config/outreach/outreach.toml` >
//! `/etc/outreach/outreach.toml`, with `OUTREACH_*` environment overrides on
//! top.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::OutreachConfig;

/// Config file name searched in each location.
pub const CONFIG_FILE_NAME: &str = "outreach.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "OUTREACH_";

const SECTIONS: &[&str] = &[
    "service", "storage", "monitor", "session", "bus", "gateway", "whatsapp", "gemini", "calls",
];

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/outreach/outreach.toml`
/// 3. `~/.config/outreach/outreach.toml`
/// 4. `./outreach.toml`
/// 5. `OUTREACH_*` environment variables
pub fn load_config() -> Result<OutreachConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string on top of the defaults only.
pub fn load_config_from_str(toml_content: &str) -> Result<OutreachConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(OutreachConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<OutreachConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(OutreachConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(OutreachConfig::default()));
    for path in search_paths() {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(env_provider())
}

/// Config file locations, lowest precedence first.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/outreach").join(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("outreach").join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(CONFIG_FILE_NAME));
    paths
}

/// Environment provider mapping `OUTREACH_<SECTION>_<KEY>` to `section.key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `OUTREACH_WHATSAPP_ACCESS_TOKEN` maps to `whatsapp.access_token`.
pub fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
