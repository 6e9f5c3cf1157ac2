// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Warm generation sessions keyed by `(agent_id, contact_id)`.
//!
//! A warm session pins the agent's instruction as it was when the session
//! was first used. Entries expire after an idle TTL and the cache is bounded;
//! when full, expired entries go first, then the least recently used.

use std::time::Duration;

use dashmap::DashMap;
use outreach_config::model::SessionConfig;
use outreach_core::Agent;
use tokio::time::Instant;
use tracing::debug;

/// A cached generation context for one agent talking to one contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmSession {
    pub agent_id: String,
    pub contact_id: String,
    pub system_instruction: String,
    warmed_at: Instant,
    last_used: Instant,
}

impl WarmSession {
    fn warm(agent: &Agent, contact_id: &str, now: Instant) -> Self {
        Self {
            agent_id: agent.id.clone(),
            contact_id: contact_id.to_string(),
            system_instruction: compose_instruction(agent),
            warmed_at: now,
            last_used: now,
        }
    }

    pub fn warmed_at(&self) -> Instant {
        self.warmed_at
    }
}

/// The agent's instruction, with a reply-language directive when the agent
/// has a language set.
pub fn compose_instruction(agent: &Agent) -> String {
    let language = agent.language.trim();
    if language.is_empty() {
        agent.system_instruction.clone()
    } else {
        format!(
            "{}\n\nAlways reply in {language}.",
            agent.system_instruction.trim_end()
        )
    }
}

type SessionKey = (String, String);

pub struct WarmSessions {
    entries: DashMap<SessionKey, WarmSession>,
    ttl: Duration,
    max_entries: usize,
}

impl WarmSessions {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            Duration::from_secs(config.session_ttl_secs),
            config.max_warm_sessions,
        )
    }

    /// Returns the live session for the pair, warming a new one when absent
    /// or expired.
    pub fn get_or_warm(&self, agent: &Agent, contact_id: &str) -> WarmSession {
        let now = Instant::now();
        let key = (agent.id.clone(), contact_id.to_string());

        if let Some(mut entry) = self.entries.get_mut(&key) {
            if now.duration_since(entry.last_used) < self.ttl {
                entry.last_used = now;
                return entry.clone();
            }
        }

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.evict(now);
        }
        let session = WarmSession::warm(agent, contact_id, now);
        self.entries.insert(key, session.clone());
        debug!(agent_id = %agent.id, contact_id, "session warmed");
        session
    }

    /// Drops every session for the contact, across all agents.
    pub fn invalidate_contact(&self, contact_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(_, contact), _| contact != contact_id);
        before.saturating_sub(self.entries.len())
    }

    /// Drops every session warmed for the agent, so an edited instruction
    /// takes effect on the next message.
    pub fn invalidate_agent(&self, agent_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(agent, _), _| agent != agent_id);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict(&self, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, session| now.duration_since(session.last_used) < ttl);
        if self.entries.len() < self.max_entries {
            return;
        }
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().last_used)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn agent(id: &str, language: &str) -> Agent {
        Agent {
            id: id.into(),
            name: "Sales".into(),
            system_instruction: "You help customers.".into(),
            language: language.into(),
            is_active: true,
            owner_id: "owner-1".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn instruction_includes_language() {
        assert_eq!(
            compose_instruction(&agent("a", "Spanish")),
            "You help customers.\n\nAlways reply in Spanish."
        );
        assert_eq!(compose_instruction(&agent("a", " ")), "You help customers.");
    }

    #[tokio::test(start_paused = true)]
    async fn session_is_reused_until_ttl() {
        let cache = WarmSessions::new(Duration::from_secs(60), 8);
        let a = agent("agent-1", "");
        let first = cache.get_or_warm(&a, "+15550001");

        tokio::time::advance(Duration::from_secs(30)).await;
        let second = cache.get_or_warm(&a, "+15550001");
        assert_eq!(first.warmed_at(), second.warmed_at());

        tokio::time::advance(Duration::from_secs(61)).await;
        let third = cache.get_or_warm(&a, "+15550001");
        assert!(third.warmed_at() > first.warmed_at());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn full_cache_evicts_least_recently_used() {
        let cache = WarmSessions::new(Duration::from_secs(600), 2);
        let a = agent("agent-1", "");
        cache.get_or_warm(&a, "c1");
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.get_or_warm(&a, "c2");
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.get_or_warm(&a, "c1");
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.get_or_warm(&a, "c3");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.invalidate_contact("c2"), 0);
        assert_eq!(cache.invalidate_contact("c1"), 1);
    }

    #[test]
    fn invalidate_only_touches_one_contact() {
        let cache = WarmSessions::new(Duration::from_secs(600), 16);
        cache.get_or_warm(&agent("agent-1", ""), "c1");
        cache.get_or_warm(&agent("agent-2", ""), "c1");
        cache.get_or_warm(&agent("agent-1", ""), "c2");

        assert_eq!(cache.invalidate_contact("c1"), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_agent_spans_contacts() {
        let cache = WarmSessions::new(Duration::from_secs(600), 16);
        cache.get_or_warm(&agent("agent-1", ""), "c1");
        cache.get_or_warm(&agent("agent-1", ""), "c2");
        cache.get_or_warm(&agent("agent-2", ""), "c1");

        assert_eq!(cache.invalidate_agent("agent-1"), 2);
        assert_eq!(cache.len(), 1);
    }
}
