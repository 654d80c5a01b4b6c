//! Readiness gate: guild list, application id and role cache must all be
//! present before the bot handles anything.

use std::sync::RwLock;
use std::time::Duration;

use tokio::sync::Notify;

use crate::error::BotError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
struct ReadinessState {
    guild_ids: Vec<String>,
    application_id: String,
    role_cache_populated: bool,
}

/// Process-wide readiness flags behind a single reader/writer lock.
///
/// The three updates may arrive in any order; [`ReadinessGate::is_ready`]
/// only looks at their conjunction.
#[derive(Debug, Default)]
pub struct ReadinessGate {
    state: RwLock<ReadinessState>,
    guilds_published: Notify,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the known guild list and wakes tasks waiting for guilds.
    pub fn update_guild_ids(&self, guild_ids: Vec<String>) {
        let has_guilds = !guild_ids.is_empty();
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.guild_ids = guild_ids;
        }
        if has_guilds {
            self.guilds_published.notify_waiters();
        }
    }

    pub fn update_application_id(&self, application_id: &str) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.application_id = application_id.to_string();
    }

    pub fn mark_role_cache_populated(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.role_cache_populated = true;
    }

    pub fn guild_ids(&self) -> Vec<String> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .guild_ids
            .clone()
    }

    pub fn application_id(&self) -> Option<String> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        if state.application_id.is_empty() {
            None
        } else {
            Some(state.application_id.clone())
        }
    }

    pub fn is_ready(&self) -> bool {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        !state.application_id.is_empty()
            && !state.guild_ids.is_empty()
            && state.role_cache_populated
    }

    /// Polls every 100ms and resolves once the gate is open.
    pub async fn ready(&self) {
        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        loop {
            ticker.tick().await;
            if self.is_ready() {
                return;
            }
        }
    }

    /// Like [`ReadinessGate::ready`], failing once `timeout` has elapsed.
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<(), BotError> {
        tokio::time::timeout(timeout, self.ready())
            .await
            .map_err(|_| BotError::ReadinessTimeout(timeout))
    }

    /// Resolves once a non-empty guild list is known and returns it.
    pub async fn wait_for_guilds(&self) -> Vec<String> {
        loop {
            let notified = self.guilds_published.notified();
            tokio::pin!(notified);
            // register before checking so an update between check and await is not lost
            notified.as_mut().enable();

            let guild_ids = self.guild_ids();
            if !guild_ids.is_empty() {
                return guild_ids;
            }
            notified.await;
        }
    }
}
