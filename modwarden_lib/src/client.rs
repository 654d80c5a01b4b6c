//! Retrying wrapper around the REST client.

use std::time::Duration;

use async_trait::async_trait;
use modwarden_api::types::{Application, Member, Message, PartialGuild, Role, User};
use modwarden_api::{Client, MessageQuery};
use rand::Rng;

use crate::api::DiscordApi;
use crate::error::BotError;

/// REST client that retries rate-limited and transient failures.
///
/// A 429 waits for the server-provided `retry_after`; network errors and 5xx
/// responses back off exponentially with jitter. After `max_attempts` the
/// last error is returned to the caller.
pub struct RetryingClient {
    inner: Client,
    retry: RetryConfig,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts per call, the first one included.
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: env_usize("MODWARDEN_RETRY_MAX", defaults.max_attempts).max(1),
            base_delay_ms: env_u64("MODWARDEN_RETRY_BASE_MS", defaults.base_delay_ms),
            max_delay_ms: env_u64("MODWARDEN_RETRY_MAX_MS", defaults.max_delay_ms),
        }
    }

    fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let shift = (attempt.saturating_sub(1)).min(30) as u32;
        let exp = 1u64 << shift;
        let base = self
            .base_delay_ms
            .saturating_mul(exp)
            .min(self.max_delay_ms);
        let jitter = rand::thread_rng().gen_range(0.8..1.2);
        Duration::from_millis((base as f64 * jitter) as u64)
    }

    fn delay_for(&self, err: &modwarden_api::Error, attempt: usize) -> Duration {
        match err {
            modwarden_api::Error::RateLimited { retry_after } => {
                (*retry_after).min(Duration::from_millis(self.max_delay_ms))
            }
            _ => self.delay_for_attempt(attempt),
        }
    }
}

impl RetryingClient {
    pub fn new(inner: Client, retry: RetryConfig) -> Self {
        Self { inner, retry }
    }

    async fn with_retry<T, F, Fut>(&self, label: &str, mut f: F) -> Result<T, BotError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, modwarden_api::Error>>,
    {
        let mut attempt = 0usize;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.retry.max_attempts || !err.is_transient() {
                        return Err(err.into());
                    }
                    let delay = self.retry.delay_for(&err, attempt);
                    tracing::warn!(
                        "{} request failed (attempt {}/{}), retrying in {:.1}s: {}",
                        label,
                        attempt,
                        self.retry.max_attempts,
                        delay.as_secs_f64(),
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl DiscordApi for RetryingClient {
    async fn fetch_guild_roles(&self, guild_id: &str) -> Result<Vec<Role>, BotError> {
        self.with_retry("guild roles", || self.inner.get_guild_roles(guild_id))
            .await
    }

    async fn fetch_guild_member(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> Result<Option<Member>, BotError> {
        self.with_retry("guild member", || {
            self.inner.get_guild_member(guild_id, user_id)
        })
        .await
    }

    async fn fetch_latest_message(&self, channel_id: &str) -> Result<Option<Message>, BotError> {
        let query = MessageQuery::latest();
        let messages = self
            .with_retry("latest message", || {
                self.inner.get_channel_messages(channel_id, &query)
            })
            .await?;
        Ok(messages.into_iter().next())
    }

    async fn fetch_messages_after(
        &self,
        channel_id: &str,
        after: &str,
        limit: u8,
    ) -> Result<Vec<Message>, BotError> {
        let query = MessageQuery::default().with_limit(limit).with_after(after);
        self.with_retry("channel messages", || {
            self.inner.get_channel_messages(channel_id, &query)
        })
        .await
    }

    async fn fetch_recent_messages(
        &self,
        channel_id: &str,
        limit: u8,
    ) -> Result<Vec<Message>, BotError> {
        let query = MessageQuery::default().with_limit(limit);
        self.with_retry("recent messages", || {
            self.inner.get_channel_messages(channel_id, &query)
        })
        .await
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), BotError> {
        self.with_retry("delete message", || {
            self.inner.delete_message(channel_id, message_id)
        })
        .await
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), BotError> {
        // reports are fire-and-forget; a retried POST could post twice
        self.inner.create_message(channel_id, content).await?;
        Ok(())
    }

    async fn current_user(&self) -> Result<User, BotError> {
        self.with_retry("current user", || self.inner.get_current_user())
            .await
    }

    async fn current_guilds(&self) -> Result<Vec<PartialGuild>, BotError> {
        self.with_retry("current guilds", || self.inner.get_current_user_guilds())
            .await
    }

    async fn current_application(&self) -> Result<Application, BotError> {
        self.with_retry("current application", || {
            self.inner.get_current_application()
        })
        .await
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(default)
}
