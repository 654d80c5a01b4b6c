//! Polls watched channels for new messages and hands each one to the bot.
//!
//! Moderated channels can also be compared against what the feed saw
//! earlier, to notice messages deleted in between.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use modwarden_api::types::Message;

use crate::api::DiscordApi;
use crate::bot::Bot;
use crate::moderation;
use crate::tasks::{shutdown_requested, Shutdown};

/// Discord's page size limit for channel messages.
const PAGE_SIZE: u8 = 100;

/// Newest messages per channel compared when looking for deletions.
const RECENT_WINDOW: u8 = 50;

/// Snowflake of the newest message seen per channel.
///
/// A channel starts at its newest message at startup, so history is never
/// replayed. An empty channel starts at `"0"`.
#[derive(Debug, Default)]
pub struct ChannelCursors {
    last_seen: HashMap<String, String>,
}

impl ChannelCursors {
    pub fn get(&self, channel_id: &str) -> Option<&str> {
        self.last_seen.get(channel_id).map(String::as_str)
    }

    pub fn set(&mut self, channel_id: &str, message_id: &str) {
        self.last_seen
            .insert(channel_id.to_string(), message_id.to_string());
    }
}

fn snowflake(id: &str) -> u64 {
    id.parse().unwrap_or(0)
}

/// The last messages the feed saw per channel, oldest first.
#[derive(Debug)]
pub struct RecentMessages {
    window: HashMap<String, VecDeque<Message>>,
    capacity: usize,
}

impl Default for RecentMessages {
    fn default() -> Self {
        Self::with_capacity(RECENT_WINDOW as usize)
    }
}

impl RecentMessages {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            window: HashMap::new(),
            capacity,
        }
    }

    /// Appends messages, given oldest first, dropping the oldest beyond capacity.
    pub fn remember(&mut self, channel_id: &str, messages: &[Message]) {
        let window = self.window.entry(channel_id.to_string()).or_default();
        window.extend(messages.iter().cloned());
        while window.len() > self.capacity {
            window.pop_front();
        }
    }

    pub fn len(&self, channel_id: &str) -> usize {
        self.window.get(channel_id).map_or(0, VecDeque::len)
    }

    /// Removes and returns remembered messages missing from `fetched`.
    ///
    /// `fetched` holds the newest `limit` messages of the channel. When it is
    /// full, anything older than its oldest message may simply have fallen out
    /// of the page, so only messages inside the page's range count as deleted.
    pub fn take_deleted(&mut self, channel_id: &str, fetched: &[Message], limit: usize) -> Vec<Message> {
        let Some(window) = self.window.get_mut(channel_id) else {
            return Vec::new();
        };
        let present: HashSet<&str> = fetched.iter().map(|m| m.id.as_str()).collect();
        let boundary = if fetched.len() < limit {
            0
        } else {
            fetched.iter().map(|m| snowflake(&m.id)).min().unwrap_or(0)
        };

        let mut deleted = Vec::new();
        window.retain(|m| {
            let id = snowflake(&m.id);
            if id < boundary {
                return false;
            }
            if present.contains(m.id.as_str()) {
                return true;
            }
            deleted.push(m.clone());
            false
        });
        deleted
    }
}

/// Returns new messages of one channel, oldest first, and advances its cursor.
///
/// Messages a wipe has already picked up are left out.
pub async fn poll_channel<A: DiscordApi>(
    bot: &Bot<A>,
    cursors: &mut ChannelCursors,
    channel_id: &str,
) -> Vec<Message> {
    let Some(after) = cursors.get(channel_id).map(str::to_string) else {
        match bot.api().fetch_latest_message(channel_id).await {
            Ok(latest) => {
                let start = latest.map_or_else(|| "0".to_string(), |m| m.id);
                tracing::debug!(channel_id, start = %start, "watching channel");
                cursors.set(channel_id, &start);
            }
            Err(e) => tracing::warn!(channel_id, error = %e, "failed to read channel"),
        }
        return Vec::new();
    };

    let mut messages = match bot
        .api()
        .fetch_messages_after(channel_id, &after, PAGE_SIZE)
        .await
    {
        Ok(messages) => messages,
        Err(e) => {
            tracing::warn!(channel_id, error = %e, "failed to poll channel");
            return Vec::new();
        }
    };

    if let Some(newest) = messages.first() {
        cursors.set(channel_id, &newest.id);
    }
    messages.reverse();
    messages.retain(|m| !bot.wiped_messages.contains(&m.id));
    messages
}

/// Reports messages of a moderated channel that vanished since the last check.
pub async fn detect_deleted<A: DiscordApi>(
    bot: &Bot<A>,
    recent: &mut RecentMessages,
    channel_id: &str,
) {
    if recent.len(channel_id) == 0 {
        return;
    }
    let fetched = match bot
        .api()
        .fetch_recent_messages(channel_id, RECENT_WINDOW)
        .await
    {
        Ok(fetched) => fetched,
        Err(e) => {
            tracing::warn!(channel_id, error = %e, "failed to check for deleted messages");
            return;
        }
    };
    for message in recent.take_deleted(channel_id, &fetched, RECENT_WINDOW as usize) {
        moderation::report_deleted_message(bot, &message).await;
    }
}

/// Polls every channel each `period` and spawns one handler task per new message.
///
/// Nothing is polled before the readiness gate opens, so no handler runs
/// against an empty role table.
pub async fn run_message_feed<A: DiscordApi + 'static>(
    bot: Arc<Bot<A>>,
    channels: Vec<String>,
    period: Duration,
    mut shutdown: Shutdown,
) {
    tokio::select! {
        _ = bot.gate.ready() => {}
        _ = shutdown_requested(&mut shutdown) => return,
    }

    tracing::info!(channels = channels.len(), "message feed started");
    let track_deletions = bot.config.features.report_deleted_messages.enabled;
    let mut cursors = ChannelCursors::default();
    let mut recent = RecentMessages::default();
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_requested(&mut shutdown) => return,
        }

        for channel_id in &channels {
            let mut messages = poll_channel(&bot, &mut cursors, channel_id).await;
            for message in &mut messages {
                if message.channel_id.is_empty() {
                    message.channel_id = channel_id.clone();
                }
            }

            if track_deletions && bot.is_moderated_channel(channel_id) {
                detect_deleted(&bot, &mut recent, channel_id).await;
                let kept: Vec<Message> = messages
                    .iter()
                    .filter(|m| !bot.is_own_message(m))
                    .cloned()
                    .collect();
                recent.remember(channel_id, &kept);
            }

            for message in messages {
                tokio::spawn(Arc::clone(&bot).handle_message(message));
            }
        }
    }
}
