//! In-memory [`DiscordApi`] used by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use modwarden_api::types::{Application, Member, Message, PartialGuild, Role, User};

use crate::api::DiscordApi;
use crate::error::BotError;

pub const BOT_USER_ID: &str = "bot";

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CallCounts {
    pub fetch_guild_roles: usize,
    pub fetch_guild_member: usize,
    pub fetch_latest_message: usize,
    pub fetch_messages_after: usize,
    pub fetch_recent_messages: usize,
    pub delete_message: usize,
    pub send_message: usize,
    pub current_user: usize,
    pub current_guilds: usize,
    pub current_application: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.fetch_guild_roles
            + self.fetch_guild_member
            + self.fetch_latest_message
            + self.fetch_messages_after
            + self.fetch_recent_messages
            + self.delete_message
            + self.send_message
            + self.current_user
            + self.current_guilds
            + self.current_application
    }
}

#[derive(Default)]
struct MockState {
    roles: HashMap<String, Vec<Role>>,
    failing_role_guilds: HashSet<String>,
    members: HashMap<(String, String), Member>,
    failing_member_guilds: HashSet<String>,
    /// Oldest first.
    channels: HashMap<String, Vec<Message>>,
    fetch_failures: usize,
    delete_failures: usize,
    deleted: Vec<String>,
    sent: Vec<(String, String)>,
    guilds: Vec<PartialGuild>,
    application_id: Option<String>,
    fetch_delay: Option<Duration>,
    calls: CallCounts,
}

#[derive(Default)]
pub struct MockApi {
    state: Mutex<MockState>,
}

pub fn message(id: &str, channel_id: &str, author_id: &str, content: &str) -> Message {
    Message {
        id: id.to_string(),
        channel_id: channel_id.to_string(),
        guild_id: None,
        author: Some(User::new(author_id, author_id)),
        content: content.to_string(),
        timestamp: Utc::now(),
    }
}

fn transient() -> BotError {
    BotError::Api(modwarden_api::Error::HttpStatus {
        status: 503,
        body: "unavailable".to_string(),
    })
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn add_roles(&self, guild_id: &str, roles: Vec<Role>) {
        self.with_state(|s| s.roles.insert(guild_id.to_string(), roles));
    }

    pub fn fail_roles_for(&self, guild_id: &str) {
        self.with_state(|s| s.failing_role_guilds.insert(guild_id.to_string()));
    }

    pub fn add_member(&self, guild_id: &str, user_id: &str, username: &str, role_ids: &[&str]) {
        let member = Member {
            user: Some(User::new(user_id, username)),
            nick: None,
            roles: role_ids.iter().map(|r| r.to_string()).collect(),
            joined_at: None,
        };
        self.with_state(|s| {
            s.members
                .insert((guild_id.to_string(), user_id.to_string()), member)
        });
    }

    pub fn fail_members_for(&self, guild_id: &str) {
        self.with_state(|s| s.failing_member_guilds.insert(guild_id.to_string()));
    }

    /// Appends a message as the newest of its channel.
    pub fn push_message(&self, message: Message) {
        self.with_state(|s| {
            s.channels
                .entry(message.channel_id.clone())
                .or_default()
                .push(message)
        });
    }

    /// The next `n` latest-message fetches fail.
    pub fn fail_next_fetches(&self, n: usize) {
        self.with_state(|s| s.fetch_failures = n);
    }

    /// The next `n` deletes fail.
    pub fn fail_next_deletes(&self, n: usize) {
        self.with_state(|s| s.delete_failures = n);
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        self.with_state(|s| s.fetch_delay = Some(delay));
    }

    pub fn set_identity(&self, guild_ids: &[&str], application_id: &str) {
        self.with_state(|s| {
            s.guilds = guild_ids.iter().map(|g| PartialGuild::new(g, g)).collect();
            s.application_id = Some(application_id.to_string());
        });
    }

    pub fn calls(&self) -> CallCounts {
        self.with_state(|s| s.calls.clone())
    }

    pub fn deleted(&self) -> Vec<String> {
        self.with_state(|s| s.deleted.clone())
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.with_state(|s| s.sent.clone())
    }

    /// Removes a message as if a moderator had deleted it.
    pub fn remove_message(&self, channel_id: &str, message_id: &str) {
        self.with_state(|s| {
            if let Some(msgs) = s.channels.get_mut(channel_id) {
                msgs.retain(|m| m.id != message_id);
            }
        });
    }

    pub fn remaining(&self, channel_id: &str) -> usize {
        self.with_state(|s| s.channels.get(channel_id).map_or(0, Vec::len))
    }
}

#[async_trait]
impl DiscordApi for MockApi {
    async fn fetch_guild_roles(&self, guild_id: &str) -> Result<Vec<Role>, BotError> {
        self.with_state(|s| {
            s.calls.fetch_guild_roles += 1;
            if s.failing_role_guilds.contains(guild_id) {
                return Err(transient());
            }
            Ok(s.roles.get(guild_id).cloned().unwrap_or_default())
        })
    }

    async fn fetch_guild_member(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> Result<Option<Member>, BotError> {
        self.with_state(|s| {
            s.calls.fetch_guild_member += 1;
            if s.failing_member_guilds.contains(guild_id) {
                return Err(transient());
            }
            Ok(s.members
                .get(&(guild_id.to_string(), user_id.to_string()))
                .cloned())
        })
    }

    async fn fetch_latest_message(&self, channel_id: &str) -> Result<Option<Message>, BotError> {
        let delay = self.with_state(|s| {
            s.calls.fetch_latest_message += 1;
            s.fetch_delay
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.with_state(|s| {
            if s.fetch_failures > 0 {
                s.fetch_failures -= 1;
                return Err(transient());
            }
            Ok(s.channels.get(channel_id).and_then(|m| m.last().cloned()))
        })
    }

    async fn fetch_messages_after(
        &self,
        channel_id: &str,
        after: &str,
        limit: u8,
    ) -> Result<Vec<Message>, BotError> {
        self.with_state(|s| {
            s.calls.fetch_messages_after += 1;
            let after: u64 = after.parse().unwrap_or(0);
            let mut newer: Vec<Message> = s
                .channels
                .get(channel_id)
                .map(|msgs| {
                    msgs.iter()
                        .filter(|m| m.id.parse::<u64>().unwrap_or(0) > after)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            newer.reverse();
            newer.truncate(limit as usize);
            Ok(newer)
        })
    }

    async fn fetch_recent_messages(
        &self,
        channel_id: &str,
        limit: u8,
    ) -> Result<Vec<Message>, BotError> {
        self.with_state(|s| {
            s.calls.fetch_recent_messages += 1;
            let mut recent: Vec<Message> = s.channels.get(channel_id).cloned().unwrap_or_default();
            recent.reverse();
            recent.truncate(limit as usize);
            Ok(recent)
        })
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), BotError> {
        self.with_state(|s| {
            s.calls.delete_message += 1;
            if s.delete_failures > 0 {
                s.delete_failures -= 1;
                return Err(transient());
            }
            if let Some(msgs) = s.channels.get_mut(channel_id) {
                msgs.retain(|m| m.id != message_id);
            }
            s.deleted.push(message_id.to_string());
            Ok(())
        })
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), BotError> {
        self.with_state(|s| {
            s.calls.send_message += 1;
            s.sent.push((channel_id.to_string(), content.to_string()));
            Ok(())
        })
    }

    async fn current_user(&self) -> Result<User, BotError> {
        self.with_state(|s| {
            s.calls.current_user += 1;
            Ok(User::new(BOT_USER_ID, "modwarden"))
        })
    }

    async fn current_guilds(&self) -> Result<Vec<PartialGuild>, BotError> {
        self.with_state(|s| {
            s.calls.current_guilds += 1;
            Ok(s.guilds.clone())
        })
    }

    async fn current_application(&self) -> Result<Application, BotError> {
        self.with_state(|s| {
            s.calls.current_application += 1;
            s.application_id
                .clone()
                .map(|id| Application {
                    id,
                    name: "modwarden".to_string(),
                })
                .ok_or(BotError::Api(modwarden_api::Error::NotFound))
        })
    }
}
