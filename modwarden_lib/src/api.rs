//! The seam between the moderation core and the Discord transport.

use async_trait::async_trait;
use modwarden_api::types::{Application, Member, Message, PartialGuild, Role, User};

use crate::error::BotError;

/// Operations the core needs from Discord.
///
/// [`crate::client::RetryingClient`] implements this over the REST client.
/// Implementations own their retry policy; callers treat every error as one
/// failed attempt.
#[async_trait]
pub trait DiscordApi: Send + Sync {
    /// All roles of a guild.
    async fn fetch_guild_roles(&self, guild_id: &str) -> Result<Vec<Role>, BotError>;

    /// Membership of `user_id` in `guild_id`, or `None` if the user is not a member.
    async fn fetch_guild_member(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> Result<Option<Member>, BotError>;

    /// The newest message of a channel, or `None` if the channel is empty.
    async fn fetch_latest_message(&self, channel_id: &str) -> Result<Option<Message>, BotError>;

    /// Up to `limit` messages newer than `after`, newest first.
    async fn fetch_messages_after(
        &self,
        channel_id: &str,
        after: &str,
        limit: u8,
    ) -> Result<Vec<Message>, BotError>;

    /// The newest `limit` messages of a channel, newest first.
    async fn fetch_recent_messages(
        &self,
        channel_id: &str,
        limit: u8,
    ) -> Result<Vec<Message>, BotError>;

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), BotError>;

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), BotError>;

    /// The bot's own user.
    async fn current_user(&self) -> Result<User, BotError>;

    /// Guilds the bot is a member of.
    async fn current_guilds(&self) -> Result<Vec<PartialGuild>, BotError>;

    async fn current_application(&self) -> Result<Application, BotError>;
}
