//! Message types and request/response bodies for the channel message endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChannelId, GuildId, MessageId, User};

/// A message posted in a channel.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Message {
    pub id: MessageId,

    pub channel_id: ChannelId,

    /// Not included by the REST channel endpoints; filled in by callers that know it.
    #[serde(default)]
    pub guild_id: Option<GuildId>,

    /// Webhook messages may carry a partial author; system messages may omit it.
    #[serde(default)]
    pub author: Option<User>,

    #[serde(default)]
    pub content: String,

    pub timestamp: DateTime<Utc>,
}

/// Body of `POST /channels/{channel.id}/messages`.
#[derive(Serialize, Debug)]
pub struct CreateMessage<'a> {
    pub content: &'a str,
}

/// Body of a 429 response.
#[derive(Deserialize, Debug)]
pub struct RateLimitBody {
    #[serde(default)]
    pub message: String,

    /// Seconds to wait before retrying.
    pub retry_after: f64,

    #[serde(default)]
    pub global: bool,
}
