//! Guild-related types: roles, members, the bot's guild list and application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GuildId, RoleId, User};

/// A role defined in a guild.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: RoleId,

    pub name: String,

    #[serde(default)]
    color: u32,

    /// Position in the guild's role hierarchy.
    #[serde(default)]
    pub position: i64,

    #[serde(default)]
    managed: bool,
}

impl Role {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            color: 0,
            position: 0,
            managed: false,
        }
    }
}

/// Membership of a user in a guild. `roles` holds role ids, not names.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Member {
    /// Absent in some gateway payloads, always present on the REST member endpoint.
    pub user: Option<User>,

    #[serde(default)]
    pub nick: Option<String>,

    #[serde(default)]
    pub roles: Vec<RoleId>,

    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

/// Entry of `GET /users/@me/guilds`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PartialGuild {
    pub id: GuildId,

    pub name: String,

    #[serde(default)]
    owner: bool,
}

impl PartialGuild {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            owner: false,
        }
    }
}

/// The application the bot token belongs to.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Application {
    pub id: String,

    pub name: String,
}
