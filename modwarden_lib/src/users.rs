//! Per-user profile cache, filled lazily from guild membership lookups.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::api::DiscordApi;
use crate::error::BotError;
use crate::readiness::ReadinessGate;
use crate::roles::{RoleCache, RoleName};

/// A guild member as the moderation features see it: role ids already
/// resolved to names.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerUser {
    pub id: String,
    pub username: String,
    pub roles: Vec<RoleName>,
    valid_until: Option<Instant>,
}

impl ServerUser {
    pub fn new(id: &str, username: &str, roles: Vec<RoleName>) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_string(),
            roles,
            valid_until: None,
        }
    }

    /// Set when the user is stored in a [`UserCache`].
    pub fn valid_until(&self) -> Option<Instant> {
        self.valid_until
    }

    pub fn has_any_role(&self, names: &[String]) -> bool {
        names
            .iter()
            .any(|name| self.roles.iter().any(|role| role.as_str() == name))
    }
}

/// Thread-safe user cache with time-to-live expiration.
///
/// Expired entries are reported as absent but stay in the map until they
/// are overwritten.
pub struct UserCache {
    store: DashMap<String, ServerUser>,
    ttl: Duration,
}

impl UserCache {
    /// Creates a new cache with the given time-to-live for entries.
    pub fn new(ttl: Duration) -> Self {
        Self {
            store: DashMap::new(),
            ttl,
        }
    }

    /// Returns the cached user, or `None` if missing or expired.
    pub fn get(&self, user_id: &str) -> Option<ServerUser> {
        let entry = self.store.get(user_id)?;
        match entry.valid_until {
            Some(valid_until) if Instant::now() < valid_until => Some(entry.clone()),
            _ => None,
        }
    }

    /// Inserts or overwrites a user. The entry expires after the configured TTL.
    pub fn put(&self, user_id: &str, mut user: ServerUser) {
        user.valid_until = Some(Instant::now() + self.ttl);
        self.store.insert(user_id.to_string(), user);
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

/// Returns the user from the cache, or looks them up guild by guild.
///
/// The first guild that knows the user wins; its role ids are resolved
/// through the role cache and the result is cached.
pub async fn resolve_user<A: DiscordApi + ?Sized>(
    api: &A,
    gate: &ReadinessGate,
    roles: &RoleCache,
    users: &UserCache,
    user_id: &str,
) -> Result<ServerUser, BotError> {
    if let Some(user) = users.get(user_id) {
        return Ok(user);
    }

    for guild_id in gate.guild_ids() {
        let member = match api.fetch_guild_member(&guild_id, user_id).await {
            Ok(Some(member)) => member,
            Ok(None) => {
                tracing::debug!(user_id, guild_id = %guild_id, "user does not belong to guild");
                continue;
            }
            Err(e) => {
                tracing::debug!(user_id, guild_id = %guild_id, error = %e, "failed to fetch guild member");
                continue;
            }
        };

        let Some(member_user) = member.user else {
            tracing::warn!(user_id, guild_id = %guild_id, "user belongs to guild, but details not available");
            continue;
        };

        let role_names = member.roles.iter().map(|id| roles.lookup(id)).collect();
        let user = ServerUser::new(user_id, &member_user.username, role_names);
        users.put(user_id, user.clone());
        return Ok(users.get(user_id).unwrap_or(user));
    }

    Err(BotError::UserNotInAnyGuild(user_id.to_string()))
}

/// Whether `user_id` holds at least one of `whitelisted_roles`.
///
/// An empty whitelist or a failed lookup never whitelists anyone.
pub async fn is_user_whitelisted<A: DiscordApi + ?Sized>(
    api: &A,
    gate: &ReadinessGate,
    roles: &RoleCache,
    users: &UserCache,
    whitelisted_roles: &[String],
    user_id: &str,
) -> bool {
    if whitelisted_roles.is_empty() {
        return false;
    }
    match resolve_user(api, gate, roles, users, user_id).await {
        Ok(user) => user.has_any_role(whitelisted_roles),
        Err(e) => {
            tracing::warn!(user_id, error = %e, "failed to resolve user");
            false
        }
    }
}
