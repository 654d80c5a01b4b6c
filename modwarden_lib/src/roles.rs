//! Role id to role name table, rebuilt from every known guild on a fixed interval.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::api::DiscordApi;

/// Human readable role name, as configured in whitelists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleName(String);

impl RoleName {
    /// Sentinel returned for role ids the cache does not know.
    pub const UNKNOWN_STR: &'static str = "UNKNOWN";

    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN_STR.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN_STR
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type RoleTable = HashMap<String, RoleName>;

/// Cached role table. Each refresh replaces the whole table, so roles
/// deleted from a guild disappear on the next cycle.
#[derive(Debug, Default)]
pub struct RoleCache {
    table: RwLock<RoleTable>,
}

impl RoleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of `role_id`, or [`RoleName::unknown`] if it is not cached.
    pub fn lookup(&self, role_id: &str) -> RoleName {
        self.table
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(role_id)
            .cloned()
            .unwrap_or_else(RoleName::unknown)
    }

    /// Swaps in a freshly built table.
    pub fn replace(&self, table: RoleTable) {
        *self.table.write().unwrap_or_else(|e| e.into_inner()) = table;
    }

    pub fn len(&self) -> usize {
        self.table.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fetches the roles of every guild and merges them into one table.
///
/// A guild whose roles cannot be fetched is skipped; the cycle goes on with
/// the remaining guilds.
pub async fn refresh<A: DiscordApi + ?Sized>(api: &A, guild_ids: &[String]) -> RoleTable {
    let mut table = RoleTable::new();
    for guild_id in guild_ids {
        match api.fetch_guild_roles(guild_id).await {
            Ok(roles) => {
                tracing::debug!(guild_id = %guild_id, roles = roles.len(), "fetched guild roles");
                for role in roles {
                    table.insert(role.id, RoleName(role.name));
                }
            }
            Err(e) => {
                tracing::warn!(guild_id = %guild_id, error = %e, "failed to get roles of guild");
            }
        }
    }
    table
}
