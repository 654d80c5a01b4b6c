//! User object as returned by the API.

use serde::{Deserialize, Serialize};

use super::UserId;

/// A Discord user, either a person or a bot account.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,

    pub username: String,

    #[serde(default)]
    global_name: Option<String>,

    /// Set for bot accounts; absent for regular users.
    #[serde(default)]
    pub bot: bool,
}

impl User {
    pub fn new(id: &str, username: &str) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_string(),
            global_name: None,
            bot: false,
        }
    }

    /// Display name shown in the client, falling back to the username.
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }
}
