//! Error types for the library layer.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by the library layer, wrapping upstream API errors
/// and adding cache lookup, readiness, and configuration failures.
#[derive(Error, Debug)]
pub enum BotError {
    /// An error from the underlying API client.
    #[error("API error: {0}")]
    Api(#[from] modwarden_api::Error),
    /// The user is not a member of any guild the bot knows about.
    #[error("User {0} was not found in any guild")]
    UserNotInAnyGuild(String),
    /// Guilds, application id or roles did not arrive in time.
    #[error("Bot was not ready within {0:?}")]
    ReadinessTimeout(Duration),
    /// An external call did not finish before its deadline.
    #[error("{0} timed out")]
    Timeout(&'static str),
    /// The configuration file is missing values or could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for BotError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}
