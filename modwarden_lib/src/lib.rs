//! Library layer for modwarden: shared caches, moderation handlers and the wipe command.
//!
//! Wraps the `modwarden_api` REST client with retries behind the [`DiscordApi`]
//! trait, and keeps the guild, role and user state the handlers consult.

pub mod api;
pub mod bot;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod moderation;
pub mod readiness;
pub mod roles;
pub mod tasks;
pub mod users;
pub mod wipe;

#[cfg(test)]
mod testing;

pub use modwarden_api;
pub use modwarden_api::types;

pub use api::DiscordApi;
pub use bot::Bot;
pub use cache::TtlList;
pub use client::{RetryConfig, RetryingClient};
pub use config::Config;
pub use error::BotError;
pub use moderation::InviteResolver;
pub use readiness::ReadinessGate;
pub use roles::{RoleCache, RoleName};
pub use tasks::{spawn_background_tasks, Shutdown};
pub use users::{ServerUser, UserCache};
pub use wipe::WipeOutcome;
