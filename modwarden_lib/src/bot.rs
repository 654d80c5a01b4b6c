//! Shared bot state and the per-message entry point.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, OnceLock};

use modwarden_api::types::Message;

use crate::api::DiscordApi;
use crate::cache::TtlList;
use crate::config::Config;
use crate::error::BotError;
use crate::moderation::{self, InviteResolver};
use crate::readiness::ReadinessGate;
use crate::roles::RoleCache;
use crate::users::{self, ServerUser, UserCache};
use crate::wipe;

/// Everything the handlers and background tasks share.
///
/// Each cache guards itself; none of them is locked while another one is held.
pub struct Bot<A> {
    pub config: Config,
    api: A,
    pub gate: ReadinessGate,
    pub roles: RoleCache,
    pub users: UserCache,
    /// Ids of messages the bot removes itself, through a wipe or the invite
    /// filter, so the feed neither handles nor reports them again.
    pub wiped_messages: TtlList<String>,
    pub(crate) wipe_in_progress: AtomicBool,
    bot_user_id: OnceLock<String>,
    invite_resolver: Option<InviteResolver>,
}

impl<A: DiscordApi> Bot<A> {
    pub fn new(config: Config, api: A) -> Self {
        let ttl = config.timings.cache_ttl();
        Self {
            config,
            api,
            gate: ReadinessGate::new(),
            roles: RoleCache::new(),
            users: UserCache::new(ttl),
            wiped_messages: TtlList::new(ttl),
            wipe_in_progress: AtomicBool::new(false),
            bot_user_id: OnceLock::new(),
            invite_resolver: None,
        }
    }

    /// Enables following redirecting links before deciding they are not invites.
    pub fn with_invite_resolver(mut self, resolver: InviteResolver) -> Self {
        self.invite_resolver = Some(resolver);
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn invite_resolver(&self) -> Option<&InviteResolver> {
        self.invite_resolver.as_ref()
    }

    /// Fetches and remembers the bot's own user id. Later calls are no-ops.
    pub async fn load_bot_user(&self) -> Result<(), BotError> {
        if self.bot_user_id.get().is_some() {
            return Ok(());
        }
        let me = self.api.current_user().await?;
        tracing::info!(user_id = %me.id, username = %me.username, "logged in");
        let _ = self.bot_user_id.set(me.id);
        Ok(())
    }

    pub fn set_bot_user_id(&self, user_id: &str) {
        let _ = self.bot_user_id.set(user_id.to_string());
    }

    pub fn bot_user_id(&self) -> Option<&str> {
        self.bot_user_id.get().map(String::as_str)
    }

    /// Whether the message was written by this bot.
    pub fn is_own_message(&self, message: &Message) -> bool {
        match (&message.author, self.bot_user_id()) {
            (Some(author), Some(me)) => author.id == me,
            _ => false,
        }
    }

    pub fn is_moderated_channel(&self, channel_id: &str) -> bool {
        self.config
            .moderated_channels
            .iter()
            .any(|c| c == channel_id)
    }

    pub async fn resolve_user(&self, user_id: &str) -> Result<ServerUser, BotError> {
        users::resolve_user(&self.api, &self.gate, &self.roles, &self.users, user_id).await
    }

    pub async fn is_user_whitelisted(&self, whitelisted_roles: &[String], user_id: &str) -> bool {
        users::is_user_whitelisted(
            &self.api,
            &self.gate,
            &self.roles,
            &self.users,
            whitelisted_roles,
            user_id,
        )
        .await
    }

    /// Runs every message handler, in order, for one inbound message.
    pub async fn handle_message(self: Arc<Self>, message: Message) {
        if self.is_moderated_channel(&message.channel_id) {
            moderation::report_suspicious_message(&self, &message).await;
            moderation::delete_invite_links(&self, &message).await;
        }
        wipe::command_wipe(&self, &message).await;
    }

    /// Sends a report to the configured report channel. Failures are only logged.
    pub(crate) async fn report(&self, text: &str) {
        if let Err(e) = self
            .api
            .send_message(&self.config.report_channel, text)
            .await
        {
            tracing::error!(error = %e, "failed to send report");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{message, MockApi, BOT_USER_ID};

    fn config() -> Config {
        Config::from_toml_str(
            r#"
report_channel = "reports"
moderated_channels = ["general"]
"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn load_bot_user_once() {
        let bot = Bot::new(config(), MockApi::new());
        bot.load_bot_user().await.unwrap();
        bot.load_bot_user().await.unwrap();
        assert_eq!(bot.bot_user_id(), Some(BOT_USER_ID));
        assert_eq!(bot.api().calls().current_user, 1);
    }

    #[test]
    fn own_message_detection() {
        let bot = Bot::new(config(), MockApi::new());
        let mine = message("1", "general", BOT_USER_ID, "hi");
        assert!(!bot.is_own_message(&mine));

        bot.set_bot_user_id(BOT_USER_ID);
        assert!(bot.is_own_message(&mine));
        assert!(!bot.is_own_message(&message("2", "general", "someone", "hi")));

        let mut anonymous = message("3", "general", "x", "hi");
        anonymous.author = None;
        assert!(!bot.is_own_message(&anonymous));
    }

    #[test]
    fn moderated_channels() {
        let bot = Bot::new(config(), MockApi::new());
        assert!(bot.is_moderated_channel("general"));
        assert!(!bot.is_moderated_channel("random"));
    }

    #[tokio::test]
    async fn report_goes_to_report_channel() {
        let bot = Bot::new(config(), MockApi::new());
        bot.report("hello").await;
        assert_eq!(
            bot.api().sent(),
            vec![("reports".to_string(), "hello".to_string())]
        );
    }
}
