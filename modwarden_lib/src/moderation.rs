//! Message moderation: keyword reports, invite link removal and deleted message reports.

use std::sync::LazyLock;
use std::time::Duration;

use modwarden_api::types::Message;
use regex::Regex;

use crate::api::DiscordApi;
use crate::bot::Bot;
use crate::error::BotError;

// discord.gg/abc, discord.com/invite/abc, discordapp.com/invite\abc
static INVITE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(https?://)?(www\.)?((discord(app)?\.com[/\\]invite)|(discord\.gg))[/\\]\w+")
        .expect("invite pattern is valid")
});

// Spammers post things like `https:/%20@@dis.army/chat/1` that redirect to an invite.
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https://?([^\s]+)").expect("link pattern is valid"));

pub fn is_discord_invitation(text: &str) -> bool {
    INVITE_RE.is_match(text)
}

/// Case-insensitive keyword match.
pub fn contains_keyword(content: &str, keywords: &[String]) -> bool {
    let content = content.to_lowercase();
    keywords
        .iter()
        .filter(|k| !k.is_empty())
        .any(|k| content.contains(&k.to_lowercase()))
}

/// Follows links to see where they end up.
///
/// Some hosts only forward to an invite when the request looks like it
/// comes from a browser, so the request carries browser headers.
pub struct InviteResolver {
    client: reqwest::Client,
    scheme: String,
}

impl InviteResolver {
    pub fn new(timeout: Duration) -> Result<Self, BotError> {
        Self::with_scheme("https", timeout)
    }

    /// Resolver that rewrites links to `scheme`. Used for testing with wiremock.
    pub fn with_scheme(scheme: &str, timeout: Duration) -> Result<Self, BotError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0")
            .build()?;
        Ok(Self {
            client,
            scheme: scheme.to_string(),
        })
    }

    /// Final URL after redirects, or `None` if the text has no link or the page cannot be opened.
    pub async fn resolve(&self, text: &str) -> Option<String> {
        let target = LINK_RE.captures(text)?.get(1)?.as_str();
        let url = format!("{}://{}", self.scheme, target);
        let resp = self
            .client
            .get(&url)
            .header("accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("accept-language", "en-US,en;q=0.5")
            .header("dnt", "1")
            .header("upgrade-insecure-requests", "1")
            .header("sec-fetch-dest", "document")
            .header("sec-fetch-mode", "navigate")
            .header("sec-fetch-site", "none")
            .header("sec-fetch-user", "?1")
            .header("pragma", "no-cache")
            .header("cache-control", "no-cache")
            .send()
            .await;
        match resp {
            Ok(resp) => Some(resp.url().to_string()),
            Err(e) => {
                tracing::info!(url = %url, error = %e, "cannot open linked page");
                None
            }
        }
    }

    /// Whether the text links to an invite, directly or through redirects.
    pub async fn links_to_invitation(&self, text: &str) -> bool {
        if is_discord_invitation(text) {
            return true;
        }
        match self.resolve(text).await {
            Some(final_url) => is_discord_invitation(&final_url),
            None => false,
        }
    }
}

/// Reports messages containing a configured keyword to the report channel.
pub async fn report_suspicious_message<A: DiscordApi>(bot: &Bot<A>, message: &Message) -> bool {
    let settings = &bot.config.features.suspicious_messages;
    if !settings.enabled || bot.is_own_message(message) {
        return false;
    }
    let Some(author) = &message.author else {
        return false;
    };
    if message.content.is_empty() {
        tracing::warn!(message_id = %message.id, "cannot get message content");
        return false;
    }
    if !contains_keyword(&message.content, &settings.keywords) {
        return false;
    }
    if bot
        .is_user_whitelisted(&settings.whitelisted_roles, &author.id)
        .await
    {
        tracing::debug!(
            "User {}({}) has whitelisted role, message does not need to be reported",
            author.username,
            author.id
        );
        return false;
    }

    let report = format!(
        "Suspicious message on the server\n================================\nAuthor: <@{}>\nChannel: <#{}>\nMessage: ```{}```",
        author.id, message.channel_id, message.content,
    );
    tracing::info!("{}", report);
    bot.report(&report).await;
    true
}

/// Deletes messages that link to another server and warns the author.
pub async fn delete_invite_links<A: DiscordApi>(bot: &Bot<A>, message: &Message) -> bool {
    let settings = &bot.config.features.delete_invite_links;
    if !settings.enabled || bot.is_own_message(message) {
        return false;
    }
    let Some(author) = &message.author else {
        return false;
    };

    let is_invite = match bot.invite_resolver() {
        Some(resolver) => resolver.links_to_invitation(&message.content).await,
        None => is_discord_invitation(&message.content),
    };
    if !is_invite {
        return false;
    }
    if bot
        .is_user_whitelisted(&settings.whitelisted_roles, &author.id)
        .await
    {
        tracing::debug!(
            "User {}({}) has whitelisted role, invitation is allowed",
            author.username,
            author.id
        );
        return false;
    }

    bot.wiped_messages.add(message.id.clone(), true);
    let warning = settings.warn_message.replacen("%s", &author.id, 1);
    if let Err(e) = bot.api().send_message(&message.channel_id, &warning).await {
        tracing::error!(error = %e, "failed to send warn message after posting server invitation");
    }
    if let Err(e) = bot
        .api()
        .delete_message(&message.channel_id, &message.id)
        .await
    {
        tracing::error!(error = %e, "failed to delete message with posted server invitation");
        return false;
    }
    tracing::info!(author_id = %author.id, channel_id = %message.channel_id, "deleted server invitation");
    true
}

/// Reports a message that was deleted by someone other than the bot.
pub async fn report_deleted_message<A: DiscordApi>(bot: &Bot<A>, message: &Message) -> bool {
    let settings = &bot.config.features.report_deleted_messages;
    if !settings.enabled || bot.wiped_messages.contains(&message.id) {
        return false;
    }
    let Some(author) = &message.author else {
        tracing::warn!(message_id = %message.id, "message author is unknown");
        return false;
    };
    if bot
        .is_user_whitelisted(&settings.whitelisted_roles, &author.id)
        .await
    {
        tracing::debug!(
            "User {}({}) has whitelisted role, message does not need to be reported",
            author.username,
            author.id
        );
        return false;
    }

    let report = format!(
        "New deleted message on the server\n=================================\nAuthor: <@{}>\nChannel: <#{}>\nMessage: ```{}```",
        author.id, message.channel_id, message.content,
    );
    tracing::info!("{}", report);
    bot.report(&report).await;
    true
}
