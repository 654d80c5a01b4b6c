//! TOML configuration file.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::BotError;

/// Environment variable consulted when the file has no `bot_token`.
pub const TOKEN_ENV: &str = "DISCORD_TOKEN";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Channel receiving wipe summaries and moderation reports.
    pub report_channel: String,

    #[serde(default)]
    pub debug: bool,

    /// Channels watched by the moderation features.
    #[serde(default)]
    pub moderated_channels: Vec<String>,

    #[serde(default)]
    pub timings: Timings,

    #[serde(default)]
    pub features: Features,

    #[serde(default)]
    pub commands: Commands,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub cache_ttl_secs: u64,
    pub request_timeout_secs: u64,
    /// How often watched channels are polled for new messages.
    pub poll_interval_secs: u64,
    pub readiness_timeout_secs: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            request_timeout_secs: 10,
            poll_interval_secs: 5,
            readiness_timeout_secs: 30,
        }
    }
}

impl Timings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_secs(self.readiness_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Features {
    pub suspicious_messages: SuspiciousMessages,
    pub delete_invite_links: DeleteInviteLinks,
    pub report_deleted_messages: ReportDeletedMessages,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SuspiciousMessages {
    pub enabled: bool,
    pub keywords: Vec<String>,
    pub whitelisted_roles: Vec<String>,
}

/// Reports messages that disappear from a moderated channel.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportDeletedMessages {
    pub enabled: bool,
    pub whitelisted_roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeleteInviteLinks {
    pub enabled: bool,
    pub whitelisted_roles: Vec<String>,
    /// `%s` is replaced with the author's user id.
    pub warn_message: String,
    /// Follow `https:/...` links and check where they end up.
    pub resolve_redirects: bool,
}

impl Default for DeleteInviteLinks {
    fn default() -> Self {
        Self {
            enabled: false,
            whitelisted_roles: Vec::new(),
            warn_message: "<@%s> posting server invitations is not allowed".to_string(),
            resolve_redirects: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Commands {
    pub wipe: WipeSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WipeSettings {
    pub enabled: bool,
    /// Prefix a message must start with to trigger a wipe.
    pub command: String,
    pub whitelisted_roles: Vec<String>,
    pub active_channels: Vec<String>,
    pub error_budget: u32,
    pub deadline_secs: u64,
    pub request_timeout_secs: u64,
    pub pacing_ms: u64,
}

impl Default for WipeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            command: "!wipe".to_string(),
            whitelisted_roles: Vec::new(),
            active_channels: Vec::new(),
            error_budget: 5,
            deadline_secs: 300,
            request_timeout_secs: 10,
            pacing_ms: 100,
        }
    }
}

impl WipeSettings {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, BotError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, BotError> {
        Ok(toml::from_str(raw)?)
    }

    /// Token from the file, falling back to `DISCORD_TOKEN`.
    pub fn token(&self) -> Option<String> {
        self.bot_token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty()))
    }

    /// Checks the values a running bot cannot do without.
    pub fn validate(&self) -> Result<(), BotError> {
        if self.report_channel.trim().is_empty() {
            return Err(BotError::Config("report_channel must not be empty".into()));
        }
        let wipe = &self.commands.wipe;
        if wipe.enabled {
            if wipe.command.trim().is_empty() {
                return Err(BotError::Config("commands.wipe.command must not be empty".into()));
            }
            if wipe.error_budget == 0 {
                return Err(BotError::Config("commands.wipe.error_budget must be at least 1".into()));
            }
            if wipe.deadline_secs == 0 || wipe.request_timeout_secs == 0 {
                return Err(BotError::Config(
                    "commands.wipe.deadline_secs and commands.wipe.request_timeout_secs must be positive"
                        .into(),
                ));
            }
        }
        if self.timings.cache_ttl_secs == 0 || self.timings.poll_interval_secs == 0 {
            return Err(BotError::Config(
                "timings.cache_ttl_secs and timings.poll_interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Every channel the message feed has to poll, without duplicates.
    pub fn watched_channels(&self) -> Vec<String> {
        let mut channels = self.moderated_channels.clone();
        if self.commands.wipe.enabled {
            for channel in &self.commands.wipe.active_channels {
                if !channels.contains(channel) {
                    channels.push(channel.clone());
                }
            }
        }
        channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
bot_token = "abc"
report_channel = "100"
debug = true
moderated_channels = ["200", "300"]

[timings]
cache_ttl_secs = 60

[features.suspicious_messages]
enabled = true
keywords = ["Free Nitro"]
whitelisted_roles = ["Moderator"]

[features.delete_invite_links]
enabled = true
warn_message = "<@%s> no invites"

[features.report_deleted_messages]
enabled = true
whitelisted_roles = ["Moderator", "Admin"]

[commands.wipe]
enabled = true
command = "!purge"
whitelisted_roles = ["Admin"]
active_channels = ["300", "400"]
"#;

    #[test]
    fn parse_full_config() {
        let config = Config::from_toml_str(FULL).unwrap();
        assert_eq!(config.report_channel, "100");
        assert!(config.debug);
        assert_eq!(config.timings.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.timings.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.features.suspicious_messages.keywords, vec!["Free Nitro"]);
        assert_eq!(config.features.delete_invite_links.warn_message, "<@%s> no invites");
        assert!(!config.features.delete_invite_links.resolve_redirects);
        assert!(config.features.report_deleted_messages.enabled);
        assert_eq!(
            config.features.report_deleted_messages.whitelisted_roles,
            vec!["Moderator", "Admin"]
        );
        assert_eq!(config.commands.wipe.command, "!purge");
        assert_eq!(config.commands.wipe.error_budget, 5);
        assert_eq!(config.commands.wipe.deadline(), Duration::from_secs(300));
        assert_eq!(config.token().as_deref(), Some("abc"));
        config.validate().unwrap();
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_toml_str(r#"report_channel = "1""#).unwrap();
        assert!(!config.commands.wipe.enabled);
        assert!(!config.features.suspicious_messages.enabled);
        assert!(!config.features.report_deleted_messages.enabled);
        assert_eq!(config.timings.readiness_timeout(), Duration::from_secs(30));
        assert_eq!(config.commands.wipe.pacing(), Duration::from_millis(100));
        config.validate().unwrap();
    }

    #[test]
    fn missing_report_channel_is_parse_error() {
        let err = Config::from_toml_str("debug = true").unwrap_err();
        assert!(matches!(err, BotError::Config(_)));
    }

    #[test]
    fn validate_rejects_empty_wipe_command() {
        let mut config = Config::from_toml_str(FULL).unwrap();
        config.commands.wipe.command = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_wipe_timeouts() {
        let mut config = Config::from_toml_str(FULL).unwrap();
        config.commands.wipe.deadline_secs = 0;
        assert!(matches!(config.validate(), Err(BotError::Config(_))));

        let mut config = Config::from_toml_str(FULL).unwrap();
        config.commands.wipe.request_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(BotError::Config(_))));

        // only checked while the command is enabled
        config.commands.wipe.enabled = false;
        config.validate().unwrap();
    }

    #[test]
    fn watched_channels_merges_without_duplicates() {
        let config = Config::from_toml_str(FULL).unwrap();
        assert_eq!(config.watched_channels(), vec!["200", "300", "400"]);
    }
}
