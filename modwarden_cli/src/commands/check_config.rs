//! The `check-config` subcommand.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use modwarden_lib::Config;

/// Arguments for the `check-config` subcommand.
#[derive(Args)]
pub struct CheckConfigArgs {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "modwarden.toml")]
    pub config: PathBuf,
}

pub fn run(args: &CheckConfigArgs) -> Result<()> {
    let config = super::load_config(&args.config)?;
    print!("{}", summary(&config));
    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

fn summary(config: &Config) -> String {
    let features = &config.features;
    let wipe = &config.commands.wipe;
    let mut out = String::new();
    out.push_str(&format!("report channel:      {}\n", config.report_channel));
    out.push_str(&format!(
        "token:               {}\n",
        if config.token().is_some() { "present" } else { "missing" }
    ));
    out.push_str(&format!(
        "moderated channels:  {}\n",
        config.moderated_channels.len()
    ));
    out.push_str(&format!(
        "suspicious messages: {} ({} keywords)\n",
        on_off(features.suspicious_messages.enabled),
        features.suspicious_messages.keywords.len()
    ));
    out.push_str(&format!(
        "invite links:        {}{}\n",
        on_off(features.delete_invite_links.enabled),
        if features.delete_invite_links.resolve_redirects {
            " (following redirects)"
        } else {
            ""
        }
    ));
    out.push_str(&format!(
        "deleted messages:    {}\n",
        on_off(features.report_deleted_messages.enabled)
    ));
    out.push_str(&format!(
        "wipe command:        {} ({} in {} channels)\n",
        on_off(wipe.enabled),
        wipe.command,
        wipe.active_channels.len()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_features() {
        let config = Config::from_toml_str(
            r#"
bot_token = "abc"
report_channel = "reports"
moderated_channels = ["a", "b"]

[features.suspicious_messages]
enabled = true
keywords = ["nitro"]

[commands.wipe]
enabled = true
active_channels = ["a"]
"#,
        )
        .unwrap();
        let text = summary(&config);
        assert!(text.contains("report channel:      reports"));
        assert!(text.contains("token:               present"));
        assert!(text.contains("moderated channels:  2"));
        assert!(text.contains("suspicious messages: on (1 keywords)"));
        assert!(text.contains("invite links:        off\n"));
        assert!(text.contains("deleted messages:    off\n"));
        assert!(text.contains("wipe command:        on (!wipe in 1 channels)"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let args = CheckConfigArgs {
            config: PathBuf::from("/nonexistent/modwarden.toml"),
        };
        let err = run(&args).unwrap_err();
        assert!(err.to_string().contains("failed to load config"));
    }

    #[test]
    fn invalid_file_is_rejected() {
        let path = std::env::temp_dir().join(format!("modwarden-check-{}.toml", std::process::id()));
        std::fs::write(&path, "report_channel = \"\"\n").unwrap();
        let result = run(&CheckConfigArgs { config: path.clone() });
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }
}
