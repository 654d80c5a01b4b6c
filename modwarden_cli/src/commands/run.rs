//! The `run` subcommand: start the bot and its background tasks.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use modwarden_lib::config::TOKEN_ENV;
use modwarden_lib::modwarden_api::{Client, API_BASE_URL};
use modwarden_lib::{spawn_background_tasks, Bot, Config, InviteResolver, RetryConfig, RetryingClient};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Arguments for the `run` subcommand.
#[derive(Args)]
pub struct RunArgs {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "modwarden.toml")]
    pub config: PathBuf,
}

pub async fn run(config: Config) -> Result<()> {
    let token = config
        .token()
        .ok_or_else(|| anyhow!("no bot token: set bot_token in the config file or {}", TOKEN_ENV))?;
    let request_timeout = config.timings.request_timeout();
    let readiness_timeout = config.timings.readiness_timeout();

    let client = Client::with_base_url(API_BASE_URL, &token, request_timeout)?;
    let api = RetryingClient::new(client, RetryConfig::from_env());

    let resolve_redirects = config.features.delete_invite_links.resolve_redirects;
    let mut bot = Bot::new(config, api);
    if resolve_redirects {
        bot = bot.with_invite_resolver(InviteResolver::new(request_timeout)?);
    }
    let bot = Arc::new(bot);

    bot.load_bot_user()
        .await
        .context("failed to get bot user, check the token")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = spawn_background_tasks(&bot, &shutdown_rx);

    if let Err(e) = bot.gate.wait_until_ready(readiness_timeout).await {
        let _ = shutdown_tx.send(true);
        join_all(handles).await;
        return Err(e.into());
    }

    tracing::info!(
        guilds = bot.gate.guild_ids().len(),
        roles = bot.roles.len(),
        "Bot running...."
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    let _ = shutdown_tx.send(true);
    join_all(handles).await;
    Ok(())
}

async fn join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "background task ended abnormally");
        }
    }
}
