//! Long-lived background loops.
//!
//! Every loop waits on its own ticker and on the shared shutdown signal, and
//! returns as soon as shutdown is requested. Errors are logged and the loop
//! moves on to its next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::api::DiscordApi;
use crate::bot::Bot;
use crate::cache::TtlList;
use crate::feed;
use crate::roles;

/// Receiving half of the process-wide shutdown signal.
pub type Shutdown = watch::Receiver<bool>;

/// Resolves once shutdown is requested or the sender is gone.
pub async fn shutdown_requested(shutdown: &mut Shutdown) {
    loop {
        let stop = *shutdown.borrow_and_update();
        if stop || shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Ticker whose first tick is one `period` from now.
fn ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Sweeps expired entries out of `list` every `period`.
pub async fn run_sweeper<T: PartialEq + Clone>(
    list: &TtlList<T>,
    period: Duration,
    mut shutdown: Shutdown,
) {
    let mut ticker = ticker(period);
    loop {
        let removed = list.sweep();
        tracing::info!(removed, remaining = list.len(), "cleared expired message ids from cache");

        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_requested(&mut shutdown) => return,
        }
    }
}

/// Rebuilds the role table every `period`, starting once guilds are known.
pub async fn run_role_refresher<A: DiscordApi>(
    bot: Arc<Bot<A>>,
    period: Duration,
    mut shutdown: Shutdown,
) {
    tokio::select! {
        guild_ids = bot.gate.wait_for_guilds() => {
            tracing::debug!(guilds = guild_ids.len(), "guild list available, caching roles");
        }
        _ = shutdown_requested(&mut shutdown) => return,
    }

    let mut ticker = ticker(period);
    loop {
        let guild_ids = bot.gate.guild_ids();
        let table = roles::refresh(bot.api(), &guild_ids).await;
        let count = table.len();
        bot.roles.replace(table);
        bot.gate.mark_role_cache_populated();
        tracing::info!(roles = count, guilds = guild_ids.len(), "role cache refreshed");

        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_requested(&mut shutdown) => return,
        }
    }
}

/// Fetches the bot's guilds and application id into the readiness gate.
pub async fn refresh_identity<A: DiscordApi>(bot: &Bot<A>) {
    match bot.api().current_guilds().await {
        Ok(guilds) if !guilds.is_empty() => {
            bot.gate
                .update_guild_ids(guilds.into_iter().map(|g| g.id).collect());
        }
        Ok(_) => tracing::warn!("bot is not a member of any guild"),
        Err(e) => tracing::warn!(error = %e, "failed to get list of guilds"),
    }

    match bot.api().current_application().await {
        Ok(app) if !app.id.is_empty() => bot.gate.update_application_id(&app.id),
        Ok(_) => tracing::warn!("application id is empty"),
        Err(e) => tracing::warn!(error = %e, "failed to get application id"),
    }
}

/// Keeps guild list and application id current.
pub async fn run_identity_poller<A: DiscordApi>(
    bot: Arc<Bot<A>>,
    period: Duration,
    mut shutdown: Shutdown,
) {
    let mut ticker = ticker(period);
    loop {
        refresh_identity(&bot).await;

        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_requested(&mut shutdown) => return,
        }
    }
}

/// Starts every background loop of the bot.
pub fn spawn_background_tasks<A: DiscordApi + 'static>(
    bot: &Arc<Bot<A>>,
    shutdown: &Shutdown,
) -> Vec<JoinHandle<()>> {
    let timings = bot.config.timings.clone();
    let mut handles = Vec::new();

    handles.push(tokio::spawn(run_identity_poller(
        Arc::clone(bot),
        timings.cache_ttl(),
        shutdown.clone(),
    )));
    handles.push(tokio::spawn(run_role_refresher(
        Arc::clone(bot),
        timings.cache_ttl(),
        shutdown.clone(),
    )));

    let sweeper_bot = Arc::clone(bot);
    let sweep_period = timings.cache_ttl();
    let sweeper_shutdown = shutdown.clone();
    handles.push(tokio::spawn(async move {
        run_sweeper(&sweeper_bot.wiped_messages, sweep_period, sweeper_shutdown).await
    }));

    let channels = bot.config.watched_channels();
    if channels.is_empty() {
        tracing::warn!("no channels to watch, message feed not started");
    } else {
        handles.push(tokio::spawn(feed::run_message_feed(
            Arc::clone(bot),
            channels,
            timings.poll_interval(),
            shutdown.clone(),
        )));
    }

    handles
}
