//! The wipe command: delete the newest message of a channel until it is
//! empty or too many calls have failed.
//!
//! Only one wipe runs at a time in the whole process. A second command that
//! arrives while a wipe is running is dropped without touching the API.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use modwarden_api::types::Message;
use tokio::time::Instant;

use crate::api::DiscordApi;
use crate::bot::Bot;
use crate::error::BotError;

/// Why a command did not start a wipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    NotCommand,
    InactiveChannel,
    UnknownAuthor,
    OwnMessage,
    NotWhitelisted,
}

/// Why a running wipe stopped before the channel was empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    ErrorBudgetExhausted,
    DeadlineExceeded,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::ErrorBudgetExhausted => f.write_str("too many errors"),
            AbortReason::DeadlineExceeded => f.write_str("time limit reached"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WipeOutcome {
    /// Another wipe was already running.
    Rejected,
    Skipped(SkipReason),
    Completed { deleted: usize },
    Aborted { deleted: usize, reason: AbortReason },
}

/// Holds the process-wide wipe flag; clears it when dropped.
struct WipeGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> WipeGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for WipeGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Counters of one wipe invocation.
#[derive(Debug)]
pub struct WipeSession {
    pub error_budget: u32,
    pub deleted_count: usize,
    pub deadline: Instant,
}

impl WipeSession {
    fn record_error(&mut self) {
        self.error_budget = self.error_budget.saturating_sub(1);
    }

    /// Deadline for one API call: `request_timeout` from now, but never past the session deadline.
    fn call_deadline(&self, request_timeout: std::time::Duration) -> Instant {
        (Instant::now() + request_timeout).min(self.deadline)
    }
}

async fn with_deadline<T, F>(deadline: Instant, what: &'static str, call: F) -> Result<T, BotError>
where
    F: Future<Output = Result<T, BotError>>,
{
    tokio::time::timeout_at(deadline, call)
        .await
        .map_err(|_| BotError::Timeout(what))?
}

/// Handles a possible wipe command.
pub async fn command_wipe<A: DiscordApi>(bot: &Bot<A>, message: &Message) -> WipeOutcome {
    let Some(_guard) = WipeGuard::acquire(&bot.wipe_in_progress) else {
        tracing::info!("Wipe command is still running. Wait before it finishes");
        return WipeOutcome::Rejected;
    };

    if let Err(reason) = check_preconditions(bot, message).await {
        tracing::debug!(?reason, message_id = %message.id, "wipe command skipped");
        return WipeOutcome::Skipped(reason);
    }

    let outcome = run(bot, &message.channel_id).await;

    let (deleted, aborted) = match outcome {
        WipeOutcome::Completed { deleted } => (deleted, None),
        WipeOutcome::Aborted { deleted, reason } => (deleted, Some(reason)),
        other => return other,
    };
    let author_id = message.author.as_ref().map_or("", |a| a.id.as_str());
    let mut report = format!(
        "Wipe channel command received\n=================================\nAuthor: <@{}>\nChannel: <#{}>\nMessages deleted: {}",
        author_id, message.channel_id, deleted,
    );
    if let Some(reason) = aborted {
        report.push_str(&format!("\nStopped early: {}", reason));
    }
    tracing::info!("{}", report);
    bot.report(&report).await;

    outcome
}

async fn check_preconditions<A: DiscordApi>(
    bot: &Bot<A>,
    message: &Message,
) -> Result<(), SkipReason> {
    let settings = &bot.config.commands.wipe;
    if !settings.enabled {
        return Err(SkipReason::Disabled);
    }
    if !message.content.starts_with(&settings.command) {
        return Err(SkipReason::NotCommand);
    }
    if message.channel_id.is_empty() || !settings.active_channels.contains(&message.channel_id) {
        return Err(SkipReason::InactiveChannel);
    }
    let Some(author) = &message.author else {
        return Err(SkipReason::UnknownAuthor);
    };
    if bot.is_own_message(message) {
        return Err(SkipReason::OwnMessage);
    }
    if !bot
        .is_user_whitelisted(&settings.whitelisted_roles, &author.id)
        .await
    {
        tracing::debug!(
            "User {}({}) is not allowed to execute wipe command",
            author.username,
            author.id
        );
        return Err(SkipReason::NotWhitelisted);
    }
    Ok(())
}

async fn run<A: DiscordApi>(bot: &Bot<A>, channel_id: &str) -> WipeOutcome {
    let settings = &bot.config.commands.wipe;
    let api = bot.api();
    let mut session = WipeSession {
        error_budget: settings.error_budget,
        deleted_count: 0,
        deadline: Instant::now() + settings.deadline(),
    };

    loop {
        if session.error_budget < 1 {
            tracing::error!(channel_id, "Too many errors during wipe command, exiting");
            return WipeOutcome::Aborted {
                deleted: session.deleted_count,
                reason: AbortReason::ErrorBudgetExhausted,
            };
        }
        if Instant::now() >= session.deadline {
            tracing::error!(channel_id, "Wipe command ran out of time, exiting");
            return WipeOutcome::Aborted {
                deleted: session.deleted_count,
                reason: AbortReason::DeadlineExceeded,
            };
        }

        tracing::debug!(channel_id, "Getting message to be deleted");
        let latest = with_deadline(
            session.call_deadline(settings.request_timeout()),
            "fetch latest message",
            api.fetch_latest_message(channel_id),
        )
        .await;

        let message = match latest {
            Ok(Some(message)) => message,
            Ok(None) => break,
            Err(e) => {
                session.record_error();
                tracing::error!(channel_id, error = %e, budget = session.error_budget, "Failed to fetch messages");
                continue;
            }
        };

        bot.wiped_messages.add(message.id.clone(), true);
        tokio::time::sleep(settings.pacing()).await;

        tracing::info!(channel_id, message_id = %message.id, written = %message.timestamp, "Deleting message");
        let deleted = with_deadline(
            session.call_deadline(settings.request_timeout()),
            "delete message",
            api.delete_message(channel_id, &message.id),
        )
        .await;

        match deleted {
            Ok(()) => session.deleted_count += 1,
            Err(e) => {
                session.record_error();
                tracing::error!(channel_id, message_id = %message.id, error = %e, budget = session.error_budget, "Failed to delete message");
            }
        }
    }

    WipeOutcome::Completed {
        deleted: session.deleted_count,
    }
}
