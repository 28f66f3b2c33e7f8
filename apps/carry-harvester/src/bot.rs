//! Chat commands and publishing.
//!
//! Commands: `/start` subscribes, `/stop` unsubscribes, `/top` replays the
//! latest cycle summary to the caller. Any other text is ignored.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use quantlaxmi_carry::RankedViews;
use quantlaxmi_carry_store::{ChatId, SubscriberStore};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::format::cycle_messages;
use crate::telegram::{BotApi, Notifier};

pub const SUBSCRIBED: &str = "You are subscribed to carry updates.";
pub const ALREADY_SUBSCRIBED: &str = "You are already subscribed.";
pub const UNSUBSCRIBED: &str = "You are unsubscribed. Send /start to subscribe again.";
pub const NO_DATA_YET: &str = "No data yet. The first summary arrives after the next scheduled refresh.";

const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Latest ranked views, shared between the cycle runner and `/top`.
pub type LatestViews = Arc<RwLock<Option<RankedViews>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Top,
}

/// Parse a bot command. Accepts `/cmd`, `/cmd@BotName` and trailing arguments.
pub fn parse_command(text: &str) -> Option<Command> {
    let word = text.split_whitespace().next()?;
    let name = word.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name);
    match name.to_ascii_lowercase().as_str() {
        "start" => Some(Command::Start),
        "stop" => Some(Command::Stop),
        "top" => Some(Command::Top),
        _ => None,
    }
}

pub async fn handle_command(
    command: Command,
    chat_id: ChatId,
    subscribers: &dyn SubscriberStore,
    latest: &LatestViews,
    notifier: &dyn Notifier,
) -> Result<()> {
    match command {
        Command::Start => {
            let added = subscribers.add(chat_id)?;
            info!(chat_id, added, "[BOT] /start");
            let reply = if added { SUBSCRIBED } else { ALREADY_SUBSCRIBED };
            notifier.send_html(chat_id, reply).await
        }
        Command::Stop => {
            let removed = subscribers.remove(chat_id)?;
            info!(chat_id, removed, "[BOT] /stop");
            notifier.send_html(chat_id, UNSUBSCRIBED).await
        }
        Command::Top => {
            let messages = latest.read().await.as_ref().map(cycle_messages);
            match messages {
                Some(messages) => {
                    for message in &messages {
                        notifier.send_html(chat_id, message).await?;
                    }
                    Ok(())
                }
                None => notifier.send_html(chat_id, NO_DATA_YET).await,
            }
        }
    }
}

/// Delivery outcome of one publication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishStats {
    pub recipients: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Send the cycle's three messages to every subscriber. A failing recipient
/// is logged and skipped.
pub async fn publish(
    notifier: &dyn Notifier,
    subscribers: &dyn SubscriberStore,
    views: &RankedViews,
) -> Result<PublishStats> {
    let chats = subscribers.list()?;
    let messages = cycle_messages(views);
    let mut stats = PublishStats {
        recipients: chats.len(),
        ..Default::default()
    };

    for chat_id in chats {
        for message in &messages {
            match notifier.send_html(chat_id, message).await {
                Ok(()) => stats.sent += 1,
                Err(e) => {
                    stats.failed += 1;
                    warn!(chat_id, error = %e, "[BOT] Failed to deliver message");
                }
            }
        }
    }

    info!(
        recipients = stats.recipients,
        sent = stats.sent,
        failed = stats.failed,
        "[BOT] Cycle published"
    );
    Ok(stats)
}

/// Long-poll `getUpdates` forever, dispatching commands.
pub async fn poll_updates(
    api: Arc<BotApi>,
    subscribers: Arc<dyn SubscriberStore>,
    latest: LatestViews,
    timeout_secs: u64,
) {
    let mut offset: Option<i64> = None;
    info!("[BOT] Polling for commands");

    loop {
        let updates = match api.get_updates(offset, timeout_secs).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "[BOT] getUpdates failed");
                tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                continue;
            }
        };

        for update in updates {
            offset = Some(update.update_id + 1);
            let Some(message) = update.message else {
                continue;
            };
            let Some(command) = message.text.as_deref().and_then(parse_command) else {
                continue;
            };
            if let Err(e) = handle_command(
                command,
                message.chat.id,
                subscribers.as_ref(),
                &latest,
                api.as_ref(),
            )
            .await
            {
                warn!(chat_id = message.chat.id, error = %e, "[BOT] Command failed");
            }
        }
    }
}
