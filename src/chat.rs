//! Telegram command surface: long-polls for `/like <uid>` and answers with a
//! verification link.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::AppError;
use crate::issuance;
use crate::notify::templates;
use crate::state::{AppState, SharedState};
use crate::telegram::{Message, TelegramClient};

const POLL_SECS: u64 = 25;
const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, PartialEq)]
pub enum Command<'a> {
    Like(Option<&'a str>),
}

/// Parse `/like`, `/like@SomeBot`, and their first argument. Anything else is
/// not a command this bot handles.
pub fn parse_command(text: &str) -> Option<Command<'_>> {
    let mut parts = text.split_whitespace();
    let head = parts.next()?.strip_prefix('/')?;
    let name = head.split('@').next()?;

    match name {
        "like" => Some(Command::Like(parts.next())),
        _ => None,
    }
}

/// Build the reply for a `/like` command.
pub async fn respond(
    state: &AppState,
    requester_id: i64,
    requester_name: &str,
    target_id: Option<&str>,
) -> String {
    if !state.config.is_allowed(requester_id) {
        tracing::info!(requester_id, "Rejected command from caller outside the allow-list");
        return templates::render_not_allowed();
    }

    let Some(target_id) = target_id else {
        return templates::render_usage();
    };

    match issuance::issue(state, requester_id, target_id).await {
        Ok(issued) => templates::render_request(
            requester_name,
            target_id,
            &issued.link,
            state.config.token_ttl,
        ),
        Err(AppError::Unauthorized(_)) => templates::render_not_allowed(),
        Err(AppError::BadRequest(msg)) => format!("{msg}\n{}", templates::render_usage()),
        Err(e) => {
            tracing::error!(requester_id, "Failed to issue verification link: {e}");
            "Something went wrong, please try again later.".to_string()
        }
    }
}

pub async fn handle_message(state: &AppState, client: &TelegramClient, message: &Message) {
    let Some(Command::Like(target_id)) = message.text.as_deref().and_then(parse_command) else {
        return;
    };
    let Some(from) = &message.from else {
        return;
    };

    let reply = respond(state, from.id, &from.full_name(), target_id).await;
    if let Err(e) = client.send_message(message.chat.id, &reply, None).await {
        tracing::warn!(chat_id = message.chat.id, "Failed to send command reply: {e}");
    }
}

pub async fn run_poller(
    state: SharedState,
    client: Arc<TelegramClient>,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!("Command poller started");
    let mut offset: Option<i64> = None;

    loop {
        if *shutdown.borrow() {
            break;
        }

        let updates = tokio::select! {
            updates = client.get_updates(offset, POLL_SECS) => updates,
            _ = shutdown.changed() => break,
        };

        match updates {
            Ok(updates) => {
                for update in updates {
                    offset = Some(update.update_id + 1);
                    if let Some(message) = &update.message {
                        handle_message(&state, &client, message).await;
                    }
                }
            }
            Err(e) => {
                tracing::warn!("getUpdates failed: {e}");
                tokio::select! {
                    _ = tokio::time::sleep(RETRY_DELAY) => {}
                    _ = shutdown.changed() => break,
                }
            }
        }
    }

    tracing::info!("Command poller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_like_with_argument() {
        assert_eq!(parse_command("/like U1"), Some(Command::Like(Some("U1"))));
        assert_eq!(parse_command("  /like   U1  extra"), Some(Command::Like(Some("U1"))));
    }

    #[test]
    fn parses_like_addressed_to_bot() {
        assert_eq!(
            parse_command("/like@VerifyBot 123"),
            Some(Command::Like(Some("123")))
        );
    }

    #[test]
    fn like_without_argument() {
        assert_eq!(parse_command("/like"), Some(Command::Like(None)));
    }

    #[test]
    fn ignores_other_text() {
        assert_eq!(parse_command("like U1"), None);
        assert_eq!(parse_command("/start"), None);
        assert_eq!(parse_command(""), None);
    }
}
