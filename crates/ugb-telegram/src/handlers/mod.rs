//! Telegram update handlers.
//!
//! Every handler checks the allow-list first, then talks to chat only through
//! the shared [`MessagingPort`](ugb_core::messaging::port::MessagingPort).

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message},
};
use tracing::{info, warn};

use ugb_core::{
    domain::{ChatId, UserId},
    security::is_authorized,
};

use crate::router::AppState;

mod callback;
mod commands;

const UNAUTHORIZED: &str = "Unauthorized. Contact the bot owner for access.";
const NOT_A_COMMAND: &str = "Send /start to see the available commands.";

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    callback::handle_callback(q, state).await
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = ChatId(msg.chat.id.0);
    let user_id = msg.from().map(|u| UserId(u.id.0 as i64));

    if !is_authorized(user_id, &state.cfg.telegram_allowed_users) {
        info!(user_id = ?user_id.map(|u| u.0), "unauthorized message");
        reply(&state, chat_id, UNAUTHORIZED).await;
        return Ok(());
    }

    // Channel posts and the like carry no sender; nothing to own accounts.
    let Some(user_id) = user_id else {
        return Ok(());
    };

    match msg.text() {
        Some(text) if text.starts_with('/') => {
            commands::handle_command(text, user_id, chat_id, state).await
        }
        Some(_) => {
            reply(&state, chat_id, NOT_A_COMMAND).await;
            Ok(())
        }
        None => Ok(()),
    }
}

/// Best-effort send; delivery failures are logged only.
async fn reply(state: &AppState, chat_id: ChatId, html: &str) {
    if let Err(e) = state.messenger.send_html(chat_id, html).await {
        warn!(chat_id = chat_id.0, error = %e, "failed to send reply");
    }
}
