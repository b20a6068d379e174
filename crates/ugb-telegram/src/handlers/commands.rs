use std::sync::Arc;

use teloxide::prelude::*;

use ugb_core::{
    domain::{ChatId, UserId},
    formatting::{escape_html, help_html},
};

use super::reply;
use crate::router::AppState;

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub async fn handle_command(
    text: &str,
    user_id: UserId,
    chat_id: ChatId,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let (cmd, args) = parse_command(text);

    match cmd.as_str() {
        "start" | "help" => reply(&state, chat_id, &help_html()).await,
        "add" => state.accounts.add(user_id, chat_id, &args).await,
        "list" => state.accounts.list(user_id, chat_id).await,
        "remove" => state.accounts.prompt_removal(user_id, chat_id).await,
        _ => {
            reply(
                &state,
                chat_id,
                &format!(
                    "Unknown command: <code>/{}</code>\nSend /start for help.",
                    escape_html(&cmd)
                ),
            )
            .await
        }
    }

    Ok(())
}
