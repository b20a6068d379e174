use std::sync::Arc;

use teloxide::prelude::*;
use tracing::warn;

use ugb_core::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    messaging::types::CallbackAction,
    security::is_authorized,
};

use crate::router::AppState;

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    let user_id = UserId(q.from.id.0 as i64);
    let data = q.data.clone().unwrap_or_default();
    let origin = q.message.as_ref().map(|m| MessageRef {
        chat_id: ChatId(m.chat.id.0),
        message_id: MessageId(m.id.0),
    });

    if !is_authorized(Some(user_id), &state.cfg.telegram_allowed_users) {
        answer(&state, &q.id, Some("Unauthorized")).await;
        return Ok(());
    }

    // Always answer so the client stops its spinner.
    answer(&state, &q.id, None).await;

    let Some(action) = CallbackAction::parse(&data) else {
        warn!(user_id = user_id.0, data = %data, "unknown callback data");
        return Ok(());
    };

    state.accounts.handle_callback(user_id, origin, action).await;
    Ok(())
}

async fn answer(state: &AppState, callback_id: &str, text: Option<&str>) {
    if let Err(e) = state.messenger.answer_callback_query(callback_id, text).await {
        warn!(error = %e, "failed to answer callback query");
    }
}
