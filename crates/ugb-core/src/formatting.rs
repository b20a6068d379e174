//! Telegram HTML rendering for every message the bot sends.

use chrono::{DateTime, Local};

use crate::domain::Account;

/// Shown alongside a fatal purchase failure.
const CRITICAL_ADVICE: &str = "Purchase failed and account removed. \
You must use a new UgPhone account that has never claimed a trial \
and has already claimed the 250 Diamonds bonus for new users.";

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// `abcde...vwxyz` for tokens longer than 10 chars, `***` otherwise.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 10 {
        return "***".to_string();
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 5..].iter().collect();
    format!("{head}...{tail}")
}

/// `[HH:MM:SS] message`, the status line shown in progress messages.
pub fn stamped_status(at: DateTime<Local>, message: &str) -> String {
    format!("[{}] {message}", at.format("%H:%M:%S"))
}

pub fn help_html() -> String {
    "🤖 <b>Welcome to the UgPhone Auto-Buyer Bot!</b>\n\n\
<b>Commands:</b>\n\
/add - Add a UgPhone account (paste the UGPHONE-MQTT JSON)\n\
/list - List your accounts\n\
/remove - Remove an account\n\n\
The bot automatically checks for stock and attempts to purchase. \
You will receive status updates here."
        .to_string()
}

pub fn add_usage_html() -> String {
    "Please paste the <b>UGPHONE-MQTT</b> JSON after the command.\n\
Usage: <code>/add {\"access_token\": \"...\", \"login_id\": \"...\"}</code>"
        .to_string()
}

pub fn account_list_html(accounts: &[Account]) -> String {
    if accounts.is_empty() {
        return "You have no configured accounts.".to_string();
    }

    let mut out = "📋 <b>Your Accounts:</b>\n\n".to_string();
    for (i, acc) in accounts.iter().enumerate() {
        out.push_str(&format!(
            "{}. ID: <code>{}</code>\n   Token: <code>{}</code>\n\n",
            i + 1,
            escape_html(&acc.ug_id),
            escape_html(&mask_token(&acc.token))
        ));
    }
    out.trim_end().to_string()
}

pub fn success_html(ug_id: &str, message: &str) -> String {
    format!(
        "🎉 <b>SUCCESS!</b>\n\nAccount: <code>{}</code>\nMessage: {}\n\nAccount has been removed from the list.",
        escape_html(ug_id),
        escape_html(message)
    )
}

pub fn critical_html(ug_id: &str, message: &str) -> String {
    format!(
        "❌ <b>CRITICAL ERROR</b>\n\nAccount: <code>{}</code>\n\n{CRITICAL_ADVICE}\n\nOriginal Error: {}",
        escape_html(ug_id),
        escape_html(message)
    )
}

pub fn processing_html(ug_id: &str, status: &str) -> String {
    format!(
        "🔄 <b>Processing...</b>\nID: <code>{}</code>\nStatus: {}",
        escape_html(ug_id),
        escape_html(status)
    )
}
