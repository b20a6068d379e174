//! Account management behind the chat commands.
//!
//! `/add`, `/list`, `/remove` and the remove buttons all go through
//! [`AccountService`], which only sees the messaging and API ports. Chat
//! delivery failures are logged, never surfaced.

use std::{sync::Arc, time::Duration};

use tracing::{error, info, warn};

use crate::{
    credentials::parse_credentials,
    domain::{ChatId, MessageRef, UserId},
    formatting::{account_list_html, add_usage_html, escape_html},
    messaging::{
        port::MessagingPort,
        types::{CallbackAction, InlineKeyboard},
    },
    purchase::{validate_credentials, UgPhoneApi},
    store::AccountStore,
    tracker::StatusTracker,
};

pub const VALIDATING: &str = "⏳ Validating credentials...";
pub const NO_ACCOUNTS_TO_REMOVE: &str = "You have no accounts to remove.";
pub const REMOVE_PROMPT: &str = "Select an account to remove:";
pub const REMOVAL_CANCELLED: &str = "Removal cancelled.";

pub struct AccountService {
    store: Arc<AccountStore>,
    tracker: Arc<StatusTracker>,
    api: Arc<dyn UgPhoneApi>,
    messenger: Arc<dyn MessagingPort>,
    validation_timeout: Duration,
}

impl AccountService {
    pub fn new(
        store: Arc<AccountStore>,
        tracker: Arc<StatusTracker>,
        api: Arc<dyn UgPhoneApi>,
        messenger: Arc<dyn MessagingPort>,
        validation_timeout: Duration,
    ) -> Self {
        Self {
            store,
            tracker,
            api,
            messenger,
            validation_timeout,
        }
    }

    /// `/add <json>`: parse, validate against the API, then store.
    ///
    /// Nothing is stored unless validation succeeds.
    pub async fn add(&self, user: UserId, chat_id: ChatId, args: &str) {
        if args.trim().is_empty() {
            self.reply(chat_id, &add_usage_html()).await;
            return;
        }

        let creds = match parse_credentials(args) {
            Ok(c) => c,
            Err(e) => {
                self.reply(chat_id, &format!("❌ Error: {}", escape_html(&e.to_string())))
                    .await;
                return;
            }
        };

        let pending = match self.messenger.send_html(chat_id, VALIDATING).await {
            Ok(m) => Some(m),
            Err(e) => {
                warn!(user_id = user.0, error = %e, "failed to send validation notice");
                None
            }
        };

        let check = validate_credentials(self.api.as_ref(), &creds, self.validation_timeout).await;

        let result = if !check.success {
            info!(user_id = user.0, ug_id = %creds.login_id, reason = %check.message, "credentials rejected");
            format!("❌ Validation Failed: {}", escape_html(&check.message))
        } else {
            match self
                .store
                .add(user, &creds.access_token, &creds.login_id)
                .await
            {
                Ok(outcome) => {
                    info!(user_id = user.0, ug_id = %creds.login_id, ?outcome, "account stored");
                    format!(
                        "✅ {} (ID: <code>{}</code>)",
                        outcome.message(),
                        escape_html(&creds.login_id)
                    )
                }
                Err(e) => {
                    error!(user_id = user.0, ug_id = %creds.login_id, error = %e, "failed to persist account");
                    format!("❌ Failed to save account: {}", escape_html(&e.to_string()))
                }
            }
        };

        self.edit_or_send(pending, chat_id, &result).await;
    }

    pub async fn list(&self, user: UserId, chat_id: ChatId) {
        let accounts = self.store.list(user).await;
        self.reply(chat_id, &account_list_html(&accounts)).await;
    }

    /// `/remove`: one button per account, or a plain note when there are none.
    pub async fn prompt_removal(&self, user: UserId, chat_id: ChatId) {
        let accounts = self.store.list(user).await;
        if accounts.is_empty() {
            self.reply(chat_id, NO_ACCOUNTS_TO_REMOVE).await;
            return;
        }

        if let Err(e) = self
            .messenger
            .send_inline_keyboard(chat_id, REMOVE_PROMPT, InlineKeyboard::remove_accounts(&accounts))
            .await
        {
            // Telegram rejects the whole keyboard when one button's data exceeds 64 bytes.
            warn!(user_id = user.0, error = %e, "failed to send remove keyboard");
            self.reply(
                chat_id,
                &format!(
                    "❌ Could not show the removal menu: {}",
                    escape_html(&e.to_string())
                ),
            )
            .await;
        }
    }

    /// Apply a pressed remove-keyboard button and rewrite the prompt it came from.
    pub async fn handle_callback(
        &self,
        user: UserId,
        origin: Option<MessageRef>,
        action: CallbackAction,
    ) {
        let text = match action {
            CallbackAction::Remove { ug_id } => self.remove(user, &ug_id).await,
            CallbackAction::CancelRemove => REMOVAL_CANCELLED.to_string(),
        };

        match origin {
            Some(msg) => {
                if let Err(e) = self.messenger.edit_html(msg, &text).await {
                    warn!(user_id = user.0, error = %e, "failed to edit remove prompt");
                }
            }
            None => self.reply(user.chat(), &text).await,
        }
    }

    async fn remove(&self, user: UserId, ug_id: &str) -> String {
        let removed = self.store.remove(user, ug_id).await;

        // The tracker may only hold entries for accounts that still exist.
        if !self.store.contains(user, ug_id).await {
            self.tracker.clear(user, ug_id).await;
        }

        match removed {
            Ok(true) => {
                info!(user_id = user.0, ug_id, "account removed by user");
                format!("✅ Account <code>{}</code> removed.", escape_html(ug_id))
            }
            Ok(false) => format!(
                "❌ Account <code>{}</code> not found or already removed.",
                escape_html(ug_id)
            ),
            Err(e) => {
                error!(user_id = user.0, ug_id, error = %e, "failed to remove account");
                format!("❌ Failed to remove account: {}", escape_html(&e.to_string()))
            }
        }
    }

    async fn edit_or_send(&self, pending: Option<MessageRef>, chat_id: ChatId, html: &str) {
        if let Some(msg) = pending {
            match self.messenger.edit_html(msg, html).await {
                Ok(()) => return,
                Err(e) => warn!(chat_id = chat_id.0, error = %e, "edit failed; sending instead"),
            }
        }
        self.reply(chat_id, html).await;
    }

    async fn reply(&self, chat_id: ChatId, html: &str) {
        if let Err(e) = self.messenger.send_html(chat_id, html).await {
            warn!(chat_id = chat_id.0, error = %e, "failed to send reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::MessageId,
        purchase::{ApiResponse, Endpoint},
        testing::{FakeApi, FakeMessenger, FakeReply},
    };
    use serde_json::json;
    use std::path::PathBuf;

    const USER: UserId = UserId(42);
    const CHAT: ChatId = ChatId(42);
    const BLOB: &str = r#"{"access_token": "tok-1", "login_id": "X"}"#;

    struct Harness {
        path: PathBuf,
        store: Arc<AccountStore>,
        tracker: Arc<StatusTracker>,
        api: Arc<FakeApi>,
        messenger: Arc<FakeMessenger>,
        service: AccountService,
    }

    impl Harness {
        fn new(prefix: &str, api: FakeApi) -> Self {
            let ts = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos();
            let path =
                std::env::temp_dir().join(format!("{prefix}-{}-{ts}.json", std::process::id()));
            let store = Arc::new(AccountStore::open(&path));
            let tracker = Arc::new(StatusTracker::new());
            let api = Arc::new(api);
            let messenger = Arc::new(FakeMessenger::default());
            let service = AccountService::new(
                store.clone(),
                tracker.clone(),
                api.clone(),
                messenger.clone(),
                Duration::from_secs(10),
            );
            Self {
                path,
                store,
                tracker,
                api,
                messenger,
                service,
            }
        }

        fn last_edit(&self) -> String {
            self.messenger
                .edited()
                .last()
                .map(|(_, text)| text.clone())
                .unwrap_or_default()
        }
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    #[tokio::test]
    async fn rejected_credentials_are_not_stored() {
        let api = FakeApi::default();
        api.set(
            Endpoint::ConfigList,
            FakeReply::Ok(ApiResponse::ok(json!({ "code": 401, "msg": "bad token" }))),
        );
        let h = Harness::new("ugb-accounts-reject", api);

        h.service.add(USER, CHAT, BLOB).await;

        assert!(h.store.list(USER).await.is_empty());
        assert_eq!(h.messenger.sent()[0].1, VALIDATING);
        assert_eq!(h.last_edit(), "❌ Validation Failed: API Error: bad token");

        let calls = h.api.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].login_id, "X");
        assert_eq!(
            h.api.timeout_for(Endpoint::ConfigList),
            Some(Some(Duration::from_secs(10)))
        );
    }

    #[tokio::test]
    async fn adding_known_ug_id_reports_update() {
        let h = Harness::new("ugb-accounts-update", FakeApi::happy("1"));

        h.service.add(USER, CHAT, BLOB).await;
        assert_eq!(h.last_edit(), "✅ Account added. (ID: <code>X</code>)");

        h.service
            .add(USER, CHAT, r#"{"access_token": "tok-2", "login_id": "X"}"#)
            .await;
        assert_eq!(h.last_edit(), "✅ Account updated. (ID: <code>X</code>)");

        let list = h.store.list(USER).await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].token, "tok-2");
    }

    #[tokio::test]
    async fn malformed_blob_and_missing_args_never_call_the_api() {
        let h = Harness::new("ugb-accounts-malformed", FakeApi::happy("1"));

        h.service.add(USER, CHAT, "").await;
        h.service.add(USER, CHAT, "{oops").await;

        let sent = h.messenger.sent();
        assert!(sent[0].1.contains("UGPHONE-MQTT"));
        assert_eq!(sent[1].1, "❌ Error: Invalid JSON format.");
        assert!(h.api.calls().is_empty());
        assert!(h.store.list(USER).await.is_empty());
    }

    #[tokio::test]
    async fn failed_edit_falls_back_to_a_new_message() {
        let h = Harness::new("ugb-accounts-edit-fail", FakeApi::happy("1"));
        h.messenger.fail_edits(true);

        h.service.add(USER, CHAT, BLOB).await;

        let sent = h.messenger.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].1, "✅ Account added. (ID: <code>X</code>)");
    }

    #[tokio::test]
    async fn removal_clears_the_tracker_entry() {
        let h = Harness::new("ugb-accounts-remove", FakeApi::default());
        h.store.add(USER, "T", "X").await.unwrap();
        h.tracker.update(USER, "X", MessageId(9), "[00:00:01] Out of stock").await;
        let prompt = MessageRef {
            chat_id: CHAT,
            message_id: MessageId(5),
        };

        h.service
            .handle_callback(
                USER,
                Some(prompt),
                CallbackAction::Remove {
                    ug_id: "X".to_string(),
                },
            )
            .await;

        assert!(!h.store.contains(USER, "X").await);
        assert!(h.tracker.get(USER, "X").await.is_none());
        assert_eq!(
            h.messenger.edited(),
            vec![(prompt, "✅ Account <code>X</code> removed.".to_string())]
        );
    }

    #[tokio::test]
    async fn removing_twice_reports_missing_account() {
        let h = Harness::new("ugb-accounts-remove-twice", FakeApi::default());
        h.store.add(USER, "T", "X").await.unwrap();
        let action = CallbackAction::Remove {
            ug_id: "X".to_string(),
        };

        h.service.handle_callback(USER, None, action.clone()).await;
        h.service.handle_callback(USER, None, action).await;

        let sent = h.messenger.sent();
        assert_eq!(sent[1].0, USER.chat());
        assert_eq!(
            sent[1].1,
            "❌ Account <code>X</code> not found or already removed."
        );
    }

    #[tokio::test]
    async fn cancel_rewrites_prompt_and_keeps_accounts() {
        let h = Harness::new("ugb-accounts-cancel", FakeApi::default());
        h.store.add(USER, "T", "X").await.unwrap();
        let prompt = MessageRef {
            chat_id: CHAT,
            message_id: MessageId(5),
        };

        h.service
            .handle_callback(USER, Some(prompt), CallbackAction::CancelRemove)
            .await;

        assert!(h.store.contains(USER, "X").await);
        assert_eq!(
            h.messenger.edited(),
            vec![(prompt, REMOVAL_CANCELLED.to_string())]
        );
    }

    #[tokio::test]
    async fn remove_prompt_lists_every_account() {
        let h = Harness::new("ugb-accounts-prompt", FakeApi::default());

        h.service.prompt_removal(USER, CHAT).await;
        assert_eq!(h.messenger.sent(), vec![(CHAT, NO_ACCOUNTS_TO_REMOVE.to_string())]);

        h.store.add(USER, "T", "A").await.unwrap();
        h.store.add(USER, "T", "B").await.unwrap();
        h.service.prompt_removal(USER, CHAT).await;

        let keyboards = h.messenger.keyboards();
        assert_eq!(keyboards.len(), 1);
        let (chat, text, keyboard) = &keyboards[0];
        assert_eq!(*chat, CHAT);
        assert_eq!(text, REMOVE_PROMPT);
        let data: Vec<&str> = keyboard
            .buttons
            .iter()
            .map(|b| b.callback_data.as_str())
            .collect();
        assert_eq!(data, vec!["REMOVE:A", "REMOVE:B", "REMOVE_CANCEL"]);
    }

    #[tokio::test]
    async fn rejected_keyboard_still_answers_the_user() {
        let h = Harness::new("ugb-accounts-prompt-fail", FakeApi::default());
        h.store.add(USER, "T", &"x".repeat(80)).await.unwrap();
        h.messenger.fail_keyboards(true);

        h.service.prompt_removal(USER, CHAT).await;

        let sent = h.messenger.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.starts_with("❌ Could not show the removal menu"));
    }
}
