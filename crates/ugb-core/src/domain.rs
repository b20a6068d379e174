use serde::{Deserialize, Serialize};

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

impl UserId {
    /// Bot conversations are private chats, so the chat id equals the user id.
    pub fn chat(self) -> ChatId {
        ChatId(self.0)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// A stored UgPhone account. `ug_id` is the UgPhone login id and `token` the
/// access token; together they authenticate every API call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub ug_id: String,
    pub token: String,
}

impl Account {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            access_token: self.token.clone(),
            login_id: self.ug_id.clone(),
        }
    }
}

/// Header credentials for the UgPhone API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub login_id: String,
}
