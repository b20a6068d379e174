use crate::domain::UserId;

/// Allow-list check. An empty allow-list means the bot serves everyone.
pub fn is_authorized(user_id: Option<UserId>, allowed_users: &[i64]) -> bool {
    let Some(uid) = user_id else {
        return false;
    };
    allowed_users.is_empty() || allowed_users.contains(&uid.0)
}
