use crate::domain::Account;

pub const REMOVE_PREFIX: &str = "REMOVE:";
pub const REMOVE_CANCEL: &str = "REMOVE_CANCEL";

/// Inline keyboard (buttons), one button per row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub buttons: Vec<InlineButton>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineKeyboard {
    pub fn new(buttons: Vec<InlineButton>) -> Self {
        Self { buttons }
    }

    /// One "Delete" button per account plus a trailing cancel button.
    pub fn remove_accounts(accounts: &[Account]) -> Self {
        let mut buttons: Vec<InlineButton> = accounts
            .iter()
            .map(|acc| InlineButton {
                label: format!("Delete ID: {}", acc.ug_id),
                callback_data: format!("{REMOVE_PREFIX}{}", acc.ug_id),
            })
            .collect();
        buttons.push(InlineButton {
            label: "Cancel".to_string(),
            callback_data: REMOVE_CANCEL.to_string(),
        });
        Self { buttons }
    }
}

/// Parsed inline-button payloads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    Remove { ug_id: String },
    CancelRemove,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        if data == REMOVE_CANCEL {
            return Some(Self::CancelRemove);
        }
        let ug_id = data.strip_prefix(REMOVE_PREFIX)?;
        if ug_id.is_empty() {
            return None;
        }
        Some(Self::Remove {
            ug_id: ug_id.to_string(),
        })
    }
}
