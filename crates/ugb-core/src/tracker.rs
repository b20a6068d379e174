//! In-memory record of the last progress message sent per (user, account).
//!
//! Lost on restart. The worst case after a restart is one extra status message
//! per account, so this stays out of the persisted store.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::domain::{MessageId, UserId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackerEntry {
    pub last_message_id: MessageId,
    pub last_status: String,
}

#[derive(Default)]
pub struct StatusTracker {
    entries: Mutex<HashMap<(UserId, String), TrackerEntry>>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user: UserId, ug_id: &str) -> Option<TrackerEntry> {
        self.entries
            .lock()
            .await
            .get(&(user, ug_id.to_string()))
            .cloned()
    }

    pub async fn update(&self, user: UserId, ug_id: &str, message_id: MessageId, status: &str) {
        self.entries.lock().await.insert(
            (user, ug_id.to_string()),
            TrackerEntry {
                last_message_id: message_id,
                last_status: status.to_string(),
            },
        );
    }

    /// Record a new status for an entry whose message was edited in place.
    /// No-op when the entry was cleared in the meantime.
    pub async fn touch(&self, user: UserId, ug_id: &str, status: &str) {
        if let Some(entry) = self.entries.lock().await.get_mut(&(user, ug_id.to_string())) {
            entry.last_status = status.to_string();
        }
    }

    pub async fn clear(&self, user: UserId, ug_id: &str) -> bool {
        self.entries
            .lock()
            .await
            .remove(&(user, ug_id.to_string()))
            .is_some()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
