//! Per-user UgPhone credential store backed by one JSON file.
//!
//! File shape: `{ "<telegram user id>": [ { "ug_id": "...", "token": "..." } ] }`.
//! The whole file is rewritten on every mutation; there is no partial update
//! and no cross-process locking.
//!
//! Loading is lenient on purpose: a missing, unreadable, malformed or legacy
//! (top-level JSON array) file yields an empty store. Old list-shaped data is
//! dropped rather than migrated.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    domain::{Account, UserId},
    Result,
};

type AccountMap = BTreeMap<String, Vec<Account>>;

/// Result of [`AccountStore::add`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Updated,
}

impl AddOutcome {
    pub fn message(self) -> &'static str {
        match self {
            AddOutcome::Added => "Account added.",
            AddOutcome::Updated => "Account updated.",
        }
    }
}

pub struct AccountStore {
    path: PathBuf,
    accounts: Mutex<AccountMap>,
}

impl AccountStore {
    /// Open the store at `path`, starting empty when the file is absent or unusable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let accounts = load_accounts(&path);
        info!(
            path = %path.display(),
            users = accounts.len(),
            "account store loaded"
        );
        Self {
            path,
            accounts: Mutex::new(accounts),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert, or replace the token when `ug_id` already exists for this user.
    ///
    /// Memory only changes once the file write succeeded.
    pub async fn add(&self, user: UserId, token: &str, ug_id: &str) -> Result<AddOutcome> {
        let mut accounts = self.accounts.lock().await;
        let mut next = accounts.clone();
        let list = next.entry(user.to_string()).or_default();

        let outcome = match list.iter_mut().find(|acc| acc.ug_id == ug_id) {
            Some(existing) => {
                existing.token = token.to_string();
                AddOutcome::Updated
            }
            None => {
                list.push(Account {
                    ug_id: ug_id.to_string(),
                    token: token.to_string(),
                });
                AddOutcome::Added
            }
        };

        save_accounts(&self.path, &next)?;
        *accounts = next;
        Ok(outcome)
    }

    /// Remove `ug_id` for this user. Returns `false` (and writes nothing) when absent.
    /// On a failed write the account stays in memory too.
    pub async fn remove(&self, user: UserId, ug_id: &str) -> Result<bool> {
        let mut accounts = self.accounts.lock().await;
        let key = user.to_string();
        let Some(list) = accounts.get(&key) else {
            return Ok(false);
        };
        if !list.iter().any(|acc| acc.ug_id == ug_id) {
            return Ok(false);
        }

        let mut next = accounts.clone();
        if let Some(list) = next.get_mut(&key) {
            list.retain(|acc| acc.ug_id != ug_id);
            if list.is_empty() {
                next.remove(&key);
            }
        }

        save_accounts(&self.path, &next)?;
        *accounts = next;
        Ok(true)
    }

    /// Snapshot of this user's accounts in insertion order.
    pub async fn list(&self, user: UserId) -> Vec<Account> {
        self.accounts
            .lock()
            .await
            .get(&user.to_string())
            .cloned()
            .unwrap_or_default()
    }

    pub async fn all_users(&self) -> Vec<UserId> {
        self.accounts
            .lock()
            .await
            .keys()
            .filter_map(|k| match k.parse::<i64>() {
                Ok(id) => Some(UserId(id)),
                Err(_) => {
                    warn!(key = %k, "skipping non-numeric user id in account store");
                    None
                }
            })
            .collect()
    }

    pub async fn contains(&self, user: UserId, ug_id: &str) -> bool {
        self.accounts
            .lock()
            .await
            .get(&user.to_string())
            .is_some_and(|list| list.iter().any(|acc| acc.ug_id == ug_id))
    }
}

fn load_accounts(path: &Path) -> AccountMap {
    if !path.exists() {
        return AccountMap::new();
    }

    let txt = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            warn!(path = %path.display(), "failed to read account store, starting empty: {e}");
            return AccountMap::new();
        }
    };
    parse_accounts(&txt)
}

fn parse_accounts(txt: &str) -> AccountMap {
    let value: serde_json::Value = match serde_json::from_str(txt) {
        Ok(v) => v,
        Err(e) => {
            warn!("account store is not valid JSON, starting empty: {e}");
            return AccountMap::new();
        }
    };

    if value.is_array() {
        warn!("account store uses the legacy list format; old data is ignored");
        return AccountMap::new();
    }

    match serde_json::from_value::<AccountMap>(value) {
        Ok(map) => map,
        Err(e) => {
            warn!("account store has an unexpected shape, starting empty: {e}");
            AccountMap::new()
        }
    }
}

fn save_accounts(path: &Path, accounts: &AccountMap) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let txt = serde_json::to_string_pretty(accounts)?;
    fs::write(path, txt)?;
    Ok(())
}
