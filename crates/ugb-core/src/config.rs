use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

const PLACEHOLDER_BOT_TOKEN: &str = "your_telegram_bot_token_here";

/// Typed configuration for the bot.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    /// Empty means the bot is open to everyone.
    pub telegram_allowed_users: Vec<i64>,

    // Persistence
    pub accounts_file: PathBuf,

    // UgPhone API
    pub ugphone_base_url: String,
    pub request_timeout: Duration,
    pub validation_timeout: Duration,

    // Purchase job
    pub purchase_interval: Duration,
    pub purchase_first_delay: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (the process env in
    /// production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() || telegram_bot_token.trim() == PLACEHOLDER_BOT_TOKEN
        {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN not set (add it to the environment or .env)".to_string(),
            ));
        }
        let telegram_allowed_users = parse_csv_i64(get("TELEGRAM_ALLOWED_USERS"));

        let accounts_file =
            PathBuf::from(get("ACCOUNTS_FILE").unwrap_or_else(|| "accounts.json".to_string()));

        let ugphone_base_url = get("UGPHONE_BASE_URL")
            .unwrap_or_else(|| "https://www.ugphone.com".to_string())
            .trim_end_matches('/')
            .to_string();
        let request_timeout = secs(get("UGPHONE_REQUEST_TIMEOUT_SECS"), 30);
        let validation_timeout = secs(get("UGPHONE_VALIDATION_TIMEOUT_SECS"), 10);

        let purchase_interval = secs(get("PURCHASE_INTERVAL_SECS"), 60);
        if purchase_interval.is_zero() {
            return Err(Error::Config(
                "PURCHASE_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        let purchase_first_delay = secs(get("PURCHASE_FIRST_DELAY_SECS"), 10);

        Ok(Self {
            telegram_bot_token,
            telegram_allowed_users,
            accounts_file,
            ugphone_base_url,
            request_timeout,
            validation_timeout,
            purchase_interval,
            purchase_first_delay,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn secs(v: Option<String>, default: u64) -> Duration {
    Duration::from_secs(
        v.and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(default),
    )
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
