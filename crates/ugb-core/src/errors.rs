/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the purchase
/// workflow can tell a timeout apart from every other failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
