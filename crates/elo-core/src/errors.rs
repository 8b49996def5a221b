/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the core can
/// decide per variant whether a failure is user-facing, skippable or fatal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    /// The provider does not know the player, or the player has no profile for
    /// the tracked game.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transient provider failure (timeout, non-2xx, malformed body).
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// A message could not be delivered to a chat.
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl Error {
    /// Storage-class failures: the operation in flight failed, nothing else.
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Io(_) | Error::Json(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
