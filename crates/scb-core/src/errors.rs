use crate::domain::UserId;

/// Core error type for the quiz bot.
///
/// Adapter crates should map their specific errors into this type so the
/// conversation layer can tell user-facing conditions (no session, bad answer)
/// apart from infrastructure failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no active quiz for user {}", user.0)]
    SessionNotFound { user: UserId },

    #[error("invalid answer: {text:?} (expected yes or no)")]
    InvalidAnswer { text: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
