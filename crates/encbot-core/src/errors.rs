/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the core can
/// decide per failure whether it becomes a user-facing message, a pruned
/// broadcast target, or (at startup only) a fatal abort.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("nothing to process")]
    NoContent,

    #[error("file too large: {size} bytes (limit {limit})")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("file is not valid UTF-8 text")]
    NotText,

    #[error("invalid ciphertext")]
    InvalidCiphertext,

    #[error("unauthorized")]
    Unauthorized,

    #[error("cipher error: {0}")]
    Cipher(String),

    #[error("transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, Error>;
