use thiserror::Error;

/// Application-level errors.
///
/// Everything here is recoverable: rank and title errors are rejected
/// before any state is mutated, and persistence errors leave the
/// in-memory collections authoritative for the rest of the session.
#[derive(Debug, Error)]
pub enum AppError {
    /// Rank outside the valid window for the operation.
    #[error("rank {rank} is outside 1..={max}")]
    InvalidRank { rank: usize, max: usize },

    /// No ranked entry at the given rank.
    #[error("no entry at rank {0}")]
    NotFound(usize),

    /// Title expected in the watch list but absent.
    #[error("'{0}' is not in the watch list")]
    MissingTitle(String),

    /// Promotion event arrived in a state that does not accept it.
    #[error("promotion step out of order for '{0}'")]
    OutOfOrder(String),

    /// Store open/read/write failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Key-value mirror payload could not be decoded.
    #[error("corrupt mirror payload: {0}")]
    Mirror(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;
