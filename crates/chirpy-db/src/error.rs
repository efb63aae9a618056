use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("a user with this email already exists")]
    AlreadyExists,

    #[error("store file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store document is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// True for faults of the backing file itself, as opposed to lookups and
    /// constraint violations.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Serialization(_) | Self::LockPoisoned)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
