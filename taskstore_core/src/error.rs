use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Rejected before any statement reached the engine.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("no such task record: '{0}'")]
    NotFound(String),

    #[error("task record '{0}' already exists")]
    DuplicateKey(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("codec error in column '{column}': {message}")]
    Codec { column: String, message: String },

    #[error(transparent)]
    Engine(#[from] rusqlite::Error),
}

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        StoreError::Validation(message.into())
    }

    pub fn codec(column: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Codec {
            column: column.into(),
            message: message.into(),
        }
    }
}
