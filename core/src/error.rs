use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProgressionError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("User '{user_id}' not found")]
    UserNotFound { user_id: String },

    #[error("Artist card '{card_id}' not found")]
    CardNotFound { card_id: String },

    #[error("Release '{release_id}' not found")]
    ReleaseNotFound { release_id: String },

    #[error("User '{user_id}' does not own artist card '{card_id}'")]
    OwnershipViolation { user_id: String, card_id: String },

    #[error("Unknown subscription tier '{name}'")]
    InvalidTier { name: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ProgressionResult<T> = Result<T, ProgressionError>;
