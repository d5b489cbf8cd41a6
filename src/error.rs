use thiserror::Error;

use crate::model::LocalizationId;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unknown localization id {0}")]
    UnknownLocalization(LocalizationId),

    #[error("Unknown track id {0}")]
    UnknownTrack(u64),

    #[error("Missing type descriptor for type {0}")]
    MissingType(u32),

    #[error("Surface already disposed")]
    Disposed,

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
