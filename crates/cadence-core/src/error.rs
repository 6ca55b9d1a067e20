use thiserror::Error;

use crate::stage::StageId;

#[derive(Debug, Error)]
pub enum CadenceError {
    // Stage errors
    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    #[error("Stage mismatch: {stage} cannot publish output produced by {produced_by}")]
    StageMismatch { stage: StageId, produced_by: StageId },

    // Package errors
    #[error("Invalid data package: {0}")]
    InvalidPackage(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // TOML errors
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, CadenceError>;
