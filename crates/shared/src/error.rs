use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MISSING_API_KEY_MESSAGE: &str =
    "API Key is missing. Please check your environment configuration.";
pub const EMPTY_RESULT_MESSAGE: &str =
    "No image was returned by the AI model. Please try a different prompt.";
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to transform image.";
pub const IMAGE_TOO_LARGE_MESSAGE: &str =
    "La imagen es demasiado grande. Por favor usa una imagen menor a 5MB.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Configuration,
    Validation,
    Transport,
    EmptyResult,
}

/// Failures a user can see. Storage faults are never represented here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StudioError {
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Transport(String),
    #[error("{}", EMPTY_RESULT_MESSAGE)]
    EmptyResult,
}

impl StudioError {
    pub fn missing_api_key() -> Self {
        Self::Configuration(MISSING_API_KEY_MESSAGE.to_string())
    }

    pub fn image_too_large() -> Self {
        Self::Validation(IMAGE_TOO_LARGE_MESSAGE.to_string())
    }

    /// Keeps the fault's own message, or the generic one when it has none.
    pub fn transport(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            Self::Transport(GENERIC_FAILURE_MESSAGE.to_string())
        } else {
            Self::Transport(message)
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Configuration(_) => ErrorCode::Configuration,
            Self::Validation(_) => ErrorCode::Validation,
            Self::Transport(_) => ErrorCode::Transport,
            Self::EmptyResult => ErrorCode::EmptyResult,
        }
    }
}

/// Message attached to a session after a failed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserError {
    pub code: ErrorCode,
    pub message: String,
}

impl UserError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<StudioError> for UserError {
    fn from(value: StudioError) -> Self {
        Self {
            code: value.code(),
            message: value.to_string(),
        }
    }
}
