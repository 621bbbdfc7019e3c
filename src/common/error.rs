//! Error handling primitives shared across the core.

use std::path::PathBuf;

use thiserror::Error;

/// Stable error codes reported by the HTTP layer and the CLI exit path.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    /// A model artefact could not be read or deserialized.
    Load = 1,
    /// The registry holds no model under the requested name.
    ModelMissing = 2,
    /// A model rejected the input row or produced an unusable value.
    Inference = 3,
    /// A submitted form value could not be read as a number.
    InvalidInput = 4,
    /// Configuration file or environment value was invalid.
    Config = 5,
    /// Unexpected failure at the HTTP boundary.
    Internal = 6,
}

impl ErrorCode {
    /// Short machine-readable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Load => "load_error",
            ErrorCode::ModelMissing => "model_missing",
            ErrorCode::Inference => "inference_error",
            ErrorCode::InvalidInput => "invalid_input",
            ErrorCode::Config => "config_error",
            ErrorCode::Internal => "internal",
        }
    }
}

/// Canonical error type for the core.
#[derive(Debug, Error)]
pub enum NpkError {
    #[error("failed to load model artefact {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("no model selected")]
    MissingModel { name: String },

    #[error("{0}")]
    Inference(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias used throughout the crate.
pub type NpkResult<T> = Result<T, NpkError>;

impl NpkError {
    /// Load failure helper.
    pub fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Model missing helper.
    pub fn missing_model(name: impl Into<String>) -> Self {
        Self::MissingModel { name: name.into() }
    }

    /// Inference failure helper.
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Validation helper.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Configuration helper.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            NpkError::Load { .. } => ErrorCode::Load,
            NpkError::MissingModel { .. } => ErrorCode::ModelMissing,
            NpkError::Inference(_) => ErrorCode::Inference,
            NpkError::InvalidInput(_) => ErrorCode::InvalidInput,
            NpkError::Config(_) => ErrorCode::Config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorCode::Load as u32, 1);
        assert_eq!(ErrorCode::ModelMissing as u32, 2);
        assert_eq!(ErrorCode::Inference as u32, 3);
        assert_eq!(ErrorCode::InvalidInput as u32, 4);
        assert_eq!(ErrorCode::Config as u32, 5);
        assert_eq!(ErrorCode::Internal as u32, 6);
    }

    #[test]
    fn missing_model_reads_like_the_form_message() {
        let err = NpkError::missing_model("Model P");
        assert_eq!(err.to_string(), "no model selected");
        assert_eq!(err.code(), ErrorCode::ModelMissing);
    }

    #[test]
    fn load_error_names_the_file() {
        let err = NpkError::load("models/Model N.json", "expected value at line 1");
        let msg = err.to_string();
        assert!(msg.contains("Model N.json"));
        assert!(msg.contains("expected value"));
        assert_eq!(err.code().as_str(), "load_error");
    }

    #[test]
    fn invalid_input_keeps_the_message() {
        let err = NpkError::invalid("rainfall: \"heavy\" is not a number");
        assert_eq!(err.to_string(), "invalid input: rainfall: \"heavy\" is not a number");
        assert_eq!(err.code(), ErrorCode::InvalidInput);
    }
}
