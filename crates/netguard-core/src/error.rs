//! Error types for the detection core

use thiserror::Error;

/// Result type for detector operations
pub type DetectorResult<T> = Result<T, DetectorError>;

/// Reasons a model fit can be rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrainError {
    #[error("training snapshot is empty")]
    EmptySnapshot,

    #[error("training snapshot has a non-finite value at row {row}, feature {feature}")]
    NonFiniteValue { row: usize, feature: &'static str },

    #[error("training snapshot has {found} columns, expected {expected}")]
    ColumnMismatch { found: usize, expected: usize },
}

/// Rejected detector configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for `{field}`: {message}")]
    InvalidValue { field: &'static str, message: String },

    #[error("failed to read config file {path}: {message}")]
    Io { path: String, message: String },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            message: message.into(),
        }
    }
}

/// Errors surfaced by [`crate::Detector`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    #[error("retrain at ingestion {seen} failed: {source}")]
    Training {
        seen: u64,
        #[source]
        source: TrainError,
    },

    #[error("feature {feature} is not finite")]
    NonFiniteInput { feature: &'static str },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
