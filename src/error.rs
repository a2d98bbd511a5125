//! Error types.
//!
//! [`ModelError`] covers loading the artifact, which is a fatal startup fault.
//! [`CoercionError`] and [`PredictionError`] are the two guarded fault points
//! of an inference run, wrapped by [`InferError`] whose `Display` carries the
//! prefix reported to callers.

use std::path::PathBuf;

use crate::compat::xgboost::ConversionError;

/// Failure to load a model artifact.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to read model file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse model JSON")]
    Json(#[from] serde_json::Error),
    #[error("failed to convert model")]
    Conversion(#[from] ConversionError),
}

/// Failure to build or coerce the input row.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoercionError {
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
    #[error("could not convert string to float: '{0}'")]
    StringToFloat(String),
    #[error("float() argument must be a string or a real number, not '{0}'")]
    NotANumber(&'static str),
}

/// Failure raised by the model on a constructed row.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    #[error("Feature shape mismatch, expected: {expected}, got {got}")]
    FeatureCountMismatch { expected: usize, got: usize },
    #[error("feature_names mismatch at column {index}: model expects '{expected}', data has '{got}'")]
    FeatureNamesMismatch {
        index: usize,
        expected: String,
        got: String,
    },
    #[error(
        "DataFrame.dtypes for data must be int, float, bool or category. Invalid columns: {}",
        format_columns(.0)
    )]
    InvalidDtype(Vec<(String, &'static str)>),
    #[error("invalid category value {value} for categorical feature '{column}'")]
    InvalidCategory { column: String, value: String },
    #[error("categorical feature '{0}' received a string but the model has no category levels for it")]
    MissingCategoryLevels(String),
    #[error("objective '{0}' does not produce class probabilities")]
    UnsupportedObjective(String),
    #[error("predict_proba returned {0} column(s), expected at least 2")]
    MissingPositiveClass(usize),
}

fn format_columns(columns: &[(String, &'static str)]) -> String {
    columns
        .iter()
        .map(|(name, dtype)| format!("{name}: {dtype}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A guarded fault of the inference path.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferError {
    #[error("Invalid input format: {0}")]
    InvalidInput(#[from] CoercionError),
    #[error("Prediction failed: {0}")]
    Prediction(#[from] PredictionError),
}
