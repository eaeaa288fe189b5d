//! Error types shared by the bundle loader, the normalizers and inference.

use std::path::PathBuf;
use thiserror::Error;

/// A trip payload that parsed but cannot be priced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field}: must be greater than 0, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field}: expected a finite number, got {raw:?}")]
    NotANumber { field: &'static str, raw: String },

    #[error("{field}: {value} is outside the range the model accepts")]
    OutOfRange { field: &'static str, value: f64 },
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::NotPositive { field, .. }
            | ValidationError::NotANumber { field, .. }
            | ValidationError::OutOfRange { field, .. } => *field,
        }
    }
}

/// Failures while running the model on one row. The `Display` text is
/// internal; clients only see [`InferenceError::public_message`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("feature length mismatch: got {got}, expected {expected}")]
    ShapeMismatch { got: usize, expected: usize },

    #[error("model produced a non-finite value: {0}")]
    NonFinite(f64),

    #[error("estimate {0} does not fit the fare range")]
    Overflow(f64),

    #[error("model unavailable: {0}")]
    Unavailable(String),
}

impl InferenceError {
    pub fn public_message(&self) -> &'static str {
        match self {
            InferenceError::ShapeMismatch { .. } => "feature vector does not match the model input",
            InferenceError::NonFinite(_) | InferenceError::Overflow(_) => {
                "model produced an unusable estimate"
            }
            InferenceError::Unavailable(_) => "model is unavailable",
        }
    }
}

/// Reasons a model bundle is refused at load time.
#[derive(Error, Debug)]
pub enum BundleError {
    #[error("failed to read bundle at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse bundle: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported bundle format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("feature order mismatch at position {index}: expected {expected:?}, found {found:?}")]
    FeatureOrder {
        index: usize,
        expected: Option<String>,
        found: Option<String>,
    },

    #[error("no encoder for categorical feature {0:?}")]
    MissingEncoder(String),

    #[error("encoder given for {0:?}, which is not a categorical feature")]
    UnexpectedEncoder(String),

    #[error("model has no trees")]
    EmptyEnsemble,

    #[error("tree {tree}, node {node}: {reason}")]
    InvalidTree {
        tree: usize,
        node: usize,
        reason: String,
    },

    #[error("model backend not available in this build: {0}")]
    BackendUnavailable(String),

    #[error("model backend failed to load: {0}")]
    Backend(String),
}

pub type Result<T, E = BundleError> = std::result::Result<T, E>;
