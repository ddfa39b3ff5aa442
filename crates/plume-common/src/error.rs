//! Error types for the plume extraction pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using PlumeError.
pub type PlumeResult<T> = Result<T, PlumeError>;

/// Primary error type for plume extraction.
///
/// Every variant names the stage that failed and the offending identifier
/// (variable name, level value or file path).
#[derive(Debug, Error)]
pub enum PlumeError {
    // === Field source errors ===
    #[error("Data not available: {0}")]
    DataUnavailable(String),

    #[error("Variable '{variable}' not found in {source_name}")]
    VariableNotFound {
        variable: String,
        source_name: String,
    },

    #[error("Unsupported dimension '{dimension}' (length {length}) on variable '{variable}'")]
    UnsupportedDimension {
        variable: String,
        dimension: String,
        length: usize,
    },

    #[error("Invalid data format in {source_name}: {message}")]
    InvalidFormat {
        source_name: String,
        message: String,
    },

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    // === Geometry errors ===
    #[error("Invalid geometry at level {level}: {message}")]
    InvalidGeometry { level: f64, message: String },

    // === Output errors ===
    #[error("Failed to write {}: {message}", path.display())]
    WriteFailed { path: PathBuf, message: String },

    #[error("Rendering failed for {}: {message}", path.display())]
    RenderFailed { path: PathBuf, message: String },
}

impl PlumeError {
    /// Shorthand for an `InvalidParameter` error.
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        PlumeError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a `WriteFailed` error.
    pub fn write_failed(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        PlumeError::WriteFailed {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Shorthand for a `RenderFailed` error.
    pub fn render_failed(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        PlumeError::RenderFailed {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error must abort the pipeline.
    ///
    /// Geometry errors are handled per ring and render errors only affect the
    /// diagnostic image, so neither is fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            PlumeError::InvalidGeometry { .. } | PlumeError::RenderFailed { .. }
        )
    }

    /// Short stage label used in log fields.
    pub fn stage(&self) -> &'static str {
        match self {
            PlumeError::DataUnavailable(_)
            | PlumeError::VariableNotFound { .. }
            | PlumeError::UnsupportedDimension { .. }
            | PlumeError::InvalidFormat { .. } => "read",
            PlumeError::InvalidParameter { .. } => "config",
            PlumeError::InvalidGeometry { .. } => "polygon",
            PlumeError::WriteFailed { .. } => "write",
            PlumeError::RenderFailed { .. } => "render",
        }
    }
}
