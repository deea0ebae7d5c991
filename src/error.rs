use std::path::PathBuf;

use thiserror::Error;

/// Every way a smoothing or power-model run can fail. All of them are fatal
/// for the whole run.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Row / frequency-table length mismatch or too few samples.
    #[error("shape error: {0}")]
    Shape(String),

    /// Regression failed: rank-deficient design or non-finite samples.
    #[error("fit error: {0}")]
    Fit(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cell of the input table could not be read as a number.
    #[error("parse error at row {row}, column {column}: {message}")]
    Parse {
        row: usize,
        column: usize,
        message: String,
    },

    /// The file was readable but not laid out as a measurement table.
    #[error("format error in {path}: {message}")]
    Format { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ModelError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ModelError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ModelError::Format {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
