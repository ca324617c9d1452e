//! Error types for qrcode-footprint.
//!
//! Generation errors always surface before any geometry reaches a drawing
//! surface: parameters are validated and the barcode is encoded first, and
//! only a fully planned footprint is emitted.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::barcode::EncodeError;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors that can occur while generating a footprint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    /// A footprint parameter is out of range.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of what's wrong.
        message: String,
    },

    /// The barcode could not be encoded.
    #[error("barcode encoding failed: {0}")]
    Encoding(#[from] EncodeError),
}

impl GenerateError {
    /// Creates an invalid parameter error.
    pub fn invalid_parameter(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}

/// Errors that can occur while exporting a generated footprint.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Failed to write the output file.
    #[error("failed to write file: {path}")]
    FileWrite {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to serialise the footprint.
    #[error("failed to serialise footprint")]
    Serialise(#[from] serde_json::Error),
}

impl ExportError {
    /// Creates a file write error.
    pub fn file_write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }
}
