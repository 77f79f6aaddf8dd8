//! Error types for the anonymization engine.
//!
//! Detector failures are recovered inside the detection layer and only show
//! up in logs; everything else is returned as an [`AnonymizerError`] and
//! converted into a failed [`AnonymizationResult`](crate::AnonymizationResult)
//! at the pipeline boundary.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for anonymization operations.
pub type AnonymizerResult<T> = Result<T, AnonymizerError>;

/// Error type for all anonymization operations.
#[derive(Debug, Error)]
pub enum AnonymizerError {
    /// Error occurred while reading or writing files
    #[error("IO error for path '{}': {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Nothing to anonymize
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Container format the document layer cannot handle
    #[error("Unsupported file type: {kind}. Supported formats: {supported}")]
    UnsupportedInput { kind: String, supported: String },

    /// Text could not be read out of a container
    #[error("Text extraction failed for '{}': {}", .path.display(), .reason)]
    Extraction { path: PathBuf, reason: String },

    /// Output document could not be generated
    #[error("{format} reconstruction failed: {reason}")]
    Reconstruction { format: String, reason: String },

    /// Detector backend is not installed or could not be started
    #[error("{detector} detector unavailable: {reason}")]
    DetectorUnavailable { detector: String, reason: String },

    /// Detector answered with something unusable (bad exit, timeout, malformed output)
    #[error("{detector} detector protocol error: {reason}")]
    DetectorProtocol { detector: String, reason: String },

    /// Rule pattern failed to compile
    #[error("Pattern error for '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    /// Invalid configuration or rule file
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AnonymizerError {
    /// Builds an IO error bound to the path that caused it.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<io::Error> for AnonymizerError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

impl From<regex::Error> for AnonymizerError {
    fn from(err: regex::Error) -> Self {
        Self::Pattern {
            pattern: "<unknown>".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for AnonymizerError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AnonymizerError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnonymizerError::UnsupportedInput {
            kind: "xlsx".to_string(),
            supported: ".txt, .pdf, .docx".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported file type: xlsx. Supported formats: .txt, .pdf, .docx"
        );
    }

    #[test]
    fn test_io_error_keeps_source() {
        use std::error::Error as _;

        let err = AnonymizerError::io(
            "/tmp/missing.txt",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("/tmp/missing.txt"));
        assert!(err.source().is_some());
    }
}
