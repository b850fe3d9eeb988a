//! Error types for aurora-scramble

use std::path::PathBuf;
use thiserror::Error;

/// Scrambling error types
#[derive(Debug, Error)]
pub enum ScrambleError {
    /// Input path does not exist
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Input path exists but is not a regular file
    #[error("Path is not a file: {}", .0.display())]
    NotAFile(PathBuf),

    /// Input could not be read or output could not be written
    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    /// File content is not UTF-8 text
    #[error("Unable to decode {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },

    /// Source text is not valid in the grammar
    #[error("Parse error at {line}:{column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    /// Synthetic statements could not be inserted at the requested position
    #[error("Splice failed: {0}")]
    Splice(String),

    /// A textual matcher failed to compile
    #[error("Pattern error: {0}")]
    Pattern(String),

    /// No transformer is registered for the file extension
    #[error("Unsupported file type: {}", .0.display())]
    UnsupportedExtension(PathBuf),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScrambleError {
    /// Classify an IO error raised while touching `path`.
    pub fn from_io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound(path.into()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.into()),
            _ => Self::Io(err),
        }
    }

    /// Skips are reported but do not count as failures.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::UnsupportedExtension(_))
    }
}

/// Result type for scrambling operations
pub type ScrambleResult<T> = Result<T, ScrambleError>;
