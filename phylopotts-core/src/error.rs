//! Structured error types for the phylopotts workspace.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Unified error type for all phylopotts operations.
#[derive(Debug, Error)]
pub enum PottsError {
    /// I/O error without an associated path.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error on a specific file or directory.
    #[error("I/O error on '{}': {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Parse error (malformed parameter line, FASTA, Newick, NPY header).
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid input (bad arguments, out-of-range values).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Referential integrity failure (unknown leaf name, symbol code outside
    /// the alphabet).
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Dimension mismatch (declared length vs. observed indices, ragged rows).
    #[error("shape error: {0}")]
    Shape(String),

    /// Catch-all for other errors
    #[error("{0}")]
    Other(String),
}

impl PottsError {
    /// Attach a path to an I/O error.
    pub fn file(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        PottsError::File {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, PottsError>;
