//! Error types for the parallel Huffman codec.

use thiserror::Error;

/// Errors produced while compressing or decompressing.
#[derive(Error, Debug)]
pub enum Error {
    /// A tree was requested for a frequency map with no symbols.
    #[error("cannot build a Huffman tree from an empty frequency map")]
    EmptyAlphabet,

    /// The persisted artifact could not be parsed or is structurally invalid.
    #[error("corrupt artifact: {message}")]
    CorruptArtifact {
        /// What was wrong with the artifact
        message: String,
    },

    /// A dispatched worker never delivered its partial result.
    #[error("worker {rank} never returned a result")]
    WorkerUnavailable {
        /// Rank of the missing worker
        rank: usize,
    },

    /// Invalid parameters or input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        Error::CorruptArtifact {
            message: message.into(),
        }
    }
}

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
