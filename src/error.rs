//! Error type shared by the index, the stream pipeline and the GFF3 layer.

use std::io;
use thiserror::Error;

/// Errors that can occur while indexing or streaming genome nodes.
#[derive(Error, Debug)]
pub enum GfiError {
    #[error("feature index does not contain the given sequence id: {0}")]
    SeqidNotFound(String),

    #[error("Invalid range: start {start} is larger than end {end}")]
    InvalidRange { start: u64, end: u64 },

    #[error("feature index is empty")]
    EmptyIndex,

    #[error("no feature with id {0} in feature index")]
    NodeNotFound(u64),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("feature index lock is poisoned")]
    Lock,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error in {file} at line {line}: {message}")]
    Parse {
        file: String,
        line: usize,
        message: String,
    },

    #[error("Input not sorted: {0}")]
    NotSorted(String),

    #[error("Invalid spliced alignment: {0}")]
    Consensus(String),
}

pub type Result<T> = std::result::Result<T, GfiError>;

impl GfiError {
    /// Wrap an arbitrary producer or visitor failure.
    pub fn upstream(message: impl Into<String>) -> Self {
        GfiError::Upstream(message.into())
    }

    /// Build a parse error for `file` at `line`.
    pub fn parse(file: &str, line: usize, message: impl Into<String>) -> Self {
        GfiError::Parse {
            file: file.to_string(),
            line,
            message: message.into(),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for GfiError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        GfiError::Lock
    }
}
