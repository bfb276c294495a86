//! Core error types for gvm-util.

use thiserror::Error;

/// Error type for symbol construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SymbolError {
    /// The source text was longer than eight bytes.
    #[error("symbols must be eight characters or fewer, got {len}")]
    TooLong { len: usize },

    /// The source text was empty.
    #[error("expected a non-empty symbol")]
    Empty,
}

pub type SymbolResult<T> = std::result::Result<T, SymbolError>;
