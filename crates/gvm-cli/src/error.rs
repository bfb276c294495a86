//! Error handling for the `gvm-cli` binary.
//!
//! Grounded on `faxt::error::FaxtError`: one `thiserror` enum, `#[from]`
//! conversions for the error types that cross into `main`, a `Result`
//! alias everything else in the crate uses.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    /// A config file existed but couldn't be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The source file failed to assemble.
    #[error("assemble error: {0}")]
    Assemble(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;
