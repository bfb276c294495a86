//! Runtime-level error kinds - distinct from [`gvm_ops::OpError`], which
//! never escapes a single opcode dispatch.

use gvm_util::Ref;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("no such process: {0}")]
    NoSuchProcess(Ref),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
