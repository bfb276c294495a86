//! Fatal opcode error kinds.
//!
//! None of these ever escape [`crate::dispatch`] as a `Result`: per
//! spec's error policy, a fatal opcode condition collapses to process
//! termination (`Step::Exit`). They exist as a typed enum purely so the
//! termination can be logged with a reason instead of silently vanishing.

use gvm_util::{Symbol, ValueKind};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OpError {
    #[error("opcode symbol {0} is not a known opcode")]
    UnknownOpcode(Symbol),

    #[error("operand {0} must be of kind {1:?}, was {2:?}")]
    TypeMismatch(Symbol, ValueKind, ValueKind),

    #[error("required slot {0} is missing (NONE)")]
    MissingSlot(Symbol),

    #[error("dereferenced a null REF via slot {0}")]
    NullDeref(Symbol),

    #[error("node storage exhausted")]
    Capacity,
}
