//! Step - the result of dispatching one instruction.
//!
//! A refinement of spec's "opcode returns a next frame, NULL_REF
//! terminates" contract: instead of overloading one `Ref`, dispatch
//! returns this small enum so the scheduler never has to guess which
//! kind of transition happened.

use gvm_util::Ref;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Continue the same process with `frame` as its current frame
    /// (`instpntr` has already been advanced on it).
    Advance(Ref),
    /// A `push` (call): the process's current frame becomes `frame`.
    Switch(Ref),
    /// A `fork`: the current process continues with `continue_frame`;
    /// the scheduler should additionally spawn a new process whose frame
    /// is `spawned_frame`.
    Fork { continue_frame: Ref, spawned_frame: Ref },
    /// The process terminates (a bare `NULL_REF` return, or a fatal
    /// opcode error).
    Exit,
}

impl Step {
    /// The frame the *current* process should continue with, if any.
    pub fn current_frame(&self) -> Option<Ref> {
        match self {
            Step::Advance(f) | Step::Switch(f) => Some(*f),
            Step::Fork { continue_frame, .. } => Some(*continue_frame),
            Step::Exit => None,
        }
    }
}
