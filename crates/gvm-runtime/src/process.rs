//! Process - a scheduler record: a pid and a current frame.
//!
//! `Pid` is just the handle the runtime's own process [`gvm_graph::Slab`]
//! hands out; there is no separate identifier space to keep in sync.

use gvm_util::Ref;

pub type Pid = Ref;

#[derive(Debug, Default, Clone, Copy)]
pub struct Process {
    pub(crate) pid: Ref,
    pub(crate) frame: Ref,
}

impl Process {
    /// This process's pid (its slot in the runtime's process table).
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// The frame this process is currently executing with.
    pub fn frame(&self) -> Ref {
        self.frame
    }
}
