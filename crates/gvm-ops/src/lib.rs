//! gvm-ops - the opcode catalogue and its execution semantics.
//!
//! Pure with respect to scheduling: [`dispatch`] advances exactly one
//! process by one instruction and reports what happened via [`Step`].
//! Everything about running many processes concurrently lives one layer
//! up, in `gvm-runtime`.

mod error;
mod exec;
mod opcode;
mod sink;
mod step;

pub use error::OpError;
pub use exec::dispatch;
pub use opcode::Opcode;
pub use sink::{PrintSink, StdoutSink, VecSink};
pub use step::Step;
