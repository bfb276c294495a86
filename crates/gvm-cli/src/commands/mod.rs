//! Command modules for the `gvm-cli` binary.

pub mod asm;
pub mod run;

pub use asm::{run_asm, AsmArgs};
pub use run::{run_run, RunArgs};
