//! Debug sink - where the `print` opcode's output goes.
//!
//! Spec keeps this out of core scope ("terminal formatting of values for
//! debugging" is a collaborator, not part of the interpreter proper);
//! this trait is the seam between the two, mirroring the host-callback
//! abstractions the wider corpus uses to keep a VM core decoupled from
//! its embedding.

/// Receives one formatted line per `print` opcode execution.
pub trait PrintSink {
    fn emit(&mut self, line: String);
}

/// Writes every line to stdout, the original source's behavior.
#[derive(Default)]
pub struct StdoutSink;

impl PrintSink for StdoutSink {
    fn emit(&mut self, line: String) {
        println!("{line}");
    }
}

/// Collects lines in memory; used by tests and by hosts that want to
/// inspect output instead of streaming it.
#[derive(Default)]
pub struct VecSink(pub Vec<String>);

impl PrintSink for VecSink {
    fn emit(&mut self, line: String) {
        self.0.push(line);
    }
}
