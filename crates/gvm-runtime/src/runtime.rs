//! Runtime - cooperative single-threaded scheduler over one [`Graph`].
//!
//! Grounded on `original_source/src/test.c`'s `ndl_runtime_*` call
//! sequence (`init`, `proc_init`, `step`, `print`, `kill`) and on
//! `testruntimefork`'s fork/exit program for the scheduling contract a
//! bare opcode dispatch can't express on its own.

use crate::error::{RuntimeError, RuntimeResult};
use crate::process::{Pid, Process};
use gvm_graph::{Graph, Slab};
use gvm_ops::{dispatch, PrintSink, Step, StdoutSink};
use gvm_util::{Ref, Symbol, Value};
use std::collections::VecDeque;
use tracing::{trace_span, warn};

fn instpntr() -> Symbol {
    Symbol::of("instpntr")
}

/// Owns the graph, the process table, and the debug print sink.
///
/// Scheduling order is a FIFO queue, independent of the process table's
/// own slab indices: a forked process is appended at the tail, so it
/// only becomes eligible once every process already queued has had its
/// turn, matching spec's "join at the tail, eligible next sweep" rule
/// without needing an explicit notion of sweeps.
pub struct Runtime {
    graph: Graph,
    processes: Slab<Process>,
    order: VecDeque<Pid>,
    sink: Box<dyn PrintSink>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_graph(Graph::new())
    }

    /// Build a runtime around an already-populated graph, e.g. one an
    /// assembler produced.
    pub fn with_graph(graph: Graph) -> Self {
        Runtime {
            graph,
            processes: Slab::new(),
            order: VecDeque::new(),
            sink: Box::new(StdoutSink),
        }
    }

    pub fn set_sink(&mut self, sink: Box<dyn PrintSink>) {
        self.sink = sink;
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Mark `frame` as a root and enqueue a new runnable process with it
    /// as its current frame. Returns the new process's pid.
    pub fn proc_init(&mut self, frame: Ref) -> Pid {
        self.graph.mark(frame).ok();
        let pid = self.processes.alloc();
        let proc = self.processes.get_mut(pid).expect("just allocated");
        proc.frame = frame;
        proc.pid = pid;
        self.order.push_back(pid);
        pid
    }

    /// Forcibly remove a process without waiting for its next tick to
    /// discover a dangling frame. Unmarks its frame immediately; whether
    /// the frame is then reclaimed depends on what else still reaches it.
    pub fn kill_process(&mut self, pid: Pid) -> RuntimeResult<()> {
        let proc = self.processes.get(pid).ok_or(RuntimeError::NoSuchProcess(pid))?;
        self.graph.unmark(proc.frame).ok();
        self.processes.free(pid);
        Ok(())
    }

    pub fn processes(&self) -> impl Iterator<Item = &Process> + '_ {
        self.processes.iterate().filter_map(move |pid| self.processes.get(pid))
    }

    pub fn process_count(&self) -> usize {
        self.processes.live_count()
    }

    /// Run up to `n` ticks, round-robin across runnable processes.
    /// Returns the number of ticks actually executed (fewer than `n`
    /// only once every process has exited).
    pub fn step(&mut self, n: usize) -> usize {
        let mut executed = 0;
        while executed < n {
            let Some(pid) = self.order.pop_front() else { break };
            let Some(proc) = self.processes.get(pid).copied() else {
                continue;
            };
            let frame = proc.frame;

            let _span = trace_span!("runtime.tick", pid = %pid, frame = %frame).entered();

            let pc = match self.graph.get(frame, instpntr()) {
                Ok(Value::Ref(r)) if !r.is_null() => r,
                _ => {
                    warn!(%pid, %frame, "process frame has no valid instpntr; terminating");
                    self.graph.unmark(frame).ok();
                    self.processes.free(pid);
                    executed += 1;
                    continue;
                }
            };

            let step = dispatch(&mut self.graph, frame, pc, self.sink.as_mut());
            self.apply_step(pid, frame, step);
            executed += 1;
        }
        executed
    }

    fn apply_step(&mut self, pid: Pid, frame: Ref, step: Step) {
        match step {
            Step::Advance(next) | Step::Switch(next) => {
                if next != frame {
                    self.graph.unmark(frame).ok();
                    self.graph.mark(next).ok();
                }
                if let Some(proc) = self.processes.get_mut(pid) {
                    proc.frame = next;
                }
                self.order.push_back(pid);
            }
            Step::Fork { continue_frame, spawned_frame } => {
                if continue_frame != frame {
                    self.graph.unmark(frame).ok();
                    self.graph.mark(continue_frame).ok();
                }
                if let Some(proc) = self.processes.get_mut(pid) {
                    proc.frame = continue_frame;
                }
                self.order.push_back(pid);

                self.graph.mark(spawned_frame).ok();
                let child = self.processes.alloc();
                if let Some(proc) = self.processes.get_mut(child) {
                    proc.frame = spawned_frame;
                    proc.pid = child;
                }
                self.order.push_back(child);
            }
            Step::Exit => {
                self.graph.unmark(frame).ok();
                self.processes.free(pid);
            }
        }
    }

    /// Debug dump of the process table, mirroring `ndl_runtime_print`.
    pub fn describe(&self) -> String {
        let mut out = format!("{} process(es)\n", self.process_count());
        for proc in self.processes() {
            out.push_str(&format!("  pid {} @ frame {}\n", proc.pid, proc.frame));
        }
        out
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gvm_util::Symbol;

    fn sym(name: &str) -> Symbol {
        Symbol::of(name)
    }

    fn inst(rt: &mut Runtime, opcode: &str) -> Ref {
        let node = rt.graph_mut().alloc();
        rt.graph_mut().set(node, sym("opcode"), Value::Sym(sym(opcode))).unwrap();
        node
    }

    #[test]
    fn single_process_runs_exit_and_is_removed() {
        let mut rt = Runtime::new();
        let frame = rt.graph_mut().alloc();
        let pc = inst(&mut rt, "exit");
        rt.graph_mut().set(frame, sym("instpntr"), Value::Ref(pc)).unwrap();
        rt.proc_init(frame);
        assert_eq!(rt.process_count(), 1);

        let executed = rt.step(1);
        assert_eq!(executed, 1);
        assert_eq!(rt.process_count(), 0);
    }

    #[test]
    fn step_stops_early_once_all_processes_exit() {
        let mut rt = Runtime::new();
        let frame = rt.graph_mut().alloc();
        let pc = inst(&mut rt, "exit");
        rt.graph_mut().set(frame, sym("instpntr"), Value::Ref(pc)).unwrap();
        rt.proc_init(frame);

        let executed = rt.step(10);
        assert_eq!(executed, 1);
    }

    #[test]
    fn fork_spawns_a_new_runnable_process() {
        let mut rt = Runtime::new();
        let frame = rt.graph_mut().alloc();
        rt.graph_mut().set(frame, sym("child"), Value::Ref(Ref::NULL)).unwrap();

        let spawned = rt.graph_mut().alloc();
        let spawned_pc = inst(&mut rt, "exit");
        rt.graph_mut().set(spawned, sym("instpntr"), Value::Ref(spawned_pc)).unwrap();
        rt.graph_mut().set(frame, sym("child"), Value::Ref(spawned)).unwrap();

        let fork_pc = inst(&mut rt, "fork");
        rt.graph_mut().set(fork_pc, sym("syma"), Value::Sym(sym("child"))).unwrap();
        let after_fork = rt.graph_mut().alloc();
        rt.graph_mut().set(after_fork, sym("opcode"), Value::Sym(sym("exit"))).unwrap();
        rt.graph_mut().set(fork_pc, sym("next"), Value::Ref(after_fork)).unwrap();

        rt.graph_mut().set(frame, sym("instpntr"), Value::Ref(fork_pc)).unwrap();
        rt.proc_init(frame);
        assert_eq!(rt.process_count(), 1);

        rt.step(1);
        assert_eq!(rt.process_count(), 2);

        rt.step(2);
        assert_eq!(rt.process_count(), 0);
    }

    #[test]
    fn killed_process_is_skipped_without_consuming_a_tick() {
        let mut rt = Runtime::new();
        let frame = rt.graph_mut().alloc();
        let pc = inst(&mut rt, "exit");
        rt.graph_mut().set(frame, sym("instpntr"), Value::Ref(pc)).unwrap();
        let pid = rt.proc_init(frame);
        rt.kill_process(pid).unwrap();

        assert_eq!(rt.process_count(), 0);
        assert_eq!(rt.step(5), 0);
    }

    #[test]
    fn missing_instpntr_terminates_the_process() {
        let mut rt = Runtime::new();
        let frame = rt.graph_mut().alloc();
        rt.proc_init(frame);

        let executed = rt.step(1);
        assert_eq!(executed, 1);
        assert_eq!(rt.process_count(), 0);
    }
}
