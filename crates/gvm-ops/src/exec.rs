//! Opcode execution - pure functions from (graph, frame, pc) to a [`Step`].
//!
//! Each handler mirrors one `BEGINOP(...)` block in `opcodes.c`: load the
//! operand symbols off the instruction node, read/write the frame (or a
//! node the frame points at) accordingly, then advance. `instpntr` is the
//! only spelling used anywhere, resolving spec's `instpntr`/`instrpntr`
//! ambiguity in `branch`'s favor of the rest of the system.

use crate::error::OpError;
use crate::opcode::Opcode;
use crate::sink::PrintSink;
use crate::step::Step;
use gvm_graph::Graph;
use gvm_util::{Ref, Symbol, Value, ValueKind};

const INSTPNTR: &str = "instpntr";

fn sym_of(name: &str) -> Symbol {
    Symbol::new(name).expect("operand slot name fits in 8 bytes")
}

/// Read `node[slot]`, requiring it to be a symbol (an operand name).
fn operand(graph: &Graph, node: Ref, slot: &str) -> Result<Symbol, OpError> {
    let slot_sym = sym_of(slot);
    match graph.get(node, slot_sym).unwrap_or(Value::None) {
        Value::Sym(s) => Ok(s),
        Value::None => Err(OpError::MissingSlot(slot_sym)),
        other => Err(OpError::TypeMismatch(slot_sym, ValueKind::Sym, other.kind())),
    }
}

fn load_notnone(graph: &Graph, node: Ref, key: Symbol) -> Result<Value, OpError> {
    match graph.get(node, key).unwrap_or(Value::None) {
        Value::None => Err(OpError::MissingSlot(key)),
        v => Ok(v),
    }
}

fn load_ref(graph: &Graph, node: Ref, key: Symbol) -> Result<Ref, OpError> {
    match load_notnone(graph, node, key)? {
        Value::Ref(r) if !r.is_null() => Ok(r),
        Value::Ref(_) => Err(OpError::NullDeref(key)),
        other => Err(OpError::TypeMismatch(key, ValueKind::Ref, other.kind())),
    }
}

fn load_int(graph: &Graph, node: Ref, key: Symbol) -> Result<i64, OpError> {
    match load_notnone(graph, node, key)? {
        Value::Int(v) => Ok(v),
        other => Err(OpError::TypeMismatch(key, ValueKind::Int, other.kind())),
    }
}

fn load_float(graph: &Graph, node: Ref, key: Symbol) -> Result<f64, OpError> {
    match load_notnone(graph, node, key)? {
        Value::Float(v) => Ok(v),
        other => Err(OpError::TypeMismatch(key, ValueKind::Float, other.kind())),
    }
}

fn store(graph: &mut Graph, node: Ref, key: Symbol, value: Value) -> Result<(), OpError> {
    graph.set(node, key, value).map_err(|_| OpError::Capacity)
}

/// `frame.instpntr <- pc.next`; the usual non-branching advance.
fn advance(graph: &mut Graph, frame: Ref, pc: Ref) -> Result<Step, OpError> {
    let next = load_ref(graph, pc, sym_of("next"))?;
    store(graph, frame, sym_of(INSTPNTR), Value::Ref(next))?;
    Ok(Step::Advance(frame))
}

macro_rules! int_binop {
    ($graph:expr, $frame:expr, $pc:expr, $op:expr) => {{
        let a_name = operand($graph, $pc, "syma")?;
        let b_name = operand($graph, $pc, "symb")?;
        let c_name = operand($graph, $pc, "symc")?;
        let a = load_int($graph, $frame, a_name)?;
        let b = load_int($graph, $frame, b_name)?;
        let result: i64 = $op(a, b);
        store($graph, $frame, c_name, Value::Int(result))?;
        advance($graph, $frame, $pc)
    }};
}

macro_rules! int_unop {
    ($graph:expr, $frame:expr, $pc:expr, $op:expr) => {{
        let a_name = operand($graph, $pc, "syma")?;
        let b_name = operand($graph, $pc, "symb")?;
        let a = load_int($graph, $frame, a_name)?;
        let result: i64 = $op(a);
        store($graph, $frame, b_name, Value::Int(result))?;
        advance($graph, $frame, $pc)
    }};
}

macro_rules! float_binop {
    ($graph:expr, $frame:expr, $pc:expr, $op:expr) => {{
        let a_name = operand($graph, $pc, "syma")?;
        let b_name = operand($graph, $pc, "symb")?;
        let c_name = operand($graph, $pc, "symc")?;
        let a = load_float($graph, $frame, a_name)?;
        let b = load_float($graph, $frame, b_name)?;
        let result: f64 = $op(a, b);
        store($graph, $frame, c_name, Value::Float(result))?;
        advance($graph, $frame, $pc)
    }};
}

macro_rules! float_unop {
    ($graph:expr, $frame:expr, $pc:expr, $op:expr) => {{
        let a_name = operand($graph, $pc, "syma")?;
        let b_name = operand($graph, $pc, "symb")?;
        let a = load_float($graph, $frame, a_name)?;
        let result: f64 = $op(a);
        store($graph, $frame, b_name, Value::Float(result))?;
        advance($graph, $frame, $pc)
    }};
}

fn run(
    op: Opcode,
    graph: &mut Graph,
    frame: Ref,
    pc: Ref,
    sink: &mut dyn PrintSink,
) -> Result<Step, OpError> {
    use Opcode::*;
    match op {
        New => {
            let a = operand(graph, pc, "syma")?;
            graph.salloc(frame, a).map_err(|_| OpError::Capacity)?;
            advance(graph, frame, pc)
        }
        Copy => {
            let a = operand(graph, pc, "syma")?;
            let b = operand(graph, pc, "symb")?;
            let val = load_notnone(graph, frame, a)?;
            store(graph, frame, b, val)?;
            advance(graph, frame, pc)
        }
        Load => {
            let a = operand(graph, pc, "syma")?;
            let b = operand(graph, pc, "symb")?;
            let c = operand(graph, pc, "symc")?;
            let sec = load_ref(graph, frame, a)?;
            let val = load_notnone(graph, sec, b)?;
            store(graph, frame, c, val)?;
            advance(graph, frame, pc)
        }
        Save => {
            let a = operand(graph, pc, "syma")?;
            let b = operand(graph, pc, "symb")?;
            let c = operand(graph, pc, "symc")?;
            let val = load_notnone(graph, frame, a)?;
            let sec = load_ref(graph, frame, c)?;
            store(graph, sec, b, val)?;
            advance(graph, frame, pc)
        }
        Drop => {
            let a = operand(graph, pc, "syma")?;
            let b = operand(graph, pc, "symb")?;
            let sec = load_ref(graph, frame, a)?;
            graph.del(sec, b).map_err(|_| OpError::Capacity)?;
            advance(graph, frame, pc)
        }
        Count => {
            let a = operand(graph, pc, "syma")?;
            let b = operand(graph, pc, "symb")?;
            let sec = load_ref(graph, frame, a)?;
            let size = graph.size(sec).map_err(|_| OpError::Capacity)?;
            store(graph, frame, b, Value::Int(size as i64))?;
            advance(graph, frame, pc)
        }
        ILoad => {
            let a = operand(graph, pc, "syma")?;
            let b = operand(graph, pc, "symb")?;
            let c = operand(graph, pc, "symc")?;
            let sec = load_ref(graph, frame, a)?;
            let i = load_int(graph, frame, b)?;
            let key = graph
                .index(sec, i as usize)
                .map_err(|_| OpError::Capacity)?
                .ok_or(OpError::MissingSlot(b))?;
            store(graph, frame, c, Value::Sym(key))?;
            advance(graph, frame, pc)
        }
        Add => int_binop!(graph, frame, pc, |a: i64, b: i64| a.wrapping_add(b)),
        Sub => int_binop!(graph, frame, pc, |a: i64, b: i64| a.wrapping_sub(b)),
        Neg => int_unop!(graph, frame, pc, |a: i64| a.wrapping_neg()),
        Mul => int_binop!(graph, frame, pc, |a: i64, b: i64| a.wrapping_mul(b)),
        Div => int_binop!(graph, frame, pc, |a: i64, b: i64| a.wrapping_div(b)),
        Mod => int_binop!(graph, frame, pc, |a: i64, b: i64| a.wrapping_rem(b)),
        And => int_binop!(graph, frame, pc, |a: i64, b: i64| a & b),
        Or => int_binop!(graph, frame, pc, |a: i64, b: i64| a | b),
        Xor => int_binop!(graph, frame, pc, |a: i64, b: i64| a ^ b),
        Not => int_unop!(graph, frame, pc, |a: i64| !a),
        LShift => int_binop!(graph, frame, pc, |a: i64, b: i64| a.wrapping_shl(b as u32)),
        RShift => int_binop!(graph, frame, pc, |a: i64, b: i64| a.wrapping_shr(b as u32)),
        ULShift => int_binop!(graph, frame, pc, |a: i64, b: i64| {
            ((a as u64).wrapping_shl(b as u32)) as i64
        }),
        URShift => int_binop!(graph, frame, pc, |a: i64, b: i64| {
            ((a as u64).wrapping_shr(b as u32)) as i64
        }),
        FAdd => float_binop!(graph, frame, pc, |a: f64, b: f64| a + b),
        FSub => float_binop!(graph, frame, pc, |a: f64, b: f64| a - b),
        FNeg => float_unop!(graph, frame, pc, |a: f64| -a),
        FMul => float_binop!(graph, frame, pc, |a: f64, b: f64| a * b),
        FDiv => float_binop!(graph, frame, pc, |a: f64, b: f64| a / b),
        FMod => float_binop!(graph, frame, pc, |a: f64, b: f64| a % b),
        FSqrt => float_unop!(graph, frame, pc, |a: f64| a.sqrt()),
        FtoI => {
            let a = operand(graph, pc, "syma")?;
            let b = operand(graph, pc, "symb")?;
            let val = load_float(graph, frame, a)?;
            store(graph, frame, b, Value::Int(val as i64))?;
            advance(graph, frame, pc)
        }
        ItoF => {
            let a = operand(graph, pc, "syma")?;
            let b = operand(graph, pc, "symb")?;
            let val = load_int(graph, frame, a)?;
            store(graph, frame, b, Value::Float(val as f64))?;
            advance(graph, frame, pc)
        }
        ItoS => {
            let a = operand(graph, pc, "syma")?;
            let b = operand(graph, pc, "symb")?;
            let val = load_int(graph, frame, a)?;
            let sym = Symbol::from_bytes((val as u64).to_be_bytes());
            store(graph, frame, b, Value::Sym(sym))?;
            advance(graph, frame, pc)
        }
        StoI => {
            let a = operand(graph, pc, "syma")?;
            let b = operand(graph, pc, "symb")?;
            let val = match load_notnone(graph, frame, a)? {
                Value::Sym(s) => s,
                other => return Err(OpError::TypeMismatch(a, ValueKind::Sym, other.kind())),
            };
            store(graph, frame, b, Value::Int(val.as_u64() as i64))?;
            advance(graph, frame, pc)
        }
        Branch => {
            let a = operand(graph, pc, "syma")?;
            let b = operand(graph, pc, "symb")?;
            let a_val = load_notnone(graph, frame, a)?;
            let b_val = load_notnone(graph, frame, b)?;
            if a_val.kind() != b_val.kind() {
                return Err(OpError::TypeMismatch(b, a_val.kind(), b_val.kind()));
            }
            let ordering = a_val
                .partial_compare(&b_val)
                .ok_or_else(|| OpError::TypeMismatch(b, a_val.kind(), b_val.kind()))?;
            let branch_key = match ordering {
                std::cmp::Ordering::Less => "lt",
                std::cmp::Ordering::Equal => "eq",
                std::cmp::Ordering::Greater => "gt",
            };
            let target = load_ref(graph, pc, sym_of(branch_key))?;
            store(graph, frame, sym_of(INSTPNTR), Value::Ref(target))?;
            Ok(Step::Advance(frame))
        }
        Push => {
            let a = operand(graph, pc, "syma")?;
            let next = load_ref(graph, pc, sym_of("next"))?;
            store(graph, frame, sym_of(INSTPNTR), Value::Ref(next))?;
            let invoke = load_ref(graph, frame, a)?;
            Ok(Step::Switch(invoke))
        }
        Print => {
            let a = operand(graph, pc, "syma")?;
            let val = load_notnone(graph, frame, a)?;
            sink.emit(format!("[{pc}@{frame}]: {val}"));
            advance(graph, frame, pc)
        }
        Exit => Ok(Step::Exit),
        Fork => {
            let a = operand(graph, pc, "syma")?;
            let spawned = load_ref(graph, frame, a)?;
            let next = load_ref(graph, pc, sym_of("next"))?;
            store(graph, frame, sym_of(INSTPNTR), Value::Ref(next))?;
            Ok(Step::Fork { continue_frame: frame, spawned_frame: spawned })
        }
    }
}

/// Dispatch the instruction at `pc` for `frame`. Fatal opcode conditions
/// (type mismatch, missing slot, null dereference, exhausted node
/// storage, an unrecognized opcode symbol) collapse to `Step::Exit`
/// rather than propagating, per spec's error policy; the reason is
/// logged at `warn` so a host can still diagnose why a process died.
pub fn dispatch(graph: &mut Graph, frame: Ref, pc: Ref, sink: &mut dyn PrintSink) -> Step {
    let opcode_sym = match graph.get(pc, sym_of("opcode")) {
        Ok(Value::Sym(s)) => s,
        _ => {
            tracing::warn!(%pc, %frame, "instruction node missing an opcode symbol");
            return Step::Exit;
        }
    };
    let op = match Opcode::from_symbol(opcode_sym) {
        Some(op) => op,
        None => {
            tracing::warn!(%pc, %frame, opcode = %opcode_sym, "unknown opcode");
            return Step::Exit;
        }
    };
    match run(op, graph, frame, pc, sink) {
        Ok(step) => step,
        Err(err) => {
            tracing::warn!(%pc, %frame, opcode = op.mnemonic(), error = %err, "fatal opcode error");
            Step::Exit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::VecSink;
    use gvm_util::Value;

    fn inst(graph: &mut Graph, opcode: &str) -> Ref {
        let node = graph.alloc();
        graph.set(node, sym_of("opcode"), Value::Sym(Symbol::new(opcode).unwrap())).unwrap();
        node
    }

    fn link(graph: &mut Graph, from: Ref, key: &str, to: Ref) {
        graph.set(from, sym_of(key), Value::Ref(to)).unwrap();
    }

    #[test]
    fn add_computes_sum_and_advances() {
        let mut graph = Graph::new();
        let frame = graph.alloc();
        graph.set(frame, sym_of("a"), Value::Int(2)).unwrap();
        graph.set(frame, sym_of("b"), Value::Int(3)).unwrap();

        let pc = inst(&mut graph, "add");
        graph.set(pc, sym_of("syma"), Value::Sym(sym_of("a"))).unwrap();
        graph.set(pc, sym_of("symb"), Value::Sym(sym_of("b"))).unwrap();
        graph.set(pc, sym_of("symc"), Value::Sym(sym_of("c"))).unwrap();
        let next = graph.alloc();
        link(&mut graph, pc, "next", next);

        let mut sink = VecSink::default();
        let step = dispatch(&mut graph, frame, pc, &mut sink);
        assert_eq!(step, Step::Advance(frame));
        assert_eq!(graph.get(frame, sym_of("c")).unwrap(), Value::Int(5));
        assert_eq!(graph.get(frame, sym_of(INSTPNTR)).unwrap(), Value::Ref(next));
    }

    #[test]
    fn print_emits_formatted_line() {
        let mut graph = Graph::new();
        let frame = graph.alloc();
        graph.set(frame, sym_of("v"), Value::Int(7)).unwrap();
        let pc = inst(&mut graph, "print");
        graph.set(pc, sym_of("syma"), Value::Sym(sym_of("v"))).unwrap();
        let next = graph.alloc();
        link(&mut graph, pc, "next", next);

        let mut sink = VecSink::default();
        dispatch(&mut graph, frame, pc, &mut sink);
        assert_eq!(sink.0.len(), 1);
        assert!(sink.0[0].ends_with(": 7"));
    }

    #[test]
    fn branch_follows_eq_on_equal_operands() {
        let mut graph = Graph::new();
        let frame = graph.alloc();
        graph.set(frame, sym_of("a"), Value::Int(4)).unwrap();
        graph.set(frame, sym_of("b"), Value::Int(4)).unwrap();
        let pc = inst(&mut graph, "branch");
        graph.set(pc, sym_of("syma"), Value::Sym(sym_of("a"))).unwrap();
        graph.set(pc, sym_of("symb"), Value::Sym(sym_of("b"))).unwrap();
        let lt = graph.alloc();
        let eq = graph.alloc();
        let gt = graph.alloc();
        link(&mut graph, pc, "lt", lt);
        link(&mut graph, pc, "eq", eq);
        link(&mut graph, pc, "gt", gt);

        let mut sink = VecSink::default();
        dispatch(&mut graph, frame, pc, &mut sink);
        assert_eq!(graph.get(frame, sym_of(INSTPNTR)).unwrap(), Value::Ref(eq));
    }

    #[test]
    fn missing_slot_terminates_the_process() {
        let mut graph = Graph::new();
        let frame = graph.alloc();
        let pc = inst(&mut graph, "copy");
        graph.set(pc, sym_of("syma"), Value::Sym(sym_of("missing"))).unwrap();
        graph.set(pc, sym_of("symb"), Value::Sym(sym_of("out"))).unwrap();

        let mut sink = VecSink::default();
        let step = dispatch(&mut graph, frame, pc, &mut sink);
        assert_eq!(step, Step::Exit);
    }

    #[test]
    fn null_deref_terminates_the_process() {
        let mut graph = Graph::new();
        let frame = graph.alloc();
        graph.set(frame, sym_of("r"), Value::Ref(Ref::NULL)).unwrap();
        let pc = inst(&mut graph, "load");
        graph.set(pc, sym_of("syma"), Value::Sym(sym_of("r"))).unwrap();
        graph.set(pc, sym_of("symb"), Value::Sym(sym_of("x"))).unwrap();
        graph.set(pc, sym_of("symc"), Value::Sym(sym_of("out"))).unwrap();

        let mut sink = VecSink::default();
        assert_eq!(dispatch(&mut graph, frame, pc, &mut sink), Step::Exit);
    }

    #[test]
    fn itos_stoi_bit_reinterpret_round_trip() {
        let mut graph = Graph::new();
        let frame = graph.alloc();
        graph.set(frame, sym_of("n"), Value::Int(-7)).unwrap();
        let pc = inst(&mut graph, "itos");
        graph.set(pc, sym_of("syma"), Value::Sym(sym_of("n"))).unwrap();
        graph.set(pc, sym_of("symb"), Value::Sym(sym_of("s"))).unwrap();
        let next = graph.alloc();
        link(&mut graph, pc, "next", next);

        let mut sink = VecSink::default();
        dispatch(&mut graph, frame, pc, &mut sink);
        let sym = graph.get(frame, sym_of("s")).unwrap().as_sym().unwrap();

        let pc2 = inst(&mut graph, "stoi");
        graph.set(pc2, sym_of("syma"), Value::Sym(sym_of("s"))).unwrap();
        graph.set(pc2, sym_of("symb"), Value::Sym(sym_of("back"))).unwrap();
        let next2 = graph.alloc();
        link(&mut graph, pc2, "next", next2);
        dispatch(&mut graph, frame, pc2, &mut sink);

        assert_eq!(graph.get(frame, sym_of("s")).unwrap(), Value::Sym(sym));
        assert_eq!(graph.get(frame, sym_of("back")).unwrap(), Value::Int(-7));
    }
}
