//! gvm-asm - line-oriented textual assembler for instruction graphs.
//!
//! Grounded on `original_source/src/asm.c`'s recursive-descent grammar
//! (`ndl_asm_parse_line` / `_nline` / `_arglist` / `_kvlist` / `_obj`):
//! each line is either a label definition (`name:`) or an opcode with up
//! to 26 positional arguments (`syma`..`symz`) followed by an optional
//! `| key=value, ...` tail that can overwrite any slot on the
//! instruction, including its own `next`.
//!
//! Two divergences from the C source, both noted in `DESIGN.md`:
//! forward label references are tracked in a plain `Vec` rather than as
//! graph nodes threaded through a `brefhead` list, and the label table
//! is a host-side `FxHashMap` rather than a graph node - Rust has an
//! associative container to reach for that C didn't.

mod cursor;
mod error;

pub use error::{AssembleError, AssembleResult};

use cursor::Cursor;
use gvm_graph::Graph;
use gvm_util::{Ref, Symbol, Value};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Everything assembling a fresh program hands back: the graph it built
/// and the first instruction of the program.
pub struct AssembleOutput {
    pub graph: Graph,
    pub head: Ref,
}

/// Assemble `source` into a new graph.
pub fn assemble(source: &str) -> AssembleResult<AssembleOutput> {
    let mut graph = Graph::new();
    let head = assemble_into(source, &mut graph)?;
    Ok(AssembleOutput { graph, head })
}

/// Assemble `source` onto an existing graph, e.g. one a runtime already
/// owns. Returns the first instruction node.
pub fn assemble_into(source: &str, graph: &mut Graph) -> AssembleResult<Ref> {
    Parser::new(source, graph).parse()
}

struct PendingRef {
    inst: Ref,
    slot: Symbol,
    label: Symbol,
    line: u32,
    column: u32,
}

struct Parser<'a> {
    cursor: Cursor<'a>,
    graph: &'a mut Graph,
    labels: FxHashMap<Symbol, Ref>,
    pending: Vec<PendingRef>,
    curr_inst: Ref,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, graph: &'a mut Graph) -> Self {
        let head = graph.alloc();
        Parser {
            cursor: Cursor::new(source),
            graph,
            labels: FxHashMap::default(),
            pending: Vec::new(),
            curr_inst: head,
        }
    }

    fn parse(mut self) -> AssembleResult<Ref> {
        let head = self.curr_inst;
        while !self.cursor.is_at_end() {
            self.parse_line()?;
        }
        self.resolve_pending()?;
        Ok(head)
    }

    fn error(&self, message: impl Into<String>) -> AssembleError {
        AssembleError::parse(message, self.cursor.line(), self.cursor.column())
    }

    fn set(&mut self, node: Ref, key: Symbol, value: Value) -> AssembleResult<()> {
        self.graph.set(node, key, value).map_err(|e| self.error(format!("internal error: {e}")))
    }

    fn salloc(&mut self, parent: Ref, key: Symbol) -> AssembleResult<Ref> {
        self.graph.salloc(parent, key).map_err(|e| self.error(format!("internal error: {e}")))
    }

    fn skip_ws(&mut self) {
        while is_ws(self.cursor.current()) {
            self.cursor.advance();
        }
    }

    /// One line: whitespace-only lines and comment-only lines are
    /// consumed here directly, everything starting with a symbol goes
    /// to [`Self::parse_nline`].
    fn parse_line(&mut self) -> AssembleResult<()> {
        self.skip_ws();
        let c = self.cursor.current();
        if is_comment(c) {
            self.eat_comment();
        } else if is_eol(c) {
            self.cursor.advance();
        } else if is_eos(c) {
            // nothing left to do
        } else if is_symbol_start(c) {
            self.parse_nline()?;
        } else {
            return Err(self.error("expected whitespace, comment, end of line, end of input, or symbol"));
        }
        Ok(())
    }

    fn eat_comment(&mut self) {
        while !is_eol(self.cursor.current()) && !is_eos(self.cursor.current()) {
            self.cursor.advance();
        }
        if is_eol(self.cursor.current()) {
            self.cursor.advance();
        }
    }

    fn expect_line_end(&mut self) -> AssembleResult<()> {
        self.skip_ws();
        let c = self.cursor.current();
        if is_comment(c) {
            self.eat_comment();
        } else if is_eol(c) {
            self.cursor.advance();
        } else if !is_eos(c) {
            return Err(self.error("expected comment, end of line, or end of input"));
        }
        Ok(())
    }

    /// A symbol-starting line: either `name:` (label definition) or an
    /// opcode mnemonic followed by its arglist and kv-tail.
    fn parse_nline(&mut self) -> AssembleResult<()> {
        let name = self.eat_sym()?;

        if self.cursor.current() == b':' {
            self.cursor.advance();
            self.labels.insert(name, self.curr_inst);
            self.expect_line_end()?;
            return Ok(());
        }

        let inst = self.curr_inst;
        self.set(inst, Symbol::of("opcode"), Value::Sym(name))?;
        self.parse_arglist(inst)?;
        let next = self.salloc(inst, Symbol::of("next"))?;
        self.parse_kvlist(inst)?;
        self.curr_inst = next;
        self.expect_line_end()
    }

    fn parse_arglist(&mut self, inst: Ref) -> AssembleResult<()> {
        self.skip_ws();
        if !is_obj_start(self.cursor.current()) {
            return Ok(());
        }

        self.parse_obj(inst, positional_slot(0)?)?;

        let mut index = 1;
        loop {
            self.skip_ws();
            let c = self.cursor.current();
            if !is_sep(c) {
                return Ok(());
            }
            if c == b'-' {
                if self.cursor.peek(1) != b'>' {
                    return Err(self.error("expected separator"));
                }
                self.cursor.advance_n(2);
            } else {
                self.cursor.advance();
            }
            self.skip_ws();
            if !is_obj_start(self.cursor.current()) {
                return Err(self.error("expected argument"));
            }
            self.parse_obj(inst, positional_slot(index)?)?;
            index += 1;
        }
    }

    fn parse_kvlist(&mut self, inst: Ref) -> AssembleResult<()> {
        if self.cursor.current() != b'|' {
            return Ok(());
        }
        self.cursor.advance();
        while self.parse_kvlist_pair(inst)? {}
        Ok(())
    }

    fn parse_kvlist_pair(&mut self, inst: Ref) -> AssembleResult<bool> {
        self.skip_ws();
        if !is_symbol_start(self.cursor.current()) {
            return Ok(false);
        }
        let key = self.eat_sym()?;
        self.skip_ws();
        if self.cursor.current() != b'=' {
            return Err(self.error("expected '=' in key-value list"));
        }
        self.cursor.advance();
        self.skip_ws();
        self.parse_obj(inst, key)?;
        self.skip_ws();
        if self.cursor.current() == b',' {
            self.cursor.advance();
        }
        Ok(true)
    }

    /// A number, a `:label` reference, or a bare symbol - stores
    /// directly into `inst[slot]`, deferring to [`Self::pending`] when
    /// the label hasn't been defined yet.
    fn parse_obj(&mut self, inst: Ref, slot: Symbol) -> AssembleResult<()> {
        let c = self.cursor.current();
        if is_num_start(c) {
            let value = self.eat_num()?;
            self.set(inst, slot, value)
        } else if c == b':' {
            let line = self.cursor.line();
            let column = self.cursor.column();
            self.cursor.advance();
            let label = self.eat_sym()?;
            if let Some(&target) = self.labels.get(&label) {
                self.set(inst, slot, Value::Ref(target))
            } else {
                self.pending.push(PendingRef { inst, slot, label, line, column });
                Ok(())
            }
        } else if is_symbol_start(c) {
            let sym = self.eat_sym()?;
            self.set(inst, slot, Value::Sym(sym))
        } else {
            Err(self.error("expected number, label, or symbol"))
        }
    }

    fn eat_sym(&mut self) -> AssembleResult<Symbol> {
        let start = self.cursor.position();
        while is_symbol_continue(self.cursor.current()) {
            self.cursor.advance();
        }
        let text = self.cursor.slice_from(start);
        if text.is_empty() {
            return Err(self.error("expected symbol"));
        }
        Symbol::new(text).map_err(|_| self.error("symbols must be eight characters or fewer"))
    }

    fn eat_num(&mut self) -> AssembleResult<Value> {
        let negative = self.cursor.current() == b'-';
        if negative {
            self.cursor.advance();
        }

        let mut int_val: i64 = 0;
        while is_digit(self.cursor.current()) {
            int_val = int_val.wrapping_mul(10).wrapping_add((self.cursor.current() - b'0') as i64);
            self.cursor.advance();
        }

        if self.cursor.current() != b'.' {
            return Ok(Value::Int(if negative { -int_val } else { int_val }));
        }

        self.cursor.advance();
        if !is_digit(self.cursor.current()) {
            return Err(self.error("expected decimal portion of floating point number"));
        }
        let mut frac = int_val as f64;
        let mut scale = 0.1;
        while is_digit(self.cursor.current()) {
            frac += scale * (self.cursor.current() - b'0') as f64;
            scale *= 0.1;
            self.cursor.advance();
        }
        Ok(Value::Float(if negative { -frac } else { frac }))
    }

    fn resolve_pending(&mut self) -> AssembleResult<()> {
        let pending = std::mem::take(&mut self.pending);
        debug!(count = pending.len(), "resolving forward label references");
        for p in pending {
            let Some(&target) = self.labels.get(&p.label) else {
                return Err(AssembleError::unresolved_label(p.label.trimmed(), p.line, p.column));
            };
            self.graph
                .set(p.inst, p.slot, Value::Ref(target))
                .map_err(|e| AssembleError::parse(format!("internal error: {e}"), p.line, p.column))?;
        }
        Ok(())
    }
}

fn positional_slot(index: usize) -> AssembleResult<Symbol> {
    if index >= 26 {
        return Err(AssembleError::parse("opcodes must have fewer than 26 arguments", 0, 0));
    }
    let letter = (b'a' + index as u8) as char;
    Ok(Symbol::new(&format!("sym{letter}")).expect("positional slot symbol always fits"))
}

fn is_ws(b: u8) -> bool {
    b == b' ' || b == b'\t'
}
fn is_eol(b: u8) -> bool {
    b == b'\n' || b == b'\r'
}
fn is_eos(b: u8) -> bool {
    b == 0
}
fn is_comment(b: u8) -> bool {
    b == b'#'
}
fn is_digit(b: u8) -> bool {
    b.is_ascii_digit()
}
fn is_num_start(b: u8) -> bool {
    is_digit(b) || b == b'-'
}
fn is_symbol_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'-'
}
fn is_symbol_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}
fn is_sep(b: u8) -> bool {
    b == b'-' || b == b',' || b == b'.'
}
fn is_obj_start(b: u8) -> bool {
    is_symbol_start(b) || b == b':' || is_num_start(b)
}
