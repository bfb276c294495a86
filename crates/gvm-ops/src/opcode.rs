//! Opcode - the closed catalogue of instruction mnemonics.
//!
//! Grounded on `andrewsmike/nodel`'s `opcodes.c`, which defines exactly
//! this set via a handful of macros (`BEGINOP`, `ONEARGINTOP`,
//! `TWOARGFPOP`, ...). Dispatch is a linear scan over a small table,
//! which spec explicitly calls adequate for a catalogue this size.

use gvm_util::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    New,
    Copy,
    Load,
    Save,
    Drop,
    Count,
    ILoad,
    Add,
    Sub,
    Neg,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Not,
    LShift,
    RShift,
    ULShift,
    URShift,
    FAdd,
    FSub,
    FNeg,
    FMul,
    FDiv,
    FMod,
    FSqrt,
    FtoI,
    ItoF,
    ItoS,
    StoI,
    Branch,
    Push,
    Print,
    Exit,
    Fork,
}

/// `(mnemonic, opcode)` pairs; mnemonics are the un-padded text an
/// assembler source file spells the opcode with.
const TABLE: &[(&str, Opcode)] = &[
    ("new", Opcode::New),
    ("copy", Opcode::Copy),
    ("load", Opcode::Load),
    ("save", Opcode::Save),
    ("drop", Opcode::Drop),
    ("count", Opcode::Count),
    ("iload", Opcode::ILoad),
    ("add", Opcode::Add),
    ("sub", Opcode::Sub),
    ("neg", Opcode::Neg),
    ("mul", Opcode::Mul),
    ("div", Opcode::Div),
    ("mod", Opcode::Mod),
    ("and", Opcode::And),
    ("or", Opcode::Or),
    ("xor", Opcode::Xor),
    ("not", Opcode::Not),
    ("lshift", Opcode::LShift),
    ("rshift", Opcode::RShift),
    ("ulshift", Opcode::ULShift),
    ("urshift", Opcode::URShift),
    ("fadd", Opcode::FAdd),
    ("fsub", Opcode::FSub),
    ("fneg", Opcode::FNeg),
    ("fmul", Opcode::FMul),
    ("fdiv", Opcode::FDiv),
    ("fmod", Opcode::FMod),
    ("fsqrt", Opcode::FSqrt),
    ("ftoi", Opcode::FtoI),
    ("itof", Opcode::ItoF),
    ("itos", Opcode::ItoS),
    ("stoi", Opcode::StoI),
    ("branch", Opcode::Branch),
    ("push", Opcode::Push),
    ("print", Opcode::Print),
    ("exit", Opcode::Exit),
    ("fork", Opcode::Fork),
];

impl Opcode {
    /// Look up the opcode a (possibly space-padded) symbol names.
    pub fn from_symbol(sym: Symbol) -> Option<Opcode> {
        let text = sym.trimmed();
        TABLE.iter().find(|(name, _)| *name == text).map(|(_, op)| *op)
    }

    /// The canonical un-padded mnemonic, for error messages and the
    /// disassembly view.
    pub fn mnemonic(self) -> &'static str {
        TABLE.iter().find(|(_, op)| *op == self).map(|(name, _)| *name).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_table_entry_roundtrips_through_a_symbol() {
        for &(name, op) in TABLE {
            let sym = Symbol::new(name).unwrap();
            assert_eq!(Opcode::from_symbol(sym), Some(op));
            assert_eq!(op.mnemonic(), name);
        }
    }

    #[test]
    fn unknown_mnemonic_is_none() {
        assert_eq!(Opcode::from_symbol(Symbol::of("bogus")), None);
    }
}
