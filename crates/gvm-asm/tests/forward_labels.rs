//! Forward-reference label resolution, end to end through `assemble`.

use gvm_asm::assemble;
use gvm_util::{Symbol, Value};

fn sym(name: &str) -> Symbol {
    Symbol::new(name).unwrap()
}

#[test]
fn branch_targets_resolve_after_their_labels_are_defined() {
    let src = "\
jump:
branch syma,symb | lt=:exit, eq=:exit, gt=:loop
loop:
sub syma,symb,symc
exit:
exit
";
    let out = assemble(src).unwrap();

    // `jump:` labels the branch instruction itself.
    assert_eq!(out.graph.get(out.head, sym("opcode")).unwrap(), Value::Sym(sym("branch")));

    let lt = out.graph.get(out.head, sym("lt")).unwrap().as_ref().unwrap();
    let eq = out.graph.get(out.head, sym("eq")).unwrap().as_ref().unwrap();
    let gt = out.graph.get(out.head, sym("gt")).unwrap().as_ref().unwrap();

    assert_eq!(out.graph.get(lt, sym("opcode")).unwrap(), Value::Sym(sym("exit")));
    assert_eq!(lt, eq, "lt and eq both target the same :exit label");
    assert_eq!(out.graph.get(gt, sym("opcode")).unwrap(), Value::Sym(sym("sub")));
}

#[test]
fn reference_to_a_label_that_is_never_defined_fails_with_line_and_column() {
    let src = "branch syma,symb | lt=:missing, eq=:missing, gt=:missing\nexit\n";

    let err = assemble(src).unwrap_err();

    assert_eq!(err.line(), 0);
    assert!(err.message().contains("missing"));
}

#[test]
fn parsing_the_same_source_twice_yields_isomorphic_graphs() {
    let src = "loop:\nbranch syma,symb | lt=:loop, eq=:done\ndone:\nexit\n";

    let a = assemble(src).unwrap();
    let b = assemble(src).unwrap();

    assert_eq!(a.graph.get(a.head, sym("opcode")).unwrap(), b.graph.get(b.head, sym("opcode")).unwrap());
    let a_lt = a.graph.get(a.head, sym("lt")).unwrap().as_ref().unwrap();
    let b_lt = b.graph.get(b.head, sym("lt")).unwrap().as_ref().unwrap();
    assert_eq!(a_lt, a.head);
    assert_eq!(b_lt, b.head);
}
