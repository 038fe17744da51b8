// Integration tests covering the end-to-end scenarios and boundary
// behaviors a full source-to-output run must produce.

use dukkha::compiler::compile;
use dukkha::vm::VM;

fn run(source: &str) -> Result<String, String> {
    let bytecode = compile(source).map_err(|errs| {
        errs.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n")
    })?;
    let mut vm = VM::new(&bytecode);
    let mut out = Vec::new();
    vm.execute(&mut out).map_err(|e| e.to_string())?;
    Ok(String::from_utf8(out).unwrap())
}

#[test]
fn scenario_arithmetic_precedence() {
    assert_eq!(run("print 1 + 2 * 3;").unwrap(), "7\n");
}

#[test]
fn scenario_exponent() {
    assert_eq!(run("print 2 ** 3;").unwrap(), "8\n");
}

#[test]
fn scenario_globals_and_subtraction() {
    assert_eq!(run("let x = 10; let y = 4; print x - y;").unwrap(), "6\n");
}

#[test]
fn scenario_string_concatenation() {
    assert_eq!(run("let s = 'hi'; print s + ' there';").unwrap(), "hi there\n");
}

#[test]
fn scenario_while_loop_counting() {
    assert_eq!(
        run("let i = 0; while i < 3 { print i; i = i + 1; }").unwrap(),
        "0\n1\n2\n"
    );
}

#[test]
fn scenario_if_else() {
    assert_eq!(
        run("if 1 == 1 { print 'yes'; } else { print 'no'; }").unwrap(),
        "yes\n"
    );
}

#[test]
fn boundary_let_without_initializer_binds_null() {
    assert_eq!(run("let x; print x;").unwrap(), "null\n");
}

#[test]
fn boundary_undeclared_global_read_is_runtime_error() {
    assert!(run("print nope;").is_err());
}

#[test]
fn boundary_duplicate_global_allocation_is_runtime_error() {
    assert!(run("let x = 1; let x = 2;").is_err());
}

#[test]
fn boundary_if_else_if_else_picks_first_true_branch() {
    assert_eq!(
        run("if false { print 'a'; } else if true { print 'b'; } else { print 'c'; }").unwrap(),
        "b\n"
    );
}

#[test]
fn boundary_while_with_non_bool_predicate_is_runtime_error() {
    assert!(run("while 1 { print 1; }").is_err());
}

#[test]
fn boundary_string_multiplication_both_orders_and_negative_count() {
    assert_eq!(run("print 'ab' * 3;").unwrap(), "ababab\n");
    assert_eq!(run("print 3 * 'ab';").unwrap(), "ababab\n");
    assert_eq!(run("print 'ab' * -1;").unwrap(), "\n");
}

#[test]
fn block_scoping_leaves_stack_depth_unchanged() {
    // A block that declares and uses locals, followed by more top-level
    // code referencing only globals, must not leave stray values on the
    // stack -- if it did, the trailing print would read garbage.
    let out = run(
        "let total = 0; { let a = 1; let b = 2; total = a + b; } print total;",
    )
    .unwrap();
    assert_eq!(out, "3\n");
}

#[test]
fn nested_blocks_reuse_slots_after_exit() {
    let out = run(
        "let x = 0; { let a = 1; x = a; } { let a = 2; x = x + a; } print x;",
    )
    .unwrap();
    assert_eq!(out, "3\n");
}

#[test]
fn assignment_targets_local_when_shadowing_a_global() {
    let out = run("let x = 1; { let x = 2; x = 3; print x; } print x;").unwrap();
    assert_eq!(out, "3\n1\n");
}
