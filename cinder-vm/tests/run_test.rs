// cinder-vm - End-to-end execution tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use cinder_vm::State;

fn run(source: &str) -> (i32, String) {
    let mut state = State::new("<test>");
    let mut out = Vec::new();
    let code = state
        .run_with_output(source, &mut out)
        .expect("program failed");
    (code, String::from_utf8(out).expect("output not utf-8"))
}

fn run_output(source: &str) -> String {
    let (code, output) = run(source);
    assert_eq!(code, 0, "expected a clean exit");
    output
}

#[test]
fn test_arithmetic_and_precedence() {
    assert_eq!(run_output("print 2 + 3 * 4 ^ 2;"), "50\n");
    assert_eq!(run_output("print 7 % 3;"), "1\n");
    assert_eq!(run_output("print (2 + 3) * 4;"), "20\n");
    assert_eq!(run_output("print 1 / 2;"), "0.5\n");
}

#[test]
fn test_exponent_right_associative() {
    assert_eq!(run_output("print 2 ^ 3 ^ 2;"), "512\n");
}

#[test]
fn test_unary_operators() {
    assert_eq!(run_output("print -5 + 10;"), "5\n");
    assert_eq!(run_output("print ---5 + 10;"), "5\n");
    assert_eq!(run_output("print --5;"), "5\n");
    assert_eq!(run_output("print !0, !1, !'';"), "true false true\n");
}

#[test]
fn test_globals_and_compound_assignment() {
    assert_eq!(run_output("var x = 1; x += 2; print x;"), "3\n");
    assert_eq!(run_output("var x = 2; x ^= 3; print x;"), "8\n");
    assert_eq!(run_output("var x = 10; x /= 4; print x;"), "2.5\n");
}

#[test]
fn test_assignment_is_an_expression() {
    assert_eq!(run_output("var x = 0; var y = 0; x = y = 5; print x, y;"), "5 5\n");
}

#[test]
fn test_var_without_initialiser_is_none() {
    assert_eq!(run_output("var x; print x;"), "None\n");
}

#[test]
fn test_print_joins_with_spaces() {
    assert_eq!(
        run_output("print 'a' + 'b', 1, true, none;"),
        "ab 1 true None\n"
    );
}

#[test]
fn test_number_formatting() {
    assert_eq!(run_output("print 2.5, 100, .5;"), "2.5 100 0.5\n");
}

#[test]
fn test_block_scoping_and_shadowing() {
    assert_eq!(
        run_output("var x = 1; { var x = 2; print x; } print x;"),
        "2\n1\n"
    );
}

#[test]
fn test_if_else_chain() {
    let source = "\
var x = 2;
if x == 1 { print 'one'; }
else if x == 2 { print 'two'; }
else { print 'many'; }
";
    assert_eq!(run_output(source), "two\n");
}

#[test]
fn test_while_and_break() {
    assert_eq!(
        run_output("var i = 0; while true { if i >= 3 { break; } i = i + 1; } print i;"),
        "3\n"
    );
}

#[test]
fn test_loop_and_break() {
    assert_eq!(
        run_output("var i = 0; loop { i += 1; if i >= 3 { break; } } print i;"),
        "3\n"
    );
}

#[test]
fn test_while_and_continue() {
    let source = "\
var i = 0;
var sum = 0;
while i < 5 {
    i += 1;
    if i % 2 == 0 { continue; }
    sum += i;
}
print sum;
";
    assert_eq!(run_output(source), "9\n");
}

#[test]
fn test_nested_loops_break_inner() {
    let source = "\
var total = 0;
var i = 0;
while i < 3 {
    i += 1;
    var j = 0;
    loop {
        j += 1;
        if j >= 2 { break; }
    }
    total += j;
}
print total;
";
    assert_eq!(run_output(source), "6\n");
}

#[test]
fn test_loop_locals_do_not_accumulate() {
    // Each iteration's locals are popped before the back jump, so a long
    // loop with body locals stays within the stack cap.
    let source = "\
var i = 0;
while i < 20000 {
    var a = i;
    var b = a + 1;
    i = b;
}
print i;
";
    assert_eq!(run_output(source), "20000\n");
}

#[test]
fn test_functions_and_calls() {
    assert_eq!(
        run_output("func add(a, b) { return a + b; } print add(2, 3);"),
        "5\n"
    );
    assert_eq!(run_output("func nop() { } print nop();"), "None\n");
}

#[test]
fn test_recursion() {
    let source = "\
func fib(n) {
    if n < 2 { return n; }
    else { return fib(n - 1) + fib(n - 2); }
}
print fib(10);
";
    assert_eq!(run_output(source), "55\n");
}

#[test]
fn test_return_falls_through_to_function_exit() {
    // `return` writes the return slot but does not leave the function;
    // statements after it still execute.
    let source = "\
var seen = 0;
func f() {
    return 1;
    seen = 1;
    return 2;
}
print f(), seen;
";
    assert_eq!(run_output(source), "2 1\n");
}

#[test]
fn test_closure_counter() {
    let source = "\
func make() {
    var n = 0;
    func step() { n = n + 1; return n; }
    return step;
}
var s = make();
print s();
print s();
print s();
";
    assert_eq!(run_output(source), "1\n2\n3\n");
}

#[test]
fn test_short_circuit() {
    let source = "\
func bang() { exit 7; }
print false and bang();
print true or bang();
";
    let (code, output) = run(source);
    assert_eq!(code, 0);
    assert_eq!(output, "false\ntrue\n");
}

#[test]
fn test_and_or_results() {
    assert_eq!(run_output("print 1 and 2;"), "2\n");
    assert_eq!(run_output("print 0 and 2;"), "0\n");
    assert_eq!(run_output("print 1 or 2;"), "1\n");
    assert_eq!(run_output("print 0 or 2;"), "2\n");
}

#[test]
fn test_equality_table() {
    assert_eq!(
        run_output("print none == none, none == 0, none == '';"),
        "true false false\n"
    );
    // Booleans fold to the other side's truthiness.
    assert_eq!(
        run_output("print true == 1, false == 0, true == 'x', true == false;"),
        "true true true false\n"
    );
    assert_eq!(run_output("print 1 == 2, 'a' == 'a', 'a' != 'b';"), "false true true\n");
}

#[test]
fn test_exit_code() {
    let (code, output) = run("exit 42;");
    assert_eq!(code, 42);
    assert_eq!(output, "");
}

#[test]
fn test_exit_inside_function() {
    let (code, output) = run("func f() { exit 7; } print 'before'; f(); print 'after';");
    assert_eq!(code, 7);
    assert_eq!(output, "before\n");
}

#[test]
fn test_implicit_exit_zero() {
    assert_eq!(run("print 1;").0, 0);
}

#[test]
fn test_globals_persist_across_runs() {
    let mut state = State::new("<test>");
    let mut out = Vec::new();

    state
        .run_with_output("var x = 1;", &mut out)
        .expect("first run failed");
    state
        .run_with_output("x += 1; print x;", &mut out)
        .expect("second run failed");

    assert_eq!(String::from_utf8(out).unwrap(), "2\n");
}

#[test]
fn test_builtins_bound_at_startup() {
    let state = State::new("<test>");
    let module = state.base_module().borrow();
    assert!(module.globals.contains_key("input"));
    assert!(module.globals.contains_key("random"));
}

#[test]
fn test_random_builtin_in_range() {
    let source = "\
var ok = true;
var i = 0;
while i < 100 {
    var r = random(1, 6);
    if r < 1 or r > 6 { ok = false; }
    if r != 1 and r != 2 and r != 3 and r != 4 and r != 5 and r != 6 { ok = false; }
    i += 1;
}
print ok;
";
    assert_eq!(run_output(source), "true\n");
}
