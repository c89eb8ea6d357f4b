// cinder-vm - Error path tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use cinder_parser::{Error, ErrorKind};
use cinder_vm::State;

fn run_err(source: &str) -> Error {
    let mut state = State::new("<test>");
    let mut out = Vec::new();
    state
        .run_with_output(source, &mut out)
        .expect_err("expected the program to fail")
}

#[test]
fn test_syntax_error_kind_and_path() {
    let err = run_err("print 1");
    assert_eq!(err.kind, ErrorKind::Syntax);
    assert_eq!(err.path, "<test>");
}

#[test]
fn test_break_outside_loop() {
    let err = run_err("break;");
    assert_eq!(err.kind, ErrorKind::Compile);
    assert_eq!(err.msg, "Cannot use break statement outside of loop");

    // A function body does not inherit the surrounding loop.
    let err = run_err("loop { func f() { break; } }");
    assert_eq!(err.msg, "Cannot use break statement outside of loop");
}

#[test]
fn test_continue_outside_loop() {
    let err = run_err("continue;");
    assert_eq!(err.kind, ErrorKind::Compile);
    assert_eq!(err.msg, "Cannot use continue statement outside of loop");
}

#[test]
fn test_return_outside_function() {
    let err = run_err("return 1;");
    assert_eq!(err.kind, ErrorKind::Compile);
    assert_eq!(err.msg, "Return outside function");
}

#[test]
fn test_invalid_assignment_target() {
    let err = run_err("1 = 2;");
    assert_eq!(err.kind, ErrorKind::Compile);
    assert_eq!(err.msg, "Invalid assignment target");

    let err = run_err("var a; var b; a + b = 2;");
    assert_eq!(err.msg, "Invalid assignment target");
}

#[test]
fn test_duplicate_local() {
    let err = run_err("{ var x = 1; var x = 2; }");
    assert_eq!(err.kind, ErrorKind::Compile);
    assert_eq!(err.msg, "Already a local called 'x'");
}

#[test]
fn test_shadowing_at_deeper_scope_is_fine() {
    let mut state = State::new("<test>");
    let mut out = Vec::new();
    state
        .run_with_output("{ var x = 1; { var x = 2; } }", &mut out)
        .expect("shadowing at a deeper scope should compile");
}

#[test]
fn test_for_loop_unsupported() {
    let err = run_err("for x in y { }");
    assert_eq!(err.kind, ErrorKind::Compile);
    assert_eq!(err.msg, "For loops are not supported yet");
}

#[test]
fn test_type_declaration_unsupported() {
    let err = run_err("type Point { }");
    assert_eq!(err.kind, ErrorKind::Compile);
    assert_eq!(err.msg, "Type declarations are not supported yet");
}

#[test]
fn test_property_access_unsupported() {
    let err = run_err("var a = 1; a.b;");
    assert_eq!(err.kind, ErrorKind::Compile);
    assert_eq!(err.msg, "Property access is not supported yet");

    let err = run_err("var a = 1; a.b = 2;");
    assert_eq!(err.msg, "Property assignment is not supported yet");
}

#[test]
fn test_exit_code_out_of_range() {
    let err = run_err("exit 300;");
    assert_eq!(err.kind, ErrorKind::Compile);
    assert_eq!(err.msg, "Exit code must be an integer between 0 and 255");
}

#[test]
fn test_constant_pool_overflow() {
    let mut source = String::new();
    for i in 0..300 {
        source.push_str(&format!("print {}.5;\n", 1000 + i));
    }

    let err = run_err(&source);
    assert_eq!(err.kind, ErrorKind::Compile);
    assert_eq!(err.msg, "Too many constants in pool");
}

#[test]
fn test_missing_global() {
    let err = run_err("print missing;");
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert_eq!(
        err.msg,
        "Couldn't find global named missing in current module"
    );
    // The fault points at the identifier.
    assert_eq!(err.view.index, 6);
    assert_eq!(err.view.length, 7);
}

#[test]
fn test_assignment_to_missing_global() {
    let err = run_err("missing = 1;");
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert_eq!(
        err.msg,
        "Couldn't find global named missing in current module"
    );
}

#[test]
fn test_type_mismatch_errors() {
    assert_eq!(run_err("print 1 + 'a';").msg, "Can only add numbers or strings");
    assert_eq!(run_err("print 'a' - 'b';").msg, "Can only subtract numbers");
    assert_eq!(run_err("print 1 < 'a';").msg, "Can only compare numbers");
    assert_eq!(run_err("print -'a';").msg, "Can only negate a number");
}

#[test]
fn test_invalid_call_target() {
    let err = run_err("var x = 5; x();");
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert_eq!(err.msg, "Invalid call target");
}

#[test]
fn test_arity_mismatch() {
    let err = run_err("func f(a, b) { return a + b; } f(1);");
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert_eq!(err.msg, "Expected 2 arguments, got 1");

    let err = run_err("func g(a) { return a; } g(1, 2);");
    assert_eq!(err.msg, "Expected 1 argument, got 2");
}

#[test]
fn test_builtin_arity_and_type_errors() {
    let err = run_err("input();");
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert_eq!(err.msg, "Expected 1 argument, got 0");

    let err = run_err("random(1);");
    assert_eq!(err.msg, "Expected 2 arguments, got 1");

    let err = run_err("random('a', 2);");
    assert_eq!(
        err.msg,
        "Expected argument 0 to be of type 'Number', got 'String' instead"
    );
}

#[test]
fn test_deep_recursion_overflows_frames() {
    let err = run_err("func f() { return f(); } f();");
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert_eq!(err.msg, "Stack overflow");
}

#[test]
fn test_rendered_runtime_error_points_at_source() {
    let source = "var x = 1;\nprint missing;\n";
    let err = run_err(source);
    let rendered = err.render(source);
    assert!(rendered.starts_with("RuntimeError:"));
    assert!(rendered.contains("<test>:2:7"));
    assert!(rendered.contains("print missing;"));
}
