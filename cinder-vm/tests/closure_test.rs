// cinder-vm - Closure and upvalue tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use cinder_vm::State;

fn run_output(source: &str) -> String {
    let mut state = State::new("<test>");
    let mut out = Vec::new();
    let code = state
        .run_with_output(source, &mut out)
        .expect("program failed");
    assert_eq!(code, 0, "expected a clean exit");
    String::from_utf8(out).expect("output not utf-8")
}

#[test]
fn test_counters_are_independent() {
    // Every counter from the same factory owns its own captured slot.
    for n in 1..=8 {
        let mut source = String::from(
            "func make_counter() {
    var count = 0;
    func step() { count = count + 1; return count; }
    return step;
}
",
        );
        for i in 0..n {
            source.push_str(&format!("var c{} = make_counter();\n", i));
        }
        // Advance counter 0 twice, the rest once.
        source.push_str("c0(); c0();\n");
        for i in 0..n {
            source.push_str(&format!("print c{}();\n", i));
        }

        let mut expected = String::from("3\n");
        for _ in 1..n {
            expected.push_str("2\n");
        }
        assert_eq!(run_output(&source), expected, "with {} counters", n);
    }
}

#[test]
fn test_two_closures_share_one_capture() {
    let source = "\
var inc;
var get;
func setup() {
    var n = 0;
    func i() { n += 1; return n; }
    func g() { return n; }
    inc = i;
    get = g;
}
setup();
inc();
inc();
print get();
";
    assert_eq!(run_output(source), "2\n");
}

#[test]
fn test_capture_survives_frame_exit() {
    // The captured slot is closed when `make` returns; the closure keeps
    // the value alive.
    let source = "\
func make(start) {
    func get() { return start; }
    return get;
}
var a = make(10);
var b = make(20);
print a(), b(), a();
";
    assert_eq!(run_output(source), "10 20 10\n");
}

#[test]
fn test_transitive_capture_through_middle_function() {
    // The innermost function reaches a variable two frames out; the
    // capture threads through the middle function's upvalues.
    let source = "\
func outer() {
    var x = 7;
    func middle() {
        func inner() { return x; }
        return inner;
    }
    return middle;
}
var m = outer();
var i = m();
print i();
";
    assert_eq!(run_output(source), "7\n");
}

#[test]
fn test_writes_through_closed_upvalue() {
    // Writing through one closure is visible through the other after the
    // owning frame is long gone.
    let source = "\
func make_pair() {
    var n = 100;
    func bump() { n += 5; return n; }
    func read() { return n; }
    func choose(which) {
        if which == 1 { return bump; }
        else { return read; }
    }
    return choose;
}
var choose = make_pair();
var bump = choose(1);
var read = choose(2);
bump();
bump();
print read();
";
    assert_eq!(run_output(source), "110\n");
}

#[test]
fn test_capture_of_argument() {
    let source = "\
func adder(amount) {
    func add(x) { return x + amount; }
    return add;
}
var add3 = adder(3);
print add3(4), add3(10);
";
    assert_eq!(run_output(source), "7 13\n");
}

#[test]
fn test_open_capture_sees_live_slot() {
    // While the owning frame is still live, reads through the closure see
    // writes to the local and vice versa.
    let source = "\
func run() {
    var n = 1;
    func get() { return n; }
    n = 2;
    return get();
}
print run();
";
    assert_eq!(run_output(source), "2\n");
}
