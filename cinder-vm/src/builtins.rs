// cinder-vm - Bytecode compiler and virtual machine for the Cinder scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Host-provided built-in functions.
//!
//! Built-ins follow the host ABI described on [`crate::value::BuiltInFn`]:
//! they read arguments relative to the frame base, write their result into
//! the return slot, and report failures through [`Vm::error_at`]. A built-in
//! may block (reading a line blocks the whole VM) but must never call back
//! into the interpreter.

use std::cell::RefCell;
use std::io::{self, BufRead};
use std::rc::Rc;

use rand::Rng;

use crate::value::{BuiltInFn, BuiltInFunction, Module, Value};
use crate::vm::Vm;

/// Merge the built-in functions into a module's globals.
pub fn install(module: &Rc<RefCell<Module>>) {
    let table: &[(&str, BuiltInFn)] = &[("input", builtin_input), ("random", builtin_random)];

    let mut module = module.borrow_mut();
    for (name, func) in table {
        module.globals.insert(
            Rc::from(*name),
            Value::BuiltIn(Rc::new(BuiltInFunction {
                name: name.to_string(),
                func: *func,
            })),
        );
    }
}

fn check_argc(vm: &mut Vm<'_>, argc: u8, expected: u8) -> bool {
    if argc != expected {
        vm.error_at(format!(
            "Expected {} argument{}, got {}",
            expected,
            if expected == 1 { "" } else { "s" },
            argc
        ));
        return false;
    }
    true
}

fn number_arg(vm: &mut Vm<'_>, sp: usize, index: usize) -> Option<f64> {
    match vm.builtin_arg(sp, index) {
        Value::Number(value) => Some(value),
        other => {
            vm.error_at(format!(
                "Expected argument {} to be of type 'Number', got '{}' instead",
                index,
                other.type_name()
            ));
            None
        }
    }
}

/// `input(prompt)` — write the prompt, read a line from standard input, and
/// return it without its trailing newline.
fn builtin_input(vm: &mut Vm<'_>, sp: usize, argc: u8) -> bool {
    if !check_argc(vm, argc, 1) {
        return false;
    }

    let prompt = match vm.builtin_arg(sp, 0) {
        Value::Str(text) => text,
        other => {
            vm.error_at(format!(
                "Expected argument 0 to be of type 'String', got '{}' instead",
                other.type_name()
            ));
            return false;
        }
    };

    vm.write_output(&prompt);

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        vm.error_at("Failed to read from standard input");
        return false;
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }

    vm.builtin_return(sp, Value::str(line));
    true
}

/// `random(min, max)` — a uniform integer in `[min, max]`, inclusive.
fn builtin_random(vm: &mut Vm<'_>, sp: usize, argc: u8) -> bool {
    if !check_argc(vm, argc, 2) {
        return false;
    }

    let Some(min) = number_arg(vm, sp, 0) else {
        return false;
    };
    let Some(max) = number_arg(vm, sp, 1) else {
        return false;
    };

    let (min, max) = (min as i64, max as i64);
    if min > max {
        vm.error_at("random: min must not be greater than max");
        return false;
    }

    let value = rand::thread_rng().gen_range(min..=max);
    vm.builtin_return(sp, Value::Number(value as f64));
    true
}
