// cinder - A small imperative scripting language with a bytecode VM
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::env;
use std::fs;
use std::process;

use cinder_vm::State;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() == 2 && (args[1] == "--version" || args[1] == "-v") {
        println!("Cinder v{}", env!("CARGO_PKG_VERSION"));
        return;
    }

    match args.len() {
        1 => run_repl(),
        2 => run_file(&args[1]),
        _ => {
            eprintln!("Usage: cinder [path]");
            process::exit(1);
        }
    }
}

/// Compile and run a source file; the process exits with the program's
/// exit code.
fn run_file(path: &str) {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("Error reading '{}': {}", path, error);
            process::exit(1);
        }
    };

    let mut state = State::new(path);
    process::exit(state.run(&source));
}

/// Run the interactive REPL. Globals persist across lines; the literal
/// input `exit` (or Ctrl-C / Ctrl-D) ends the session.
fn run_repl() {
    println!("Cinder v{}", env!("CARGO_PKG_VERSION"));

    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(error) => {
            eprintln!("Could not initialise the REPL: {}", error);
            process::exit(1);
        }
    };

    let mut state = State::new("<repl>");

    loop {
        match editor.readline(">>> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" {
                    break;
                }

                let _ = editor.add_history_entry(line);
                state.run(line);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(error) => {
                eprintln!("Read error: {}", error);
                break;
            }
        }
    }
}
