// cinder-vm - Bytecode compiler and virtual machine for the Cinder scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The process-wide interpreter state.
//!
//! A [`State`] owns the root module (with the built-ins merged into its
//! globals at startup) and drives `source → tokens → AST → chunk → run`.
//! Parser, compiler, and VM are transient per run; the state is reused
//! across REPL lines so globals persist.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use cinder_parser::{Error, Parser};

use crate::builtins;
use crate::compiler::Compiler;
use crate::value::Module;
use crate::vm::Vm;

/// The interpreter state: one per program or REPL session.
pub struct State {
    base: Rc<RefCell<Module>>,
    path: String,
}

impl State {
    /// Create a state with the built-ins bound in the root module.
    /// `path` labels diagnostics (a file path, or a pseudo-path like
    /// `<repl>`).
    pub fn new(path: &str) -> Self {
        let base = Rc::new(RefCell::new(Module::new("main")));
        builtins::install(&base);

        Self {
            base,
            path: path.to_string(),
        }
    }

    /// The root module.
    pub fn base_module(&self) -> &Rc<RefCell<Module>> {
        &self.base
    }

    /// Compile and run `source`, streaming program output to `out`.
    ///
    /// Returns the program's exit code, or the first diagnostic from
    /// whichever phase failed.
    pub fn run_with_output(&mut self, source: &str, out: &mut dyn Write) -> Result<i32, Error> {
        let ast = Parser::new(source, &self.path).parse()?;
        let chunk = Compiler::new(&self.path).compile(&ast)?;

        let mut vm = Vm::new(&self.path, out);
        vm.interpret(self.base.clone(), Rc::new(chunk))
    }

    /// Compile and run `source` against standard output, rendering any
    /// diagnostic to standard error. Returns the process exit code.
    pub fn run(&mut self, source: &str) -> i32 {
        let mut out = io::stdout();

        match self.run_with_output(source, &mut out) {
            Ok(code) => code,
            Err(error) => {
                eprintln!("{}", error.render(source));
                1
            }
        }
    }
}
