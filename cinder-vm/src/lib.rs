// cinder-vm - Bytecode compiler and virtual machine for the Cinder scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # cinder-vm
//!
//! Bytecode compiler and stack-based virtual machine for the Cinder
//! scripting language. Source flows linearly through the toolchain:
//! `source → tokens → AST → chunk → run`. The AST comes from
//! `cinder-parser`; this crate lowers it to bytecode and executes it.

pub mod builtins;
pub mod chunk;
pub mod compiler;
pub mod debug;
pub mod opcode;
pub mod state;
pub mod value;
pub mod vm;

pub use chunk::{Chunk, ConstantPool, Prototype};
pub use compiler::Compiler;
pub use opcode::Op;
pub use state::State;
pub use value::{BuiltInFunction, Function, Module, UpValue, Value};
pub use vm::{CallFrame, Vm};
