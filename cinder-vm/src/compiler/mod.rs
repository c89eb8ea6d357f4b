// cinder-vm - Bytecode compiler and virtual machine for the Cinder scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler: transforms the Cinder AST to bytecode.
//!
//! A single-pass walk over the AST. Nested function declarations push fresh
//! [`types::ChunkData`] frames; nested loops push [`types::LoopData`]
//! frames. Lexical scopes, captured variables, jump fix-ups, and constant
//! pools are all resolved during the one pass.

pub mod codegen;
pub mod types;

pub use codegen::Compiler;
pub use types::{ChunkData, Local, LoopData, UpValueData};
