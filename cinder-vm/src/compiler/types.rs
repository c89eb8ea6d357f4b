// cinder-vm - Bytecode compiler and virtual machine for the Cinder scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Shared types for the bytecode compiler.

use crate::chunk::Chunk;

/// Local variable during compilation.
#[derive(Debug, Clone)]
pub struct Local {
    pub name: String,
    pub depth: u32,
}

/// A captured variable recorded at compile time.
///
/// `index` addresses the enclosing function's locals when `is_local` is
/// true, its upvalues otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpValueData {
    pub index: u8,
    pub is_local: bool,
}

/// Loop context for compiling break/continue.
#[derive(Debug)]
pub struct LoopData {
    /// Bytecode offset backward jumps return to.
    pub start: usize,
    /// Operand offsets of break jumps awaiting a patch.
    pub breaks: Vec<usize>,
    /// Scope depth outside the loop body; break/continue pop every local
    /// above it before jumping.
    pub depth: u32,
    /// The loop this one is nested in, if any.
    pub enclosing: Option<Box<LoopData>>,
}

/// Per-function compilation state.
///
/// The compiler keeps a stack of these, one per function declaration being
/// compiled, linked through `enclosing`. The outermost frame is the global
/// chunk.
#[derive(Debug)]
pub struct ChunkData {
    pub chunk: Chunk,
    pub scope_depth: u32,
    /// First local slot: 0 for the global chunk, 1 for functions (slot 0 is
    /// the return slot).
    pub local_offset: u8,
    pub global: bool,
    pub locals: Vec<Local>,
    pub upvalues: Vec<UpValueData>,
    pub loop_data: Option<Box<LoopData>>,
    pub enclosing: Option<Box<ChunkData>>,
}

impl ChunkData {
    /// Create compilation state for the global chunk or a function chunk.
    pub fn new(global: bool) -> Self {
        Self {
            chunk: Chunk::new(),
            scope_depth: 0,
            local_offset: if global { 0 } else { 1 },
            global,
            locals: Vec::new(),
            upvalues: Vec::new(),
            loop_data: None,
            enclosing: None,
        }
    }
}
