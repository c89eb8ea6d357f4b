// cinder-vm - Bytecode compiler and virtual machine for the Cinder scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode disassembler.

use std::fmt::Write;

use crate::chunk::Chunk;
use crate::opcode::Op;

/// Render a chunk (and its nested prototypes) as one instruction per line.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut out = format!(">=== {} ===<\n", name);

    let mut offset = 0;
    while offset < chunk.bytecode.len() {
        offset = disassemble_instruction(chunk, offset, &mut out);
    }

    for prototype in &chunk.constants.prototypes {
        out.push_str(&disassemble_chunk(&prototype.chunk, &prototype.name));
    }

    out
}

fn disassemble_instruction(chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let _ = write!(out, "{:04} ", offset);

    let byte = chunk.bytecode[offset];
    let Some(op) = Op::from_byte(byte) else {
        let _ = writeln!(out, "Unknown Instruction ({})", byte);
        return offset + 1;
    };

    match op {
        // No operand.
        Op::Return
        | Op::Pop
        | Op::True
        | Op::False
        | Op::None
        | Op::Add
        | Op::Subtract
        | Op::Modulo
        | Op::Multiply
        | Op::Divide
        | Op::Exponent
        | Op::Equal
        | Op::Greater
        | Op::Less
        | Op::GreaterEqual
        | Op::LessEqual
        | Op::Not
        | Op::Negate => {
            let _ = writeln!(out, "{}", op.name());
            offset + 1
        }

        // One raw byte operand.
        Op::Exit
        | Op::PopLocals
        | Op::ByteNumber
        | Op::Print
        | Op::GetLocal
        | Op::SetLocal
        | Op::GetUpValue
        | Op::SetUpValue
        | Op::Call => {
            let operand = chunk.bytecode.get(offset + 1).copied().unwrap_or(0);
            let _ = writeln!(out, "{} {}", op.name(), operand);
            offset + 2
        }

        // One name-constant operand.
        Op::Name | Op::DefineGlobal | Op::GetGlobal | Op::SetGlobal => {
            let index = chunk.bytecode.get(offset + 1).copied().unwrap_or(0);
            let name = chunk
                .constants
                .names
                .get(index as usize)
                .map(|n| n.as_ref())
                .unwrap_or("?");
            let _ = writeln!(out, "{} {} '{}'", op.name(), index, name);
            offset + 2
        }

        // One number-constant operand.
        Op::Number => {
            let index = chunk.bytecode.get(offset + 1).copied().unwrap_or(0);
            match chunk.constants.numbers.get(index as usize) {
                Some(value) => {
                    let _ = writeln!(out, "{} {} ({})", op.name(), index, value);
                }
                None => {
                    let _ = writeln!(out, "{} {} (?)", op.name(), index);
                }
            }
            offset + 2
        }

        // One big-endian u16 distance; show the landing offset.
        Op::Jump | Op::JumpIfTrue | Op::JumpIfFalse | Op::JumpPopIfFalse | Op::JumpBack => {
            let hi = chunk.bytecode.get(offset + 1).copied().unwrap_or(0) as usize;
            let lo = chunk.bytecode.get(offset + 2).copied().unwrap_or(0) as usize;
            let distance = (hi << 8) | lo;
            let after = offset + 3;
            let target = if op == Op::JumpBack {
                after.wrapping_sub(distance)
            } else {
                after + distance
            };
            let _ = writeln!(out, "{} {} -> {:04}", op.name(), distance, target);
            offset + 3
        }

        // Prototype index, then one (index, is_local) pair per capture.
        Op::Function => {
            let index = chunk.bytecode.get(offset + 1).copied().unwrap_or(0) as usize;
            let mut next = offset + 2;
            match chunk.constants.prototypes.get(index) {
                Some(prototype) => {
                    let _ = writeln!(
                        out,
                        "Function {} <{}> ({} upvalues)",
                        index, prototype.name, prototype.upvalue_count
                    );
                    for _ in 0..prototype.upvalue_count {
                        let capture = chunk.bytecode.get(next).copied().unwrap_or(0);
                        let is_local = chunk.bytecode.get(next + 1).copied().unwrap_or(0) != 0;
                        let _ = writeln!(
                            out,
                            "{:04}   | capture {} {}",
                            next,
                            if is_local { "local" } else { "upvalue" },
                            capture
                        );
                        next += 2;
                    }
                }
                None => {
                    let _ = writeln!(out, "Function {} <?>", index);
                }
            }
            next
        }
    }
}
