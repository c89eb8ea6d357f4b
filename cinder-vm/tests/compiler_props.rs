// cinder-vm - Property-based compiler tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Property-based tests for the compiler.
//!
//! Tests the following properties:
//! - Constant pools never hold duplicate numbers or names
//! - Every scope's PopLocals count equals the locals it introduced

use cinder_parser::Parser;
use cinder_vm::{Chunk, Compiler, Op};
use proptest::prelude::*;

fn compile(source: &str) -> Chunk {
    let ast = Parser::new(source, "<prop>").parse().expect("parse error");
    Compiler::new("<prop>")
        .compile(&ast)
        .expect("compile error")
}

proptest! {
    #[test]
    fn number_pool_stays_duplicate_free(
        values in proptest::collection::vec((1000u32..100_000u32, 1u32..1000u32), 1..40)
    ) {
        let mut source = String::new();
        for (whole, frac) in &values {
            source.push_str(&format!("print {}.{};\n", whole, frac));
        }

        let chunk = compile(&source);
        let mut bits: Vec<u64> = chunk.constants.numbers.iter().map(|n| n.to_bits()).collect();
        bits.sort_unstable();
        let before = bits.len();
        bits.dedup();
        prop_assert_eq!(bits.len(), before);
    }

    #[test]
    fn name_pool_stays_duplicate_free(count in 1usize..30) {
        // The same few names referenced over and over.
        let mut source = String::from("var alpha = 1; var beta = 2;\n");
        for _ in 0..count {
            source.push_str("alpha = alpha + beta;\nprint alpha, beta;\n");
        }

        let chunk = compile(&source);
        let mut names: Vec<&str> = chunk.constants.names.iter().map(|n| n.as_ref()).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        prop_assert_eq!(names.len(), before);
    }

    #[test]
    fn scope_close_matches_locals_introduced(counts in proptest::collection::vec(1usize..8, 1..6)) {
        // One block per entry, each declaring `count` locals; every block
        // must close with a PopLocals of exactly that count.
        let mut source = String::new();
        let mut expected = 0usize;
        for (block, count) in counts.iter().enumerate() {
            source.push_str("{\n");
            for i in 0..*count {
                source.push_str(&format!("var v{}_{} = {};\n", block, i, i));
            }
            source.push_str("}\n");
            expected += count;
        }

        let chunk = compile(&source);
        let mut popped = 0usize;
        let mut i = 0;
        while i < chunk.bytecode.len() {
            match Op::from_byte(chunk.bytecode[i]) {
                Some(Op::PopLocals) => {
                    popped += chunk.bytecode[i + 1] as usize;
                    i += 2;
                }
                Some(Op::ByteNumber) | Some(Op::Exit) => i += 2,
                Some(Op::DefineGlobal) | Some(Op::Name) | Some(Op::Number) => i += 2,
                _ => i += 1,
            }
        }
        prop_assert_eq!(popped, expected);
    }
}
