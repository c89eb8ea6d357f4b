// cinder-parser - Property-based tests for the scanner
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Property-based tests for the scanner.
//!
//! Tests the following properties:
//! - The scanner terminates on arbitrary ASCII input and ends with EndOfFile
//! - Token views are in-bounds, non-overlapping, and strictly advancing
//! - Token views plus skipped bytes reconstruct the source exactly
//! - Integer and decimal spellings scan as a single Number token with the
//!   expected value

use cinder_parser::ast::Expr;
use cinder_parser::ast::Stmt;
use cinder_parser::{Parser, Scanner, Token, TokenKind};
use proptest::prelude::*;

fn tokenize(source: &str) -> Vec<Token> {
    let mut scanner = Scanner::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.next_token();
        let done = token.kind == TokenKind::EndOfFile;
        tokens.push(token);
        if done {
            break;
        }
    }
    tokens
}

/// Arbitrary printable-ASCII source text.
fn arb_ascii_source() -> impl Strategy<Value = String> {
    proptest::collection::vec(32u8..127u8, 0..200)
        .prop_map(|bytes| String::from_utf8(bytes).unwrap())
}

proptest! {
    #[test]
    fn scanner_terminates_and_views_advance(source in arb_ascii_source()) {
        let tokens = tokenize(&source);

        prop_assert_eq!(tokens.last().unwrap().kind, TokenKind::EndOfFile);

        let mut covered = 0;
        for token in &tokens {
            prop_assert!(token.view.index >= covered);
            prop_assert!(token.view.end() <= source.len());
            covered = token.view.end();
        }
    }

    #[test]
    fn lex_round_trip(source in arb_ascii_source()) {
        // Concatenating every token's source range, interleaved with the
        // skipped whitespace and comments, reconstructs the source.
        let mut rebuilt = String::new();
        let mut covered = 0;
        for token in tokenize(&source) {
            rebuilt.push_str(&source[covered..token.view.index]);
            rebuilt.push_str(&source[token.view.index..token.view.end()]);
            covered = token.view.end();
        }
        rebuilt.push_str(&source[covered..]);
        prop_assert_eq!(rebuilt, source);
    }

    #[test]
    fn integers_scan_as_numbers(value in 0u32..1_000_000u32) {
        let source = value.to_string();
        let tokens = tokenize(&source);
        prop_assert_eq!(tokens.len(), 2);
        prop_assert_eq!(tokens[0].kind, TokenKind::Number);
        prop_assert_eq!(&tokens[0].text, &source);
    }

    #[test]
    fn decimals_parse_to_expected_value(whole in 0u32..100_000u32, frac in 0u32..1000u32) {
        let source = format!("{}.{};", whole, frac);
        let ast = Parser::new(&source, "<prop>").parse().unwrap();
        let [Stmt::Expr(stmt)] = &ast.body[..] else {
            return Err(TestCaseError::fail("expected one expression statement"));
        };
        let Expr::Number(n) = &stmt.expr else {
            return Err(TestCaseError::fail("expected a number literal"));
        };
        let expected: f64 = format!("{}.{}", whole, frac).parse().unwrap();
        prop_assert_eq!(n.value, expected);
    }
}
