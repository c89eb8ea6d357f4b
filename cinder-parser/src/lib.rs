// cinder-parser - Scanner and parser for the Cinder scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # cinder-parser
//!
//! Scanner and parser for the Cinder scripting language.
//! Produces a source-annotated AST from source code strings, along with the
//! diagnostic type shared by every phase of the toolchain.

pub mod ast;
pub mod parser;
pub mod scanner;
pub mod span;
pub mod token;

pub use parser::Parser;
pub use scanner::Scanner;
pub use span::{Error, ErrorKind, SourceView};
pub use token::{Token, TokenKind};
