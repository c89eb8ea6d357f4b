// cinder-parser - Scanner and parser for the Cinder scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Scanner (tokeniser) for Cinder source code.
//!
//! A forward-only token producer over an in-memory source buffer. The
//! language treats source as ASCII; non-ASCII bytes come back as `Error`
//! tokens.

use crate::span::SourceView;
use crate::token::{Token, TokenKind};

/// The scanner converts source text into tokens.
pub struct Scanner<'a> {
    source: &'a [u8],
    start: usize,
    current: usize,
    line: u32,
    line_start: usize,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner for the given source code.
    pub fn new(source: &'a str) -> Self {
        Scanner {
            source: source.as_bytes(),
            start: 0,
            current: 0,
            line: 1,
            line_start: 0,
        }
    }

    /// Get the next token from the source.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        self.start = self.current;

        if self.is_at_end() {
            return self.make_token(TokenKind::EndOfFile);
        }

        let c = self.advance();

        if c.is_ascii_digit() {
            return self.scan_number();
        }
        if c.is_ascii_alphabetic() || c == b'_' {
            return self.scan_identifier();
        }
        if c == b'"' || c == b'\'' {
            return self.scan_string();
        }

        match c {
            b'(' => self.make_token(TokenKind::LeftParen),
            b')' => self.make_token(TokenKind::RightParen),
            b'{' => self.make_token(TokenKind::LeftBrace),
            b'}' => self.make_token(TokenKind::RightBrace),
            b',' => self.make_token(TokenKind::Comma),
            b';' => self.make_token(TokenKind::Semicolon),
            b'%' => self.make_token(TokenKind::Percent),

            b'+' => self.make_matched(b'=', TokenKind::PlusEqual, TokenKind::Plus),
            b'-' => self.make_matched(b'=', TokenKind::MinusEqual, TokenKind::Minus),
            b'/' => self.make_matched(b'=', TokenKind::SlashEqual, TokenKind::Slash),
            b'*' => self.make_matched(b'=', TokenKind::AsteriskEqual, TokenKind::Asterisk),
            b'^' => self.make_matched(b'=', TokenKind::CaretEqual, TokenKind::Caret),
            b'!' => self.make_matched(b'=', TokenKind::BangEqual, TokenKind::Bang),
            b'=' => self.make_matched(b'=', TokenKind::EqualEqual, TokenKind::Equal),
            b'>' => self.make_matched(b'=', TokenKind::GreaterEqual, TokenKind::Greater),
            b'<' => self.make_matched(b'=', TokenKind::LessEqual, TokenKind::Less),

            b'.' => {
                if self.peek().is_ascii_digit() {
                    self.scan_number()
                } else {
                    self.make_token(TokenKind::Dot)
                }
            }

            _ => self.make_token(TokenKind::Error),
        }
    }

    fn advance(&mut self) -> u8 {
        self.current += 1;
        self.source[self.current - 1]
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() {
            return 0;
        }
        self.source[self.current]
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn match_byte(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                b'\r' | b'\t' | b' ' => {
                    self.advance();
                }
                b'\n' => {
                    self.advance();
                    self.line += 1;
                    self.line_start = self.current;
                }
                b'#' => {
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        self.token_with_text(kind, self.lexeme(self.start, self.current))
    }

    fn make_matched(&mut self, expected: u8, matched: TokenKind, single: TokenKind) -> Token {
        if self.match_byte(expected) {
            self.make_token(matched)
        } else {
            self.make_token(single)
        }
    }

    fn token_with_text(&self, kind: TokenKind, text: String) -> Token {
        Token {
            kind,
            text,
            view: SourceView::new(
                self.start,
                self.current - self.start,
                self.line,
                (self.start - self.line_start + 1) as u32,
            ),
        }
    }

    fn lexeme(&self, from: usize, to: usize) -> String {
        String::from_utf8_lossy(&self.source[from..to]).into_owned()
    }

    fn scan_number(&mut self) -> Token {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        self.make_token(TokenKind::Number)
    }

    fn scan_string(&mut self) -> Token {
        let quote = self.source[self.current - 1];

        while self.peek() != quote {
            if self.peek() == b'\n' || self.is_at_end() {
                return self.make_token(TokenKind::Error);
            }
            self.advance();
        }

        self.advance();
        self.token_with_text(
            TokenKind::String,
            self.lexeme(self.start + 1, self.current - 1),
        )
    }

    fn scan_identifier(&mut self) -> Token {
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.advance();
        }

        let text = self.lexeme(self.start, self.current);
        self.make_token(keyword_kind(&text))
    }
}

/// Look a spelling up against the keyword table.
fn keyword_kind(text: &str) -> TokenKind {
    match text {
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "none" => TokenKind::None,
        "print" => TokenKind::Print,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "loop" => TokenKind::Loop,
        "while" => TokenKind::While,
        "for" => TokenKind::For,
        "in" => TokenKind::In,
        "continue" => TokenKind::Continue,
        "break" => TokenKind::Break,
        "return" => TokenKind::Return,
        "func" => TokenKind::Func,
        "var" => TokenKind::Var,
        "exit" => TokenKind::Exit,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "type" => TokenKind::Type,
        _ => TokenKind::Identifier,
    }
}
