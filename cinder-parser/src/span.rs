// cinder-parser - Scanner and parser for the Cinder scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Source ranges and the shared diagnostic type.
//!
//! Every token, AST node, and chunk marker carries a [`SourceView`] so that
//! any phase of the toolchain can point an error at the exact bytes that
//! caused it.

use std::fmt;
use std::ops::BitOr;

/// A byte range into the source text, with the line and column of its start.
///
/// Lines and columns are 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceView {
    /// Byte offset of the start of the range.
    pub index: usize,
    /// Length of the range in bytes.
    pub length: usize,
    /// Source line of the start (1-indexed).
    pub line: u32,
    /// Source column of the start (1-indexed).
    pub column: u32,
}

impl SourceView {
    /// Create a new view.
    pub fn new(index: usize, length: usize, line: u32, column: u32) -> Self {
        Self {
            index,
            length,
            line,
            column,
        }
    }

    /// Byte offset one past the end of the range.
    pub fn end(&self) -> usize {
        self.index + self.length
    }
}

/// Union of two views: the smallest view covering both.
///
/// Line and column come from whichever view starts earlier.
impl BitOr for SourceView {
    type Output = SourceView;

    fn bitor(self, rhs: SourceView) -> SourceView {
        let (first, _) = if self.index <= rhs.index {
            (self, rhs)
        } else {
            (rhs, self)
        };

        SourceView {
            index: first.index,
            length: self.end().max(rhs.end()) - first.index,
            line: first.line,
            column: first.column,
        }
    }
}

/// Which phase of the toolchain produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Lexing or parsing failure.
    Syntax,
    /// AST-to-bytecode lowering failure.
    Compile,
    /// Fault during execution.
    Runtime,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Syntax => write!(f, "SyntaxError"),
            ErrorKind::Compile => write!(f, "CompileError"),
            ErrorKind::Runtime => write!(f, "RuntimeError"),
        }
    }
}

/// A diagnostic attributed to a source range.
///
/// Each phase halts at its first error, so one of these is the complete
/// error report for a failed run.
#[derive(Debug, Clone)]
pub struct Error {
    /// The source range the diagnostic points at.
    pub view: SourceView,
    /// Which phase failed.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub msg: String,
    /// Optional short annotation rendered under the carets.
    pub note: Option<String>,
    /// Path of the source file (or a pseudo-path such as `<repl>`).
    pub path: String,
}

impl Error {
    /// Create a new diagnostic.
    pub fn new(view: SourceView, kind: ErrorKind, msg: impl Into<String>, path: &str) -> Self {
        Self {
            view,
            kind,
            msg: msg.into(),
            note: None,
            path: path.to_string(),
        }
    }

    /// Attach a short annotation rendered under the carets.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Render the diagnostic as a caret-underlined snippet of `source`.
    pub fn render(&self, source: &str) -> String {
        let line_text = source
            .lines()
            .nth(self.view.line.saturating_sub(1) as usize)
            .unwrap_or("");

        let line_label = self.view.line.to_string();
        let gutter = " ".repeat(line_label.len());
        let indent = " ".repeat(self.view.column.saturating_sub(1) as usize);

        // Clip the underline to the quoted line.
        let remaining = line_text
            .len()
            .saturating_sub(self.view.column.saturating_sub(1) as usize);
        let carets = "^".repeat(self.view.length.clamp(1, remaining.max(1)));

        let mut out = format!(
            "{}: {}\n {}--> {}:{}:{}\n {} |\n {} | {}\n {} | {}{}",
            self.kind,
            self.msg,
            gutter,
            self.path,
            self.view.line,
            self.view.column,
            gutter,
            line_label,
            line_text,
            gutter,
            indent,
            carets,
        );

        if let Some(note) = &self.note {
            out.push(' ');
            out.push_str(note);
        }

        out
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.msg)
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_ordering() {
        let a = SourceView::new(4, 3, 1, 5);
        let b = SourceView::new(10, 2, 2, 3);

        let both = a | b;
        assert_eq!(both.index, 4);
        assert_eq!(both.length, 8);
        assert_eq!(both.line, 1);
        assert_eq!(both.column, 5);

        // Union is symmetric.
        assert_eq!(a | b, b | a);
    }

    #[test]
    fn test_union_contained() {
        let outer = SourceView::new(0, 20, 1, 1);
        let inner = SourceView::new(5, 3, 1, 6);
        assert_eq!(outer | inner, outer);
    }

    #[test]
    fn test_render_points_at_column() {
        let source = "var x = ;\n";
        let err = Error::new(
            SourceView::new(8, 1, 1, 9),
            ErrorKind::Syntax,
            "Expected an expression",
            "script.cin",
        )
        .with_note("here");

        let rendered = err.render(source);
        assert!(rendered.starts_with("SyntaxError: Expected an expression"));
        assert!(rendered.contains("script.cin:1:9"));
        assert!(rendered.contains("var x = ;"));
        assert!(rendered.ends_with("^ here"));
    }
}
