// cinder-parser - Scanner and parser for the Cinder scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Abstract syntax tree for Cinder programs.
//!
//! The expression and statement algebras are mutually recursive; recursive
//! node kinds are boxed. Every node carries a [`SourceView`] covering itself
//! and all of its descendants.

use crate::span::SourceView;

/// A parsed program: a flat list of top-level statements.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    pub body: Vec<Stmt>,
}

/// Binary operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Modulo,
    Multiply,
    Divide,
    Exponent,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    Equal,
    NotEqual,
    And,
    Or,
}

/// Unary operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Numeric negation (`-x`).
    Negative,
    /// Logical negation (`!x`).
    Negate,
}

/// A number literal.
#[derive(Debug, Clone)]
pub struct NumberLit {
    pub view: SourceView,
    pub value: f64,
}

/// A boolean literal.
#[derive(Debug, Clone)]
pub struct BoolLit {
    pub view: SourceView,
    pub value: bool,
}

/// A string literal, quotes stripped.
#[derive(Debug, Clone)]
pub struct StrLit {
    pub view: SourceView,
    pub value: String,
}

/// An identifier reference.
#[derive(Debug, Clone)]
pub struct Ident {
    pub view: SourceView,
    pub name: String,
}

/// `target = expr` (including the desugared compound forms).
#[derive(Debug, Clone)]
pub struct AssignExpr {
    pub view: SourceView,
    pub target: Expr,
    pub expr: Expr,
}

/// `left op right`.
#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub view: SourceView,
    pub op: BinaryOp,
    /// View of the operator token, for runtime fault attribution.
    pub op_view: SourceView,
    pub left: Expr,
    pub right: Expr,
}

/// `op expr`.
#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub view: SourceView,
    pub op: UnaryOp,
    pub op_view: SourceView,
    pub expr: Expr,
}

/// `target(args...)`.
#[derive(Debug, Clone)]
pub struct CallExpr {
    pub view: SourceView,
    pub target: Expr,
    pub args: Vec<Expr>,
}

/// `target.prop`.
#[derive(Debug, Clone)]
pub struct PropertyExpr {
    pub view: SourceView,
    pub target: Expr,
    pub prop: Ident,
}

/// An expression node.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Placeholder produced on parse errors and for omitted initialisers.
    Empty,
    Number(NumberLit),
    Bool(BoolLit),
    Str(StrLit),
    None(SourceView),
    Identifier(Ident),
    Assignment(Box<AssignExpr>),
    Binary(Box<BinaryExpr>),
    Unary(Box<UnaryExpr>),
    Call(Box<CallExpr>),
    Property(Box<PropertyExpr>),
}

impl Expr {
    /// The source range this expression covers.
    pub fn view(&self) -> SourceView {
        match self {
            Expr::Empty => SourceView::default(),
            Expr::Number(n) => n.view,
            Expr::Bool(b) => b.view,
            Expr::Str(s) => s.view,
            Expr::None(view) => *view,
            Expr::Identifier(id) => id.view,
            Expr::Assignment(a) => a.view,
            Expr::Binary(b) => b.view,
            Expr::Unary(u) => u.view,
            Expr::Call(c) => c.view,
            Expr::Property(p) => p.view,
        }
    }
}

/// `exit CODE;`
#[derive(Debug, Clone)]
pub struct ExitStmt {
    pub view: SourceView,
    pub code: NumberLit,
}

/// An expression evaluated for its side effects.
#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub view: SourceView,
    pub expr: Expr,
}

/// `print a, b, c;`
#[derive(Debug, Clone)]
pub struct PrintStmt {
    pub view: SourceView,
    pub exprs: Vec<Expr>,
}

/// `if cond { ... } else { ... }` — `else if` chains nest in `orelse`.
#[derive(Debug, Clone)]
pub struct IfStmt {
    pub view: SourceView,
    pub condition: Expr,
    pub body: Vec<Stmt>,
    pub orelse: Vec<Stmt>,
}

/// `loop { ... }`
#[derive(Debug, Clone)]
pub struct LoopStmt {
    pub view: SourceView,
    pub body: Vec<Stmt>,
}

/// `while cond { ... }`
#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub view: SourceView,
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

/// `for name in iter { ... }` — parsed but not yet compilable.
#[derive(Debug, Clone)]
pub struct ForStmt {
    pub view: SourceView,
    pub target: Ident,
    pub iterator: Expr,
    pub body: Vec<Stmt>,
}

/// `return;` or `return expr;`
#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub view: SourceView,
    pub value: Expr,
}

/// `{ ... }` — a block statement introducing a scope.
#[derive(Debug, Clone)]
pub struct BlockStmt {
    pub view: SourceView,
    pub body: Vec<Stmt>,
}

/// `func name(args) { ... }`
#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub view: SourceView,
    pub name: Ident,
    pub args: Vec<Ident>,
    pub body: Vec<Stmt>,
}

/// `var name;` or `var name = expr;`
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub view: SourceView,
    pub target: Ident,
    /// `Expr::Empty` when the initialiser is omitted.
    pub expr: Expr,
}

/// `type Name; parents { methods }` — parsed but not yet compilable.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub view: SourceView,
    pub name: Ident,
    pub parents: Vec<Ident>,
    pub methods: Vec<Stmt>,
}

/// A statement node.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Placeholder produced on parse errors.
    Empty,
    Break(SourceView),
    Continue(SourceView),
    Exit(ExitStmt),
    Expr(ExprStmt),
    Print(PrintStmt),
    If(Box<IfStmt>),
    Loop(Box<LoopStmt>),
    While(Box<WhileStmt>),
    For(Box<ForStmt>),
    Return(Box<ReturnStmt>),
    Block(Box<BlockStmt>),
    Func(Box<FuncDecl>),
    Var(Box<VarDecl>),
    Type(Box<TypeDecl>),
}
