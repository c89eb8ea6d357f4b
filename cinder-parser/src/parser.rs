// cinder-parser - Scanner and parser for the Cinder scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Recursive-descent parser for Cinder.
//!
//! Hand-written precedence climbing, lowest to highest:
//! `assignment → or → and → equality → comparison → term → factor →
//! exponent → unary → postfix → primary`.
//!
//! The parser is single-shot: the first error is recorded and every
//! subsequent production is a no-op, so a failed parse returns exactly one
//! diagnostic.

use crate::ast::{
    AssignExpr, Ast, BinaryExpr, BinaryOp, BlockStmt, BoolLit, CallExpr, ExitStmt, Expr, ExprStmt,
    ForStmt, FuncDecl, Ident, IfStmt, LoopStmt, NumberLit, PrintStmt, PropertyExpr, ReturnStmt,
    Stmt, StrLit, TypeDecl, UnaryExpr, UnaryOp, VarDecl, WhileStmt,
};
use crate::scanner::Scanner;
use crate::span::{Error, ErrorKind, SourceView};
use crate::token::{Token, TokenKind};

/// The parser converts source text into an [`Ast`].
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    cur: Token,
    prev: Token,
    had_error: bool,
    error: Option<Error>,
    path: String,
}

impl<'a> Parser<'a> {
    /// Create a new parser over `source`. `path` is used for diagnostics.
    pub fn new(source: &'a str, path: &str) -> Self {
        Parser {
            scanner: Scanner::new(source),
            cur: Token::empty(),
            prev: Token::empty(),
            had_error: false,
            error: None,
            path: path.to_string(),
        }
    }

    /// Parse the whole source into an AST, or return the first error.
    pub fn parse(mut self) -> Result<Ast, Error> {
        let mut ast = Ast::default();

        self.advance();
        while !self.is_finished() {
            ast.body.push(self.statement());
        }

        match self.error {
            Some(error) => Err(error),
            None => Ok(ast),
        }
    }

    fn advance(&mut self) {
        if self.had_error {
            return;
        }

        self.prev = std::mem::replace(&mut self.cur, self.scanner.next_token());

        if self.cur.kind == TokenKind::Error {
            let msg = format!("Invalid Token: {}", self.cur.text);
            self.error_at(self.cur.view, msg);
        }
    }

    fn error_at(&mut self, view: SourceView, msg: impl Into<String>) {
        if self.had_error {
            return;
        }
        self.had_error = true;
        self.error = Some(Error::new(view, ErrorKind::Syntax, msg, &self.path));
    }

    /// Consume a token of the given kind or report `msg` at a one-character
    /// view just after the previous token.
    fn consume(&mut self, kind: TokenKind, msg: &str) {
        if self.cur.kind == kind {
            self.advance();
            return;
        }

        if self.had_error {
            return;
        }

        self.had_error = true;
        let view = SourceView::new(
            self.prev.view.index + self.prev.view.length,
            1,
            self.prev.view.line,
            self.prev.view.column + self.prev.view.length as u32,
        );
        self.error = Some(Error::new(view, ErrorKind::Syntax, msg, &self.path).with_note("here"));
    }

    fn is_finished(&self) -> bool {
        self.check(TokenKind::EndOfFile) || self.had_error
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.cur.kind == kind
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.is_finished() || !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn match_kinds(&mut self, kinds: &[TokenKind]) -> bool {
        for &kind in kinds {
            if self.match_kind(kind) {
                return true;
            }
        }
        false
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn expression(&mut self) -> Expr {
        self.assignment()
    }

    fn assignment(&mut self) -> Expr {
        let view = self.cur.view;
        let target = self.or_expr();

        if self.match_kinds(&[
            TokenKind::Equal,
            TokenKind::PlusEqual,
            TokenKind::MinusEqual,
            TokenKind::AsteriskEqual,
            TokenKind::SlashEqual,
            TokenKind::CaretEqual,
        ]) {
            let op_token = self.prev.clone();

            // Right-associative: `a = b = c` assigns c to both.
            let mut value = self.assignment();

            // Compound forms desugar to `target = target OP value`, reusing
            // the target node on both sides.
            if op_token.kind != TokenKind::Equal {
                let op = match op_token.kind {
                    TokenKind::PlusEqual => BinaryOp::Add,
                    TokenKind::MinusEqual => BinaryOp::Subtract,
                    TokenKind::AsteriskEqual => BinaryOp::Multiply,
                    TokenKind::SlashEqual => BinaryOp::Divide,
                    _ => BinaryOp::Exponent,
                };
                value = Expr::Binary(Box::new(BinaryExpr {
                    view: view | self.prev.view,
                    op,
                    op_view: op_token.view,
                    left: target.clone(),
                    right: value,
                }));
            }

            return Expr::Assignment(Box::new(AssignExpr {
                view: view | self.prev.view,
                target,
                expr: value,
            }));
        }

        target
    }

    fn or_expr(&mut self) -> Expr {
        let view = self.cur.view;
        let mut expr = self.and_expr();

        while self.match_kind(TokenKind::Or) {
            let op_view = self.prev.view;
            let right = self.and_expr();
            expr = Expr::Binary(Box::new(BinaryExpr {
                view: view | self.prev.view,
                op: BinaryOp::Or,
                op_view,
                left: expr,
                right,
            }));
        }

        expr
    }

    fn and_expr(&mut self) -> Expr {
        let view = self.cur.view;
        let mut expr = self.equality();

        while self.match_kind(TokenKind::And) {
            let op_view = self.prev.view;
            let right = self.equality();
            expr = Expr::Binary(Box::new(BinaryExpr {
                view: view | self.prev.view,
                op: BinaryOp::And,
                op_view,
                left: expr,
                right,
            }));
        }

        expr
    }

    fn equality(&mut self) -> Expr {
        let view = self.cur.view;
        let mut expr = self.comparison();

        while self.match_kinds(&[TokenKind::EqualEqual, TokenKind::BangEqual]) {
            let op_view = self.prev.view;
            let op = if self.prev.kind == TokenKind::EqualEqual {
                BinaryOp::Equal
            } else {
                BinaryOp::NotEqual
            };
            let right = self.comparison();
            expr = Expr::Binary(Box::new(BinaryExpr {
                view: view | self.prev.view,
                op,
                op_view,
                left: expr,
                right,
            }));
        }

        expr
    }

    fn comparison(&mut self) -> Expr {
        let view = self.cur.view;
        let mut expr = self.term();

        while self.match_kinds(&[
            TokenKind::Greater,
            TokenKind::Less,
            TokenKind::GreaterEqual,
            TokenKind::LessEqual,
        ]) {
            let op_view = self.prev.view;
            let op = match self.prev.kind {
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::Less => BinaryOp::Less,
                TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
                _ => BinaryOp::LessEqual,
            };
            let right = self.term();
            expr = Expr::Binary(Box::new(BinaryExpr {
                view: view | self.prev.view,
                op,
                op_view,
                left: expr,
                right,
            }));
        }

        expr
    }

    fn term(&mut self) -> Expr {
        let view = self.cur.view;
        let mut expr = self.factor();

        while self.match_kinds(&[TokenKind::Plus, TokenKind::Minus, TokenKind::Percent]) {
            let op_view = self.prev.view;
            let op = match self.prev.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Subtract,
                _ => BinaryOp::Modulo,
            };
            let right = self.factor();
            expr = Expr::Binary(Box::new(BinaryExpr {
                view: view | self.prev.view,
                op,
                op_view,
                left: expr,
                right,
            }));
        }

        expr
    }

    fn factor(&mut self) -> Expr {
        let view = self.cur.view;
        let mut expr = self.exponent();

        while self.match_kinds(&[TokenKind::Asterisk, TokenKind::Slash]) {
            let op_view = self.prev.view;
            let op = if self.prev.kind == TokenKind::Asterisk {
                BinaryOp::Multiply
            } else {
                BinaryOp::Divide
            };
            let right = self.exponent();
            expr = Expr::Binary(Box::new(BinaryExpr {
                view: view | self.prev.view,
                op,
                op_view,
                left: expr,
                right,
            }));
        }

        expr
    }

    fn exponent(&mut self) -> Expr {
        let view = self.cur.view;
        let expr = self.unary();

        // Right-associative: `2 ^ 3 ^ 2` is `2 ^ (3 ^ 2)`.
        if self.match_kind(TokenKind::Caret) {
            let op_view = self.prev.view;
            let right = self.exponent();
            return Expr::Binary(Box::new(BinaryExpr {
                view: view | self.prev.view,
                op: BinaryOp::Exponent,
                op_view,
                left: expr,
                right,
            }));
        }

        expr
    }

    fn unary(&mut self) -> Expr {
        let view = self.cur.view;

        if self.match_kinds(&[TokenKind::Minus, TokenKind::Plus]) {
            // Collapse a +/- chain: an odd count of `-` negates.
            let mut negative = self.prev.kind == TokenKind::Minus;
            while self.match_kinds(&[TokenKind::Minus, TokenKind::Plus]) {
                if self.prev.kind == TokenKind::Minus {
                    negative = !negative;
                }
            }

            if negative {
                let op_view = self.prev.view;
                let expr = self.postfix();
                return Expr::Unary(Box::new(UnaryExpr {
                    view: view | self.prev.view,
                    op: UnaryOp::Negative,
                    op_view,
                    expr,
                }));
            }

            return self.postfix();
        }

        if self.match_kind(TokenKind::Bang) {
            // `!!x` folds to the identity on truthiness of x.
            let mut negate = true;
            while self.match_kind(TokenKind::Bang) {
                negate = !negate;
            }

            if negate {
                let op_view = self.prev.view;
                let expr = self.postfix();
                return Expr::Unary(Box::new(UnaryExpr {
                    view: view | self.prev.view,
                    op: UnaryOp::Negate,
                    op_view,
                    expr,
                }));
            }

            return self.postfix();
        }

        self.postfix()
    }

    fn postfix(&mut self) -> Expr {
        let view = self.cur.view;
        let mut expr = self.primary();

        while self.match_kinds(&[TokenKind::Dot, TokenKind::LeftParen]) {
            if self.prev.kind == TokenKind::Dot {
                self.consume(TokenKind::Identifier, "Expected identifier name after '.'");
                let prop = self.identifier_node();
                expr = Expr::Property(Box::new(PropertyExpr {
                    view: view | self.prev.view,
                    target: expr,
                    prop,
                }));
            } else {
                let mut args = Vec::new();
                if !self.check(TokenKind::RightParen) {
                    args = self.expr_list();
                }

                self.consume(TokenKind::RightParen, "Expected ')' after argument list");
                expr = Expr::Call(Box::new(CallExpr {
                    view: view | self.prev.view,
                    target: expr,
                    args,
                }));
            }
        }

        expr
    }

    fn primary(&mut self) -> Expr {
        self.advance();

        match self.prev.kind {
            TokenKind::True => Expr::Bool(BoolLit {
                view: self.prev.view,
                value: true,
            }),
            TokenKind::False => Expr::Bool(BoolLit {
                view: self.prev.view,
                value: false,
            }),
            TokenKind::None => Expr::None(self.prev.view),
            TokenKind::Number => Expr::Number(self.number_node()),
            TokenKind::Identifier => Expr::Identifier(self.identifier_node()),
            TokenKind::String => Expr::Str(StrLit {
                view: self.prev.view,
                value: self.prev.text.clone(),
            }),
            TokenKind::LeftParen => self.grouping(),
            _ => {
                self.error_at(self.prev.view, "Expected an expression");
                Expr::Empty
            }
        }
    }

    fn number_node(&self) -> NumberLit {
        // A leading `.` implies a `0.` prefix.
        let value = if self.prev.text.starts_with('.') {
            format!("0{}", self.prev.text).parse().unwrap_or(0.0)
        } else {
            self.prev.text.parse().unwrap_or(0.0)
        };

        NumberLit {
            view: self.prev.view,
            value,
        }
    }

    fn identifier_node(&self) -> Ident {
        Ident {
            view: self.prev.view,
            name: self.prev.text.clone(),
        }
    }

    fn grouping(&mut self) -> Expr {
        let expr = self.expression();
        self.consume(TokenKind::RightParen, "Expected ')' after grouping");
        expr
    }

    fn expr_list(&mut self) -> Vec<Expr> {
        let mut values = Vec::new();

        while !self.is_finished() {
            values.push(self.expression());
            if !self.match_kind(TokenKind::Comma) {
                break;
            }
        }

        values
    }

    fn block(&mut self) -> Vec<Stmt> {
        let mut body = Vec::new();

        while !self.check(TokenKind::RightBrace) && !self.is_finished() {
            body.push(self.statement());
        }

        self.consume(TokenKind::RightBrace, "Expected '}' after block");
        body
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn statement(&mut self) -> Stmt {
        let view = self.cur.view;

        match self.cur.kind {
            TokenKind::Print => self.print_stmt(),
            TokenKind::If => self.if_stmt(),
            TokenKind::Loop => self.loop_block(),
            TokenKind::While => self.while_loop(),
            TokenKind::For => self.for_loop(),
            TokenKind::Return => self.return_stmt(),
            TokenKind::Type => self.type_declaration(),
            TokenKind::Func => self.func_declaration(),
            TokenKind::Var => self.var_declaration(),

            TokenKind::LeftBrace => {
                self.advance();
                let body = self.block();
                Stmt::Block(Box::new(BlockStmt {
                    view: view | self.prev.view,
                    body,
                }))
            }

            TokenKind::Break => {
                self.advance();
                self.consume(TokenKind::Semicolon, "Expected ';' after break");
                Stmt::Break(view)
            }

            TokenKind::Continue => {
                self.advance();
                self.consume(TokenKind::Semicolon, "Expected ';' after continue");
                Stmt::Continue(view)
            }

            TokenKind::Exit => {
                self.advance();
                self.consume(TokenKind::Number, "Expected number after exit");
                let code = self.number_node();
                let stmt = Stmt::Exit(ExitStmt {
                    view: view | self.prev.view,
                    code,
                });
                self.consume(TokenKind::Semicolon, "Expected ';' after exit code");
                stmt
            }

            TokenKind::EndOfFile | TokenKind::Error => Stmt::Empty,

            _ => self.expr_stmt(),
        }
    }

    fn expr_stmt(&mut self) -> Stmt {
        let view = self.cur.view;
        let expr = self.expression();
        let stmt = Stmt::Expr(ExprStmt {
            view: view | self.prev.view,
            expr,
        });
        self.consume(TokenKind::Semicolon, "Expected ';' after expression");
        stmt
    }

    fn print_stmt(&mut self) -> Stmt {
        let view = self.cur.view;
        self.advance();
        let exprs = self.expr_list();
        let stmt = Stmt::Print(PrintStmt {
            view: view | self.prev.view,
            exprs,
        });
        self.consume(TokenKind::Semicolon, "Expected ';' after print statement");
        stmt
    }

    fn if_stmt(&mut self) -> Stmt {
        let view = self.cur.view;
        self.advance();
        let condition = self.expression();
        self.consume(TokenKind::LeftBrace, "Expected '{' after if condition");
        let body = self.block();
        let mut orelse = Vec::new();

        if self.match_kind(TokenKind::Else) {
            if self.check(TokenKind::If) {
                // `else if` recurses; the dangling else binds to the
                // nearest unclosed if.
                orelse.push(self.if_stmt());
            } else {
                self.consume(TokenKind::LeftBrace, "Expected '{' after else clause");
                orelse = self.block();
            }
        }

        Stmt::If(Box::new(IfStmt {
            view: view | self.prev.view,
            condition,
            body,
            orelse,
        }))
    }

    fn loop_block(&mut self) -> Stmt {
        let view = self.cur.view;
        self.advance();
        self.consume(TokenKind::LeftBrace, "Expected '{' after loop");
        let body = self.block();
        Stmt::Loop(Box::new(LoopStmt {
            view: view | self.prev.view,
            body,
        }))
    }

    fn while_loop(&mut self) -> Stmt {
        let view = self.cur.view;
        self.advance();
        let condition = self.expression();
        self.consume(TokenKind::LeftBrace, "Expected '{' after while condition");
        let body = self.block();
        Stmt::While(Box::new(WhileStmt {
            view: view | self.prev.view,
            condition,
            body,
        }))
    }

    fn for_loop(&mut self) -> Stmt {
        let view = self.cur.view;
        self.advance();

        if !self.match_kind(TokenKind::Identifier) {
            self.error_at(self.cur.view, "For loop target must be an identifier");
            return Stmt::Empty;
        }
        let target = self.identifier_node();

        self.consume(TokenKind::In, "Expected 'in' after for loop target");
        let iterator = self.expression();
        self.consume(TokenKind::LeftBrace, "Expected '{' after for iterator");
        let body = self.block();

        Stmt::For(Box::new(ForStmt {
            view: view | self.prev.view,
            target,
            iterator,
            body,
        }))
    }

    fn return_stmt(&mut self) -> Stmt {
        let mut view = self.cur.view;
        self.advance();

        let mut value = Expr::None(view);
        if !self.match_kind(TokenKind::Semicolon) {
            value = self.expression();
            view = view | self.prev.view;
            self.consume(TokenKind::Semicolon, "Expected ';' after return statement");
        }

        Stmt::Return(Box::new(ReturnStmt { view, value }))
    }

    fn type_declaration(&mut self) -> Stmt {
        let view = self.cur.view;
        self.advance();
        self.consume(TokenKind::Identifier, "Type name must be an identifier");
        let name = self.identifier_node();

        let mut parents = Vec::new();
        if self.match_kind(TokenKind::Semicolon) {
            loop {
                self.consume(TokenKind::Identifier, "Parent must be an identifier");
                parents.push(self.identifier_node());
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.consume(TokenKind::LeftBrace, "Expected '{' before type body");

        let mut methods = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_finished() {
            methods.push(self.method_declaration());
        }

        self.consume(TokenKind::RightBrace, "Expected '}' after type body");
        Stmt::Type(Box::new(TypeDecl {
            view: view | self.prev.view,
            name,
            parents,
            methods,
        }))
    }

    fn func_declaration(&mut self) -> Stmt {
        let view = self.cur.view;
        self.advance();

        if !self.match_kind(TokenKind::Identifier) {
            self.error_at(self.cur.view, "Function name must be an identifier");
            return Stmt::Empty;
        }
        let name = self.identifier_node();

        self.consume(TokenKind::LeftParen, "Expected '(' after function name");
        let args = self.arg_list();
        self.consume(TokenKind::RightParen, "Expected ')' after function arguments");
        self.consume(TokenKind::LeftBrace, "Expected '{' before function body");
        let body = self.block();

        Stmt::Func(Box::new(FuncDecl {
            view: view | self.prev.view,
            name,
            args,
            body,
        }))
    }

    fn method_declaration(&mut self) -> Stmt {
        let view = self.cur.view;

        if !self.match_kind(TokenKind::Identifier) {
            self.error_at(self.cur.view, "Method name must be an identifier");
            return Stmt::Empty;
        }
        let name = self.identifier_node();

        self.consume(TokenKind::LeftParen, "Expected '(' after method name");
        let args = self.arg_list();
        self.consume(TokenKind::RightParen, "Expected ')' after method arguments");
        self.consume(TokenKind::LeftBrace, "Expected '{' before method body");
        let body = self.block();

        Stmt::Func(Box::new(FuncDecl {
            view: view | self.prev.view,
            name,
            args,
            body,
        }))
    }

    fn arg_list(&mut self) -> Vec<Ident> {
        let mut args = Vec::new();

        while !self.is_finished() && !self.check(TokenKind::RightParen) {
            if !self.match_kind(TokenKind::Identifier) {
                self.error_at(self.cur.view, "Expected argument identifiers");
                break;
            }
            args.push(self.identifier_node());

            if !self.match_kind(TokenKind::Comma) {
                break;
            }
        }

        args
    }

    fn var_declaration(&mut self) -> Stmt {
        let view = self.cur.view;
        self.advance();

        if !self.match_kind(TokenKind::Identifier) {
            self.error_at(self.cur.view, "Variable name must be an identifier");
            return Stmt::Empty;
        }
        let target = self.identifier_node();

        // `var x;` initialises to none.
        let mut expr = Expr::Empty;
        if self.match_kind(TokenKind::Equal) {
            expr = self.expression();
        }

        let stmt = Stmt::Var(Box::new(VarDecl {
            view: view | self.prev.view,
            target,
            expr,
        }));
        self.consume(TokenKind::Semicolon, "Expected ';' after variable declaration");
        stmt
    }
}
