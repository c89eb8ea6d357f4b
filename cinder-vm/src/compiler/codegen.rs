// cinder-vm - Bytecode compiler and virtual machine for the Cinder scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Code generation: emits bytecode while walking the AST once.

use std::rc::Rc;

use cinder_parser::ast::{
    AssignExpr, Ast, BinaryExpr, BinaryOp, BoolLit, CallExpr, ExitStmt, Expr, ForStmt, FuncDecl,
    Ident, IfStmt, LoopStmt, NumberLit, PrintStmt, ReturnStmt, Stmt, StrLit, TypeDecl, UnaryExpr,
    UnaryOp, VarDecl, WhileStmt,
};
use cinder_parser::{Error, ErrorKind, SourceView};

use crate::chunk::{Chunk, MAX_CONSTANTS, Prototype};
use crate::opcode::Op;

use super::types::{ChunkData, Local, LoopData, UpValueData};

/// The single-pass bytecode compiler.
///
/// Single-shot error policy: the first error is recorded and every
/// subsequent emission is a no-op, so a failed compile returns exactly one
/// diagnostic.
pub struct Compiler {
    data: Box<ChunkData>,
    had_error: bool,
    error: Option<Error>,
    path: String,
}

impl Compiler {
    /// Create a compiler. `path` is used for diagnostics.
    pub fn new(path: &str) -> Self {
        Self {
            data: Box::new(ChunkData::new(true)),
            had_error: false,
            error: None,
            path: path.to_string(),
        }
    }

    /// Compile a program into its global chunk, or return the first error.
    pub fn compile(mut self, ast: &Ast) -> Result<Chunk, Error> {
        self.body(&ast.body);
        self.emit(Op::Exit);
        self.emit_byte(0);

        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data.chunk),
        }
    }

    fn failed(&self) -> bool {
        self.had_error
    }

    fn error_at(&mut self, view: SourceView, msg: impl Into<String>) {
        if self.had_error {
            return;
        }
        self.had_error = true;
        self.error = Some(Error::new(view, ErrorKind::Compile, msg, &self.path));
    }

    // =========================================================================
    // Emission
    // =========================================================================

    fn emit(&mut self, op: Op) {
        self.data.chunk.emit(op);
    }

    fn emit_byte(&mut self, byte: u8) {
        self.data.chunk.emit_byte(byte);
    }

    fn mark(&mut self, view: SourceView) {
        self.data.chunk.mark(view);
    }

    fn make_number(&mut self, value: f64, view: SourceView) -> u8 {
        match self.data.chunk.constants.add_number(value) {
            Some(index) => index,
            None => {
                self.error_at(view, "Too many constants in pool");
                0
            }
        }
    }

    fn make_name(&mut self, name: &str, view: SourceView) -> u8 {
        match self.data.chunk.constants.add_name(name) {
            Some(index) => index,
            None => {
                self.error_at(view, "Too many constants in pool");
                0
            }
        }
    }

    /// Emit a forward jump with a two-byte placeholder; returns the operand
    /// offset for [`Self::patch_jump`].
    fn emit_jump(&mut self, op: Op) -> usize {
        self.emit(op);
        self.data.chunk.emit_u16(0);
        self.data.chunk.offset() - 2
    }

    /// Patch a forward jump to land at the current end of the bytecode.
    fn patch_jump(&mut self, index: usize) {
        let distance = self.data.chunk.offset() - index - 2;
        if distance > u16::MAX as usize {
            self.error_at(SourceView::default(), "Jump distance too large");
            return;
        }

        self.data.chunk.bytecode[index] = (distance >> 8) as u8;
        self.data.chunk.bytecode[index + 1] = (distance & 0xff) as u8;
    }

    /// Emit a backward jump landing on `target`.
    ///
    /// The VM subtracts the operand from the address of the byte after it,
    /// so the distance includes the operand's own two bytes.
    fn emit_jump_back(&mut self, target: usize) {
        let distance = self.data.chunk.offset() + 3 - target;
        if distance > u16::MAX as usize {
            self.error_at(SourceView::default(), "Jump distance too large");
            return;
        }

        self.emit(Op::JumpBack);
        self.data.chunk.emit_u16(distance as u16);
    }

    // =========================================================================
    // Chunks, scopes, loops
    // =========================================================================

    fn new_chunk(&mut self) {
        let enclosing = std::mem::replace(&mut self.data, Box::new(ChunkData::new(false)));
        self.data.enclosing = Some(enclosing);
    }

    fn end_chunk(&mut self) -> Box<ChunkData> {
        let enclosing = self.data.enclosing.take().expect("unbalanced chunk stack");
        std::mem::replace(&mut self.data, enclosing)
    }

    fn begin_scope(&mut self) {
        self.data.scope_depth += 1;
    }

    /// Close the current scope: emit `PopLocals` for its locals and drop
    /// them from the compiler's view.
    fn end_scope(&mut self) {
        let depth = self.data.scope_depth;
        let count = self
            .data
            .locals
            .iter()
            .rev()
            .take_while(|local| local.depth >= depth)
            .count();

        if count > 0 {
            self.emit(Op::PopLocals);
            self.emit_byte(count as u8);
        }

        self.data.scope_depth -= 1;
        let remaining = self.data.locals.len() - count;
        self.data.locals.truncate(remaining);
    }

    /// Compile a braced body in a scope of its own.
    fn scoped_body(&mut self, stmts: &[Stmt]) {
        self.begin_scope();
        self.body(stmts);
        self.end_scope();
    }

    /// Open a loop: its body is a scope, and break/continue inside it pop
    /// back down to the surrounding depth.
    fn begin_loop(&mut self) -> usize {
        let start = self.data.chunk.offset();
        let enclosing = self.data.loop_data.take();
        self.data.loop_data = Some(Box::new(LoopData {
            start,
            breaks: Vec::new(),
            depth: self.data.scope_depth,
            enclosing,
        }));
        self.begin_scope();
        start
    }

    /// Close a loop: pop the body scope, jump back to the start, and land
    /// every break after the jump.
    fn end_loop(&mut self) {
        self.end_scope();

        let Some(loop_data) = self.data.loop_data.take() else {
            return;
        };
        self.data.loop_data = loop_data.enclosing;

        self.emit_jump_back(loop_data.start);
        for offset in loop_data.breaks {
            self.patch_jump(offset);
        }
    }

    /// Emit `PopLocals` for every local above `depth` without forgetting
    /// them; used by break/continue, which leave the scope early while the
    /// rest of the block still compiles against those slots.
    fn pop_locals_above(&mut self, depth: u32) {
        let count = self
            .data
            .locals
            .iter()
            .filter(|local| local.depth > depth)
            .count();

        if count > 0 {
            self.emit(Op::PopLocals);
            self.emit_byte(count as u8);
        }
    }

    // =========================================================================
    // Variables
    // =========================================================================

    fn add_local(&mut self, name: &str, view: SourceView) {
        for local in &self.data.locals {
            if local.name == name && local.depth == self.data.scope_depth {
                self.error_at(view, format!("Already a local called '{}'", name));
                return;
            }
        }

        if self.data.locals.len() + self.data.local_offset as usize >= 256 {
            self.error_at(view, "Too many locals in scope");
            return;
        }

        self.data.locals.push(Local {
            name: name.to_string(),
            depth: self.data.scope_depth,
        });
    }

    /// Bind a freshly-compiled value: a global definition at depth zero,
    /// otherwise the value's stack slot becomes the local.
    fn declare(&mut self, name: &str, view: SourceView) {
        if self.data.scope_depth == 0 {
            self.emit(Op::DefineGlobal);
            let index = self.make_name(name, view);
            self.emit_byte(index);
            return;
        }

        self.add_local(name, view);
    }

    /// Compile a name reference or assignment target:
    /// local, else upvalue, else global.
    fn identifier(&mut self, id: &Ident, get: bool) {
        if let Some(slot) = find_local(&self.data, &id.name) {
            self.emit(if get { Op::GetLocal } else { Op::SetLocal });
            self.emit_byte(slot);
            return;
        }

        match resolve_upvalue(&mut self.data, &id.name) {
            Ok(Some(index)) => {
                self.emit(if get { Op::GetUpValue } else { Op::SetUpValue });
                self.emit_byte(index);
                return;
            }
            Err(TooManyUpValues) => {
                self.error_at(id.view, "Too many captured variables in function");
                return;
            }
            Ok(None) => {}
        }

        self.mark(id.view);
        self.emit(if get { Op::GetGlobal } else { Op::SetGlobal });
        let index = self.make_name(&id.name, id.view);
        self.emit_byte(index);
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn body(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            if self.failed() {
                return;
            }

            match stmt {
                Stmt::Empty => {}
                Stmt::Break(view) => self.break_stmt(*view),
                Stmt::Continue(view) => self.continue_stmt(*view),
                Stmt::Exit(stmt) => self.exit_stmt(stmt),
                Stmt::Expr(stmt) => {
                    self.expression(&stmt.expr);
                    self.emit(Op::Pop);
                }
                Stmt::Return(stmt) => self.return_stmt(stmt),
                Stmt::Print(stmt) => self.print_stmt(stmt),
                Stmt::If(stmt) => self.if_stmt(stmt),
                Stmt::Loop(stmt) => self.loop_block(stmt),
                Stmt::While(stmt) => self.while_loop(stmt),
                Stmt::For(stmt) => self.for_loop(stmt),
                Stmt::Type(stmt) => self.type_declaration(stmt),
                Stmt::Func(stmt) => self.func_declaration(stmt),
                Stmt::Var(stmt) => self.var_declaration(stmt),
                Stmt::Block(stmt) => self.scoped_body(&stmt.body),
            }
        }
    }

    fn break_stmt(&mut self, view: SourceView) {
        let Some(depth) = self.data.loop_data.as_ref().map(|l| l.depth) else {
            self.error_at(view, "Cannot use break statement outside of loop");
            return;
        };

        self.pop_locals_above(depth);
        let offset = self.emit_jump(Op::Jump);
        if let Some(loop_data) = self.data.loop_data.as_mut() {
            loop_data.breaks.push(offset);
        }
    }

    fn continue_stmt(&mut self, view: SourceView) {
        let Some((depth, start)) = self.data.loop_data.as_ref().map(|l| (l.depth, l.start)) else {
            self.error_at(view, "Cannot use continue statement outside of loop");
            return;
        };

        self.pop_locals_above(depth);
        self.emit_jump_back(start);
    }

    fn exit_stmt(&mut self, stmt: &ExitStmt) {
        let code = stmt.code.value;
        if code.fract() != 0.0 || !(0.0..=255.0).contains(&code) {
            self.error_at(
                stmt.code.view,
                "Exit code must be an integer between 0 and 255",
            );
            return;
        }

        self.emit(Op::Exit);
        self.emit_byte(code as u8);
    }

    fn return_stmt(&mut self, stmt: &ReturnStmt) {
        if self.data.global {
            self.error_at(stmt.view, "Return outside function");
            return;
        }

        // Slot 0 of the frame is the return slot; execution continues to
        // the function's trailing Return.
        self.expression(&stmt.value);
        self.emit(Op::SetLocal);
        self.emit_byte(0);
        self.emit(Op::Pop);
    }

    fn print_stmt(&mut self, stmt: &PrintStmt) {
        if stmt.exprs.len() > u8::MAX as usize {
            self.error_at(stmt.view, "Too many values in print statement (max: 255)");
            return;
        }

        // Emitted in reverse so the VM pops them in source order.
        for expr in stmt.exprs.iter().rev() {
            self.expression(expr);
        }

        self.emit(Op::Print);
        self.emit_byte(stmt.exprs.len() as u8);
    }

    fn if_stmt(&mut self, stmt: &IfStmt) {
        self.expression(&stmt.condition);
        let else_jump = self.emit_jump(Op::JumpPopIfFalse);
        self.scoped_body(&stmt.body);

        if stmt.orelse.is_empty() {
            self.patch_jump(else_jump);
        } else {
            let end_jump = self.emit_jump(Op::Jump);
            self.patch_jump(else_jump);
            self.scoped_body(&stmt.orelse);
            self.patch_jump(end_jump);
        }
    }

    fn loop_block(&mut self, stmt: &LoopStmt) {
        self.begin_loop();
        self.body(&stmt.body);
        self.end_loop();
    }

    fn while_loop(&mut self, stmt: &WhileStmt) {
        self.begin_loop();
        self.expression(&stmt.condition);
        let exit_jump = self.emit_jump(Op::JumpPopIfFalse);
        self.body(&stmt.body);
        self.end_loop();
        self.patch_jump(exit_jump);
    }

    fn for_loop(&mut self, stmt: &ForStmt) {
        self.error_at(stmt.view, "For loops are not supported yet");
    }

    fn type_declaration(&mut self, stmt: &TypeDecl) {
        self.error_at(stmt.name.view, "Type declarations are not supported yet");
    }

    fn func_declaration(&mut self, stmt: &FuncDecl) {
        if stmt.args.len() > u8::MAX as usize {
            self.error_at(
                stmt.name.view,
                format!(
                    "Too many arguments in function declaration (max: {}, you have {})",
                    u8::MAX,
                    stmt.args.len()
                ),
            );
            return;
        }

        if self.data.chunk.constants.prototypes.len() >= MAX_CONSTANTS {
            self.error_at(stmt.name.view, "Too many constants in pool");
            return;
        }
        let proto_index = self.data.chunk.constants.prototypes.len() as u8;

        self.emit(Op::Function);
        self.emit_byte(proto_index);

        self.new_chunk();
        self.begin_scope();
        for arg in &stmt.args {
            self.add_local(&arg.name, arg.view);
        }
        self.body(&stmt.body);
        self.end_scope();
        self.emit(Op::Return);

        let data = self.end_chunk();

        // The capture table reads back at closure-construction time; it
        // lands right after the Function operand in the enclosing chunk.
        for upvalue in &data.upvalues {
            self.emit_byte(upvalue.index);
            self.emit_byte(upvalue.is_local as u8);
        }

        let prototype = Prototype {
            name: stmt.name.name.clone(),
            argc: stmt.args.len() as u8,
            upvalue_count: data.upvalues.len() as u8,
            chunk: Rc::new(data.chunk),
        };

        self.declare(&stmt.name.name, stmt.name.view);
        if self.data.chunk.constants.add_prototype(prototype).is_none() {
            self.error_at(stmt.name.view, "Too many constants in pool");
        }
    }

    fn var_declaration(&mut self, stmt: &VarDecl) {
        if matches!(stmt.expr, Expr::Empty) {
            self.emit(Op::None);
        } else {
            self.expression(&stmt.expr);
        }

        self.declare(&stmt.target.name, stmt.target.view);
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn expression(&mut self, expr: &Expr) {
        if self.failed() {
            return;
        }

        match expr {
            Expr::Number(num) => self.number_literal(num),
            Expr::Bool(BoolLit { value: true, .. }) => self.emit(Op::True),
            Expr::Bool(BoolLit { value: false, .. }) => self.emit(Op::False),
            Expr::None(_) => self.emit(Op::None),
            Expr::Str(str_lit) => self.string_literal(str_lit),
            Expr::Identifier(id) => self.identifier(id, true),
            Expr::Assignment(assign) => self.assignment(assign),
            Expr::Binary(binary) => self.binary(binary),
            Expr::Unary(unary) => self.unary(unary),
            Expr::Call(call) => self.call(call),
            Expr::Property(prop) => {
                self.error_at(prop.prop.view, "Property access is not supported yet");
            }
            Expr::Empty => self.error_at(SourceView::default(), "Invalid expression"),
        }
    }

    fn number_literal(&mut self, num: &NumberLit) {
        // Small integers ride in the operand byte; everything else goes
        // through the constant pool.
        if num.value.fract() == 0.0 && (0.0..=255.0).contains(&num.value) {
            self.emit(Op::ByteNumber);
            self.emit_byte(num.value as u8);
        } else {
            let index = self.make_number(num.value, num.view);
            self.emit(Op::Number);
            self.emit_byte(index);
        }
    }

    fn string_literal(&mut self, str_lit: &StrLit) {
        let index = self.make_name(&str_lit.value, str_lit.view);
        self.emit(Op::Name);
        self.emit_byte(index);
    }

    fn assignment(&mut self, assign: &AssignExpr) {
        // The assigned value stays on the stack; statements pop it.
        self.expression(&assign.expr);

        match &assign.target {
            Expr::Identifier(id) => self.identifier(id, false),
            Expr::Property(prop) => {
                self.error_at(prop.prop.view, "Property assignment is not supported yet");
            }
            other => {
                let view = if matches!(other, Expr::Empty) {
                    assign.view
                } else {
                    other.view()
                };
                self.error_at(view, "Invalid assignment target");
            }
        }
    }

    fn binary(&mut self, binary: &BinaryExpr) {
        self.mark(binary.op_view);

        match binary.op {
            // Short-circuit forms branch on the left value without popping
            // it, so it doubles as the expression's result.
            BinaryOp::And => {
                self.expression(&binary.left);
                let jump = self.emit_jump(Op::JumpIfFalse);
                self.emit(Op::Pop);
                self.expression(&binary.right);
                self.patch_jump(jump);
            }
            BinaryOp::Or => {
                self.expression(&binary.left);
                let jump = self.emit_jump(Op::JumpIfTrue);
                self.emit(Op::Pop);
                self.expression(&binary.right);
                self.patch_jump(jump);
            }
            op => {
                self.expression(&binary.left);
                self.expression(&binary.right);
                self.operator(op);
            }
        }
    }

    fn operator(&mut self, op: BinaryOp) {
        match op {
            BinaryOp::Add => self.emit(Op::Add),
            BinaryOp::Subtract => self.emit(Op::Subtract),
            BinaryOp::Modulo => self.emit(Op::Modulo),
            BinaryOp::Multiply => self.emit(Op::Multiply),
            BinaryOp::Divide => self.emit(Op::Divide),
            BinaryOp::Exponent => self.emit(Op::Exponent),
            BinaryOp::Greater => self.emit(Op::Greater),
            BinaryOp::Less => self.emit(Op::Less),
            BinaryOp::GreaterEqual => self.emit(Op::GreaterEqual),
            BinaryOp::LessEqual => self.emit(Op::LessEqual),
            BinaryOp::Equal => self.emit(Op::Equal),
            BinaryOp::NotEqual => {
                self.emit(Op::Equal);
                self.emit(Op::Not);
            }
            // Handled by the short-circuit paths in `binary`.
            BinaryOp::And | BinaryOp::Or => {}
        }
    }

    fn unary(&mut self, unary: &UnaryExpr) {
        self.expression(&unary.expr);
        self.mark(unary.op_view);

        match unary.op {
            UnaryOp::Negative => self.emit(Op::Negate),
            UnaryOp::Negate => self.emit(Op::Not),
        }
    }

    fn call(&mut self, call: &CallExpr) {
        if call.args.len() > u8::MAX as usize {
            self.error_at(
                call.view,
                format!("Too many arguments in function call (max: {})", u8::MAX),
            );
            return;
        }

        // The callee writes its result into a slot pushed before the
        // arguments.
        self.emit(Op::None);
        for arg in &call.args {
            self.expression(arg);
        }
        self.expression(&call.target);

        self.mark(call.target.view());
        self.emit(Op::Call);
        self.mark(call.view);
        self.emit_byte(call.args.len() as u8);
    }
}

/// Innermost local slot bound to `name`, if any. The returned index already
/// includes the chunk's local offset.
fn find_local(data: &ChunkData, name: &str) -> Option<u8> {
    for (index, local) in data.locals.iter().enumerate().rev() {
        if local.name == name {
            return Some(index as u8 + data.local_offset);
        }
    }
    None
}

/// Marker error: a function tried to capture more than 256 variables.
pub struct TooManyUpValues;

/// Resolve `name` as a captured variable.
///
/// Checks the enclosing function's locals first, then recurses so that a
/// capture several functions out threads an upvalue through every frame in
/// between. Captures already recorded are reused.
fn resolve_upvalue(data: &mut ChunkData, name: &str) -> Result<Option<u8>, TooManyUpValues> {
    let Some(enclosing) = data.enclosing.as_deref_mut() else {
        return Ok(None);
    };

    if let Some(slot) = find_local(enclosing, name) {
        return add_upvalue(data, slot, true).map(Some);
    }

    if let Some(index) = resolve_upvalue(enclosing, name)? {
        return add_upvalue(data, index, false).map(Some);
    }

    Ok(None)
}

fn add_upvalue(data: &mut ChunkData, index: u8, is_local: bool) -> Result<u8, TooManyUpValues> {
    for (i, upvalue) in data.upvalues.iter().enumerate() {
        if upvalue.index == index && upvalue.is_local == is_local {
            return Ok(i as u8);
        }
    }

    if data.upvalues.len() >= 256 {
        return Err(TooManyUpValues);
    }

    data.upvalues.push(UpValueData { index, is_local });
    Ok((data.upvalues.len() - 1) as u8)
}
