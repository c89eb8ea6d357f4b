// cinder-vm - Bytecode compiler and virtual machine for the Cinder scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Stack-based virtual machine for executing Cinder bytecode.
//!
//! One value stack, one call-frame stack, and a list of open upvalues kept
//! sorted by descending stack slot. The compiler's slot discipline and the
//! upvalue capture/close protocol here must agree exactly for closures to
//! behave.

pub mod frame;

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use cinder_parser::{Error, ErrorKind, SourceView};

use crate::chunk::Chunk;
use crate::opcode::Op;
use crate::value::{Function, Module, UpValue, UpValueRef, Value};

pub use frame::CallFrame;

/// Maximum call depth.
pub const FRAMES_MAX: usize = 64;

/// Value stack capacity: every frame may address up to 256 slots.
pub const STACK_MAX: usize = FRAMES_MAX * 256;

/// The Cinder virtual machine.
///
/// Transient: one is built per `run`, executes synchronously to completion,
/// and writes program output through the supplied sink.
pub struct Vm<'a> {
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    /// Open upvalues, sorted by descending stack slot.
    open_upvalues: Vec<UpValueRef>,
    /// Error slot written by built-in functions via [`Vm::error_at`].
    error: Option<Error>,
    path: String,
    out: &'a mut dyn Write,
}

impl<'a> Vm<'a> {
    /// Create a VM writing program output to `out`.
    pub fn new(path: &str, out: &'a mut dyn Write) -> Self {
        Self {
            stack: Vec::with_capacity(STACK_MAX),
            frames: Vec::with_capacity(FRAMES_MAX),
            open_upvalues: Vec::new(),
            error: None,
            path: path.to_string(),
            out,
        }
    }

    /// Execute a compiled chunk against a module's globals.
    ///
    /// Returns the program's exit code, or the first runtime fault.
    pub fn interpret(
        &mut self,
        module: Rc<RefCell<Module>>,
        chunk: Rc<Chunk>,
    ) -> Result<i32, Error> {
        self.frames.push(CallFrame {
            ip: 0,
            sp: 0,
            module,
            chunk,
            func: None,
        });

        let result = self.run();
        self.frames.clear();
        self.open_upvalues.clear();
        self.stack.clear();
        result
    }

    fn run(&mut self) -> Result<i32, Error> {
        loop {
            let byte = self.read_byte()?;
            let Some(op) = Op::from_byte(byte) else {
                return Err(self.fault(format!("Unknown Instruction ({})", byte)));
            };

            match op {
                Op::Exit => {
                    let code = self.read_byte()?;
                    return Ok(code as i32);
                }

                Op::Return => {
                    let frame = self.frames.pop().expect("no active call frame");
                    self.close_upvalues(frame.sp);

                    if self.stack.len() <= frame.sp {
                        return Err(self.fault("Stack underflow"));
                    }
                    // Leave the return slot as the call's result.
                    self.stack.truncate(frame.sp + 1);

                    if self.frames.is_empty() {
                        return Ok(0);
                    }
                }

                Op::Pop => {
                    self.pop()?;
                }

                Op::PopLocals => {
                    let count = self.read_byte()? as usize;
                    if count > self.stack.len() {
                        return Err(self.fault("Stack underflow"));
                    }
                    let base = self.stack.len() - count;
                    self.close_upvalues(base);
                    self.stack.truncate(base);
                }

                Op::Name => {
                    let name = self.read_name()?;
                    self.push(Value::Str(name));
                }

                Op::Number => {
                    let value = self.read_number()?;
                    self.push(Value::Number(value));
                }

                Op::ByteNumber => {
                    let byte = self.read_byte()?;
                    self.push(Value::Number(byte as f64));
                }

                Op::True => self.push(Value::Bool(true)),
                Op::False => self.push(Value::Bool(false)),
                Op::None => self.push(Value::None),

                Op::Add => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    match (a, b) {
                        (Value::Number(a), Value::Number(b)) => self.push(Value::Number(a + b)),
                        (Value::Str(a), Value::Str(b)) => {
                            self.push(Value::str(format!("{}{}", a, b)));
                        }
                        _ => return Err(self.fault("Can only add numbers or strings")),
                    }
                }

                Op::Subtract => self.numeric_op(|a, b| a - b, "Can only subtract numbers")?,
                Op::Modulo => self.numeric_op(|a, b| a % b, "Can only take the modulo of numbers")?,
                Op::Multiply => self.numeric_op(|a, b| a * b, "Can only multiply numbers")?,
                Op::Divide => self.numeric_op(|a, b| a / b, "Can only divide numbers")?,
                Op::Exponent => self.numeric_op(|a, b| a.powf(b), "Can only exponentiate numbers")?,

                Op::Equal => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.push(Value::Bool(a.values_equal(&b)));
                }

                Op::Greater => self.comparison_op(|a, b| a > b)?,
                Op::Less => self.comparison_op(|a, b| a < b)?,
                Op::GreaterEqual => self.comparison_op(|a, b| a >= b)?,
                Op::LessEqual => self.comparison_op(|a, b| a <= b)?,

                Op::Not => {
                    let value = self.pop()?;
                    self.push(Value::Bool(!value.is_truthy()));
                }

                Op::Negate => {
                    let value = self.pop()?;
                    match value {
                        Value::Number(n) => self.push(Value::Number(-n)),
                        _ => return Err(self.fault("Can only negate a number")),
                    }
                }

                Op::Print => {
                    let count = self.read_byte()?;
                    let mut parts = Vec::with_capacity(count as usize);
                    for _ in 0..count {
                        parts.push(self.pop()?.to_string());
                    }
                    let _ = writeln!(self.out, "{}", parts.join(" "));
                }

                Op::DefineGlobal => {
                    let name = self.read_name()?;
                    let value = self.pop()?;
                    let module = self.frame().module.clone();
                    module.borrow_mut().globals.insert(name, value);
                }

                Op::GetGlobal => {
                    let name = self.read_name()?;
                    let module = self.frame().module.clone();
                    let value = module.borrow().globals.get(&name).cloned();
                    match value {
                        Some(value) => self.push(value),
                        None => return Err(self.missing_global(&name)),
                    }
                }

                Op::SetGlobal => {
                    let name = self.read_name()?;
                    let value = self.peek(0)?;
                    let module = self.frame().module.clone();
                    let mut borrowed = module.borrow_mut();
                    match borrowed.globals.get_mut(&name) {
                        Some(slot) => *slot = value,
                        None => return Err(self.missing_global(&name)),
                    }
                }

                Op::GetLocal => {
                    let slot = self.read_byte()? as usize;
                    let index = self.frame().sp + slot;
                    let value = match self.stack.get(index) {
                        Some(value) => value.clone(),
                        None => return Err(self.fault("Stack underflow")),
                    };
                    self.push(value);
                }

                Op::SetLocal => {
                    let slot = self.read_byte()? as usize;
                    let index = self.frame().sp + slot;
                    let value = self.peek(0)?;
                    match self.stack.get_mut(index) {
                        Some(entry) => *entry = value,
                        None => return Err(self.fault("Stack underflow")),
                    }
                }

                Op::GetUpValue => {
                    let index = self.read_byte()? as usize;
                    let cell = self.upvalue_cell(index)?;
                    let value = match &*cell.borrow() {
                        UpValue::Open(slot) => self.stack.get(*slot).cloned().unwrap_or(Value::None),
                        UpValue::Closed(value) => value.clone(),
                    };
                    self.push(value);
                }

                Op::SetUpValue => {
                    let index = self.read_byte()? as usize;
                    let cell = self.upvalue_cell(index)?;
                    let value = self.peek(0)?;

                    let open_slot = match &mut *cell.borrow_mut() {
                        UpValue::Open(slot) => Some(*slot),
                        UpValue::Closed(owned) => {
                            *owned = value.clone();
                            None
                        }
                    };

                    if let Some(slot) = open_slot {
                        match self.stack.get_mut(slot) {
                            Some(entry) => *entry = value,
                            None => return Err(self.fault("Stack underflow")),
                        }
                    }
                }

                Op::Jump => {
                    let distance = self.read_u16()? as usize;
                    self.frame_mut().ip += distance;
                }

                Op::JumpBack => {
                    let distance = self.read_u16()? as usize;
                    if distance > self.frame().ip {
                        return Err(self.fault("Jump out of bounds"));
                    }
                    self.frame_mut().ip -= distance;
                }

                Op::JumpIfTrue => {
                    let distance = self.read_u16()? as usize;
                    if self.peek(0)?.is_truthy() {
                        self.frame_mut().ip += distance;
                    }
                }

                Op::JumpIfFalse => {
                    let distance = self.read_u16()? as usize;
                    if !self.peek(0)?.is_truthy() {
                        self.frame_mut().ip += distance;
                    }
                }

                Op::JumpPopIfFalse => {
                    let distance = self.read_u16()? as usize;
                    if !self.pop()?.is_truthy() {
                        self.frame_mut().ip += distance;
                    }
                }

                Op::Function => self.make_closure()?,

                Op::Call => {
                    let argc = self.read_byte()?;
                    self.call_value(argc)?;
                }
            }
        }
    }

    // =========================================================================
    // Calls and closures
    // =========================================================================

    fn call_value(&mut self, argc: u8) -> Result<(), Error> {
        let callee = self.pop()?;

        if self.stack.len() < argc as usize + 1 {
            return Err(self.fault("Stack underflow"));
        }
        // Frame base: the return slot the caller pushed before the arguments.
        let sp = self.stack.len() - argc as usize - 1;

        match callee {
            Value::Function(func) => {
                if argc != func.prototype.argc {
                    let expected = func.prototype.argc;
                    return Err(self.fault(format!(
                        "Expected {} argument{}, got {}",
                        expected,
                        if expected == 1 { "" } else { "s" },
                        argc
                    )));
                }

                if self.frames.len() >= FRAMES_MAX || self.stack.len() + 256 > STACK_MAX {
                    return Err(self.fault("Stack overflow"));
                }

                let module = func.module.clone();
                let chunk = func.prototype.chunk.clone();
                self.frames.push(CallFrame {
                    ip: 0,
                    sp,
                    module,
                    chunk,
                    func: Some(func),
                });
                Ok(())
            }

            Value::BuiltIn(builtin) => {
                let ok = (builtin.func)(self, sp, argc);
                if let Some(error) = self.error.take() {
                    return Err(error);
                }
                if !ok {
                    return Err(
                        self.fault(format!("Built-in function '{}' failed", builtin.name))
                    );
                }

                // Arguments popped, return value retained.
                self.stack.truncate(sp + 1);
                Ok(())
            }

            _ => Err(self.fault("Invalid call target")),
        }
    }

    /// Build a closure from a `Function` instruction: read the prototype
    /// index, then one `(index, is_local)` pair per captured variable.
    fn make_closure(&mut self) -> Result<(), Error> {
        let index = self.read_byte()? as usize;

        let (prototype, module, sp) = {
            let frame = self.frame();
            let prototype = match frame.chunk.constants.prototypes.get(index) {
                Some(prototype) => prototype.clone(),
                None => return Err(self.fault("Unknown function prototype")),
            };
            (prototype, frame.module.clone(), frame.sp)
        };

        let mut upvalues = Vec::with_capacity(prototype.upvalue_count as usize);
        for _ in 0..prototype.upvalue_count {
            let capture_index = self.read_byte()? as usize;
            let is_local = self.read_byte()? != 0;

            if is_local {
                // Capture a slot of the *current* frame's window.
                upvalues.push(self.capture_upvalue(sp + capture_index));
            } else {
                // Reuse a capture threaded through the current closure.
                let cell = {
                    let frame = self.frame();
                    let Some(func) = frame.func.as_ref() else {
                        return Err(self.fault("Invalid capture outside of function"));
                    };
                    match func.upvalues.get(capture_index) {
                        Some(cell) => cell.clone(),
                        None => return Err(self.fault("Invalid capture index")),
                    }
                };
                upvalues.push(cell);
            }
        }

        self.push(Value::Function(Rc::new(Function {
            prototype,
            module,
            upvalues,
        })));
        Ok(())
    }

    // =========================================================================
    // Upvalues
    // =========================================================================

    /// Find or create the open upvalue for a stack slot.
    ///
    /// The open list is sorted by descending slot; capturing the same slot
    /// twice hands back the same cell, which is what makes two closures
    /// over one variable share state.
    fn capture_upvalue(&mut self, slot: usize) -> UpValueRef {
        let mut at = self.open_upvalues.len();
        for (i, cell) in self.open_upvalues.iter().enumerate() {
            match cell.borrow().slot() {
                Some(existing) if existing == slot => return cell.clone(),
                Some(existing) if existing < slot => {
                    at = i;
                    break;
                }
                _ => {}
            }
        }

        let cell: UpValueRef = Rc::new(RefCell::new(UpValue::Open(slot)));
        self.open_upvalues.insert(at, cell.clone());
        cell
    }

    /// Close every open upvalue at or above `min_slot`: copy the stack
    /// value into the cell and drop it from the open list. Idempotent.
    fn close_upvalues(&mut self, min_slot: usize) {
        loop {
            let Some(cell) = self.open_upvalues.first().cloned() else {
                break;
            };
            let Some(slot) = cell.borrow().slot() else {
                self.open_upvalues.remove(0);
                continue;
            };
            if slot < min_slot {
                break;
            }

            let value = self.stack.get(slot).cloned().unwrap_or(Value::None);
            *cell.borrow_mut() = UpValue::Closed(value);
            self.open_upvalues.remove(0);
        }
    }

    fn upvalue_cell(&self, index: usize) -> Result<UpValueRef, Error> {
        let frame = self.frame();
        let Some(func) = frame.func.as_ref() else {
            return Err(self.fault("Invalid capture outside of function"));
        };
        match func.upvalues.get(index) {
            Some(cell) => Ok(cell.clone()),
            None => Err(self.fault("Invalid capture index")),
        }
    }

    // =========================================================================
    // Bytecode reading
    // =========================================================================

    fn read_byte(&mut self) -> Result<u8, Error> {
        let frame = self.frames.last_mut().expect("no active call frame");
        if frame.ip < frame.chunk.bytecode.len() {
            let byte = frame.chunk.bytecode[frame.ip];
            frame.ip += 1;
            return Ok(byte);
        }

        Err(self.fault("Instruction pointer out of bounds"))
    }

    fn read_u16(&mut self) -> Result<u16, Error> {
        let hi = self.read_byte()? as u16;
        let lo = self.read_byte()? as u16;
        Ok((hi << 8) | lo)
    }

    fn read_name(&mut self) -> Result<Rc<str>, Error> {
        let index = self.read_byte()? as usize;
        match self.frame().chunk.constants.names.get(index) {
            Some(name) => Ok(name.clone()),
            None => Err(self.fault("Unknown name constant")),
        }
    }

    fn read_number(&mut self) -> Result<f64, Error> {
        let index = self.read_byte()? as usize;
        match self.frame().chunk.constants.numbers.get(index) {
            Some(&value) => Ok(value),
            None => Err(self.fault("Unknown number constant")),
        }
    }

    // =========================================================================
    // Stack
    // =========================================================================

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Result<Value, Error> {
        match self.stack.pop() {
            Some(value) => Ok(value),
            None => Err(self.fault("Stack underflow")),
        }
    }

    fn peek(&self, distance: usize) -> Result<Value, Error> {
        if distance >= self.stack.len() {
            return Err(self.fault("Stack underflow"));
        }
        Ok(self.stack[self.stack.len() - 1 - distance].clone())
    }

    fn frame(&self) -> &CallFrame {
        self.frames.last().expect("no active call frame")
    }

    fn frame_mut(&mut self) -> &mut CallFrame {
        self.frames.last_mut().expect("no active call frame")
    }

    // =========================================================================
    // Operators
    // =========================================================================

    fn numeric_op(&mut self, op: fn(f64, f64) -> f64, msg: &str) -> Result<(), Error> {
        let b = self.pop()?;
        let a = self.pop()?;

        match (a, b) {
            (Value::Number(a), Value::Number(b)) => {
                self.push(Value::Number(op(a, b)));
                Ok(())
            }
            _ => Err(self.fault(msg)),
        }
    }

    fn comparison_op(&mut self, op: fn(f64, f64) -> bool) -> Result<(), Error> {
        let b = self.pop()?;
        let a = self.pop()?;

        match (a, b) {
            (Value::Number(a), Value::Number(b)) => {
                self.push(Value::Bool(op(a, b)));
                Ok(())
            }
            _ => Err(self.fault("Can only compare numbers")),
        }
    }

    // =========================================================================
    // Errors and the built-in ABI
    // =========================================================================

    /// Build a runtime fault attributed to the nearest marker at or before
    /// the instruction being executed.
    fn fault(&self, msg: impl Into<String>) -> Error {
        let view = self
            .frames
            .last()
            .and_then(|frame| frame.chunk.marker_for(frame.ip.saturating_sub(1)))
            .unwrap_or_else(SourceView::default);
        Error::new(view, ErrorKind::Runtime, msg, &self.path)
    }

    fn missing_global(&self, name: &str) -> Error {
        self.fault(format!(
            "Couldn't find global named {} in current module",
            name
        ))
    }

    /// Record a runtime error from inside a built-in function. The first
    /// error wins; the dispatch loop surfaces it when the built-in returns.
    pub fn error_at(&mut self, msg: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(self.fault(msg));
        }
    }

    /// Argument `index` (0-based) of the built-in call based at `sp`.
    pub fn builtin_arg(&self, sp: usize, index: usize) -> Value {
        self.stack.get(sp + 1 + index).cloned().unwrap_or(Value::None)
    }

    /// Write the return value of the built-in call based at `sp`.
    pub fn builtin_return(&mut self, sp: usize, value: Value) {
        if let Some(slot) = self.stack.get_mut(sp) {
            *slot = value;
        }
    }

    /// Write prompt text through the VM's output sink.
    pub fn write_output(&mut self, text: &str) {
        let _ = write!(self.out, "{}", text);
        let _ = self.out.flush();
    }
}
