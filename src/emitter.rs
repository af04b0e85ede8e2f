//! Semantic VM code emitter.
//!
//! The parser never writes raw VM text. It asks the emitter to push a
//! variable, apply an operator or bind a receiver, and the emitter resolves
//! names through the symbol table and lowers the request to VM commands.

use crate::error::CompileError;
use crate::symbol_table::{Symbol, SymbolKind, SymbolTable, VarType};
use crate::token::{Keyword, Span};
use crate::vm_writer::{ArithmeticCommand, Segment, VMWriter};

/// Largest value a `push constant` can carry.
pub const MAX_CONSTANT: u32 = 32767;

/// A declared subroutine parameter.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub var_type: VarType,
    pub span: Span,
}

/// Symbol table plus instruction sink.
#[derive(Debug, Default)]
pub struct Emitter {
    symbols: SymbolTable,
    vm: VMWriter,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh subroutine scope.
    pub fn start_subroutine(&mut self) {
        self.symbols.start_subroutine();
    }

    /// Register a variable without emitting anything.
    pub fn declare_variable(
        &mut self,
        name: &str,
        var_type: VarType,
        kind: SymbolKind,
        span: Span,
    ) -> Result<(), CompileError> {
        self.symbols.register(name, var_type, kind, span)?;
        Ok(())
    }

    /// Emit a function header and register its arguments in order.
    ///
    /// For methods the caller must already have put the receiver first in `args`.
    pub fn declare_function(
        &mut self,
        qualified_name: &str,
        args: &[Parameter],
        local_count: u16,
    ) -> Result<(), CompileError> {
        self.vm.write_function(qualified_name, local_count);
        for arg in args {
            self.symbols.register(
                &arg.name,
                arg.var_type.clone(),
                SymbolKind::Argument,
                arg.span.clone(),
            )?;
        }
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols.lookup(name)
    }

    /// Number of locals registered in the current subroutine.
    pub fn local_count(&self) -> u16 {
        self.symbols.var_count(SymbolKind::Local)
    }

    fn resolve(&self, name: &str, span: &Span) -> Result<(Segment, u16), CompileError> {
        self.symbols
            .lookup(name)
            .map(|symbol| (symbol.segment(), symbol.index))
            .ok_or_else(|| CompileError::undefined_variable(name, span.clone()))
    }

    pub fn push_variable(&mut self, name: &str, span: &Span) -> Result<(), CompileError> {
        let (segment, index) = self.resolve(name, span)?;
        self.vm.write_push(segment, index);
        Ok(())
    }

    pub fn pop_variable(&mut self, name: &str, span: &Span) -> Result<(), CompileError> {
        let (segment, index) = self.resolve(name, span)?;
        self.vm.write_pop(segment, index);
        Ok(())
    }

    pub fn push_int_constant(&mut self, value: u16) {
        self.vm.write_push(Segment::Constant, value);
    }

    /// Build a string object: `String.new(len)` then one `appendChar` per character.
    pub fn push_string_constant(&mut self, value: &str, span: &Span) -> Result<(), CompileError> {
        let codes = value
            .chars()
            .map(|ch| check_constant(ch as u32, span))
            .collect::<Result<Vec<_>, _>>()?;
        let len = check_constant(codes.len() as u32, span)?;

        self.push_int_constant(len);
        self.vm.write_call("String.new", 1);
        for code in codes {
            self.push_int_constant(code);
            self.vm.write_call("String.appendChar", 2);
        }
        Ok(())
    }

    /// Push `true`, `false`, `null` or `this`. `true` is `not 0` (all ones).
    pub fn push_keyword_constant(&mut self, keyword: Keyword, span: &Span) -> Result<(), CompileError> {
        match keyword {
            Keyword::False | Keyword::Null => self.push_int_constant(0),
            Keyword::True => {
                self.push_int_constant(0);
                self.vm.write_arithmetic(ArithmeticCommand::Not);
            }
            Keyword::This => self.vm.write_push(Segment::Pointer, 0),
            other => {
                return Err(CompileError::UnknownKeywordConstant {
                    keyword: other.as_str().to_string(),
                    span: span.clone(),
                });
            }
        }
        Ok(())
    }

    /// Apply an operator to the top of the stack.
    ///
    /// `-` is `neg` when `unary` and `sub` otherwise; `*` and `/` call the
    /// runtime math library.
    pub fn arithmetic(&mut self, op: char, unary: bool, span: &Span) -> Result<(), CompileError> {
        let cmd = match (op, unary) {
            ('-', true) => ArithmeticCommand::Neg,
            ('~', true) => ArithmeticCommand::Not,
            ('+', false) => ArithmeticCommand::Add,
            ('-', false) => ArithmeticCommand::Sub,
            ('&', false) => ArithmeticCommand::And,
            ('|', false) => ArithmeticCommand::Or,
            ('<', false) => ArithmeticCommand::Lt,
            ('>', false) => ArithmeticCommand::Gt,
            ('=', false) => ArithmeticCommand::Eq,
            ('*', false) => {
                self.vm.write_call("Math.multiply", 2);
                return Ok(());
            }
            ('/', false) => {
                self.vm.write_call("Math.divide", 2);
                return Ok(());
            }
            _ => {
                return Err(CompileError::UnknownOperator {
                    op,
                    span: span.clone(),
                });
            }
        };
        self.vm.write_arithmetic(cmd);
        Ok(())
    }

    /// Call a subroutine whose `arg_count` arguments are already on the stack.
    pub fn call(&mut self, qualified_name: &str, arg_count: u16) {
        self.vm.write_call(qualified_name, arg_count);
    }

    pub fn label(&mut self, name: &str) {
        self.vm.write_label(name);
    }

    pub fn goto(&mut self, name: &str) {
        self.vm.write_goto(name);
    }

    /// Jump when the popped top of stack is true.
    pub fn if_goto(&mut self, name: &str) {
        self.vm.write_if_goto(name);
    }

    pub fn emit_return(&mut self) {
        self.vm.write_return();
    }

    /// Drop the value on top of the stack.
    pub fn discard(&mut self) {
        self.vm.write_pop(Segment::Temp, 0);
    }

    /// Bind the receiver passed as argument 0 (methods only).
    pub fn set_this(&mut self) {
        self.vm.write_push(Segment::Argument, 0);
        self.vm.write_pop(Segment::Pointer, 0);
    }

    /// Allocate the object and bind it as receiver (constructors only).
    pub fn constructor_alloc(&mut self) {
        let size = self.symbols.field_count();
        self.push_int_constant(size);
        self.vm.write_call("Memory.alloc", 1);
        self.vm.write_pop(Segment::Pointer, 0);
    }

    /// Store through an address: expects `[address, value]` on the stack.
    pub fn array_store(&mut self) {
        self.vm.write_pop(Segment::Temp, 0);
        self.vm.write_pop(Segment::Pointer, 1);
        self.vm.write_push(Segment::Temp, 0);
        self.vm.write_pop(Segment::That, 0);
    }

    /// Replace the address on top of the stack with the value it points to.
    pub fn array_load(&mut self) {
        self.vm.write_pop(Segment::Pointer, 1);
        self.vm.write_push(Segment::That, 0);
    }

    pub fn lines(&self) -> &[String] {
        self.vm.lines()
    }

    pub fn into_writer(self) -> VMWriter {
        self.vm
    }
}

/// Check that a value fits a `push constant`.
pub fn check_constant(value: u32, span: &Span) -> Result<u16, CompileError> {
    if value > MAX_CONSTANT {
        return Err(CompileError::IntegerOutOfRange {
            value,
            span: span.clone(),
        });
    }
    Ok(value as u16)
}
