//! Two-level symbol table for the Jack compiler.
//!
//! The symbol table maintains two scopes:
//! - **Class scope**: `static` and `field` variables, persists across subroutines
//! - **Subroutine scope**: `argument` and `local` variables, reset per subroutine
//!
//! Lookup is subroutine-first, allowing local variables to shadow class-level ones.

use crate::error::CompileError;
use crate::token::Span;
use crate::vm_writer::Segment;
use std::collections::HashMap;
use std::fmt;

/// Declared type of a variable. Recorded, never checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarType {
    Int,
    Char,
    Boolean,
    ClassName(String),
}

impl VarType {
    /// Class name of an object-typed variable.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            VarType::ClassName(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarType::Int => f.write_str("int"),
            VarType::Char => f.write_str("char"),
            VarType::Boolean => f.write_str("boolean"),
            VarType::ClassName(name) => f.write_str(name),
        }
    }
}

/// The kind of symbol, determining its VM segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// Class-level static variable → `static` segment
    Static,
    /// Class-level field variable → `this` segment
    Field,
    /// Subroutine argument → `argument` segment
    Argument,
    /// Subroutine local variable → `local` segment
    Local,
}

impl SymbolKind {
    /// Convert to VM segment.
    #[inline]
    pub fn to_segment(self) -> Segment {
        match self {
            SymbolKind::Static => Segment::Static,
            SymbolKind::Field => Segment::This,
            SymbolKind::Argument => Segment::Argument,
            SymbolKind::Local => Segment::Local,
        }
    }

    /// Plural noun for diagnostics, e.g. "local variables".
    pub fn plural(self) -> &'static str {
        match self {
            SymbolKind::Static => "static variables",
            SymbolKind::Field => "fields",
            SymbolKind::Argument => "arguments",
            SymbolKind::Local => "local variables",
        }
    }

    /// Check if this is a class-level symbol.
    #[inline]
    pub fn is_class_level(self) -> bool {
        matches!(self, SymbolKind::Static | SymbolKind::Field)
    }
}

/// A symbol entry in the symbol table.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub symbol_type: VarType,
    pub kind: SymbolKind,
    /// The index within its segment.
    pub index: u16,
}

impl Symbol {
    /// Get the VM segment for this symbol.
    #[inline]
    pub fn segment(&self) -> Segment {
        self.kind.to_segment()
    }
}

/// Two-level symbol table for Jack compilation.
///
/// Indices are handed out per kind, densely and in declaration order.
#[derive(Debug, Default)]
pub struct SymbolTable {
    class_scope: HashMap<String, Symbol>,
    subroutine_scope: HashMap<String, Symbol>,
    static_count: u16,
    field_count: u16,
    argument_count: u16,
    local_count: u16,
}

impl SymbolTable {
    /// Create a new empty symbol table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start compiling a new subroutine.
    ///
    /// Clears subroutine-level symbols and resets argument/local counters.
    /// Class-level symbols remain accessible.
    pub fn start_subroutine(&mut self) {
        self.subroutine_scope.clear();
        self.argument_count = 0;
        self.local_count = 0;
    }

    /// Register a new symbol in the scope implied by its kind.
    ///
    /// Returns an error if the name is already registered in that scope.
    pub fn register(
        &mut self,
        name: &str,
        symbol_type: VarType,
        kind: SymbolKind,
        span: Span,
    ) -> Result<&Symbol, CompileError> {
        let scope = if kind.is_class_level() {
            &mut self.class_scope
        } else {
            &mut self.subroutine_scope
        };

        if scope.contains_key(name) {
            return Err(CompileError::duplicate_definition(name, span));
        }

        let counter = match kind {
            SymbolKind::Static => &mut self.static_count,
            SymbolKind::Field => &mut self.field_count,
            SymbolKind::Argument => &mut self.argument_count,
            SymbolKind::Local => &mut self.local_count,
        };
        let index = *counter;
        *counter = index
            .checked_add(1)
            .ok_or_else(|| CompileError::limit_exceeded(kind.plural(), span.clone()))?;

        let symbol = Symbol {
            name: name.to_string(),
            symbol_type,
            kind,
            index,
        };

        let symbol: &Symbol = scope.entry(name.to_string()).or_insert(symbol);
        Ok(symbol)
    }

    /// Look up a symbol by name.
    ///
    /// Searches subroutine scope first, then class scope.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.subroutine_scope
            .get(name)
            .or_else(|| self.class_scope.get(name))
    }

    /// Get the count of symbols of a given kind.
    pub fn var_count(&self, kind: SymbolKind) -> u16 {
        match kind {
            SymbolKind::Static => self.static_count,
            SymbolKind::Field => self.field_count,
            SymbolKind::Argument => self.argument_count,
            SymbolKind::Local => self.local_count,
        }
    }

    /// Get the number of field variables (needed for Memory.alloc in constructors).
    #[inline]
    pub fn field_count(&self) -> u16 {
        self.field_count
    }
}
