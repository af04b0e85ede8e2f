//! Error types for the Jack compiler.

use crate::token::Span;
use std::path::PathBuf;
use thiserror::Error;

/// Broad class of a compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// No token category matches the remaining input.
    Lexical,
    /// Unexpected token or premature end of input.
    Syntax,
    /// Well-formed input that cannot be translated.
    Semantic,
    /// Reading or writing a file failed.
    Io,
}

/// Errors that can occur during Jack compilation.
///
/// Every error is fatal for its compilation unit.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Lexical error at {span}: {message}")]
    Lexical { span: Span, message: String },

    #[error("Syntax error at {span}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },

    /// Variable used but not declared.
    #[error("Undefined variable '{name}' at {span}")]
    UndefinedVariable { name: String, span: Span },

    /// Variable declared twice in the same scope.
    #[error("Duplicate definition of '{name}' at {span}")]
    DuplicateDefinition { name: String, span: Span },

    #[error("Unknown operator '{op}' at {span}")]
    UnknownOperator { op: char, span: Span },

    #[error("Unknown keyword constant '{keyword}' at {span}")]
    UnknownKeywordConstant { keyword: String, span: Span },

    #[error("Constant {value} out of range 0..=32767 at {span}")]
    IntegerOutOfRange { value: u32, span: Span },

    /// A declaration or argument count no longer fits a VM index.
    #[error("Too many {what} (at most {limit}) at {span}")]
    LimitExceeded {
        what: &'static str,
        limit: u16,
        span: Span,
    },

    /// Unqualified call inside a `function`, where no receiver exists.
    #[error("Subroutine '{name}' called as a method from within function at {span}")]
    MethodCallInFunction { name: String, span: Span },

    /// File I/O error.
    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    /// Create a lexical error.
    pub fn lexical(span: Span, message: impl Into<String>) -> Self {
        Self::Lexical {
            span,
            message: message.into(),
        }
    }

    /// Create a syntax error.
    pub fn syntax(span: Span, message: impl Into<String>) -> Self {
        Self::Syntax {
            span,
            message: message.into(),
            expected: Vec::new(),
        }
    }

    /// Create a syntax error with expected tokens.
    pub fn syntax_expected(span: Span, message: impl Into<String>, expected: Vec<String>) -> Self {
        Self::Syntax {
            span,
            message: message.into(),
            expected,
        }
    }

    /// Create an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an undefined variable error.
    pub fn undefined_variable(name: impl Into<String>, span: Span) -> Self {
        Self::UndefinedVariable {
            name: name.into(),
            span,
        }
    }

    /// Create a limit error for a count that would pass `u16::MAX`.
    pub fn limit_exceeded(what: &'static str, span: Span) -> Self {
        Self::LimitExceeded {
            what,
            limit: u16::MAX,
            span,
        }
    }

    /// Create a duplicate definition error.
    pub fn duplicate_definition(name: impl Into<String>, span: Span) -> Self {
        Self::DuplicateDefinition {
            name: name.into(),
            span,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Lexical { .. } => ErrorCategory::Lexical,
            Self::Syntax { .. } => ErrorCategory::Syntax,
            Self::UndefinedVariable { .. }
            | Self::DuplicateDefinition { .. }
            | Self::UnknownOperator { .. }
            | Self::UnknownKeywordConstant { .. }
            | Self::IntegerOutOfRange { .. }
            | Self::LimitExceeded { .. }
            | Self::MethodCallInFunction { .. } => ErrorCategory::Semantic,
            Self::Io { .. } => ErrorCategory::Io,
        }
    }

    /// Get the span of this error, if any.
    pub fn span(&self) -> Option<&Span> {
        match self {
            Self::Lexical { span, .. }
            | Self::Syntax { span, .. }
            | Self::UndefinedVariable { span, .. }
            | Self::DuplicateDefinition { span, .. }
            | Self::UnknownOperator { span, .. }
            | Self::UnknownKeywordConstant { span, .. }
            | Self::IntegerOutOfRange { span, .. }
            | Self::LimitExceeded { span, .. }
            | Self::MethodCallInFunction { span, .. } => Some(span),
            Self::Io { .. } => None,
        }
    }
}
