//! Human-readable rendering of compile errors.

use crate::error::CompileError;
use std::fmt;

/// Diagnostic formatter for rich error output.
pub struct Diagnostic<'a> {
    error: &'a CompileError,
    source: Option<&'a str>,
    filename: Option<&'a str>,
}

impl<'a> Diagnostic<'a> {
    pub fn new(error: &'a CompileError) -> Self {
        Self {
            error,
            source: None,
            filename: None,
        }
    }

    pub fn with_source(mut self, source: &'a str) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_filename(mut self, filename: &'a str) -> Self {
        self.filename = Some(filename);
        self
    }
}

impl fmt::Display for Diagnostic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filename = self.filename.unwrap_or("<input>");

        let Some(span) = self.error.span() else {
            return writeln!(f, "error: {}", self.error);
        };

        match self.error {
            CompileError::Lexical { message, .. } | CompileError::Syntax { message, .. } => {
                writeln!(f, "error: {}", message)?;
            }
            other => writeln!(f, "error: {}", other)?,
        }
        writeln!(f, "  --> {}:{}:{}", filename, span.line, span.column)?;

        if let Some(source) = self.source
            && let Some(line) = source.lines().nth(span.line.saturating_sub(1))
        {
            writeln!(f, "   |")?;
            writeln!(f, "{:3} | {}", span.line, line)?;
            writeln!(f, "   | {:>width$}^", "", width = span.column.saturating_sub(1))?;
        }

        if let CompileError::Syntax { expected, .. } = self.error
            && !expected.is_empty()
        {
            writeln!(f, "   = expected: {}", expected.join(", "))?;
        }

        Ok(())
    }
}

/// Render one error with its source context.
pub fn format_error(error: &CompileError, source: &str, filename: &str) -> String {
    Diagnostic::new(error)
        .with_source(source)
        .with_filename(filename)
        .to_string()
}
