//! VM command sink for the Jack compiler.
//!
//! Holds the append-only instruction sequence. Each write appends exactly one
//! line; nothing already written is ever changed.

use std::fmt;

/// Memory segment of the target virtual machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    pub fn as_str(self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Argument => "argument",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stack arithmetic and logic commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticCommand {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl ArithmeticCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            ArithmeticCommand::Add => "add",
            ArithmeticCommand::Sub => "sub",
            ArithmeticCommand::Neg => "neg",
            ArithmeticCommand::Eq => "eq",
            ArithmeticCommand::Gt => "gt",
            ArithmeticCommand::Lt => "lt",
            ArithmeticCommand::And => "and",
            ArithmeticCommand::Or => "or",
            ArithmeticCommand::Not => "not",
        }
    }
}

/// VM command writer backed by an ordered list of lines.
#[derive(Debug, Default)]
pub struct VMWriter {
    lines: Vec<String>,
}

impl VMWriter {
    /// Create a new, empty VM writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a push command.
    pub fn write_push(&mut self, segment: Segment, index: u16) {
        self.lines.push(format!("push {} {}", segment, index));
    }

    /// Write a pop command.
    pub fn write_pop(&mut self, segment: Segment, index: u16) {
        self.lines.push(format!("pop {} {}", segment, index));
    }

    /// Write an arithmetic/logical command.
    pub fn write_arithmetic(&mut self, cmd: ArithmeticCommand) {
        self.lines.push(cmd.as_str().to_string());
    }

    pub fn write_label(&mut self, label: &str) {
        self.lines.push(format!("label {}", label));
    }

    pub fn write_goto(&mut self, label: &str) {
        self.lines.push(format!("goto {}", label));
    }

    pub fn write_if_goto(&mut self, label: &str) {
        self.lines.push(format!("if-goto {}", label));
    }

    /// Write a function declaration.
    pub fn write_function(&mut self, name: &str, num_locals: u16) {
        self.lines.push(format!("function {} {}", name, num_locals));
    }

    /// Write a function call.
    pub fn write_call(&mut self, name: &str, num_args: u16) {
        self.lines.push(format!("call {} {}", name, num_args));
    }

    pub fn write_return(&mut self) {
        self.lines.push("return".to_string());
    }

    /// The instructions written so far, in execution order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Consume the writer and return the instruction list.
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Render the instructions as text, one per line with a trailing newline.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.lines.iter().map(|l| l.len() + 1).sum());
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
