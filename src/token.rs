//! Token types and source spans for the Jack tokenizer.

use std::fmt;

/// Source location span for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A token with its source location.
///
/// `next_char` is the first significant character following the token
/// (whitespace and comments skipped), or `None` at end of input. The parser
/// uses it to tell `name(`, `name.` and `name[` apart without consuming `name`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
    pub next_char: Option<char>,
}

impl SpannedToken {
    pub fn new(token: Token, span: Span, next_char: Option<char>) -> Self {
        Self {
            token,
            span,
            next_char,
        }
    }
}

/// Jack language token types.
///
/// Integer constants are kept unchecked here; range validation happens when
/// the constant is lowered to a `push constant`.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Keyword(Keyword),
    Symbol(char),
    IntegerConstant(u32),
    StringConstant(String),
    Identifier(String),
}

impl Token {
    /// Source text of the token (string constants without their quotes).
    pub fn text(&self) -> String {
        match self {
            Token::Keyword(k) => k.as_str().to_string(),
            Token::Symbol(c) => c.to_string(),
            Token::IntegerConstant(n) => n.to_string(),
            Token::StringConstant(s) => s.clone(),
            Token::Identifier(s) => s.clone(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(k) => write!(f, "keyword '{}'", k.as_str()),
            Token::Symbol(c) => write!(f, "symbol '{}'", c),
            Token::IntegerConstant(n) => write!(f, "integer {}", n),
            Token::StringConstant(s) => write!(f, "string \"{}\"", s),
            Token::Identifier(s) => write!(f, "identifier '{}'", s),
        }
    }
}

/// Jack language keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Class,
    Constructor,
    Function,
    Method,
    Field,
    Static,
    Var,
    Int,
    Char,
    Boolean,
    Void,
    True,
    False,
    Null,
    This,
    Let,
    Do,
    If,
    Else,
    While,
    Return,
}

impl Keyword {
    /// Try to parse a string as a keyword.
    pub fn parse_keyword(s: &str) -> Option<Self> {
        match s {
            "class" => Some(Keyword::Class),
            "constructor" => Some(Keyword::Constructor),
            "function" => Some(Keyword::Function),
            "method" => Some(Keyword::Method),
            "field" => Some(Keyword::Field),
            "static" => Some(Keyword::Static),
            "var" => Some(Keyword::Var),
            "int" => Some(Keyword::Int),
            "char" => Some(Keyword::Char),
            "boolean" => Some(Keyword::Boolean),
            "void" => Some(Keyword::Void),
            "true" => Some(Keyword::True),
            "false" => Some(Keyword::False),
            "null" => Some(Keyword::Null),
            "this" => Some(Keyword::This),
            "let" => Some(Keyword::Let),
            "do" => Some(Keyword::Do),
            "if" => Some(Keyword::If),
            "else" => Some(Keyword::Else),
            "while" => Some(Keyword::While),
            "return" => Some(Keyword::Return),
            _ => None,
        }
    }

    /// Returns the string representation of the keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Class => "class",
            Keyword::Constructor => "constructor",
            Keyword::Function => "function",
            Keyword::Method => "method",
            Keyword::Field => "field",
            Keyword::Static => "static",
            Keyword::Var => "var",
            Keyword::Int => "int",
            Keyword::Char => "char",
            Keyword::Boolean => "boolean",
            Keyword::Void => "void",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Null => "null",
            Keyword::This => "this",
            Keyword::Let => "let",
            Keyword::Do => "do",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::While => "while",
            Keyword::Return => "return",
        }
    }

    /// `true`, `false`, `null` or `this`.
    pub fn is_constant(self) -> bool {
        matches!(
            self,
            Keyword::True | Keyword::False | Keyword::Null | Keyword::This
        )
    }
}

/// Jack language symbols.
pub const SYMBOLS: &[char] = &[
    '{', '}', '(', ')', '[', ']', '.', ',', ';', '+', '-', '*', '/', '&', '|', '<', '>', '=', '~',
];

/// Binary operators accepted between terms of an expression.
pub const BINARY_OPS: &[char] = &['+', '-', '*', '/', '&', '|', '<', '>', '='];

/// Check if a character is a Jack symbol.
pub fn is_symbol(c: char) -> bool {
    SYMBOLS.contains(&c)
}

/// Check if a character is a binary operator.
pub fn is_binary_op(c: char) -> bool {
    BINARY_OPS.contains(&c)
}
