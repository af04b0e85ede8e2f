//! Pull-based lexical analyzer for the Jack language.
//!
//! Tokens are produced one at a time on demand. Whitespace and comments are
//! skipped before every token and never surface to the parser.

use crate::error::CompileError;
use crate::token::{Keyword, Span, SpannedToken, Token, is_symbol};

/// Jack language tokenizer with a single token of lookahead.
pub struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    byte_offset: usize,
    line: usize,
    column: usize,
    lookahead: Option<SpannedToken>,
}

impl Tokenizer {
    /// Create a new tokenizer for the given input.
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            byte_offset: 0,
            line: 1,
            column: 1,
            lookahead: None,
        }
    }

    /// Return the next token without consuming it, or `None` at end of input.
    pub fn peek(&mut self) -> Result<Option<&SpannedToken>, CompileError> {
        if self.lookahead.is_none() {
            self.lookahead = self.scan()?;
        }
        Ok(self.lookahead.as_ref())
    }

    /// Consume the next token. Running out of input is a syntax error.
    pub fn next(&mut self) -> Result<SpannedToken, CompileError> {
        self.take()?
            .ok_or_else(|| CompileError::syntax(self.end_span(), "unexpected end of input"))
    }

    /// Consume the next token, failing unless it equals `expected`.
    pub fn eat(&mut self, expected: &Token) -> Result<SpannedToken, CompileError> {
        let Some(spanned) = self.take()? else {
            return Err(CompileError::syntax_expected(
                self.end_span(),
                format!("expected {}, got end of input", expected),
                vec![expected.text()],
            ));
        };
        if &spanned.token == expected {
            Ok(spanned)
        } else {
            Err(CompileError::syntax_expected(
                spanned.span.clone(),
                format!("expected {}, got {}", expected, spanned.token),
                vec![expected.text()],
            ))
        }
    }

    /// Consume an identifier and return its name with its span.
    pub fn eat_identifier(&mut self) -> Result<(String, Span), CompileError> {
        let Some(spanned) = self.take()? else {
            return Err(CompileError::syntax_expected(
                self.end_span(),
                "expected identifier, got end of input",
                vec!["identifier".to_string()],
            ));
        };
        match spanned.token {
            Token::Identifier(name) => Ok((name, spanned.span)),
            other => Err(CompileError::syntax_expected(
                spanned.span,
                format!("expected identifier, got {}", other),
                vec!["identifier".to_string()],
            )),
        }
    }

    /// Remove the buffered lookahead, scanning a fresh token if none is buffered.
    fn take(&mut self) -> Result<Option<SpannedToken>, CompileError> {
        match self.lookahead.take() {
            Some(token) => Ok(Some(token)),
            None => self.scan(),
        }
    }

    /// Span pointing just past the last character of input.
    pub fn end_span(&self) -> Span {
        Span::new(self.byte_offset, self.byte_offset, self.line, self.column)
    }

    /// Check if we've reached the end of input.
    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    /// Peek at the current character.
    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// Peek at the character after the current one.
    fn peek_next_char(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    /// Advance to the next character, updating byte offset incrementally.
    fn advance(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += 1;
        self.byte_offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Skip whitespace and comments.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while let Some(c) = self.peek_char() {
                if c.is_whitespace() {
                    self.advance();
                } else {
                    break;
                }
            }

            if self.peek_char() == Some('/') {
                if self.peek_next_char() == Some('/') {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                    continue;
                } else if self.peek_next_char() == Some('*') {
                    self.advance(); // /
                    self.advance(); // *
                    while !self.is_at_end() {
                        if self.peek_char() == Some('*') && self.peek_next_char() == Some('/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                    continue;
                }
            }

            break;
        }
    }

    /// Scan the next token from the raw input.
    fn scan(&mut self) -> Result<Option<SpannedToken>, CompileError> {
        self.skip_whitespace_and_comments();

        let start_pos = self.byte_offset;
        let start_line = self.line;
        let start_column = self.column;

        let Some(c) = self.peek_char() else {
            return Ok(None);
        };

        let token = if c.is_alphabetic() || c == '_' {
            self.read_word()
        } else if is_symbol(c) {
            self.advance();
            Token::Symbol(c)
        } else if c.is_ascii_digit() {
            self.read_integer()
        } else if c == '"' {
            self.read_string(start_pos, start_line, start_column)?
        } else {
            self.advance();
            let span = Span::new(start_pos, self.byte_offset, start_line, start_column);
            return Err(CompileError::lexical(
                span,
                format!("unexpected character '{}'", c),
            ));
        };

        let span = Span::new(start_pos, self.byte_offset, start_line, start_column);
        self.skip_whitespace_and_comments();
        Ok(Some(SpannedToken::new(token, span, self.peek_char())))
    }

    /// Read an integer constant. Range is checked later, at lowering time.
    fn read_integer(&mut self) -> Token {
        let mut value: u32 = 0;

        while let Some(c) = self.peek_char() {
            match c.to_digit(10) {
                Some(digit) => {
                    self.advance();
                    value = value.saturating_mul(10).saturating_add(digit);
                }
                None => break,
            }
        }

        Token::IntegerConstant(value)
    }

    /// Read a string constant; the quotes are not part of the value.
    fn read_string(
        &mut self,
        start_pos: usize,
        start_line: usize,
        start_column: usize,
    ) -> Result<Token, CompileError> {
        self.advance(); // Opening quote

        let mut value = String::new();

        while let Some(c) = self.peek_char() {
            match c {
                '"' => {
                    self.advance();
                    return Ok(Token::StringConstant(value));
                }
                '\n' => break,
                _ => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        let span = Span::new(start_pos, self.byte_offset, start_line, start_column);
        Err(CompileError::lexical(span, "unterminated string constant"))
    }

    /// Read a keyword or identifier. Keywords only match whole words.
    fn read_word(&mut self) -> Token {
        let mut value = String::new();

        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' {
                value.push(c);
                self.advance();
            } else {
                break;
            }
        }

        match Keyword::parse_keyword(&value) {
            Some(keyword) => Token::Keyword(keyword),
            None => Token::Identifier(value),
        }
    }
}
