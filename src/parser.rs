//! Single-pass recursive descent compiler for the Jack language.
//!
//! Each grammar rule has one routine. Routines look at a single token of
//! lookahead, consume what they recognise and emit VM code immediately; no
//! syntax tree is built. Any error aborts the whole class.

use crate::emitter::{Emitter, Parameter, check_constant};
use crate::error::CompileError;
use crate::symbol_table::{SymbolKind, VarType};
use crate::token::{Keyword, Span, SpannedToken, Token, is_binary_op};
use crate::tokenizer::Tokenizer;
use crate::vm_writer::VMWriter;

/// Maximum nesting of expressions and statement blocks.
/// Prevents stack overflow on pathological input (e.g., `(((((...)))))`).
const MAX_DEPTH: usize = 64;

/// Kind of the subroutine being compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubroutineKind {
    Constructor,
    Function,
    Method,
}

#[derive(Debug, Clone, Copy)]
struct SubroutineContext {
    kind: SubroutineKind,
    is_void: bool,
}

/// Compilation context for one class: token stream, emitter, label counters.
pub struct Parser {
    tokens: Tokenizer,
    emitter: Emitter,
    class_name: String,
    if_counter: u32,
    while_counter: u32,
    subroutine: Option<SubroutineContext>,
    depth: usize,
}

impl Parser {
    /// Create a parser over one compilation unit.
    pub fn new(source: &str) -> Self {
        Self {
            tokens: Tokenizer::new(source),
            emitter: Emitter::new(),
            class_name: String::new(),
            if_counter: 0,
            while_counter: 0,
            subroutine: None,
            depth: 0,
        }
    }

    /// Name of the class, once its header has been read.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Instructions emitted so far. After a failure this is the partial output.
    pub fn lines(&self) -> &[String] {
        self.emitter.lines()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.into_writer().into_lines()
    }

    /// Consume the parser and return the instruction sink.
    pub fn into_writer(self) -> VMWriter {
        self.emitter.into_writer()
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    fn peek_keyword(&mut self) -> Result<Option<Keyword>, CompileError> {
        Ok(match self.tokens.peek()? {
            Some(SpannedToken {
                token: Token::Keyword(k),
                ..
            }) => Some(*k),
            _ => None,
        })
    }

    fn peek_symbol(&mut self) -> Result<Option<char>, CompileError> {
        Ok(match self.tokens.peek()? {
            Some(SpannedToken {
                token: Token::Symbol(c),
                ..
            }) => Some(*c),
            _ => None,
        })
    }

    fn eat_symbol(&mut self, symbol: char) -> Result<Span, CompileError> {
        Ok(self.tokens.eat(&Token::Symbol(symbol))?.span)
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> Result<Span, CompileError> {
        Ok(self.tokens.eat(&Token::Keyword(keyword))?.span)
    }

    fn unexpected(&self, got: Option<SpannedToken>, what: &str, expected: &[&str]) -> CompileError {
        let (span, got) = match got {
            Some(t) => (t.span, t.token.to_string()),
            None => (self.tokens.end_span(), "end of input".to_string()),
        };
        CompileError::syntax_expected(
            span,
            format!("expected {}, got {}", what, got),
            expected.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Open one nesting level at `open`, the token that starts it.
    fn enter(&mut self, open: &Span) -> Result<(), CompileError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CompileError::syntax(
                open.clone(),
                format!("nesting deeper than {} levels", MAX_DEPTH),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // ========================================================================
    // Program structure
    // ========================================================================

    /// class: 'class' className '{' classVarDec* subroutineDec* '}'
    pub fn compile_class(&mut self) -> Result<(), CompileError> {
        self.eat_keyword(Keyword::Class)?;
        let (name, _) = self.tokens.eat_identifier()?;
        self.class_name = name;
        self.eat_symbol('{')?;

        while matches!(self.peek_keyword()?, Some(Keyword::Static | Keyword::Field)) {
            self.compile_class_var_dec()?;
        }

        while matches!(
            self.peek_keyword()?,
            Some(Keyword::Constructor | Keyword::Function | Keyword::Method)
        ) {
            self.compile_subroutine_dec()?;
        }

        self.eat_symbol('}')?;

        if let Some(extra) = self.tokens.peek()?.cloned() {
            return Err(self.unexpected(Some(extra), "end of input", &[]));
        }
        Ok(())
    }

    /// classVarDec: ('static' | 'field') type varName (',' varName)* ';'
    fn compile_class_var_dec(&mut self) -> Result<(), CompileError> {
        let kind = match self.tokens.next()?.token {
            Token::Keyword(Keyword::Static) => SymbolKind::Static,
            _ => SymbolKind::Field,
        };
        self.compile_var_names(kind)
    }

    /// type varName (',' varName)* ';'  -- each name is registered as soon as it is read.
    fn compile_var_names(&mut self, kind: SymbolKind) -> Result<(), CompileError> {
        let var_type = self.compile_type()?;
        loop {
            let (name, span) = self.tokens.eat_identifier()?;
            self.emitter
                .declare_variable(&name, var_type.clone(), kind, span)?;
            if self.peek_symbol()? != Some(',') {
                break;
            }
            self.eat_symbol(',')?;
        }
        self.eat_symbol(';')?;
        Ok(())
    }

    /// type: 'int' | 'char' | 'boolean' | className
    fn compile_type(&mut self) -> Result<VarType, CompileError> {
        let token = self.tokens.next()?;
        let var_type = match &token.token {
            Token::Keyword(Keyword::Int) => Some(VarType::Int),
            Token::Keyword(Keyword::Char) => Some(VarType::Char),
            Token::Keyword(Keyword::Boolean) => Some(VarType::Boolean),
            Token::Identifier(name) => Some(VarType::ClassName(name.clone())),
            _ => None,
        };
        var_type.ok_or_else(|| {
            self.unexpected(
                Some(token),
                "type (int, char, boolean, or class name)",
                &["int", "char", "boolean", "identifier"],
            )
        })
    }

    /// subroutineDec: ('constructor'|'function'|'method') ('void'|type) subroutineName
    ///                '(' parameterList ')' subroutineBody
    fn compile_subroutine_dec(&mut self) -> Result<(), CompileError> {
        let start = self.tokens.next()?;
        let kind = match start.token {
            Token::Keyword(Keyword::Constructor) => SubroutineKind::Constructor,
            Token::Keyword(Keyword::Method) => SubroutineKind::Method,
            _ => SubroutineKind::Function,
        };

        let is_void = if self.peek_keyword()? == Some(Keyword::Void) {
            self.tokens.next()?;
            true
        } else {
            self.compile_type()?;
            false
        };

        let (name, _) = self.tokens.eat_identifier()?;
        let qualified_name = format!("{}.{}", self.class_name, name);

        self.eat_symbol('(')?;
        let mut args = Vec::new();
        if kind == SubroutineKind::Method {
            args.push(Parameter {
                name: "this".to_string(),
                var_type: VarType::ClassName(self.class_name.clone()),
                span: start.span,
            });
        }
        self.compile_parameter_list(&mut args)?;
        self.eat_symbol(')')?;

        self.emitter.start_subroutine();
        self.subroutine = Some(SubroutineContext { kind, is_void });
        self.compile_subroutine_body(&qualified_name, &args, kind)?;
        self.subroutine = None;
        Ok(())
    }

    /// parameterList: ((type varName) (',' type varName)*)?
    fn compile_parameter_list(&mut self, args: &mut Vec<Parameter>) -> Result<(), CompileError> {
        if self.peek_symbol()? == Some(')') {
            return Ok(());
        }
        loop {
            let var_type = self.compile_type()?;
            let (name, span) = self.tokens.eat_identifier()?;
            args.push(Parameter {
                name,
                var_type,
                span,
            });
            if self.peek_symbol()? != Some(',') {
                return Ok(());
            }
            self.eat_symbol(',')?;
        }
    }

    /// subroutineBody: '{' varDec* statements '}'
    ///
    /// All `var` declarations are read before the function header is emitted,
    /// because the header carries the local count.
    fn compile_subroutine_body(
        &mut self,
        qualified_name: &str,
        args: &[Parameter],
        kind: SubroutineKind,
    ) -> Result<(), CompileError> {
        let open = self.eat_symbol('{')?;
        while self.peek_keyword()? == Some(Keyword::Var) {
            self.compile_var_dec()?;
        }

        let local_count = self.emitter.local_count();
        self.emitter
            .declare_function(qualified_name, args, local_count)?;
        match kind {
            SubroutineKind::Method => self.emitter.set_this(),
            SubroutineKind::Constructor => self.emitter.constructor_alloc(),
            SubroutineKind::Function => {}
        }
        log::debug!(
            "{}: {:?} with {} argument(s), {} local(s)",
            qualified_name,
            kind,
            args.len(),
            local_count
        );

        self.compile_statements(&open)?;
        self.eat_symbol('}')?;
        Ok(())
    }

    /// varDec: 'var' type varName (',' varName)* ';'
    fn compile_var_dec(&mut self) -> Result<(), CompileError> {
        self.eat_keyword(Keyword::Var)?;
        self.compile_var_names(SymbolKind::Local)
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// statements: statement*
    fn compile_statements(&mut self, open: &Span) -> Result<(), CompileError> {
        self.enter(open)?;
        loop {
            match self.peek_keyword()? {
                Some(Keyword::Let) => self.compile_let()?,
                Some(Keyword::If) => self.compile_if()?,
                Some(Keyword::While) => self.compile_while()?,
                Some(Keyword::Do) => self.compile_do()?,
                Some(Keyword::Return) => self.compile_return()?,
                _ => break,
            }
        }
        self.leave();
        Ok(())
    }

    /// letStatement: 'let' varName ('[' expression ']')? '=' expression ';'
    fn compile_let(&mut self) -> Result<(), CompileError> {
        self.eat_keyword(Keyword::Let)?;
        let (name, span) = self.tokens.eat_identifier()?;

        if self.peek_symbol()? == Some('[') {
            // Address first, then the value, then store through `that`.
            let bracket = self.eat_symbol('[')?;
            self.emitter.push_variable(&name, &span)?;
            self.compile_expression()?;
            self.eat_symbol(']')?;
            self.emitter.arithmetic('+', false, &bracket)?;

            self.eat_symbol('=')?;
            self.compile_expression()?;
            self.eat_symbol(';')?;
            self.emitter.array_store();
        } else {
            self.eat_symbol('=')?;
            self.compile_expression()?;
            self.eat_symbol(';')?;
            self.emitter.pop_variable(&name, &span)?;
        }
        Ok(())
    }

    /// ifStatement: 'if' '(' expression ')' '{' statements '}' ('else' '{' statements '}')?
    fn compile_if(&mut self) -> Result<(), CompileError> {
        let span = self.eat_keyword(Keyword::If)?;
        let n = self.if_counter;
        self.if_counter += 1;
        let false_label = format!("IF_FALSE{}", n);
        let end_label = format!("IF_END{}", n);

        self.eat_symbol('(')?;
        self.compile_expression()?;
        self.eat_symbol(')')?;
        self.emitter.arithmetic('~', true, &span)?;
        self.emitter.if_goto(&false_label);

        let open = self.eat_symbol('{')?;
        self.compile_statements(&open)?;
        self.eat_symbol('}')?;
        self.emitter.goto(&end_label);

        self.emitter.label(&false_label);
        if self.peek_keyword()? == Some(Keyword::Else) {
            self.eat_keyword(Keyword::Else)?;
            let open = self.eat_symbol('{')?;
            self.compile_statements(&open)?;
            self.eat_symbol('}')?;
        }
        self.emitter.label(&end_label);
        Ok(())
    }

    /// whileStatement: 'while' '(' expression ')' '{' statements '}'
    fn compile_while(&mut self) -> Result<(), CompileError> {
        let span = self.eat_keyword(Keyword::While)?;
        let n = self.while_counter;
        self.while_counter += 1;
        let exp_label = format!("WHILE_EXP{}", n);
        let end_label = format!("WHILE_END{}", n);

        self.emitter.label(&exp_label);
        self.eat_symbol('(')?;
        self.compile_expression()?;
        self.eat_symbol(')')?;
        self.emitter.arithmetic('~', true, &span)?;
        self.emitter.if_goto(&end_label);

        let open = self.eat_symbol('{')?;
        self.compile_statements(&open)?;
        self.eat_symbol('}')?;
        self.emitter.goto(&exp_label);
        self.emitter.label(&end_label);
        Ok(())
    }

    /// doStatement: 'do' subroutineCall ';'
    fn compile_do(&mut self) -> Result<(), CompileError> {
        self.eat_keyword(Keyword::Do)?;
        self.compile_subroutine_call()?;
        self.eat_symbol(';')?;
        self.emitter.discard();
        Ok(())
    }

    /// returnStatement: 'return' expression? ';'
    ///
    /// Every call returns a value, so void subroutines return constant 0.
    fn compile_return(&mut self) -> Result<(), CompileError> {
        self.eat_keyword(Keyword::Return)?;
        let has_value = self.peek_symbol()? != Some(';');
        if has_value {
            self.compile_expression()?;
        }
        self.eat_symbol(';')?;

        let is_void = self.subroutine.is_some_and(|s| s.is_void);
        if is_void {
            if has_value {
                self.emitter.discard();
            }
            self.emitter.push_int_constant(0);
        }
        self.emitter.emit_return();
        Ok(())
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// expression: term (op term)*  -- left to right, no precedence.
    fn compile_expression(&mut self) -> Result<(), CompileError> {
        self.compile_term()?;
        while let Some(op) = self.peek_symbol()?.filter(|c| is_binary_op(*c)) {
            let span = self.eat_symbol(op)?;
            self.compile_term()?;
            self.emitter.arithmetic(op, false, &span)?;
        }
        Ok(())
    }

    /// An expression inside brackets or parentheses opened at `open`.
    fn compile_nested_expression(&mut self, open: &Span) -> Result<(), CompileError> {
        self.enter(open)?;
        self.compile_expression()?;
        self.leave();
        Ok(())
    }

    /// term: integerConstant | stringConstant | keywordConstant | varName
    ///     | varName '[' expression ']' | subroutineCall | '(' expression ')' | unaryOp term
    fn compile_term(&mut self) -> Result<(), CompileError> {
        let Some(current) = self.tokens.peek()?.cloned() else {
            return Err(self.unexpected(None, "term", &["term"]));
        };
        let span = current.span.clone();

        match current.token {
            Token::IntegerConstant(value) => {
                self.tokens.next()?;
                let value = check_constant(value, &span)?;
                self.emitter.push_int_constant(value);
            }
            Token::StringConstant(s) => {
                self.tokens.next()?;
                self.emitter.push_string_constant(&s, &span)?;
            }
            Token::Keyword(k) if k.is_constant() => {
                self.tokens.next()?;
                self.emitter.push_keyword_constant(k, &span)?;
            }
            Token::Identifier(name) => match current.next_char {
                Some('(' | '.') => self.compile_subroutine_call()?,
                Some('[') => {
                    self.tokens.next()?;
                    let bracket = self.eat_symbol('[')?;
                    self.emitter.push_variable(&name, &span)?;
                    self.compile_nested_expression(&bracket)?;
                    self.eat_symbol(']')?;
                    self.emitter.arithmetic('+', false, &bracket)?;
                    self.emitter.array_load();
                }
                _ => {
                    self.tokens.next()?;
                    self.emitter.push_variable(&name, &span)?;
                }
            },
            Token::Symbol(op @ ('-' | '~')) => {
                self.tokens.next()?;
                self.enter(&span)?;
                self.compile_term()?;
                self.leave();
                self.emitter.arithmetic(op, true, &span)?;
            }
            Token::Symbol('(') => {
                self.tokens.next()?;
                self.compile_nested_expression(&span)?;
                self.eat_symbol(')')?;
            }
            _ => return Err(self.unexpected(Some(current), "term", &["term"])),
        }
        Ok(())
    }

    /// subroutineCall: subroutineName '(' expressionList ')'
    ///               | (className | varName) '.' subroutineName '(' expressionList ')'
    fn compile_subroutine_call(&mut self) -> Result<(), CompileError> {
        let (first, span) = self.tokens.eat_identifier()?;

        let (qualified_name, receiver) = if self.peek_symbol()? == Some('.') {
            self.eat_symbol('.')?;
            let (name, _) = self.tokens.eat_identifier()?;
            let object_class = self
                .emitter
                .lookup(&first)
                .and_then(|symbol| symbol.symbol_type.class_name())
                .map(str::to_string);
            match object_class {
                Some(class) => {
                    self.emitter.push_variable(&first, &span)?;
                    (format!("{}.{}", class, name), 1)
                }
                None => (format!("{}.{}", first, name), 0),
            }
        } else {
            if self
                .subroutine
                .is_some_and(|s| s.kind == SubroutineKind::Function)
            {
                return Err(CompileError::MethodCallInFunction { name: first, span });
            }
            self.emitter.push_keyword_constant(Keyword::This, &span)?;
            (format!("{}.{}", self.class_name, first), 1)
        };

        let open = self.eat_symbol('(')?;
        self.enter(&open)?;
        let arg_count = self.compile_expression_list()?;
        self.leave();
        self.eat_symbol(')')?;
        let total = arg_count
            .checked_add(receiver)
            .ok_or_else(|| CompileError::limit_exceeded("call arguments", span))?;
        self.emitter.call(&qualified_name, total);
        Ok(())
    }

    /// expressionList: (expression (',' expression)*)?
    fn compile_expression_list(&mut self) -> Result<u16, CompileError> {
        if self.peek_symbol()? == Some(')') {
            return Ok(0);
        }
        let mut count: u16 = 1;
        self.compile_expression()?;
        while self.peek_symbol()? == Some(',') {
            let comma = self.eat_symbol(',')?;
            count = count
                .checked_add(1)
                .ok_or_else(|| CompileError::limit_exceeded("call arguments", comma))?;
            self.compile_expression()?;
        }
        Ok(count)
    }
}
