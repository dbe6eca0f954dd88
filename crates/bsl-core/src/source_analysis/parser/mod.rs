// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Recursive descent parser for BSL source code.
//!
//! The parser works on the output of the region engine: only tokens on the
//! [`Channel::Visible`](crate::source_analysis::Channel) channel take part in
//! the grammar, so code inside dead `#Если` branches and `#Удаление` blocks
//! never reaches it, and `#Вставка` code reads as if it had always been
//! there.
//!
//! # Design
//!
//! - **First error wins** - parsing stops at the first syntax error; the
//!   caller decides how to recover
//! - **Precise spans** - every error points at the offending token
//! - **Directives at statement boundaries** - a live directive that sits
//!   between two statements becomes a [`Statement::Preprocessor`]; one that
//!   sits inside an expression or declaration is invisible to the grammar
//!
//! # Operator Precedence (Pratt Parsing)
//!
//! | Level | Operators | Associativity |
//! |-------|-----------|---------------|
//! | 10 | `ИЛИ` | Left |
//! | 20 | `И` | Left |
//! | 30 | `НЕ` (prefix) | - |
//! | 40 | `<` `<=` `>` `>=` `=` `<>` | Left |
//! | 50 | `+` `-` | Left |
//! | 60 | `*` `/` `%` | Left |
//!
//! Unary `+`/`-` binds tighter than any binary operator, and postfix
//! modifiers (`.Имя`, `[индекс]`, `(аргументы)`) tighter still.

use std::collections::HashSet;

use ecow::{EcoString, eco_format};

use crate::ast::{Directive, File, Shebang};
use crate::source_analysis::preprocessor::Preprocessed;
use crate::source_analysis::{Keyword, LineColumn, Span, SyntaxError, Token, TokenKind};

// Submodules with additional impl blocks for Parser
mod declarations;
mod expressions;
mod statements;


/// Result type of every parsing routine.
pub(super) type ParseResult<T> = Result<T, SyntaxError>;

// ============================================================================
// Pratt Parsing for Binary Operator Precedence
// ============================================================================

/// Binding power for binary operators (Pratt parsing).
///
/// Higher values bind tighter. All BSL binary operators are
/// left-associative: `left_bp == right_bp - 1`.
#[derive(Debug, Clone, Copy)]
pub(super) struct BindingPower {
    /// Left binding power (how tightly this operator binds to its left operand).
    pub(super) left: u8,
    /// Right binding power (how tightly this operator binds to its right operand).
    pub(super) right: u8,
}

impl BindingPower {
    /// Creates a left-associative binding power.
    const fn left_assoc(precedence: u8) -> Self {
        Self {
            left: precedence,
            right: precedence + 1,
        }
    }
}

/// Binding power of the prefix `НЕ`: its operand stops at `И` and `ИЛИ`
/// but swallows comparisons.
pub(super) const NOT_BINDING_POWER: u8 = 31;

/// Gets the operator and binding power for a binary operator token.
///
/// Returns `None` for any other token, which ends the expression.
pub(super) fn binary_binding_power(kind: &TokenKind) -> Option<(crate::ast::BinaryOp, BindingPower)> {
    use crate::ast::BinaryOp;

    let (op, precedence) = match kind {
        TokenKind::Keyword(Keyword::Or) => (BinaryOp::Or, 10),
        TokenKind::Keyword(Keyword::And) => (BinaryOp::And, 20),

        TokenKind::Equal => (BinaryOp::Equal, 40),
        TokenKind::NotEqual => (BinaryOp::NotEqual, 40),
        TokenKind::Less => (BinaryOp::Less, 40),
        TokenKind::LessEqual => (BinaryOp::LessEqual, 40),
        TokenKind::Greater => (BinaryOp::Greater, 40),
        TokenKind::GreaterEqual => (BinaryOp::GreaterEqual, 40),

        TokenKind::Plus => (BinaryOp::Add, 50),
        TokenKind::Minus => (BinaryOp::Subtract, 50),

        TokenKind::Star => (BinaryOp::Multiply, 60),
        TokenKind::Slash => (BinaryOp::Divide, 60),
        TokenKind::Percent => (BinaryOp::Modulo, 60),

        _ => return None,
    };
    Some((op, BindingPower::left_assoc(precedence)))
}

/// Parses the visible tokens of a preprocessed file into a [`File`].
///
/// # Errors
///
/// Returns the first [`SyntaxError`].
pub(super) fn parse_file(preprocessed: &Preprocessed) -> ParseResult<File> {
    let mut parser = Parser::new(preprocessed);
    parser.parse_file()
}

/// Maximum nesting depth of statements and expressions before the parser
/// bails out.
///
/// Each nesting level uses several stack frames through the parser call
/// chain. `stacker::maybe_grow` extends the stack on the heap as a second
/// line of defence.
const MAX_NESTING_DEPTH: usize = 64;

/// What the parser knows about the subroutine it is inside.
#[derive(Debug, Default)]
pub(super) struct SubroutineContext {
    /// Declared `Асинх`.
    pub(super) is_async: bool,
    /// Parameter names, lowercased.
    pub(super) params: Vec<String>,
}

impl SubroutineContext {
    pub(super) fn has_param(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.params.iter().any(|p| *p == name)
    }
}

/// The parser state.
pub(super) struct Parser {
    /// Visible tokens, always terminated by `Eof`.
    pub(super) tokens: Vec<Token>,
    /// Current token index.
    pub(super) current: usize,
    /// Live directives keyed by the index of the visible token they precede.
    directives: Vec<(usize, Directive)>,
    /// First directive not yet taken or skipped.
    next_directive: usize,
    /// Current nesting depth (guards against stack overflow).
    nesting_depth: usize,
    /// The enclosing subroutine, if any.
    pub(super) context: SubroutineContext,
    /// Token indices where an await expression has already failed to parse.
    pub(super) failed_awaits: HashSet<usize>,
}

impl Parser {
    fn new(preprocessed: &Preprocessed) -> Self {
        let mut tokens: Vec<Token> = Vec::with_capacity(preprocessed.tokens.len());
        // visible_before[i] = number of visible tokens before full-stream index i
        let mut visible_before = Vec::with_capacity(preprocessed.tokens.len() + 1);
        for token in &preprocessed.tokens {
            visible_before.push(tokens.len());
            if token.is_visible() && !token.kind().is_eof() {
                tokens.push(token.clone());
            }
        }
        visible_before.push(tokens.len());
        tokens.push(eof_token(&preprocessed.tokens));

        let directives = preprocessed
            .directives
            .iter()
            .map(|anchored| {
                let anchor = visible_before
                    .get(anchored.token_index)
                    .copied()
                    .unwrap_or(tokens.len() - 1);
                (anchor, anchored.directive.clone())
            })
            .collect();

        Self {
            tokens,
            current: 0,
            directives,
            next_directive: 0,
            nesting_depth: 0,
            context: SubroutineContext::default(),
            failed_awaits: HashSet::new(),
        }
    }

    // ========================================================================
    // Token Management
    // ========================================================================

    /// Returns the current token.
    pub(super) fn current_token(&self) -> &Token {
        // The stream always ends with `Eof`, so it is never empty.
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    /// Returns the current token kind.
    pub(super) fn current_kind(&self) -> &TokenKind {
        self.current_token().kind()
    }

    /// Returns the kind of the token `offset` positions ahead.
    pub(super) fn peek_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.current + offset).map(Token::kind)
    }

    /// Peeks at the next token kind.
    pub(super) fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek_at(1)
    }

    /// Checks if we're at the end of input.
    pub(super) fn is_at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    /// Advances to the next token and returns the previous one.
    pub(super) fn advance(&mut self) -> Token {
        let token = self.current_token().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    /// Checks if the current token has the same variant as the given kind.
    pub(super) fn check(&self, kind: &TokenKind) -> bool {
        if self.is_at_end() {
            return false;
        }
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    /// Checks if the current token is the given keyword.
    pub(super) fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current_kind().is_keyword(keyword)
    }

    /// Consumes the current token if it matches the given kind.
    pub(super) fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes the current token if it is the given keyword.
    pub(super) fn match_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expects the current token to match the given kind, advancing if it does.
    pub(super) fn expect(&mut self, kind: &TokenKind) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_expected(&[eco_format!("`{kind}`")]))
        }
    }

    /// Expects the given keyword.
    pub(super) fn expect_keyword(&mut self, keyword: Keyword) -> ParseResult<Token> {
        if self.check_keyword(keyword) {
            Ok(self.advance())
        } else {
            Err(self.error_expected(&[eco_format!("`{keyword}`")]))
        }
    }

    /// Span of the most recently consumed token.
    pub(super) fn previous_span(&self) -> Span {
        self.current
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or_else(|| self.current_token().span(), Token::span)
    }

    // ========================================================================
    // Errors & Nesting
    // ========================================================================

    /// Builds an error at the current token.
    pub(super) fn error(&self, message: impl Into<EcoString>, expected: Vec<EcoString>) -> SyntaxError {
        let token = self.current_token();
        SyntaxError::new(
            message,
            expected,
            token.kind().describe(),
            token.span(),
            token.position(),
        )
    }

    /// Builds an "expected X, found Y" error at the current token.
    pub(super) fn error_expected(&self, expected: &[EcoString]) -> SyntaxError {
        let found = self.current_kind().describe();
        let message = match expected {
            [] => eco_format!("unexpected {found}"),
            [single] => eco_format!("expected {single}, found {found}"),
            many => eco_format!("expected one of {}, found {found}", many.join(", ")),
        };
        self.error(message, expected.to_vec())
    }

    /// Builds an error covering an already parsed construct.
    pub(super) fn error_at(&self, message: impl Into<EcoString>, span: Span) -> SyntaxError {
        let position = self
            .tokens
            .iter()
            .find(|t| t.span().start() == span.start())
            .map_or(LineColumn::START, Token::position);
        SyntaxError::new(message, Vec::new(), self.current_kind().describe(), span, position)
    }

    /// Runs `f` one nesting level deeper, growing the stack if needed.
    ///
    /// Fails with a [`SyntaxError`] past [`MAX_NESTING_DEPTH`] levels.
    pub(super) fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        // 32 KiB red zone, 256 KiB new segment.
        stacker::maybe_grow(32 * 1024, 256 * 1024, || {
            if self.nesting_depth >= MAX_NESTING_DEPTH {
                return Err(self.error(
                    format!("nesting is too deep (maximum {MAX_NESTING_DEPTH} levels)"),
                    Vec::new(),
                ));
            }
            self.nesting_depth += 1;
            let result = f(self);
            self.nesting_depth -= 1;
            result
        })
    }

    // ========================================================================
    // Directives
    // ========================================================================

    /// Takes the directives that sit right before the current token.
    ///
    /// Directives anchored before the current token were inside a construct
    /// that has already been parsed; they are skipped.
    pub(super) fn take_directives(&mut self) -> Vec<Directive> {
        let mut taken = Vec::new();
        while let Some((anchor, directive)) = self.directives.get(self.next_directive) {
            if *anchor > self.current {
                break;
            }
            if *anchor == self.current {
                taken.push(directive.clone());
            }
            self.next_directive += 1;
        }
        taken
    }

    // ========================================================================
    // File
    // ========================================================================

    /// `[Shebang] Directive* VarDeclaration* Subroutine* CodeBlock EOF`
    fn parse_file(&mut self) -> ParseResult<File> {
        let shebang = match self.current_kind() {
            TokenKind::Shebang(command) => {
                let shebang = Shebang {
                    command: command.clone(),
                    span: self.current_token().span(),
                };
                self.advance();
                Some(shebang)
            }
            _ => None,
        };

        let preprocessor = self.take_directives();

        let mut module_vars = Vec::new();
        while self.is_at_var_declaration() {
            module_vars.push(self.parse_var_declaration(true)?);
        }

        let mut subroutines = Vec::new();
        while self.is_at_subroutine() {
            subroutines.push(self.parse_subroutine()?);
        }

        let body = self.parse_block()?;
        if !self.is_at_end() {
            return Err(self.error_expected(&["end of file".into()]));
        }

        let end = self.current_token().span().end();
        Ok(File {
            shebang,
            preprocessor,
            directives: self.directives.iter().map(|(_, d)| d.clone()).collect(),
            module_vars,
            subroutines,
            body,
            span: Span::new(0, end),
        })
    }
}

/// The `Eof` token of a stream, or one synthesized after its last token.
fn eof_token(tokens: &[Token]) -> Token {
    if let Some(eof) = tokens.iter().rev().find(|t| t.kind().is_eof()) {
        return eof.clone();
    }
    let (end, position) = tokens
        .last()
        .map_or((0, LineColumn::START), |t| (t.span().end(), t.position()));
    Token::new(TokenKind::Eof, "", Span::new(end, end), position)
}
