// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lexical analysis for BSL source code.
//!
//! This module converts source text into a stream of [`Token`]s. The lexer
//! is hand-written and runs as an explicit two-state machine:
//!
//! - **Default mode** lexes ordinary code onto the [`Channel::Visible`] channel.
//! - **Directive mode** is entered on a `#` that starts a logical line and left
//!   at the end of that line. Its tokens go to [`Channel::Directive`]; literals
//!   and names are lexed by the same routines as in default mode.
//!
//! Comments (`//` to end of line) and whitespace produce no tokens. A leading
//! byte-order mark is skipped, but spans stay relative to the original text.
//!
//! # Multiline strings
//!
//! A string that reaches the end of its line becomes a `StringStart`; each
//! following line must continue it with `|` (a `StringPart`, or a
//! `StringTail` once the closing quote is found). Blank lines, comment lines
//! and directive lines may sit between the pieces, which is what lets
//! `#Удаление`/`#Вставка` markers split a string literal.
//!
//! # Example
//!
//! ```
//! use bsl_core::source_analysis::{Lexer, TokenKind};
//!
//! let tokens: Vec<_> = Lexer::new("А = 1;").collect::<Result<_, _>>().unwrap();
//! assert_eq!(tokens.len(), 4); // А, =, 1, ; (EOF excluded from iterator)
//! ```

use std::iter::Peekable;
use std::str::CharIndices;

use ecow::EcoString;

use super::{
    Channel, CompilerDirective, DirectiveKeyword, Keyword, LexError, LexErrorKind, LineColumn,
    Span, Token, TokenKind,
};

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Lexer state between tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Default,
    PreprocessorDirective,
}

/// A lexer that tokenizes BSL source code.
///
/// Implements [`Iterator`]; the stream ends after the last token before end
/// of file, or right after the first error.
pub struct Lexer<'src> {
    /// The source text being lexed.
    source: &'src str,
    /// Character iterator with byte positions.
    chars: Peekable<CharIndices<'src>>,
    /// Current byte position in source.
    position: usize,
    line: u32,
    column: u32,
    mode: Mode,
    /// No token has been emitted on the current line yet.
    at_line_start: bool,
    /// Byte offset where the file content starts (after a BOM).
    content_start: usize,
    /// The next directive-mode word names the directive.
    expect_directive_word: bool,
    /// The rest of the line is an `#Использовать` argument.
    expect_use_reference: bool,
    /// Start of an open multiline string literal.
    multiline_string: Option<(u32, LineColumn)>,
    finished: bool,
}

impl std::fmt::Debug for Lexer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lexer")
            .field("position", &self.position)
            .field("mode", &self.mode)
            .field("remaining", &self.source.get(self.position..).unwrap_or(""))
            .finish()
    }
}

impl<'src> Lexer<'src> {
    /// Creates a new lexer for the given source text.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        let mut lexer = Self {
            source,
            chars: source.char_indices().peekable(),
            position: 0,
            line: 1,
            column: 1,
            mode: Mode::Default,
            at_line_start: true,
            content_start: 0,
            expect_directive_word: false,
            expect_use_reference: false,
            multiline_string: None,
            finished: false,
        };
        if lexer.peek_char() == Some(BYTE_ORDER_MARK) {
            lexer.advance();
            lexer.column = 1;
            lexer.content_start = lexer.position;
        }
        lexer
    }

    /// Peeks at the next character without consuming it.
    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    /// Peeks `n+1` characters ahead without consuming (n=0 is same as `peek_char`).
    fn peek_char_n(&self, n: usize) -> Option<char> {
        let mut iter = self.chars.clone();
        for _ in 0..n {
            iter.next();
        }
        iter.next().map(|(_, c)| c)
    }

    /// Consumes the next character and returns it.
    fn advance(&mut self) -> Option<char> {
        let (pos, c) = self.chars.next()?;
        self.position = pos + c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Consumes characters while the predicate is true.
    fn advance_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.peek_char().is_some_and(&predicate) {
            self.advance();
        }
    }

    /// Returns the current byte position.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "source files over 4GB are not supported"
    )]
    fn current_position(&self) -> u32 {
        self.position as u32
    }

    fn line_column(&self) -> LineColumn {
        LineColumn::new(self.line, self.column)
    }

    /// Creates a span from start to current position.
    fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.current_position())
    }

    /// Extracts source text for a span.
    fn text_for(&self, span: Span) -> &'src str {
        &self.source[span.as_range()]
    }

    /// Resets per-line state after a line break.
    fn end_line(&mut self) {
        self.mode = Mode::Default;
        self.at_line_start = true;
        self.expect_directive_word = false;
        self.expect_use_reference = false;
    }

    /// Skips whitespace and `//` comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some('\n') => {
                    self.advance();
                    self.end_line();
                }
                Some(c) if c.is_whitespace() || c == BYTE_ORDER_MARK => {
                    self.advance();
                }
                Some('/') if self.peek_char_n(1) == Some('/') => {
                    self.advance_while(|c| c != '\n');
                }
                _ => break,
            }
        }
    }

    /// Lexes the next token, including the final `Eof`.
    fn lex_token(&mut self) -> Result<Token, LexError> {
        if self.position == self.content_start && self.source[self.position..].starts_with("#!")
        {
            return Ok(self.lex_shebang());
        }

        self.skip_trivia();
        let start = self.current_position();
        let position = self.line_column();

        let Some(c) = self.peek_char() else {
            if let Some((string_start, string_position)) = self.multiline_string {
                return Err(LexError::unterminated_string(
                    self.span_from(string_start),
                    string_position,
                ));
            }
            return Ok(Token::new(TokenKind::Eof, "", self.span_from(start), position));
        };

        let kind = match (self.mode, self.multiline_string) {
            (Mode::PreprocessorDirective, _) => self.lex_directive_token(c, start, position)?,
            (Mode::Default, None) => self.lex_default(c, start, position)?,
            (Mode::Default, Some((string_start, string_position))) => match c {
                '|' => self.lex_string_continuation(string_start, string_position)?,
                '#' if self.at_line_start => self.lex_hash(),
                _ => {
                    return Err(LexError::unterminated_string(
                        self.span_from(string_start),
                        string_position,
                    ));
                }
            },
        };

        let channel = if self.mode == Mode::PreprocessorDirective {
            Channel::Directive
        } else {
            Channel::Visible
        };
        self.at_line_start = false;

        let span = self.span_from(start);
        Ok(Token::new(kind, self.text_for(span), span, position).on_channel(channel))
    }

    /// Lexes `#!...` up to the end of the first line.
    fn lex_shebang(&mut self) -> Token {
        let start = self.current_position();
        let position = self.line_column();
        self.advance(); // #
        self.advance(); // !
        self.advance_while(|c| c != '\n' && c != '\r');
        let span = self.span_from(start);
        let text = self.text_for(span);
        self.at_line_start = false;
        Token::new(
            TokenKind::Shebang(EcoString::from(&text[2..])),
            text,
            span,
            position,
        )
    }

    /// Lexes a token in default (code) mode.
    fn lex_default(
        &mut self,
        c: char,
        start: u32,
        position: LineColumn,
    ) -> Result<TokenKind, LexError> {
        match c {
            '#' if self.at_line_start => Ok(self.lex_hash()),
            '&' => self.lex_ampersand(start, position),
            c if is_identifier_start(c) => {
                let word = self.lex_word();
                Ok(Keyword::from_word(word).map_or_else(
                    || TokenKind::Identifier(EcoString::from(word)),
                    TokenKind::Keyword,
                ))
            }
            _ => self.lex_common(c, start, position),
        }
    }

    /// Consumes a line-leading `#` and switches to directive mode.
    fn lex_hash(&mut self) -> TokenKind {
        self.advance();
        self.mode = Mode::PreprocessorDirective;
        self.expect_directive_word = true;
        TokenKind::Hash
    }

    /// Lexes a token on a directive line.
    fn lex_directive_token(
        &mut self,
        c: char,
        start: u32,
        position: LineColumn,
    ) -> Result<TokenKind, LexError> {
        if self.expect_use_reference {
            self.expect_use_reference = false;
            return self.lex_use_reference(c, start, position);
        }

        let directive_word = std::mem::take(&mut self.expect_directive_word);
        if !is_identifier_start(c) {
            return self.lex_common(c, start, position);
        }

        let word = self.lex_word();
        if directive_word {
            if let Some(directive) = DirectiveKeyword::from_word(word) {
                self.expect_use_reference = directive == DirectiveKeyword::Use;
                return Ok(TokenKind::Directive(directive));
            }
        }
        Ok(match Keyword::from_word(word) {
            Some(keyword @ (Keyword::Then | Keyword::And | Keyword::Or | Keyword::Not)) => {
                TokenKind::Keyword(keyword)
            }
            _ => TokenKind::Identifier(EcoString::from(word)),
        })
    }

    /// Lexes the argument of `#Использовать`: a quoted path or a
    /// whitespace-free run such as `lib-name` or `1lib`.
    fn lex_use_reference(
        &mut self,
        c: char,
        start: u32,
        position: LineColumn,
    ) -> Result<TokenKind, LexError> {
        if c == '"' {
            self.advance();
            let (content, closed) = self.lex_string_body();
            if !closed {
                return Err(LexError::unterminated_string(self.span_from(start), position));
            }
            return Ok(TokenKind::UseReference(content));
        }
        self.advance_while(|c| !c.is_whitespace());
        let text = self.text_for(self.span_from(start));
        Ok(TokenKind::UseReference(EcoString::from(text)))
    }

    /// Lexes literals, operators and punctuation, shared by both modes.
    fn lex_common(
        &mut self,
        c: char,
        start: u32,
        position: LineColumn,
    ) -> Result<TokenKind, LexError> {
        if c.is_ascii_digit() {
            return Ok(self.lex_number(start));
        }
        if c == '"' {
            return self.lex_string(start, position);
        }
        if c == '\'' {
            return self.lex_date(start, position);
        }

        self.advance();
        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '=' => TokenKind::Equal,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            '?' => TokenKind::Question,
            ':' => TokenKind::Colon,
            '~' => TokenKind::Tilde,
            '<' => match self.peek_char() {
                Some('=') => {
                    self.advance();
                    TokenKind::LessEqual
                }
                Some('>') => {
                    self.advance();
                    TokenKind::NotEqual
                }
                _ => TokenKind::Less,
            },
            '>' => {
                if self.peek_char() == Some('=') {
                    self.advance();
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            '#' => {
                return Err(LexError::new(
                    LexErrorKind::MisplacedDirective,
                    self.span_from(start),
                    position,
                ));
            }
            other => {
                return Err(LexError::unexpected_char(
                    other,
                    self.span_from(start),
                    position,
                ));
            }
        };
        Ok(kind)
    }

    /// Consumes an identifier-shaped word and returns its text.
    fn lex_word(&mut self) -> &'src str {
        let start = self.current_position();
        self.advance();
        self.advance_while(is_identifier_continue);
        self.text_for(self.span_from(start))
    }

    /// Lexes a number: `42`, `3.14`.
    fn lex_number(&mut self, start: u32) -> TokenKind {
        self.advance_while(|c| c.is_ascii_digit());
        if self.peek_char() == Some('.') && self.peek_char_n(1).is_some_and(|c| c.is_ascii_digit())
        {
            self.advance(); // .
            self.advance_while(|c| c.is_ascii_digit());
        }
        TokenKind::Number(EcoString::from(self.text_for(self.span_from(start))))
    }

    /// Lexes `&Name` as a compiler directive or an annotation.
    fn lex_ampersand(&mut self, start: u32, position: LineColumn) -> Result<TokenKind, LexError> {
        if !self.peek_char_n(1).is_some_and(is_identifier_start) {
            self.advance();
            return Err(LexError::unexpected_char('&', self.span_from(start), position));
        }
        self.advance(); // &
        let name = self.lex_word();
        Ok(CompilerDirective::from_name(name).map_or_else(
            || TokenKind::Annotation(EcoString::from(name)),
            TokenKind::CompilerDirective,
        ))
    }

    /// Lexes a string literal, opening a multiline string if the line ends first.
    fn lex_string(&mut self, start: u32, position: LineColumn) -> Result<TokenKind, LexError> {
        self.advance(); // opening quote
        let (content, closed) = self.lex_string_body();
        if closed {
            return Ok(TokenKind::String(content));
        }
        if self.mode == Mode::Default && self.peek_char().is_some() {
            self.multiline_string = Some((start, position));
            return Ok(TokenKind::StringStart(content));
        }
        Err(LexError::unterminated_string(self.span_from(start), position))
    }

    /// Lexes a `|...` continuation line of a multiline string.
    fn lex_string_continuation(
        &mut self,
        string_start: u32,
        string_position: LineColumn,
    ) -> Result<TokenKind, LexError> {
        self.advance(); // |
        let (content, closed) = self.lex_string_body();
        if closed {
            self.multiline_string = None;
            return Ok(TokenKind::StringTail(content));
        }
        if self.peek_char().is_none() {
            return Err(LexError::unterminated_string(
                self.span_from(string_start),
                string_position,
            ));
        }
        Ok(TokenKind::StringPart(content))
    }

    /// Reads string content up to the closing quote (consumed) or the end
    /// of the line (not consumed). `""` stands for one quote.
    fn lex_string_body(&mut self) -> (EcoString, bool) {
        let mut content = EcoString::new();
        loop {
            match self.peek_char() {
                None | Some('\n') => return (content, false),
                Some('\r') if self.peek_char_n(1) == Some('\n') => return (content, false),
                Some('"') => {
                    self.advance();
                    if self.peek_char() == Some('"') {
                        self.advance();
                        content.push('"');
                    } else {
                        return (content, true);
                    }
                }
                Some(c) => {
                    self.advance();
                    content.push(c);
                }
            }
        }
    }

    /// Lexes a date literal: `'20240101'`.
    fn lex_date(&mut self, start: u32, position: LineColumn) -> Result<TokenKind, LexError> {
        self.advance(); // opening quote
        let content_start = self.position;
        loop {
            match self.peek_char() {
                None | Some('\n') => {
                    return Err(LexError::new(
                        LexErrorKind::UnterminatedDate,
                        self.span_from(start),
                        position,
                    ));
                }
                Some('\'') => {
                    let content = &self.source[content_start..self.position];
                    self.advance();
                    return Ok(TokenKind::Date(EcoString::from(content)));
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.lex_token() {
            Ok(token) if token.kind().is_eof() => {
                self.finished = true;
                None
            }
            Ok(token) => Some(Ok(token)),
            Err(error) => {
                self.finished = true;
                Some(Err(error))
            }
        }
    }
}

/// Tokenizes a whole file, including the final `Eof` token.
///
/// # Errors
///
/// Returns the first [`LexError`]; lexical errors abort the file.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.lex_token()?;
        let is_eof = token.kind().is_eof();
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    tracing::debug!(count = tokens.len(), "tokenized source");
    Ok(tokens)
}
