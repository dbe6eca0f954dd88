// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Parsing infrastructure for BSL source code.
//!
//! A parse runs three batch phases over one file:
//!
//! 1. The [`Lexer`] turns text into [`Token`]s, each tagged with a
//!    [`Channel`]. Directive lines (`#Если ...`) are lexed in their own mode.
//! 2. The region engine ([`preprocess`]) evaluates conditional directives
//!    against an [`Environment`] and moves dead or deleted code to the
//!    `Deleted` channel.
//! 3. The parser builds a [`File`](crate::ast::File) from the visible tokens.
//!
//! ```
//! use bsl_core::source_analysis::{Environment, parse};
//!
//! let parsed = parse("Процедура Тест()\n    А = 1;\nКонецПроцедуры", &Environment::new()).unwrap();
//! assert_eq!(parsed.file.subroutines.len(), 1);
//! ```
//!
//! # Error Handling
//!
//! Every phase stops at its first error. [`parse`] returns them as one
//! [`ParseError`]; each carries a span and a line/column.

mod environment;
mod error;
mod lexer;
mod parser;
pub mod preprocessor;
mod span;
mod token;


pub use environment::{Environment, PreprocSymbol};
pub use error::{
    DirectiveError, DirectiveErrorKind, LexError, LexErrorKind, ParseError, SyntaxError,
};
pub use lexer::{Lexer, tokenize};
pub use preprocessor::{Preprocessed, preprocess, visible_text};
pub use span::{LineColumn, Span};
pub use token::{Channel, CompilerDirective, DirectiveKeyword, Keyword, Token, TokenKind};

use ecow::EcoString;
use tracing::debug;

use crate::ast::{File, Region};

/// A parsed file together with its channel-tagged token stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFile {
    source: EcoString,
    /// The parse tree.
    pub file: File,
    /// Every token of the file, with its final channel.
    pub tokens: Vec<Token>,
    /// Top-level `#Область` regions.
    pub regions: Vec<Region>,
}

impl ParsedFile {
    /// The effective text of `span`: visible lexemes joined without separators.
    #[must_use]
    pub fn visible_text(&self, span: Span) -> String {
        visible_text(&self.tokens, span)
    }

    /// The source text of `span` exactly as written.
    #[must_use]
    pub fn raw_text(&self, span: Span) -> &str {
        self.source.get(span.as_range()).unwrap_or_default()
    }

    /// Tokens the grammar saw, `Eof` excluded.
    pub fn visible_tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens
            .iter()
            .filter(|t| t.is_visible() && !t.kind().is_eof())
    }
}

/// Parses a whole file under the given environment.
///
/// # Errors
///
/// Returns the first lexical, directive or syntax error.
#[tracing::instrument(level = "debug", skip_all, fields(bytes = source.len()))]
pub fn parse(source: &str, env: &Environment) -> Result<ParsedFile, ParseError> {
    let tokens = tokenize(source)?;
    let preprocessed = preprocess(tokens, env)?;
    let file = parser::parse_file(&preprocessed)?;
    debug!(
        module_vars = file.module_vars.len(),
        subroutines = file.subroutines.len(),
        statements = file.body.statements.len(),
        "parsed file"
    );
    Ok(ParsedFile {
        source: EcoString::from(source),
        file,
        tokens: preprocessed.tokens,
        regions: preprocessed.regions,
    })
}
