// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Error types for BSL source analysis.
//!
//! Every error carries a byte [`Span`] and the [`LineColumn`] of its start, so
//! a host can render a diagnostic without re-scanning the file. All of them
//! integrate with [`miette`] for reporting.

// Spurious warnings from miette derive macro expansion
#![allow(unused_assignments)]

use ecow::EcoString;
use miette::Diagnostic;
use thiserror::Error;

use super::{LineColumn, Span};

// ============================================================================
// Lexical errors
// ============================================================================

/// A lexical error encountered during tokenization.
///
/// Lexical errors are fatal: the file is not tokenized any further.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{kind} at {position}")]
#[diagnostic(code(bsl::lex))]
pub struct LexError {
    /// The kind of lexical error.
    #[source]
    pub kind: LexErrorKind,
    /// The source location of the error.
    #[label("here")]
    pub span: Span,
    /// Line and column of the span start.
    pub position: LineColumn,
}

impl LexError {
    /// Creates a new lexical error.
    #[must_use]
    pub fn new(kind: LexErrorKind, span: Span, position: LineColumn) -> Self {
        Self {
            kind,
            span,
            position,
        }
    }

    /// Creates an "unexpected character" error.
    #[must_use]
    pub fn unexpected_char(c: char, span: Span, position: LineColumn) -> Self {
        Self::new(LexErrorKind::UnexpectedCharacter(c), span, position)
    }

    /// Creates an "unterminated string" error.
    #[must_use]
    pub fn unterminated_string(span: Span, position: LineColumn) -> Self {
        Self::new(LexErrorKind::UnterminatedString, span, position)
    }
}

/// The kind of lexical error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    /// An unexpected character was encountered.
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),

    /// A string literal was not terminated.
    #[error("unterminated string literal")]
    UnterminatedString,

    /// A date literal was not terminated.
    #[error("unterminated date literal")]
    UnterminatedDate,

    /// A `#` that does not start a logical line.
    #[error("preprocessor directive must start a line")]
    MisplacedDirective,
}

// ============================================================================
// Directive structure errors
// ============================================================================

/// A structural error in the preprocessor directives of a file.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{kind} at {position}")]
#[diagnostic(code(bsl::directive))]
pub struct DirectiveError {
    /// The kind of directive error.
    #[source]
    pub kind: DirectiveErrorKind,
    /// The offending directive.
    #[label("in this directive")]
    pub span: Span,
    /// Line and column of the span start.
    pub position: LineColumn,
}

impl DirectiveError {
    #[must_use]
    pub fn new(kind: DirectiveErrorKind, span: Span, position: LineColumn) -> Self {
        Self {
            kind,
            span,
            position,
        }
    }
}

/// The kind of directive error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveErrorKind {
    /// `#` followed by a word that is not a directive.
    #[error("unknown preprocessor directive `{0}`")]
    UnknownDirective(EcoString),

    /// The condition of `#Если`/`#ИначеЕсли` is not a boolean expression.
    #[error("malformed preprocessor condition: {0}")]
    MalformedCondition(EcoString),

    /// The condition is not followed by `Тогда`.
    #[error("expected `Тогда` after preprocessor condition")]
    MissingThen,

    /// `#Область` without a name.
    #[error("expected region name after `#Область`")]
    MissingRegionName,

    /// `#Использовать` without a library reference.
    #[error("expected library reference after `#Использовать`")]
    MissingLibraryReference,

    /// Extra tokens after a complete directive.
    #[error("unexpected tokens after directive")]
    UnexpectedTokens,

    /// A closing or continuation directive with no matching opener.
    #[error("`{0}` without a matching opening directive")]
    Unmatched(EcoString),

    /// A block directive still open at end of file.
    #[error("`{0}` is never closed")]
    Unterminated(EcoString),
}

// ============================================================================
// Syntax errors
// ============================================================================

/// The token sequence does not match the grammar at some position.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{message} at {position}")]
#[diagnostic(code(bsl::syntax))]
pub struct SyntaxError {
    /// Human-readable description.
    pub message: EcoString,
    /// What the grammar would have accepted here.
    pub expected: Vec<EcoString>,
    /// Description of the token actually found.
    pub found: EcoString,
    /// The offending token.
    #[label("found {found}")]
    pub span: Span,
    /// Line and column of the span start.
    pub position: LineColumn,
}

impl SyntaxError {
    #[must_use]
    pub fn new(
        message: impl Into<EcoString>,
        expected: Vec<EcoString>,
        found: impl Into<EcoString>,
        span: Span,
        position: LineColumn,
    ) -> Self {
        Self {
            message: message.into(),
            expected,
            found: found.into(),
            span,
            position,
        }
    }
}

// ============================================================================
// Union
// ============================================================================

/// Any failure of the [`parse`](crate::source_analysis::parse) entry point.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ParseError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Directive(#[from] DirectiveError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),
}

impl ParseError {
    /// The span of the offending source text.
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Lex(e) => e.span,
            Self::Directive(e) => e.span,
            Self::Syntax(e) => e.span,
        }
    }

    /// Line and column of the offending source text.
    #[must_use]
    pub fn position(&self) -> LineColumn {
        match self {
            Self::Lex(e) => e.position,
            Self::Directive(e) => e.position,
            Self::Syntax(e) => e.position,
        }
    }
}
