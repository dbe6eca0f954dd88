// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Conditions of `#Если` / `#ИначеЕсли`: parsing and evaluation.
//!
//! ```text
//! condition := or Тогда
//! or        := and (ИЛИ and)*
//! and       := not (И not)*
//! not       := НЕ not | primary
//! primary   := symbol | '(' or ')'
//! ```

use ecow::eco_format;

use crate::ast::PreprocExpr;
use crate::source_analysis::{
    DirectiveError, DirectiveErrorKind, Environment, Keyword, LineColumn, PreprocSymbol, Span,
    Token, TokenKind,
};

/// Maximum nesting of `НЕ` and parentheses in one condition.
const MAX_CONDITION_DEPTH: usize = 64;

/// Evaluates a condition; unknown symbols are false unless the environment sets them.
#[must_use]
pub fn evaluate(condition: &PreprocExpr, env: &Environment) -> bool {
    match condition {
        PreprocExpr::Symbol { symbol, .. } => env.is_defined(symbol),
        PreprocExpr::Not { operand, .. } => !evaluate(operand, env),
        PreprocExpr::And { operands, .. } => operands.iter().all(|op| evaluate(op, env)),
        PreprocExpr::Or { operands, .. } => operands.iter().any(|op| evaluate(op, env)),
    }
}

/// Parses the tokens after `#Если`/`#ИначеЕсли`, which must end with `Тогда`.
///
/// `line_end` locates errors that happen at the end of the line.
pub(super) fn parse_condition(
    tokens: &[Token],
    line_end: (Span, LineColumn),
) -> Result<PreprocExpr, DirectiveError> {
    let mut parser = ConditionParser {
        tokens,
        current: 0,
        depth: 0,
        line_end,
    };
    let condition = parser.parse_or()?;
    match parser.peek() {
        Some(token) if token.kind().is_keyword(Keyword::Then) => {
            parser.current += 1;
            match parser.peek() {
                Some(extra) => Err(DirectiveError::new(
                    DirectiveErrorKind::UnexpectedTokens,
                    extra.span(),
                    extra.position(),
                )),
                None => Ok(condition),
            }
        }
        Some(token) => Err(parser.malformed(token, "`Тогда` or an operator")),
        None => Err(DirectiveError::new(
            DirectiveErrorKind::MissingThen,
            line_end.0,
            line_end.1,
        )),
    }
}

struct ConditionParser<'a> {
    tokens: &'a [Token],
    current: usize,
    depth: usize,
    line_end: (Span, LineColumn),
}

impl ConditionParser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.peek().is_some_and(|t| t.kind().is_keyword(keyword))
    }

    fn malformed(&self, token: &Token, expected: &str) -> DirectiveError {
        DirectiveError::new(
            DirectiveErrorKind::MalformedCondition(eco_format!(
                "expected {expected}, found {}",
                token.kind().describe()
            )),
            token.span(),
            token.position(),
        )
    }

    fn end_of_line(&self, expected: &str) -> DirectiveError {
        DirectiveError::new(
            DirectiveErrorKind::MalformedCondition(eco_format!(
                "expected {expected}, found end of line"
            )),
            self.line_end.0,
            self.line_end.1,
        )
    }

    fn enter_nesting(&mut self) -> Result<(), DirectiveError> {
        self.depth += 1;
        if self.depth > MAX_CONDITION_DEPTH {
            let (span, position) = self
                .peek()
                .map_or(self.line_end, |t| (t.span(), t.position()));
            return Err(DirectiveError::new(
                DirectiveErrorKind::MalformedCondition("condition is nested too deeply".into()),
                span,
                position,
            ));
        }
        Ok(())
    }

    fn parse_or(&mut self) -> Result<PreprocExpr, DirectiveError> {
        let first = self.parse_and()?;
        if !self.check_keyword(Keyword::Or) {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.check_keyword(Keyword::Or) {
            self.current += 1;
            operands.push(self.parse_and()?);
        }
        Ok(PreprocExpr::Or {
            span: spanning(&operands),
            operands,
        })
    }

    fn parse_and(&mut self) -> Result<PreprocExpr, DirectiveError> {
        let first = self.parse_not()?;
        if !self.check_keyword(Keyword::And) {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.check_keyword(Keyword::And) {
            self.current += 1;
            operands.push(self.parse_not()?);
        }
        Ok(PreprocExpr::And {
            span: spanning(&operands),
            operands,
        })
    }

    fn parse_not(&mut self) -> Result<PreprocExpr, DirectiveError> {
        let Some(token) = self.peek() else {
            return Err(self.end_of_line("a preprocessor symbol"));
        };
        if !token.kind().is_keyword(Keyword::Not) {
            return self.parse_primary();
        }
        let start = token.span();
        self.current += 1;
        self.enter_nesting()?;
        let operand = self.parse_not()?;
        self.depth -= 1;
        Ok(PreprocExpr::Not {
            span: start.merge(operand.span()),
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> Result<PreprocExpr, DirectiveError> {
        let Some(token) = self.peek() else {
            return Err(self.end_of_line("a preprocessor symbol"));
        };
        match token.kind() {
            TokenKind::Identifier(name) => {
                let symbol = PreprocSymbol::from_name(name);
                let span = token.span();
                self.current += 1;
                Ok(PreprocExpr::Symbol { symbol, span })
            }
            TokenKind::LeftParen => {
                self.current += 1;
                self.enter_nesting()?;
                let inner = self.parse_or()?;
                self.depth -= 1;
                match self.peek() {
                    Some(t) if matches!(t.kind(), TokenKind::RightParen) => {
                        self.current += 1;
                        Ok(inner)
                    }
                    Some(t) => Err(self.malformed(t, "`)`")),
                    None => Err(self.end_of_line("`)`")),
                }
            }
            _ => Err(self.malformed(token, "a preprocessor symbol")),
        }
    }
}

fn spanning(operands: &[PreprocExpr]) -> Span {
    operands
        .iter()
        .map(PreprocExpr::span)
        .reduce(Span::merge)
        .unwrap_or_default()
}
