// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Expression parsing for BSL.
//!
//! This module handles:
//! - Binary operators via Pratt parsing (see [`binary_binding_power`])
//! - Prefix `НЕ`, unary `+`/`-` and the soft `Ждать` operator
//! - Primaries: literals, identifiers, `(...)`, `?(...)`, `Новый ...`
//! - Postfix chains: `.Имя`, `[индекс]`, `(аргументы)`

use ecow::EcoString;

use crate::ast::{Expression, Identifier, Literal, UnaryOp};
use crate::source_analysis::{Keyword, Span, TokenKind};

use super::{NOT_BINDING_POWER, ParseResult, Parser, binary_binding_power};

/// Returns true if `name` is the await word in either language.
pub(super) fn is_await_word(name: &str) -> bool {
    name.eq_ignore_ascii_case("await") || name.to_lowercase() == "ждать"
}

impl Parser {
    /// Parses a full expression.
    ///
    /// Uses `stacker::maybe_grow` through [`Parser::nested`] to extend the
    /// stack on the heap when remaining space is low.
    pub(super) fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.nested(|p| p.parse_binary(0))
    }

    /// Pratt loop: parses operators whose left binding power is at least `min_bp`.
    fn parse_binary(&mut self, min_bp: u8) -> ParseResult<Expression> {
        let mut left = self.parse_prefix()?;

        while let Some((op, bp)) = binary_binding_power(self.current_kind()) {
            if bp.left < min_bp {
                break;
            }
            self.advance();
            let right = self.nested(|p| p.parse_binary(bp.right))?;
            let span = left.span().merge(right.span());
            left = Expression::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
                span,
            };
        }

        Ok(left)
    }

    /// `НЕ` operand, or a signed operand.
    fn parse_prefix(&mut self) -> ParseResult<Expression> {
        if self.check_keyword(Keyword::Not) {
            let start = self.advance().span();
            let operand = self.nested(|p| p.parse_binary(NOT_BINDING_POWER))?;
            return Ok(Expression::Unary {
                op: UnaryOp::Not,
                span: start.merge(operand.span()),
                operand: Box::new(operand),
            });
        }
        self.parse_unary()
    }

    /// `-операнд`, `+операнд`, repeatable: `1 +- 2` is `1 + (-2)`.
    fn parse_unary(&mut self) -> ParseResult<Expression> {
        let op = match self.current_kind() {
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Plus => UnaryOp::Plus,
            _ => return self.parse_postfix(),
        };
        let start = self.advance().span();
        let operand = self.nested(Self::parse_unary)?;
        Ok(Expression::Unary {
            op,
            span: start.merge(operand.span()),
            operand: Box::new(operand),
        })
    }

    /// A primary followed by any number of postfix modifiers.
    pub(super) fn parse_postfix(&mut self) -> ParseResult<Expression> {
        let primary = self.parse_primary()?;
        self.parse_modifiers(primary)
    }

    /// Applies `.Имя`, `[индекс]` and `(аргументы)` to `expr`.
    ///
    /// A call is only accepted directly after a name.
    pub(super) fn parse_modifiers(&mut self, mut expr: Expression) -> ParseResult<Expression> {
        loop {
            match self.current_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.parse_member_name()?;
                    let span = expr.span().merge(name.span);
                    expr = Expression::Member {
                        receiver: Box::new(expr),
                        name,
                        span,
                    };
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    let close = self.expect(&TokenKind::RightBracket)?;
                    let span = expr.span().merge(close.span());
                    expr = Expression::Index {
                        receiver: Box::new(expr),
                        index: Box::new(index),
                        span,
                    };
                }
                TokenKind::LeftParen
                    if matches!(expr, Expression::Identifier(_) | Expression::Member { .. }) =>
                {
                    let (args, args_span) = self.parse_call_args()?;
                    let span = expr.span().merge(args_span);
                    expr = Expression::Call {
                        callee: Box::new(expr),
                        args,
                        span,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    /// The name after `.`; keywords are allowed: `Запрос.Выполнить()`.
    fn parse_member_name(&mut self) -> ParseResult<Identifier> {
        match self.current_kind() {
            TokenKind::Identifier(_) | TokenKind::Keyword(_) => {
                let token = self.advance();
                Ok(Identifier::new(token.text(), token.span()))
            }
            _ => Err(self.error_expected(&["a member name".into()])),
        }
    }

    /// `(арг, , арг)`: empty slots are `None`, `()` has no slots.
    pub(super) fn parse_call_args(&mut self) -> ParseResult<(Vec<Option<Expression>>, Span)> {
        let open = self.expect(&TokenKind::LeftParen)?;
        let mut args = Vec::new();
        if let TokenKind::RightParen = self.current_kind() {
            let close = self.advance();
            return Ok((args, open.span().merge(close.span())));
        }
        loop {
            let arg = if matches!(self.current_kind(), TokenKind::Comma | TokenKind::RightParen) {
                None
            } else {
                Some(self.parse_expression()?)
            };
            args.push(arg);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        let close = self.expect(&TokenKind::RightParen)?;
        Ok((args, open.span().merge(close.span())))
    }

    // ========================================================================
    // Primaries
    // ========================================================================

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        if let Some((literal, span)) = self.parse_literal()? {
            return Ok(Expression::Literal(literal, span));
        }

        match self.current_kind() {
            TokenKind::Identifier(_) => {
                if self.is_at_await() {
                    if let Some(expr) = self.try_parse_await() {
                        return Ok(expr);
                    }
                }
                let token = self.advance();
                Ok(Expression::Identifier(Identifier::new(token.text(), token.span())))
            }
            TokenKind::LeftParen => {
                let open = self.advance();
                let expression = self.parse_expression()?;
                let close = self.expect(&TokenKind::RightParen)?;
                Ok(Expression::Parenthesized {
                    expression: Box::new(expression),
                    span: open.span().merge(close.span()),
                })
            }
            TokenKind::Question => self.parse_ternary(),
            TokenKind::Keyword(Keyword::New) => self.parse_new(),
            _ => Err(self.error_expected(&["an expression".into()])),
        }
    }

    /// Parses a literal at the current token, if there is one.
    ///
    /// A multiline string is read from its `StringStart` through its
    /// `StringTail`; the pieces are joined with `\n`.
    pub(super) fn parse_literal(&mut self) -> ParseResult<Option<(Literal, Span)>> {
        let literal = match self.current_kind() {
            TokenKind::Number(text) => Literal::Number(text.clone()),
            TokenKind::String(text) => Literal::String(text.clone()),
            TokenKind::Date(text) => Literal::Date(text.clone()),
            TokenKind::Keyword(Keyword::True) => Literal::Boolean(true),
            TokenKind::Keyword(Keyword::False) => Literal::Boolean(false),
            TokenKind::Keyword(Keyword::Undefined) => Literal::Undefined,
            TokenKind::Keyword(Keyword::Null) => Literal::Null,
            TokenKind::StringStart(_) => return self.parse_multiline_string().map(Some),
            _ => return Ok(None),
        };
        let span = self.advance().span();
        Ok(Some((literal, span)))
    }

    fn parse_multiline_string(&mut self) -> ParseResult<(Literal, Span)> {
        let start = self.advance();
        let mut text = match start.kind() {
            TokenKind::StringStart(first) => EcoString::from(first.as_str()),
            _ => EcoString::new(),
        };
        loop {
            match self.current_kind() {
                TokenKind::StringPart(piece) => {
                    text.push('\n');
                    text.push_str(piece);
                    self.advance();
                }
                TokenKind::StringTail(piece) => {
                    text.push('\n');
                    text.push_str(piece);
                    let end = self.advance().span();
                    return Ok((Literal::String(text), start.span().merge(end)));
                }
                _ => {
                    return Err(self.error_expected(&["a string continuation `|`".into()]));
                }
            }
        }
    }

    /// `?(условие, да, нет)`
    fn parse_ternary(&mut self) -> ParseResult<Expression> {
        let start = self.advance().span();
        self.expect(&TokenKind::LeftParen)?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::Comma)?;
        let then_branch = self.parse_expression()?;
        self.expect(&TokenKind::Comma)?;
        let else_branch = self.parse_expression()?;
        let close = self.expect(&TokenKind::RightParen)?;
        Ok(Expression::Ternary {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
            span: start.merge(close.span()),
        })
    }

    /// `Новый Тип[(аргументы)]` or `Новый(Тип, аргументы)`.
    fn parse_new(&mut self) -> ParseResult<Expression> {
        let start = self.advance().span();
        match self.current_kind() {
            TokenKind::Identifier(_) => {
                let type_name = self.expect_identifier("a type name")?;
                let (args, end) = if self.check(&TokenKind::LeftParen) {
                    self.parse_call_args()?
                } else {
                    (Vec::new(), type_name.span)
                };
                Ok(Expression::New {
                    type_name: Some(type_name),
                    args,
                    span: start.merge(end),
                })
            }
            TokenKind::LeftParen => {
                let (args, end) = self.parse_call_args()?;
                Ok(Expression::New {
                    type_name: None,
                    args,
                    span: start.merge(end),
                })
            }
            _ => Err(self.error_expected(&["a type name".into(), "`(`".into()])),
        }
    }

    // ========================================================================
    // Await
    // ========================================================================

    /// Returns true if the current identifier can be read as `Ждать`
    /// applied to the token after it.
    ///
    /// Inside a subroutine that is not `Асинх`, a parameter spelled like the
    /// await word is always a plain name.
    pub(super) fn is_at_await(&self) -> bool {
        let TokenKind::Identifier(name) = self.current_kind() else {
            return false;
        };
        if !is_await_word(name) {
            return false;
        }
        if !self.context.is_async && self.context.has_param(name) {
            return false;
        }
        matches!(
            self.peek_kind(),
            Some(
                TokenKind::Identifier(_)
                    | TokenKind::Number(_)
                    | TokenKind::String(_)
                    | TokenKind::StringStart(_)
                    | TokenKind::Date(_)
                    | TokenKind::LeftParen
                    | TokenKind::Question
                    | TokenKind::Keyword(
                        Keyword::True
                            | Keyword::False
                            | Keyword::Undefined
                            | Keyword::Null
                            | Keyword::New
                    )
            )
        )
    }

    /// `Ждать операнд`, where the operand is a postfix chain.
    /// Tries an await expression at the current token.
    ///
    /// On failure the parser rewinds and remembers the start index, so the
    /// same tokens are never tried as an await twice.
    pub(super) fn try_parse_await(&mut self) -> Option<Expression> {
        let checkpoint = self.current;
        if self.failed_awaits.contains(&checkpoint) {
            return None;
        }
        match self.parse_await() {
            Ok(expr) => Some(expr),
            Err(_) => {
                self.failed_awaits.insert(checkpoint);
                self.current = checkpoint;
                None
            }
        }
    }

    pub(super) fn parse_await(&mut self) -> ParseResult<Expression> {
        let start = self.advance().span();
        let operand = self.nested(Self::parse_postfix)?;
        Ok(Expression::Await {
            span: start.merge(operand.span()),
            operand: Box::new(operand),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{BinaryOp, Expression, Literal, Statement, UnaryOp};
    use crate::source_analysis::{Environment, parse};

    /// Parses `Х = <source>;` and returns the right-hand side.
    fn expr(source: &str) -> Expression {
        let program = format!("Х = {source};");
        let parsed = match parse(&program, &Environment::new()) {
            Ok(parsed) => parsed,
            Err(err) => panic!("parse failed for {program:?}: {err}"),
        };
        match parsed.file.body.statements.into_iter().next() {
            Some(Statement::Assignment { value, .. }) => value,
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    fn expr_fails(source: &str) {
        let program = format!("Х = {source};");
        assert!(parse(&program, &Environment::new()).is_err(), "{program}");
    }

    #[test]
    fn literals() {
        assert_eq!(expr("42"), Expression::Literal(Literal::Number("42".into()), span(5, 7)));
        assert!(matches!(expr("\"т\""), Expression::Literal(Literal::String(_), _)));
        assert!(matches!(expr("'20240101'"), Expression::Literal(Literal::Date(_), _)));
        assert!(matches!(expr("Ложь"), Expression::Literal(Literal::Boolean(false), _)));
        assert!(matches!(expr("Неопределено"), Expression::Literal(Literal::Undefined, _)));
        assert!(matches!(expr("NULL"), Expression::Literal(Literal::Null, _)));
    }

    fn span(start: u32, end: u32) -> crate::source_analysis::Span {
        crate::source_analysis::Span::new(start, end)
    }

    #[test]
    fn multiline_string_literal() {
        let e = expr("\"первая\n|вторая\n// комментарий\n|третья\"");
        assert_eq!(
            e,
            Expression::Literal(Literal::String("первая\nвторая\nтретья".into()), e.span())
        );
    }

    #[test]
    fn precedence() {
        let Expression::Binary { op, right, .. } = expr("А + Б * В") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(*right, Expression::Binary { op: BinaryOp::Multiply, .. }));

        let Expression::Binary { op, left, .. } = expr("А = 1 И Б ИЛИ В") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Or);
        assert!(matches!(*left, Expression::Binary { op: BinaryOp::And, .. }));
    }

    #[test]
    fn not_binds_looser_than_comparison() {
        let Expression::Binary { op, left, .. } = expr("НЕ А = Б И В") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::And);
        let Expression::Unary { op: UnaryOp::Not, operand, .. } = *left else {
            panic!("expected НЕ");
        };
        assert!(matches!(*operand, Expression::Binary { op: BinaryOp::Equal, .. }));
    }

    #[test]
    fn glued_signs() {
        for source in ["+0", "-0", "1 ++ 2", "1 -- 2", "1 +- 2", "1 -+ 2"] {
            expr(source);
        }
        let Expression::Binary { op, right, .. } = expr("1 +- 2") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(*right, Expression::Unary { op: UnaryOp::Minus, .. }));
    }

    #[test]
    fn postfix_chains() {
        for source in [
            "Метод()",
            "Метод().Свойство",
            "Модуль.Метод(А).Метод2(Б)",
            "Модуль.Метод().Метод2().Свойство.Метод()[1]",
            "Идентификатор[1].Метод().Метод2().Свойство.Метод()[1]",
            "Запрос. Выполнить()",
            "?(Истина, Истина, Ложь).Выполнить()",
            "?(Истина, М, М)[0]",
            "Новый Файл().Существует()",
            "(Новый Файл()).Существует()",
            "Новый(\"Файл\").Существует()",
        ] {
            expr(source);
        }
        let Expression::Index { receiver, .. } = expr("А.Б()[0]") else {
            panic!("expected index");
        };
        let Expression::Call { callee, args, .. } = *receiver else {
            panic!("expected call");
        };
        assert!(args.is_empty());
        assert!(matches!(*callee, Expression::Member { .. }));
    }

    #[test]
    fn keyword_member_name() {
        let Expression::Call { callee, .. } = expr("Запрос.Выполнить()") else {
            panic!("expected call");
        };
        let Expression::Member { name, .. } = *callee else {
            panic!("expected member");
        };
        assert_eq!(name.name, "Выполнить");
    }

    #[test]
    fn call_argument_slots() {
        let count = |source: &str| match expr(source) {
            Expression::Call { args, .. } => args.iter().map(Option::is_some).collect::<Vec<_>>(),
            other => panic!("expected call, got {other:?}"),
        };
        assert_eq!(count("Ф()"), Vec::<bool>::new());
        assert_eq!(count("Ф(А)"), [true]);
        assert_eq!(count("Ф(,)"), [false, false]);
        assert_eq!(count("Ф(А, Б, )"), [true, true, false]);
    }

    #[test]
    fn calls_only_follow_names() {
        expr_fails("(А)(1)");
        expr_fails("Ф()(1)");
    }

    #[test]
    fn new_expressions() {
        for source in [
            "Новый Массив",
            "Новый(Массив)",
            "Новый Массив(А, Б)",
            "Новый(Массив, А, Б)",
            "Новый(Тип(\"Массив\"), А, Б)",
            "Новый(\"Массив\")",
        ] {
            assert!(matches!(expr(source), Expression::New { .. }), "{source}");
        }
        let Expression::New { type_name, args, .. } = expr("Новый Структура(\"А\", 1)") else {
            panic!("expected new");
        };
        assert_eq!(type_name.map(|t| t.name), Some("Структура".into()));
        assert_eq!(args.len(), 2);
        expr_fails("Новый Выполнить");
    }

    #[test]
    fn keyword_is_not_an_expression() {
        expr_fails("Выполнить");
        expr_fails("НЕ");
    }

    #[test]
    fn unary_not_forms() {
        for source in ["НЕ Истина", "НЕ А", "НЕ (А)"] {
            assert!(matches!(expr(source), Expression::Unary { op: UnaryOp::Not, .. }));
        }
    }

    #[test]
    fn await_in_expressions() {
        assert!(matches!(expr("Ждать Ф()"), Expression::Await { .. }));
        assert!(matches!(expr("Await Ф()"), Expression::Await { .. }));

        let Expression::Binary { left, right, .. } = expr("Ждать (Ждать 1) + Ждать (Ждать 2)") else {
            panic!("expected binary");
        };
        assert!(matches!(*left, Expression::Await { .. }));
        assert!(matches!(*right, Expression::Await { .. }));

        // Followed by an operator the word is a plain name.
        assert!(matches!(expr("Ждать + 1"), Expression::Binary { .. }));
        assert!(matches!(expr("Ждать"), Expression::Identifier(_)));
    }

    #[test]
    fn directives_inside_expression() {
        let source = "Х = A1 + \n#Если (Клиент) Тогда\nА +\n#КонецЕсли\n#Если Клиент Тогда\nБ +\n\
                      #Иначе\n#Область Имя\nВ(\nА + \nБ\n)\n#КонецОбласти\n#КонецЕсли\n+ С\n;";
        let parsed = parse(source, &Environment::new()).unwrap();
        assert_eq!(parsed.visible_text(parsed.file.body.statements[0].span()), "Х=A1+В(А+Б)+С");

        let client = Environment::new().with_name("Клиент", true);
        let parsed = parse(source, &client).unwrap();
        assert_eq!(parsed.visible_text(parsed.file.body.statements[0].span()), "Х=A1+А+Б++С");
    }
}
