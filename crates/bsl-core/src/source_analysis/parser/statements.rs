// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Statement parsing for BSL.
//!
//! A code block is a sequence of statements, each optionally followed by
//! `;`, that ends at end of file or at the keyword closing the enclosing
//! construct (`КонецЕсли`, `Исключение`, `КонецПроцедуры`, ...).

use ecow::eco_format;

use crate::ast::{Block, ConditionalBranch, Identifier, RaiseArgument, Statement};
use crate::source_analysis::{Keyword, Span, TokenKind};

use super::{ParseResult, Parser};

/// `ВызватьИсключение(Текст, Категория, Код, Подробности)`
const MAX_RAISE_ARGS: usize = 4;

impl Parser {
    /// Returns true at a token that closes the current code block.
    fn is_at_block_end(&self) -> bool {
        match self.current_kind() {
            TokenKind::Eof => true,
            TokenKind::Keyword(keyword) => keyword.ends_code_block(),
            _ => false,
        }
    }

    /// Returns true where a statement may end without consuming anything.
    pub(super) fn is_at_statement_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Semicolon) || self.is_at_block_end()
    }

    /// Parses statements up to the end of the block.
    ///
    /// Directives found between statements are kept as
    /// [`Statement::Preprocessor`] items.
    pub(super) fn parse_block(&mut self) -> ParseResult<Block> {
        let start = self.current_token().span().start();
        let mut statements = Vec::new();
        loop {
            statements.extend(self.take_directives().into_iter().map(Statement::Preprocessor));
            if self.is_at_block_end() {
                break;
            }
            let statement = self.parse_statement()?;
            if !matches!(statement, Statement::Empty { .. }) {
                self.match_token(&TokenKind::Semicolon);
            }
            statements.push(statement);
        }

        let span = match (statements.first(), statements.last()) {
            (Some(first), Some(last)) => first.span().merge(last.span()),
            _ => Span::new(start, start),
        };
        Ok(Block { statements, span })
    }

    /// Parses one statement without its trailing `;`.
    ///
    /// Counts towards the nesting limit, so deeply nested blocks fail
    /// cleanly instead of exhausting the stack.
    fn parse_statement(&mut self) -> ParseResult<Statement> {
        self.nested(Self::parse_statement_kind)
    }

    fn parse_statement_kind(&mut self) -> ParseResult<Statement> {
        match self.current_kind() {
            TokenKind::Semicolon => Ok(Statement::Empty {
                span: self.advance().span(),
            }),
            TokenKind::Tilde => self.parse_labeled(),
            TokenKind::Identifier(_) => self.parse_simple_statement(),
            TokenKind::Keyword(keyword) => match *keyword {
                Keyword::If => self.parse_if(),
                Keyword::While => self.parse_while(),
                Keyword::For => {
                    if matches!(self.peek_kind(), Some(TokenKind::Keyword(Keyword::Each))) {
                        self.parse_for_each()
                    } else {
                        self.parse_for()
                    }
                }
                Keyword::Try => self.parse_try(),
                Keyword::Return => self.parse_return(),
                Keyword::Continue => Ok(Statement::Continue {
                    span: self.advance().span(),
                }),
                Keyword::Break => Ok(Statement::Break {
                    span: self.advance().span(),
                }),
                Keyword::Raise => self.parse_raise(),
                Keyword::Execute => {
                    let start = self.advance().span();
                    let code = self.parse_expression()?;
                    Ok(Statement::Execute {
                        span: start.merge(code.span()),
                        code,
                    })
                }
                Keyword::Goto => {
                    let start = self.advance().span();
                    let label = self.parse_label_name()?;
                    Ok(Statement::Goto {
                        span: start.merge(label.span),
                        label,
                    })
                }
                Keyword::AddHandler | Keyword::RemoveHandler => self.parse_handler(),
                _ => Err(self.error_expected(&["a statement".into()])),
            },
            _ => Err(self.error_expected(&["a statement".into()])),
        }
    }

    // ========================================================================
    // Assignments, calls, await
    // ========================================================================

    /// An assignment, a call, or an await statement.
    fn parse_simple_statement(&mut self) -> ParseResult<Statement> {
        if self.is_at_await() {
            let checkpoint = self.current;
            if let Some(expr) = self.try_parse_await() {
                if self.is_at_statement_end() {
                    return Ok(Statement::Await(expr));
                }
                self.current = checkpoint;
            }
        }

        let target = self.parse_postfix()?;
        if self.check(&TokenKind::Equal) {
            if !target.is_assignable() {
                return Err(self.error_at(
                    "cannot assign to a call; the target must end with a name or an index",
                    target.span(),
                ));
            }
            self.advance();
            let value = self.parse_expression()?;
            return Ok(Statement::Assignment {
                span: target.span().merge(value.span()),
                target,
                value,
            });
        }
        if target.is_call() {
            return Ok(Statement::Call(target));
        }
        Err(self.error_expected(&["`=`".into(), "`(`".into()]))
    }

    // ========================================================================
    // Compound statements
    // ========================================================================

    /// `Если ... Тогда ... {ИначеЕсли ... Тогда ...} [Иначе ...] КонецЕсли`
    fn parse_if(&mut self) -> ParseResult<Statement> {
        let start = self.advance().span();
        let mut branches = vec![self.parse_conditional_branch(start)?];
        while self.check_keyword(Keyword::ElseIf) {
            let keyword = self.advance().span();
            branches.push(self.parse_conditional_branch(keyword)?);
        }
        let else_branch = if self.match_keyword(Keyword::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };
        let end = self.expect_keyword(Keyword::EndIf)?;
        Ok(Statement::If {
            branches,
            else_branch,
            span: start.merge(end.span()),
        })
    }

    fn parse_conditional_branch(&mut self, keyword: Span) -> ParseResult<ConditionalBranch> {
        let condition = self.parse_expression()?;
        let then = self.expect_keyword(Keyword::Then)?;
        let body = self.parse_block()?;
        let end = if body.statements.is_empty() {
            then.span()
        } else {
            body.span
        };
        Ok(ConditionalBranch {
            condition,
            body,
            span: keyword.merge(end),
        })
    }

    /// `Пока условие Цикл ... КонецЦикла`
    fn parse_while(&mut self) -> ParseResult<Statement> {
        let start = self.advance().span();
        let condition = self.parse_expression()?;
        self.expect_keyword(Keyword::Do)?;
        let body = self.parse_block()?;
        let end = self.expect_keyword(Keyword::EndDo)?;
        Ok(Statement::While {
            condition,
            body,
            span: start.merge(end.span()),
        })
    }

    /// `Для счетчик = начало По конец Цикл ... КонецЦикла`
    fn parse_for(&mut self) -> ParseResult<Statement> {
        let start = self.advance().span();
        let variable = self.expect_identifier("a loop variable")?;
        self.expect(&TokenKind::Equal)?;
        let from = self.parse_expression()?;
        self.expect_keyword(Keyword::To)?;
        let to = self.parse_expression()?;
        self.expect_keyword(Keyword::Do)?;
        let body = self.parse_block()?;
        let end = self.expect_keyword(Keyword::EndDo)?;
        Ok(Statement::For {
            variable,
            start: from,
            end: to,
            body,
            span: start.merge(end.span()),
        })
    }

    /// `Для Каждого элемент Из коллекция Цикл ... КонецЦикла`
    fn parse_for_each(&mut self) -> ParseResult<Statement> {
        let start = self.advance().span();
        self.expect_keyword(Keyword::Each)?;
        let variable = self.expect_identifier("a loop variable")?;
        self.expect_keyword(Keyword::In)?;
        let collection = self.parse_expression()?;
        self.expect_keyword(Keyword::Do)?;
        let body = self.parse_block()?;
        let end = self.expect_keyword(Keyword::EndDo)?;
        Ok(Statement::ForEach {
            variable,
            collection,
            body,
            span: start.merge(end.span()),
        })
    }

    /// `Попытка ... Исключение ... КонецПопытки`
    fn parse_try(&mut self) -> ParseResult<Statement> {
        let start = self.advance().span();
        let body = self.parse_block()?;
        self.expect_keyword(Keyword::Except)?;
        let handler = self.parse_block()?;
        let end = self.expect_keyword(Keyword::EndTry)?;
        Ok(Statement::Try {
            body,
            handler,
            span: start.merge(end.span()),
        })
    }

    /// `Возврат [значение]`
    fn parse_return(&mut self) -> ParseResult<Statement> {
        let start = self.advance().span();
        if self.is_at_statement_end() {
            return Ok(Statement::Return {
                value: None,
                span: start,
            });
        }
        let value = self.parse_expression()?;
        Ok(Statement::Return {
            span: start.merge(value.span()),
            value: Some(value),
        })
    }

    /// `ВызватьИсключение [выражение | (аргументы)]`
    ///
    /// A parenthesized list is read as call parameters when nothing but the
    /// end of the statement follows it; otherwise the argument is an
    /// expression, so `ВызватьИсключение ("а") + Б` raises the sum.
    fn parse_raise(&mut self) -> ParseResult<Statement> {
        let start = self.advance().span();
        if self.is_at_statement_end() {
            return Ok(Statement::Raise {
                argument: None,
                span: start,
            });
        }

        if self.check(&TokenKind::LeftParen) {
            let checkpoint = self.current;
            if let Ok((args, span)) = self.parse_call_args() {
                if self.is_at_statement_end() {
                    if args.len() > MAX_RAISE_ARGS {
                        return Err(self.error_at(
                            eco_format!(
                                "`{}` takes at most {MAX_RAISE_ARGS} arguments",
                                Keyword::Raise
                            ),
                            span,
                        ));
                    }
                    return Ok(Statement::Raise {
                        argument: Some(RaiseArgument::CallParams { args, span }),
                        span: start.merge(span),
                    });
                }
            }
            self.current = checkpoint;
        }

        let argument = self.parse_expression()?;
        Ok(Statement::Raise {
            span: start.merge(argument.span()),
            argument: Some(RaiseArgument::Expression(argument)),
        })
    }

    /// `ДобавитьОбработчик событие, обработчик` and its `Удалить` twin.
    fn parse_handler(&mut self) -> ParseResult<Statement> {
        let keyword = self.advance();
        let event = self.parse_expression()?;
        self.expect(&TokenKind::Comma)?;
        let handler = self.parse_expression()?;
        let span = keyword.span().merge(handler.span());
        Ok(if keyword.kind().is_keyword(Keyword::AddHandler) {
            Statement::AddHandler {
                event,
                handler,
                span,
            }
        } else {
            Statement::RemoveHandler {
                event,
                handler,
                span,
            }
        })
    }

    // ========================================================================
    // Labels
    // ========================================================================

    /// `~Метка:` followed by the statement it marks, if any.
    fn parse_labeled(&mut self) -> ParseResult<Statement> {
        let start = self.current_token().span();
        let label = self.parse_label_name()?;
        let colon = self.expect(&TokenKind::Colon)?;
        let head = start.merge(colon.span());

        if self.is_at_block_end() {
            return Ok(Statement::Labeled {
                label,
                statement: None,
                span: head,
            });
        }
        let statement = self.parse_statement()?;
        Ok(Statement::Labeled {
            span: head.merge(statement.span()),
            label,
            statement: Some(Box::new(statement)),
        })
    }

    /// `~Имя`; keywords are allowed: `~Если:`.
    fn parse_label_name(&mut self) -> ParseResult<Identifier> {
        self.expect(&TokenKind::Tilde)?;
        match self.current_kind() {
            TokenKind::Identifier(_) | TokenKind::Keyword(_) => {
                let token = self.advance();
                Ok(Identifier::new(token.text(), token.span()))
            }
            _ => Err(self.error_expected(&["a label name".into()])),
        }
    }
}
