// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Declaration parsing for BSL.
//!
//! This module handles module-level declarations:
//! - Module variables: `&НаКлиенте Перем А Экспорт, Б;`
//! - Subroutines: `&Перед("Метод") Асинх Функция Имя(Знач П = 0) Экспорт ... КонецФункции`
//! - Annotations and their parameters
//! - Parameter default values

use ecow::eco_format;

use crate::ast::{
    Annotation, AnnotationParam, Identifier, Literal, Parameter, Subroutine, SubroutineKind,
    VarDeclaration, VarDeclarator,
};
use crate::source_analysis::{CompilerDirective, Keyword, Span, TokenKind};

use super::{ParseResult, Parser, SubroutineContext};

/// Annotations and the compiler directive in front of a declaration.
struct Prefix {
    annotations: Vec<Annotation>,
    compiler_directive: Option<CompilerDirective>,
    span: Option<Span>,
}

impl Parser {
    // ========================================================================
    // Lookahead
    // ========================================================================

    /// Skips annotations and compiler directives starting at `offset`,
    /// returning the offset of the first token after them.
    fn skip_declaration_prefix(&self, mut offset: usize) -> usize {
        loop {
            match self.peek_at(offset) {
                Some(TokenKind::CompilerDirective(_)) => offset += 1,
                Some(TokenKind::Annotation(_)) => {
                    offset += 1;
                    if matches!(self.peek_at(offset), Some(TokenKind::LeftParen)) {
                        offset = self.skip_parenthesized(offset);
                    }
                }
                _ => return offset,
            }
        }
    }

    /// Given the offset of a `(`, returns the offset after its matching `)`.
    fn skip_parenthesized(&self, mut offset: usize) -> usize {
        let mut depth = 0usize;
        while let Some(kind) = self.peek_at(offset) {
            offset += 1;
            match kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        break;
                    }
                }
                TokenKind::Eof => break,
                _ => {}
            }
        }
        offset
    }

    /// Returns true if a `Перем` declaration starts here.
    pub(super) fn is_at_var_declaration(&self) -> bool {
        let offset = self.skip_declaration_prefix(0);
        matches!(self.peek_at(offset), Some(TokenKind::Keyword(Keyword::Var)))
    }

    /// Returns true if a procedure or function declaration starts here.
    pub(super) fn is_at_subroutine(&self) -> bool {
        let mut offset = self.skip_declaration_prefix(0);
        if matches!(self.peek_at(offset), Some(TokenKind::Keyword(Keyword::Async))) {
            offset += 1;
        }
        matches!(
            self.peek_at(offset),
            Some(TokenKind::Keyword(Keyword::Procedure | Keyword::Function))
        )
    }

    // ========================================================================
    // Annotations
    // ========================================================================

    /// Parses annotations and compiler directives in any order.
    ///
    /// With more than one compiler directive the last one wins.
    fn parse_declaration_prefix(&mut self) -> ParseResult<Prefix> {
        let mut prefix = Prefix {
            annotations: Vec::new(),
            compiler_directive: None,
            span: None,
        };
        loop {
            let span = match self.current_kind() {
                TokenKind::CompilerDirective(directive) => {
                    prefix.compiler_directive = Some(*directive);
                    self.advance().span()
                }
                TokenKind::Annotation(_) => {
                    let annotation = self.parse_annotation()?;
                    let span = annotation.span;
                    prefix.annotations.push(annotation);
                    span
                }
                _ => return Ok(prefix),
            };
            prefix.span = Some(prefix.span.map_or(span, |s| s.merge(span)));
        }
    }

    /// Parses `&Имя` with an optional parameter list.
    ///
    /// ```text
    /// &Перед("Метод")
    /// &Аннотация(П = 0, П2, Истина, "строка")
    /// ```
    pub(super) fn parse_annotation(&mut self) -> ParseResult<Annotation> {
        let token = self.advance();
        let TokenKind::Annotation(name) = token.kind() else {
            return Err(self.error_at(
                eco_format!("expected an annotation, found {}", token.kind().describe()),
                token.span(),
            ));
        };
        let name_span = Span::new(token.span().start() + 1, token.span().end());
        let name = Identifier::new(name.clone(), name_span);

        let mut params = Vec::new();
        let mut span = token.span();
        if self.match_token(&TokenKind::LeftParen) {
            if !self.check(&TokenKind::RightParen) {
                loop {
                    params.push(self.parse_annotation_param()?);
                    if !self.match_token(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            span = span.merge(self.expect(&TokenKind::RightParen)?.span());
        }

        Ok(Annotation { name, params, span })
    }

    /// `Имя`, `Имя = Значение` or a bare value.
    fn parse_annotation_param(&mut self) -> ParseResult<AnnotationParam> {
        if let TokenKind::Identifier(name) = self.current_kind() {
            let name = Identifier::new(name.clone(), self.current_token().span());
            self.advance();
            if self.match_token(&TokenKind::Equal) {
                let (value, value_span) = self.parse_constant()?;
                return Ok(AnnotationParam {
                    span: name.span.merge(value_span),
                    name: Some(name),
                    value: Some(value),
                });
            }
            return Ok(AnnotationParam {
                span: name.span,
                name: Some(name),
                value: None,
            });
        }
        let (value, span) = self.parse_constant()?;
        Ok(AnnotationParam {
            name: None,
            value: Some(value),
            span,
        })
    }

    // ========================================================================
    // Variables
    // ========================================================================

    /// `{Аннотация} Перем Имя [Экспорт] {, Имя [Экспорт]} [;]`
    ///
    /// Module and local variables share this rule. `Экспорт` is only
    /// accepted at module level.
    pub(super) fn parse_var_declaration(
        &mut self,
        allow_export: bool,
    ) -> ParseResult<VarDeclaration> {
        let prefix = self.parse_declaration_prefix()?;
        let var = self.expect_keyword(Keyword::Var)?;

        let mut declarators = Vec::new();
        loop {
            let name = self.expect_identifier("a variable name")?;
            let mut span = name.span;
            let export = allow_export && self.check_keyword(Keyword::Export);
            if export {
                span = span.merge(self.advance().span());
            }
            declarators.push(VarDeclarator { name, export, span });
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.match_token(&TokenKind::Semicolon);
        let end = self.previous_span();

        let start = prefix.span.unwrap_or(var.span());
        Ok(VarDeclaration {
            annotations: prefix.annotations,
            compiler_directive: prefix.compiler_directive,
            declarators,
            span: start.merge(end),
        })
    }

    /// Local `Перем` declarations at the start of a subroutine body.
    fn parse_local_vars(&mut self) -> ParseResult<Vec<VarDeclaration>> {
        let mut vars = Vec::new();
        while self.is_at_var_declaration() {
            vars.push(self.parse_var_declaration(false)?);
        }
        Ok(vars)
    }

    // ========================================================================
    // Subroutines
    // ========================================================================

    /// Parses a procedure or function declaration with its body.
    pub(super) fn parse_subroutine(&mut self) -> ParseResult<Subroutine> {
        let prefix = self.parse_declaration_prefix()?;
        let async_span = self.check_keyword(Keyword::Async).then(|| self.advance().span());
        let is_async = async_span.is_some();

        let (kind, end_keyword) = if self.check_keyword(Keyword::Procedure) {
            (SubroutineKind::Procedure, Keyword::EndProcedure)
        } else if self.check_keyword(Keyword::Function) {
            (SubroutineKind::Function, Keyword::EndFunction)
        } else {
            return Err(self.error_expected(&[
                eco_format!("`{}`", Keyword::Procedure),
                eco_format!("`{}`", Keyword::Function),
            ]));
        };
        let keyword_span = self.advance().span();
        let name = self.expect_identifier("a subroutine name")?;

        self.expect(&TokenKind::LeftParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                params.push(self.parse_param()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightParen)?;
        let export = self.match_keyword(Keyword::Export);

        self.context = SubroutineContext {
            is_async,
            params: params.iter().map(|p| p.name.name.as_str().to_lowercase()).collect(),
        };
        let body = self
            .parse_local_vars()
            .and_then(|vars| self.parse_block().map(|block| (vars, block)));
        self.context = SubroutineContext::default();
        let (vars, body) = body?;
        let end = self.expect_keyword(end_keyword)?;

        let start = prefix
            .span
            .or(async_span)
            .unwrap_or(keyword_span);
        Ok(Subroutine {
            annotations: prefix.annotations,
            compiler_directive: prefix.compiler_directive,
            is_async,
            kind,
            name,
            params,
            export,
            vars,
            body,
            span: start.merge(end.span()),
        })
    }

    /// `{Аннотация} [Знач] Имя [= Значение]`
    fn parse_param(&mut self) -> ParseResult<Parameter> {
        let mut annotations = Vec::new();
        while self.check(&TokenKind::Annotation(ecow::EcoString::new())) {
            annotations.push(self.parse_annotation()?);
        }
        let val_span = self.check_keyword(Keyword::Val).then(|| self.advance().span());
        let name = self.expect_identifier("a parameter name")?;
        let mut end = name.span;

        let default = if self.match_token(&TokenKind::Equal) {
            let (value, span) = self.parse_constant()?;
            end = span;
            Some(value)
        } else {
            None
        };

        let start = annotations
            .first()
            .map(|a| a.span)
            .or(val_span)
            .unwrap_or(name.span);
        Ok(Parameter {
            annotations,
            by_value: val_span.is_some(),
            name,
            default,
            span: start.merge(end),
        })
    }

    /// A default value or annotation value: a signed number, string, date
    /// or literal keyword.
    pub(super) fn parse_constant(&mut self) -> ParseResult<(Literal, Span)> {
        let sign = match self.current_kind() {
            TokenKind::Minus => Some("-"),
            TokenKind::Plus => Some("+"),
            _ => None,
        };
        if let Some(sign) = sign {
            let sign_span = self.advance().span();
            let TokenKind::Number(digits) = self.current_kind() else {
                return Err(self.error_expected(&["a number".into()]));
            };
            let text = if sign == "-" {
                eco_format!("-{digits}")
            } else {
                digits.clone()
            };
            let span = sign_span.merge(self.advance().span());
            return Ok((Literal::Number(text), span));
        }

        match self.parse_literal()? {
            Some(literal) => Ok(literal),
            None => Err(self.error_expected(&["a constant value".into()])),
        }
    }

    /// Expects an identifier and returns it as an AST node.
    pub(super) fn expect_identifier(&mut self, what: &str) -> ParseResult<Identifier> {
        if let TokenKind::Identifier(name) = self.current_kind() {
            let id = Identifier::new(name.clone(), self.current_token().span());
            self.advance();
            Ok(id)
        } else {
            Err(self.error_expected(&[what.into()]))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{File, Literal, Statement, SubroutineKind};
    use crate::source_analysis::{CompilerDirective, Environment, Span, parse};

    fn parse_ok(source: &str) -> File {
        match parse(source, &Environment::new()) {
            Ok(parsed) => parsed.file,
            Err(err) => panic!("parse failed for {source:?}: {err}"),
        }
    }

    fn parse_fails(source: &str) {
        assert!(parse(source, &Environment::new()).is_err(), "{source}");
    }

    #[test]
    fn module_var_forms() {
        for source in [
            "Перем ИмяПерем;",
            "Перем ИмяПерем Экспорт;",
            "&НаКлиенте\nПерем ИмяПерем Экспорт;",
            "&Аннотация\nПерем ИмяПерем;",
            "&Аннотация\n&ВтораяАннотация\nПерем ИмяПерем;",
            "&Аннотация\n#Область ИмяОбласти\n&ВтораяАннотация\nПерем ИмяПерем;\n#КонецОбласти",
        ] {
            let file = parse_ok(source);
            assert_eq!(file.module_vars.len(), 1, "{source}");
        }
    }

    #[test]
    fn module_var_semicolon_is_optional() {
        let file = parse_ok("Перем ИмяПерем");
        assert_eq!(file.module_vars[0].declarators[0].name.name, "ИмяПерем");
        assert_eq!(file.module_vars[0].span, Span::new(0, 27));

        let file = parse_ok("Перем А Экспорт
Перем Б, В
Процедура П()
КонецПроцедуры");
        assert_eq!(file.module_vars.len(), 2);
        assert!(file.module_vars[0].declarators[0].export);
        assert_eq!(file.module_vars[1].declarators.len(), 2);
        assert_eq!(file.subroutines.len(), 1);

        parse_fails("Перем ;");
        parse_fails("Перем А,;");
    }

    #[test]
    fn compiler_directive_on_module_var() {
        let file = parse_ok("&НаСервере\nПерем А;");
        assert_eq!(
            file.module_vars[0].compiler_directive,
            Some(CompilerDirective::AtServer)
        );
    }

    #[test]
    fn annotation_params() {
        let file = parse_ok(
            "&Аннотация(П = 0, П2, Истина, \"строка\", П3)\nПроцедура А()\nКонецПроцедуры",
        );
        let annotation = &file.subroutines[0].annotations[0];
        assert_eq!(annotation.name.name, "Аннотация");
        assert_eq!(annotation.params.len(), 5);
        assert_eq!(
            annotation.params[0].name.as_ref().map(|n| n.name.as_str()),
            Some("П")
        );
        assert_eq!(annotation.params[0].value, Some(Literal::Number("0".into())));
        assert!(annotation.params[1].value.is_none());
        assert_eq!(annotation.params[2].value, Some(Literal::Boolean(true)));
        assert!(annotation.params[3].name.is_none());
    }

    #[test]
    fn annotation_with_empty_params() {
        let file = parse_ok("&Аннотация()\nПроцедура А()\nКонецПроцедуры");
        assert!(file.subroutines[0].annotations[0].params.is_empty());
    }

    #[test]
    fn extension_annotation() {
        let file = parse_ok("&После(\"РегламентноеЗадание1\")\nПроцедура А()\nКонецПроцедуры");
        assert_eq!(
            file.subroutines[0].annotations[0].params[0].value,
            Some(Literal::String("РегламентноеЗадание1".into()))
        );
    }

    #[test]
    fn annotated_params() {
        let source = "Процедура САннотированнымиПараметрами(\n\t\n\t&АннотацияДляПараметра\n\
                      \tЗнач Парам1,\n\n\t&АннотацияДляПараметра\n\t&АннотацияДляПараметра1\n\
                      \t&АннотацияДляПараметра2(СПараметрами = 3, 4, 5)\n\tЗнач Парам2,\n\n\
                      \tПарам3,\n\tПарам4 = Неопределено\n) Экспорт\n\nКонецПроцедуры";
        let file = parse_ok(source);
        let params = &file.subroutines[0].params;
        assert_eq!(params.len(), 4);
        assert_eq!(params[0].annotations.len(), 1);
        assert_eq!(params[1].annotations.len(), 3);
        assert_eq!(params[1].annotations[2].params.len(), 3);
        assert_eq!(params[3].default, Some(Literal::Undefined));
        assert!(file.subroutines[0].export);
    }

    #[test]
    fn default_values() {
        let file = parse_ok(
            "Функция Ф(А = 0, Б = -1, В = +1, Г = ИСТИНА, Д = \"с\", Е = '20240101')\nКонецФункции",
        );
        let defaults: Vec<_> = file.subroutines[0]
            .params
            .iter()
            .map(|p| p.default.clone())
            .collect();
        assert_eq!(
            defaults,
            [
                Some(Literal::Number("0".into())),
                Some(Literal::Number("-1".into())),
                Some(Literal::Number("1".into())),
                Some(Literal::Boolean(true)),
                Some(Literal::String("с".into())),
                Some(Literal::Date("20240101".into())),
            ]
        );
        parse_fails("Функция Ф(А = Б)\nКонецФункции");
    }

    #[test]
    fn async_subroutines() {
        let file = parse_ok(
            "&ИзменениеИКонтроль(\"Тест\")\nАсинх Функция Тест(Параметры)\n\tВозврат Ложь;\nКонецФункции",
        );
        assert!(file.subroutines[0].is_async);
        assert_eq!(file.subroutines[0].kind, SubroutineKind::Function);

        let file =
            parse_ok("&НаКлиенте\nАсинх Процедура Тест(Параметры)\n\tВозврат;\nКонецПроцедуры");
        let proc = &file.subroutines[0];
        assert!(proc.is_async);
        assert_eq!(proc.compiler_directive, Some(CompilerDirective::AtClient));
    }

    #[test]
    fn local_vars() {
        let file = parse_ok("Процедура А()\nПерем Б, В;\nПерем Г;\nБ = 1;\nКонецПроцедуры");
        let proc = &file.subroutines[0];
        assert_eq!(proc.vars.len(), 2);
        assert_eq!(proc.vars[0].declarators.len(), 2);
        assert_eq!(proc.body.statements.len(), 1);
    }

    #[test]
    fn local_vars_share_the_module_rule() {
        let file = parse_ok("Процедура А()\nПерем Б\nБ = 1;\nКонецПроцедуры");
        let proc = &file.subroutines[0];
        assert_eq!(proc.vars[0].declarators[0].name.name, "Б");
        assert!(matches!(proc.body.statements[..], [Statement::Assignment { .. }]));

        let file = parse_ok("Процедура А()\n&Аннотация\nПерем Б;\nКонецПроцедуры");
        assert_eq!(file.subroutines[0].vars[0].annotations[0].name.name, "Аннотация");

        parse_fails("Процедура А()\nПерем Б Экспорт;\nКонецПроцедуры");
    }

    #[test]
    fn subroutine_span_covers_annotations_and_end() {
        let source = "&НаКлиенте\nПроцедура А()\nКонецПроцедуры";
        let file = parse_ok(source);
        let span = file.subroutines[0].span;
        assert_eq!(span.start(), 0);
        assert_eq!(span.end() as usize, source.len());
    }

    #[test]
    fn subroutines_after_statements_are_rejected() {
        parse_fails("А = 1;\nПроцедура Б()\nКонецПроцедуры");
    }
}
