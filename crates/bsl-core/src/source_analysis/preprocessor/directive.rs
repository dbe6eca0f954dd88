// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Parsing of a single directive line into a [`Directive`] node.

use crate::ast::{Directive, DirectiveKind, Identifier, LibraryReference};
use crate::source_analysis::{
    DirectiveError, DirectiveErrorKind, DirectiveKeyword, LineColumn, Span, Token, TokenKind,
};

use super::expression::parse_condition;

/// Parses one directive line: the `#` token and every directive-channel
/// token after it on the same line.
pub(super) fn parse_directive_line(line: &[Token]) -> Result<Directive, DirectiveError> {
    let Some((hash, rest)) = line.split_first() else {
        return Err(DirectiveError::new(
            DirectiveErrorKind::UnknownDirective("".into()),
            Span::default(),
            LineColumn::default(),
        ));
    };
    let last = line.last().unwrap_or(hash);
    let span = hash.span().merge(last.span());
    let line_end = (last.span(), last.position());

    let Some((keyword_token, args)) = rest.split_first() else {
        return Err(DirectiveError::new(
            DirectiveErrorKind::UnknownDirective("#".into()),
            hash.span(),
            hash.position(),
        ));
    };
    let TokenKind::Directive(keyword) = keyword_token.kind() else {
        return Err(DirectiveError::new(
            DirectiveErrorKind::UnknownDirective(keyword_token.text().into()),
            keyword_token.span(),
            keyword_token.position(),
        ));
    };

    let kind = match keyword {
        DirectiveKeyword::If => DirectiveKind::If(parse_condition(args, line_end)?),
        DirectiveKeyword::ElseIf => DirectiveKind::ElseIf(parse_condition(args, line_end)?),
        DirectiveKeyword::Region => {
            let Some((name, extra)) = args.split_first() else {
                return Err(DirectiveError::new(
                    DirectiveErrorKind::MissingRegionName,
                    keyword_token.span(),
                    keyword_token.position(),
                ));
            };
            if !matches!(name.kind(), TokenKind::Identifier(_) | TokenKind::Keyword(_)) {
                return Err(DirectiveError::new(
                    DirectiveErrorKind::MissingRegionName,
                    name.span(),
                    name.position(),
                ));
            }
            expect_end(extra)?;
            DirectiveKind::Region(Identifier::new(name.text(), name.span()))
        }
        DirectiveKeyword::Use => {
            let Some((reference, extra)) = args.split_first() else {
                return Err(DirectiveError::new(
                    DirectiveErrorKind::MissingLibraryReference,
                    keyword_token.span(),
                    keyword_token.position(),
                ));
            };
            let TokenKind::UseReference(name) = reference.kind() else {
                return Err(DirectiveError::new(
                    DirectiveErrorKind::MissingLibraryReference,
                    reference.span(),
                    reference.position(),
                ));
            };
            expect_end(extra)?;
            DirectiveKind::Use(LibraryReference {
                name: name.clone(),
                quoted: reference.text().starts_with('"'),
                span: reference.span(),
            })
        }
        DirectiveKeyword::Else => without_arguments(args, DirectiveKind::Else)?,
        DirectiveKeyword::EndIf => without_arguments(args, DirectiveKind::EndIf)?,
        DirectiveKeyword::EndRegion => without_arguments(args, DirectiveKind::EndRegion)?,
        DirectiveKeyword::Insert => without_arguments(args, DirectiveKind::Insert)?,
        DirectiveKeyword::EndInsert => without_arguments(args, DirectiveKind::EndInsert)?,
        DirectiveKeyword::Delete => without_arguments(args, DirectiveKind::Delete)?,
        DirectiveKeyword::EndDelete => without_arguments(args, DirectiveKind::EndDelete)?,
    };

    Ok(Directive { kind, span })
}

fn without_arguments(args: &[Token], kind: DirectiveKind) -> Result<DirectiveKind, DirectiveError> {
    expect_end(args)?;
    Ok(kind)
}

fn expect_end(extra: &[Token]) -> Result<(), DirectiveError> {
    match extra.first() {
        Some(token) => Err(DirectiveError::new(
            DirectiveErrorKind::UnexpectedTokens,
            token.span(),
            token.position(),
        )),
        None => Ok(()),
    }
}
