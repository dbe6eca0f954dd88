// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lexer for method-description comments.
//!
//! Every character of the input lands in some token, so tokenizing never
//! fails. Section labels are soft keywords: `Параметры:` is a
//! [`DescriptionTokenKind::Parameters`] token, while `Параметры :` or
//! `NoParameters:` fall back to plain words and symbols. Multi-word labels
//! (`Возвращаемое значение:`) require exactly one space between the words
//! and no space before the terminator.

use ecow::EcoString;

use crate::source_analysis::Span;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// The kind of a description token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptionTokenKind {
    /// The `//` comment marker
    Comment,
    /// A run of spaces and tabs
    Space,
    /// A line break
    Eol,
    /// A run of letters, digits and underscores
    Word,
    /// Words joined by dots: `ОбщийМодуль.Метод`
    DotsWord,
    /// `:`
    Colon,
    /// Any other single character
    AnySymbol,
    /// `См. Модуль.Метод(...)` or `See Модуль.Метод(...)`
    Hyperlink,
    /// `Параметры:` / `Parameters:`
    Parameters,
    /// `Возвращаемое значение:` / `Returns:`
    Returns,
    /// `Пример:` / `Example:`
    Example,
    /// `Варианты вызова:` / `Call options:`
    CallOptions,
    /// `Устарела.` / `Deprecate.`
    Deprecate,
}

impl DescriptionTokenKind {
    /// Returns `true` for the section-label keywords.
    #[must_use]
    pub const fn is_keyword(self) -> bool {
        matches!(
            self,
            Self::Parameters | Self::Returns | Self::Example | Self::CallOptions | Self::Deprecate
        )
    }
}

/// A token of a method-description comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionToken {
    /// The token kind.
    pub kind: DescriptionTokenKind,
    /// The exact text of the token.
    pub text: EcoString,
    /// Byte span within the comment.
    pub span: Span,
}

/// Section labels: the words, separated by single spaces, then the terminator.
const KEYWORDS: &[(&str, DescriptionTokenKind)] = &[
    ("параметры:", DescriptionTokenKind::Parameters),
    ("parameters:", DescriptionTokenKind::Parameters),
    ("возвращаемое значение:", DescriptionTokenKind::Returns),
    ("returns:", DescriptionTokenKind::Returns),
    ("пример:", DescriptionTokenKind::Example),
    ("example:", DescriptionTokenKind::Example),
    ("варианты вызова:", DescriptionTokenKind::CallOptions),
    ("call options:", DescriptionTokenKind::CallOptions),
    ("устарела.", DescriptionTokenKind::Deprecate),
    ("deprecate.", DescriptionTokenKind::Deprecate),
];

/// Hyperlink lead-ins; each is followed by exactly one space.
const HYPERLINK_LEADS: &[&str] = &["см.", "see"];

/// Tokenizes a method-description comment.
///
/// ```
/// use bsl_core::method_description::{DescriptionTokenKind, tokenize};
///
/// let kinds: Vec<_> = tokenize("// Параметры:").into_iter().map(|t| t.kind).collect();
/// assert_eq!(
///     kinds,
///     [DescriptionTokenKind::Comment, DescriptionTokenKind::Space, DescriptionTokenKind::Parameters]
/// );
/// ```
#[must_use]
pub fn tokenize(comment: &str) -> Vec<DescriptionToken> {
    let start = if comment.starts_with(BYTE_ORDER_MARK) {
        BYTE_ORDER_MARK.len_utf8()
    } else {
        0
    };
    let mut tokens = Vec::new();
    let mut position = start;
    while let Some(rest) = comment.get(position..).filter(|rest| !rest.is_empty()) {
        let (kind, len) = next_token(rest);
        let end = position + len;
        tokens.push(DescriptionToken {
            kind,
            text: EcoString::from(&comment[position..end]),
            span: Span::from(position..end),
        });
        position = end;
    }
    tokens
}

/// Classifies the token at the start of `rest` and returns its byte length.
fn next_token(rest: &str) -> (DescriptionTokenKind, usize) {
    let Some(first) = rest.chars().next() else {
        return (DescriptionTokenKind::AnySymbol, 0);
    };
    match first {
        '/' if rest.starts_with("//") => {
            let len = rest.len() - rest.trim_start_matches('/').len();
            (DescriptionTokenKind::Comment, len)
        }
        ' ' | '\t' => {
            let len = rest.len() - rest.trim_start_matches([' ', '\t']).len();
            (DescriptionTokenKind::Space, len)
        }
        '\r' if rest.starts_with("\r\n") => (DescriptionTokenKind::Eol, 2),
        '\r' | '\n' => (DescriptionTokenKind::Eol, 1),
        ':' => (DescriptionTokenKind::Colon, 1),
        c if is_word_char(c) => word_token(rest),
        c => (DescriptionTokenKind::AnySymbol, c.len_utf8()),
    }
}

fn word_token(rest: &str) -> (DescriptionTokenKind, usize) {
    for (phrase, kind) in KEYWORDS {
        if let Some(len) = match_phrase(rest, phrase) {
            return (*kind, len);
        }
    }
    if let Some(len) = hyperlink_len(rest) {
        return (DescriptionTokenKind::Hyperlink, len);
    }
    let (len, dotted) = dotted_word_len(rest);
    if dotted {
        (DescriptionTokenKind::DotsWord, len)
    } else {
        (DescriptionTokenKind::Word, len)
    }
}

/// Matches `phrase` case-insensitively at the start of `text`.
///
/// Returns the matched byte length in `text`.
fn match_phrase(text: &str, phrase: &str) -> Option<usize> {
    let mut chars = text.char_indices();
    for expected in phrase.chars() {
        let (_, actual) = chars.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    Some(chars.next().map_or(text.len(), |(offset, _)| offset))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn word_len(text: &str) -> usize {
    text.find(|c: char| !is_word_char(c)).unwrap_or(text.len())
}

/// Length of `Word(.Word)*` at the start of `text`, and whether it had a dot.
fn dotted_word_len(text: &str) -> (usize, bool) {
    let mut len = word_len(text);
    let mut dotted = false;
    while let Some(after_dot) = text[len..].strip_prefix('.') {
        let next = word_len(after_dot);
        if next == 0 {
            break;
        }
        len += 1 + next;
        dotted = true;
    }
    (len, dotted)
}

/// Length of a hyperlink at the start of `text`, if there is one.
///
/// The lead-in must be a whole word followed by exactly one space and a
/// reference; an argument list in parentheses is included when it closes on
/// the same line.
fn hyperlink_len(text: &str) -> Option<usize> {
    let lead = HYPERLINK_LEADS
        .iter()
        .find_map(|lead| match_phrase(text, lead))?;
    let after_space = text[lead..].strip_prefix(' ')?;
    let (reference, _) = dotted_word_len(after_space);
    if reference == 0 {
        return None;
    }
    let mut len = lead + 1 + reference;
    if let Some(args) = text[len..].strip_prefix('(') {
        let line = args.split(['\r', '\n']).next().unwrap_or_default();
        if let Some(close) = line.find(')') {
            len += close + 2;
        }
    }
    Some(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::DescriptionTokenKind::{
        AnySymbol, CallOptions, Colon, Comment, Deprecate, DotsWord, Eol, Example, Hyperlink,
        Parameters, Returns, Space, Word,
    };

    fn kinds(input: &str) -> Vec<DescriptionTokenKind> {
        tokenize(input).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn whitespace() {
        assert_eq!(kinds("//   А"), [Comment, Space, Word]);
        assert_eq!(kinds("// А\n// Б"), [Comment, Space, Word, Eol, Comment, Space, Word]);
        assert_eq!(kinds("А\r\nБ"), [Word, Eol, Word]);
    }

    #[test]
    fn byte_order_mark_is_skipped() {
        let tokens = tokenize("\u{feff}Процедура");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, Word);
        assert_eq!(tokens[0].text, "Процедура");
        assert_eq!(tokens[0].span, Span::new(3, 21));
    }

    #[test]
    fn hyperlinks() {
        assert_eq!(kinds("СМ"), [Word]);
        assert_eq!(kinds("СМСМ"), [Word]);
        assert_eq!(kinds("SEE"), [Word]);
        assert_eq!(kinds("СМ."), [Word, AnySymbol]);
        assert_eq!(kinds("СМ. ОбщийМодуль"), [Hyperlink]);
        assert_eq!(kinds("SEE ОбщийМодуль"), [Hyperlink]);
        assert_eq!(kinds("SEE  ОбщийМодуль"), [Word, Space, Word]);
        assert_eq!(kinds("SSEE ОбщийМодуль"), [Word, Space, Word]);
        assert_eq!(kinds("СМ. ОбщийМодуль.Метод"), [Hyperlink]);
        assert_eq!(kinds("SEE ОбщийМодуль.Метод"), [Hyperlink]);
        assert_eq!(kinds("SEE ОбщийМодуль.Метод()"), [Hyperlink]);
        assert_eq!(
            kinds("СМ. ОбщийМодуль.Метод(Параметра, Значение, \"\t+-'sdsds\")"),
            [Hyperlink]
        );
        assert_eq!(kinds("SEE ОбщийМодуль.Метод() WORD"), [Hyperlink, Space, Word]);
        assert_eq!(
            kinds("SEE. ОбщийМодуль.Метод() WORD"),
            [Word, AnySymbol, Space, DotsWord, AnySymbol, AnySymbol, Space, Word]
        );
        assert_eq!(
            kinds("СМ.   ОбщийМодуль.Метод() WORD"),
            [Word, AnySymbol, Space, DotsWord, AnySymbol, AnySymbol, Space, Word]
        );
        assert_eq!(kinds("см. Модуль"), [Hyperlink]);
    }

    #[test]
    fn unclosed_hyperlink_arguments_stay_outside() {
        assert_eq!(
            kinds("См. Модуль.Метод(А\n)"),
            [Hyperlink, AnySymbol, Word, Eol, AnySymbol]
        );
    }

    #[test]
    fn parameters() {
        assert_eq!(kinds("Параметры"), [Word]);
        assert_eq!(kinds("Parameters"), [Word]);
        assert_eq!(kinds("NoParameters:"), [Word, Colon]);
        assert_eq!(kinds("Параметры:"), [Parameters]);
        assert_eq!(kinds("Parameters:"), [Parameters]);
        assert_eq!(kinds("Параметры :"), [Word, Space, Colon]);
    }

    #[test]
    fn returns() {
        assert_eq!(kinds("Возвращаемое значение"), [Word, Space, Word]);
        assert_eq!(kinds("RETURNS"), [Word]);
        assert_eq!(kinds("Возвращаемое  значение:"), [Word, Space, Word, Colon]);
        assert_eq!(kinds("RETURNS :"), [Word, Space, Colon]);
        assert_eq!(kinds("Возвращаемое значение:"), [Returns]);
        assert_eq!(kinds("RETURNS:"), [Returns]);
        assert_eq!(kinds("НеВозвращаемое значение:"), [Word, Space, Word, Colon]);
        assert_eq!(kinds("НЕRETURNS:"), [Word, Colon]);
    }

    #[test]
    fn example() {
        assert_eq!(kinds("Пример"), [Word]);
        assert_eq!(kinds("ПримерЫ"), [Word]);
        assert_eq!(kinds("Example"), [Word]);
        assert_eq!(kinds("Examples"), [Word]);
        assert_eq!(kinds("Примеры:"), [Word, Colon]);
        assert_eq!(kinds("Examples:"), [Word, Colon]);
        assert_eq!(kinds("Пример:"), [Example]);
        assert_eq!(kinds("Example:"), [Example]);
        assert_eq!(kinds("Пример :"), [Word, Space, Colon]);
        assert_eq!(kinds("NoExample:"), [Word, Colon]);
    }

    #[test]
    fn call_options() {
        assert_eq!(kinds("Варианты вызова"), [Word, Space, Word]);
        assert_eq!(kinds("Call options"), [Word, Space, Word]);
        assert_eq!(kinds("Варианты  вызова:"), [Word, Space, Word, Colon]);
        assert_eq!(kinds("Call options :"), [Word, Space, Word, Space, Colon]);
        assert_eq!(kinds("Варианты вызова:"), [CallOptions]);
        assert_eq!(kinds("Call options:"), [CallOptions]);
        assert_eq!(kinds("Вариант вызова:"), [Word, Space, Word, Colon]);
        assert_eq!(kinds("Call option:"), [Word, Space, Word, Colon]);
    }

    #[test]
    fn deprecate() {
        assert_eq!(kinds("Устарела"), [Word]);
        assert_eq!(kinds("Deprecate"), [Word]);
        assert_eq!(kinds("Depricate"), [Word]);
        assert_eq!(kinds("Устарела."), [Deprecate]);
        assert_eq!(kinds("Deprecate."), [Deprecate]);
        assert_eq!(kinds("Устарела ."), [Word, Space, AnySymbol]);
        assert_eq!(kinds("Deprecate:"), [Word, Colon]);
    }

    #[test]
    fn every_character_is_covered() {
        let input = "// Параметры:\n//  Имя - Строка - «имя» файла; см. ниже…\r\n";
        let tokens = tokenize(input);
        let rebuilt: String = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(rebuilt, input);
        for pair in tokens.windows(2) {
            assert_eq!(pair[0].span.end(), pair[1].span.start());
        }
    }
}
