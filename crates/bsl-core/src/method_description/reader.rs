// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Section reader for method-description comments.
//!
//! A description is read line by line. A line that starts with a section
//! keyword switches the current section; every other line is text of the
//! current section. Text before the first keyword is the purpose.

use ecow::EcoString;
use tracing::debug;

use super::lexer::{DescriptionToken, DescriptionTokenKind, tokenize};
use crate::source_analysis::Span;

/// The sections of a method-description comment.
///
/// Section text has the comment markers and the single space after them
/// removed; lines are joined with `\n`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MethodDescription {
    /// Text before the first section keyword.
    pub purpose: EcoString,
    /// Entries of the form `Имя - описание` from the parameters section.
    pub parameters: Vec<ParameterDescription>,
    /// Full text of the parameters section, if present.
    pub parameters_text: Option<EcoString>,
    pub returns: Option<EcoString>,
    pub examples: Option<EcoString>,
    pub call_options: Option<EcoString>,
    /// Text following `Устарела.`, if present.
    pub deprecated: Option<EcoString>,
    /// `См. ...` references found anywhere in the comment.
    pub hyperlinks: Vec<Hyperlink>,
}

/// One documented parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescription {
    pub name: EcoString,
    /// Everything after the dash, continuation lines included.
    pub description: EcoString,
}

/// A reference to another method or module: `См. ОбщийМодуль.Метод(А, Б)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hyperlink {
    /// The dotted reference: `ОбщийМодуль.Метод`.
    pub target: EcoString,
    /// Text between the parentheses, when an argument list is present.
    pub arguments: Option<EcoString>,
    /// Span of the whole hyperlink, lead-in included.
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Purpose,
    Parameters,
    Returns,
    Examples,
    CallOptions,
    Deprecated,
}

impl SectionKind {
    fn from_keyword(kind: DescriptionTokenKind) -> Option<Self> {
        match kind {
            DescriptionTokenKind::Parameters => Some(Self::Parameters),
            DescriptionTokenKind::Returns => Some(Self::Returns),
            DescriptionTokenKind::Example => Some(Self::Examples),
            DescriptionTokenKind::CallOptions => Some(Self::CallOptions),
            DescriptionTokenKind::Deprecate => Some(Self::Deprecated),
            _ => None,
        }
    }
}

/// Accumulates the lines of each section.
#[derive(Debug, Default)]
struct Sections {
    purpose: Vec<String>,
    parameters: Option<Vec<String>>,
    returns: Option<Vec<String>>,
    examples: Option<Vec<String>>,
    call_options: Option<Vec<String>>,
    deprecated: Option<Vec<String>>,
}

impl Sections {
    fn lines_mut(&mut self, kind: SectionKind) -> &mut Vec<String> {
        match kind {
            SectionKind::Purpose => &mut self.purpose,
            SectionKind::Parameters => self.parameters.get_or_insert_with(Vec::new),
            SectionKind::Returns => self.returns.get_or_insert_with(Vec::new),
            SectionKind::Examples => self.examples.get_or_insert_with(Vec::new),
            SectionKind::CallOptions => self.call_options.get_or_insert_with(Vec::new),
            SectionKind::Deprecated => self.deprecated.get_or_insert_with(Vec::new),
        }
    }
}

impl MethodDescription {
    /// Reads a method-description comment. Never fails: text that does not
    /// fit the expected layout stays in the current section.
    ///
    /// ```
    /// use bsl_core::method_description::MethodDescription;
    ///
    /// let description = MethodDescription::parse(
    ///     "// Складывает числа.\n// Параметры:\n//  А - Число - слагаемое\n// Возвращаемое значение:\n// Число",
    /// );
    /// assert_eq!(description.purpose, "Складывает числа.");
    /// assert_eq!(description.parameters[0].name, "А");
    /// assert_eq!(description.returns.as_deref(), Some("Число"));
    /// ```
    #[must_use]
    pub fn parse(comment: &str) -> Self {
        let tokens = tokenize(comment);
        let mut sections = Sections::default();
        let mut parameters: Vec<ParameterDescription> = Vec::new();
        let mut hyperlinks = Vec::new();
        let mut current = SectionKind::Purpose;

        for line in tokens.split(|t| t.kind == DescriptionTokenKind::Eol) {
            hyperlinks.extend(
                line.iter()
                    .filter(|t| t.kind == DescriptionTokenKind::Hyperlink)
                    .map(read_hyperlink),
            );

            let mut content = line_body(line);
            let first_word = skip_spaces(content);
            if let Some(section) = first_word
                .first()
                .and_then(|t| SectionKind::from_keyword(t.kind))
            {
                current = section;
                sections.lines_mut(current);
                content = skip_spaces(&first_word[1..]);
                if content.is_empty() {
                    continue;
                }
            }

            let text = join_text(content);
            if current == SectionKind::Parameters {
                match parameter_entry(content) {
                    Some(entry) => parameters.push(entry),
                    None => {
                        if let Some(last) = parameters.last_mut() {
                            let trimmed = text.trim();
                            if !trimmed.is_empty() {
                                last.description = if last.description.is_empty() {
                                    EcoString::from(trimmed)
                                } else {
                                    ecow::eco_format!("{}\n{trimmed}", last.description)
                                };
                            }
                        }
                    }
                }
            }
            sections.lines_mut(current).push(text);
        }

        let description = Self {
            purpose: join_lines(&sections.purpose),
            parameters,
            parameters_text: sections.parameters.as_deref().map(join_lines),
            returns: sections.returns.as_deref().map(join_lines),
            examples: sections.examples.as_deref().map(join_lines),
            call_options: sections.call_options.as_deref().map(join_lines),
            deprecated: sections.deprecated.as_deref().map(join_lines),
            hyperlinks,
        };
        debug!(
            parameters = description.parameters.len(),
            hyperlinks = description.hyperlinks.len(),
            deprecated = description.is_deprecated(),
            "read method description"
        );
        description
    }

    /// Returns `true` if the description carries `Устарела.`.
    #[must_use]
    pub fn is_deprecated(&self) -> bool {
        self.deprecated.is_some()
    }
}

/// Drops leading indentation and the `//` marker.
fn line_body(line: &[DescriptionToken]) -> &[DescriptionToken] {
    let rest = skip_spaces(line);
    match rest.first() {
        Some(t) if t.kind == DescriptionTokenKind::Comment => &rest[1..],
        _ => rest,
    }
}

fn skip_spaces(tokens: &[DescriptionToken]) -> &[DescriptionToken] {
    let start = tokens
        .iter()
        .position(|t| t.kind != DescriptionTokenKind::Space)
        .unwrap_or(tokens.len());
    &tokens[start..]
}

/// Joins token texts, dropping one separator space after `//` and trailing
/// whitespace.
fn join_text(tokens: &[DescriptionToken]) -> String {
    let mut text: String = tokens.iter().map(|t| t.text.as_str()).collect();
    if let Some(stripped) = text.strip_prefix(' ') {
        text = stripped.to_string();
    }
    text.trim_end().to_string()
}

/// Joins section lines, dropping blank lines at either end.
fn join_lines(lines: &[String]) -> EcoString {
    let first = lines.iter().position(|l| !l.trim().is_empty());
    let last = lines.iter().rposition(|l| !l.trim().is_empty());
    match (first, last) {
        (Some(first), Some(last)) => EcoString::from(lines[first..=last].join("\n")),
        _ => EcoString::new(),
    }
}

/// Reads `Имя - описание`; the dash may be a hyphen, en dash or em dash.
fn parameter_entry(content: &[DescriptionToken]) -> Option<ParameterDescription> {
    let content = skip_spaces(content);
    let name = content.first().filter(|t| t.kind == DescriptionTokenKind::Word)?;
    let rest = skip_spaces(&content[1..]);
    rest.first()
        .filter(|t| t.kind == DescriptionTokenKind::AnySymbol && is_dash(&t.text))?;
    Some(ParameterDescription {
        name: name.text.clone(),
        description: EcoString::from(join_text(&rest[1..]).trim()),
    })
}

fn is_dash(text: &str) -> bool {
    matches!(text, "-" | "\u{2013}" | "\u{2014}")
}

fn read_hyperlink(token: &DescriptionToken) -> Hyperlink {
    let reference = token
        .text
        .split_once(' ')
        .map_or("", |(_, reference)| reference);
    let (target, arguments) = match reference.split_once('(') {
        Some((target, args)) if args.ends_with(')') => (
            target,
            Some(EcoString::from(&args[..args.len() - 1])),
        ),
        _ => (reference, None),
    };
    Hyperlink {
        target: EcoString::from(target),
        arguments,
        span: token.span,
    }
}
