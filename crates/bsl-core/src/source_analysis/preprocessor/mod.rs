// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Preprocessor region engine.
//!
//! Walks the raw token stream, resolves every directive line and moves the
//! tokens the grammar must not see to [`Channel::Deleted`]:
//!
//! - code in a `#Если`/`#ИначеЕсли`/`#Иначе` branch that is not taken;
//! - code between `#Удаление` and `#КонецУдаления`.
//!
//! Code between `#Вставка` and `#КонецВставки` stays visible. Directive lines
//! themselves stay on [`Channel::Directive`], or move to `Deleted` when they
//! sit in dead code. `#Область` pairs only build the [`Region`] tree.
//!
//! Tokens are never removed, so the raw and the effective text of any span
//! remain available (see [`visible_text`]).
//!
//! # Conditional blocks
//!
//! Each `#Если` opens a frame that moves through three states:
//!
//! ```text
//! Seeking --(condition true / #Иначе)--> Active --(#ИначеЕсли / #Иначе)--> Done
//! ```
//!
//! A frame opened in dead code starts and stays `Done`; its conditions are
//! never evaluated, but its `#КонецЕсли` still closes it.

mod directive;
mod expression;

pub use expression::evaluate;

use ecow::EcoString;
use tracing::{debug, trace};

use crate::ast::{Directive, DirectiveKind, Identifier, Region};
use crate::source_analysis::{
    Channel, DirectiveError, DirectiveErrorKind, Environment, LineColumn, Span, Token, TokenKind,
};

use directive::parse_directive_line;

/// Result of running the region engine over a token stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessed {
    /// Every token of the file with its final channel.
    pub tokens: Vec<Token>,
    /// Live directives in source order.
    pub directives: Vec<AnchoredDirective>,
    /// Top-level `#Область` regions.
    pub regions: Vec<Region>,
}

/// A live directive and the index of its `#` token in [`Preprocessed::tokens`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnchoredDirective {
    pub directive: Directive,
    pub token_index: usize,
}

/// Joins the lexemes of the visible tokens inside `span`, with no separator.
///
/// Directive markers and deleted code contribute nothing, so a statement
/// patched with `#Удаление`/`#Вставка` reads as the code that is compiled.
#[must_use]
pub fn visible_text(tokens: &[Token], span: Span) -> String {
    tokens
        .iter()
        .filter(|t| t.is_visible() && !t.kind().is_eof() && span.contains(t.span()))
        .map(Token::text)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BranchState {
    /// No branch taken yet.
    Seeking,
    /// The current branch is taken.
    Active,
    /// A branch was taken earlier, or the block sits in dead code.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Conditional { state: BranchState, seen_else: bool },
    Insert,
    Delete,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    kind: FrameKind,
    /// Code around the block was live when the block was opened.
    parent_live: bool,
    opener: (Span, LineColumn),
}

impl Frame {
    fn allows(self) -> bool {
        match self.kind {
            FrameKind::Conditional { state, .. } => state == BranchState::Active,
            FrameKind::Insert => true,
            FrameKind::Delete => false,
        }
    }

    fn opener_name(self) -> &'static str {
        match self.kind {
            FrameKind::Conditional { .. } => "#Если",
            FrameKind::Insert => "#Вставка",
            FrameKind::Delete => "#Удаление",
        }
    }
}

struct OpenRegion {
    name: Identifier,
    start: Span,
    children: Vec<Region>,
    opener: (Span, LineColumn),
}

struct Engine<'env> {
    env: &'env Environment,
    frames: Vec<Frame>,
    regions: Vec<OpenRegion>,
    finished_regions: Vec<Region>,
    directives: Vec<AnchoredDirective>,
}

/// Resolves directives and assigns final channels.
///
/// # Errors
///
/// Returns a [`DirectiveError`] for a malformed directive line, a closing or
/// continuation directive without its opener, or a block left open at end
/// of file. There is no recovery across directive mismatches.
#[tracing::instrument(level = "debug", skip_all, fields(tokens = tokens.len()))]
pub fn preprocess(
    mut tokens: Vec<Token>,
    env: &Environment,
) -> Result<Preprocessed, DirectiveError> {
    let mut engine = Engine {
        env,
        frames: Vec::new(),
        regions: Vec::new(),
        finished_regions: Vec::new(),
        directives: Vec::new(),
    };

    let mut index = 0;
    while index < tokens.len() {
        let token = &tokens[index];
        if token.channel() == Channel::Directive && matches!(token.kind(), TokenKind::Hash) {
            let position = token.position();
            let line_end = directive_line_end(&tokens, index);
            let directive = parse_directive_line(&tokens[index..line_end])?;
            let live = engine.apply(directive, index, position)?;
            if !live {
                for token in &mut tokens[index..line_end] {
                    token.set_channel(Channel::Deleted);
                }
            }
            index = line_end;
            continue;
        }
        if token.channel() == Channel::Visible && !token.kind().is_eof() && !engine.is_live() {
            tokens[index].set_channel(Channel::Deleted);
        }
        index += 1;
    }

    engine.finish()?;
    debug!(
        directives = engine.directives.len(),
        deleted = tokens
            .iter()
            .filter(|t| t.channel() == Channel::Deleted)
            .count(),
        "resolved preprocessor directives"
    );
    Ok(Preprocessed {
        tokens,
        directives: engine.directives,
        regions: engine.finished_regions,
    })
}

/// Index one past the last token of the directive line starting at `start`.
fn directive_line_end(tokens: &[Token], start: usize) -> usize {
    tokens[start + 1..]
        .iter()
        .position(|t| t.channel() != Channel::Directive || matches!(t.kind(), TokenKind::Hash))
        .map_or(tokens.len(), |offset| start + 1 + offset)
}

impl Engine<'_> {
    fn is_live(&self) -> bool {
        self.frames.iter().all(|frame| frame.allows())
    }

    /// Applies one directive; returns whether it is live (recorded).
    fn apply(
        &mut self,
        directive: Directive,
        token_index: usize,
        position: LineColumn,
    ) -> Result<bool, DirectiveError> {
        let live = self.is_live();
        let at = (directive.span, position);
        let recorded = match &directive.kind {
            DirectiveKind::If(condition) => {
                let state = if live {
                    let taken = evaluate(condition, self.env);
                    trace!(?condition, taken, "evaluated #Если");
                    if taken {
                        BranchState::Active
                    } else {
                        BranchState::Seeking
                    }
                } else {
                    BranchState::Done
                };
                self.push(
                    FrameKind::Conditional {
                        state,
                        seen_else: false,
                    },
                    live,
                    at,
                );
                live
            }
            DirectiveKind::ElseIf(condition) => {
                let env = self.env;
                let (state, _, parent_live) = self.conditional_frame("#ИначеЕсли", at)?;
                if parent_live {
                    *state = match *state {
                        BranchState::Seeking => {
                            let taken = evaluate(condition, env);
                            trace!(?condition, taken, "evaluated #ИначеЕсли");
                            if taken {
                                BranchState::Active
                            } else {
                                BranchState::Seeking
                            }
                        }
                        BranchState::Active | BranchState::Done => BranchState::Done,
                    };
                }
                parent_live
            }
            DirectiveKind::Else => {
                let (state, seen_else, parent_live) = self.conditional_frame("#Иначе", at)?;
                *seen_else = true;
                if parent_live {
                    *state = match *state {
                        BranchState::Seeking => BranchState::Active,
                        BranchState::Active | BranchState::Done => BranchState::Done,
                    };
                    trace!(taken = *state == BranchState::Active, "evaluated #Иначе");
                }
                parent_live
            }
            DirectiveKind::EndIf => self.pop(
                |kind| matches!(kind, FrameKind::Conditional { .. }),
                "#КонецЕсли",
                at,
            )?,
            DirectiveKind::Insert => {
                self.push(FrameKind::Insert, live, at);
                live
            }
            DirectiveKind::EndInsert => {
                self.pop(|kind| kind == FrameKind::Insert, "#КонецВставки", at)?
            }
            DirectiveKind::Delete => {
                self.push(FrameKind::Delete, live, at);
                live
            }
            DirectiveKind::EndDelete => {
                self.pop(|kind| kind == FrameKind::Delete, "#КонецУдаления", at)?
            }
            DirectiveKind::Region(name) => {
                if live {
                    self.regions.push(OpenRegion {
                        name: name.clone(),
                        start: directive.span,
                        children: Vec::new(),
                        opener: at,
                    });
                }
                live
            }
            DirectiveKind::EndRegion => {
                if live {
                    let Some(open) = self.regions.pop() else {
                        return Err(unmatched("#КонецОбласти", at));
                    };
                    let region = Region {
                        name: open.name,
                        span: open.start.merge(directive.span),
                        children: open.children,
                    };
                    match self.regions.last_mut() {
                        Some(parent) => parent.children.push(region),
                        None => self.finished_regions.push(region),
                    }
                }
                live
            }
            DirectiveKind::Use(_) => live,
        };

        if recorded {
            self.directives.push(AnchoredDirective {
                directive,
                token_index,
            });
        }
        Ok(recorded)
    }

    fn push(&mut self, kind: FrameKind, parent_live: bool, opener: (Span, LineColumn)) {
        self.frames.push(Frame {
            kind,
            parent_live,
            opener,
        });
    }

    /// The innermost frame, which must be an open conditional without `#Иначе`.
    /// Returns its state, its `#Иначе` flag and whether its parent is live.
    fn conditional_frame(
        &mut self,
        name: &'static str,
        at: (Span, LineColumn),
    ) -> Result<(&mut BranchState, &mut bool, bool), DirectiveError> {
        match self.frames.last_mut() {
            Some(Frame {
                kind: FrameKind::Conditional { state, seen_else },
                parent_live,
                ..
            }) if !*seen_else => Ok((state, seen_else, *parent_live)),
            _ => Err(unmatched(name, at)),
        }
    }

    /// Closes the innermost frame if `accepts` allows it; returns whether
    /// the closing directive is live.
    fn pop(
        &mut self,
        accepts: impl Fn(FrameKind) -> bool,
        name: &'static str,
        at: (Span, LineColumn),
    ) -> Result<bool, DirectiveError> {
        match self.frames.last() {
            Some(frame) if accepts(frame.kind) => {
                let live = frame.parent_live;
                self.frames.pop();
                Ok(live)
            }
            _ => Err(unmatched(name, at)),
        }
    }

    fn finish(&self) -> Result<(), DirectiveError> {
        if let Some(frame) = self.frames.last() {
            return Err(DirectiveError::new(
                DirectiveErrorKind::Unterminated(frame.opener_name().into()),
                frame.opener.0,
                frame.opener.1,
            ));
        }
        if let Some(region) = self.regions.last() {
            return Err(DirectiveError::new(
                DirectiveErrorKind::Unterminated(EcoString::from("#Область")),
                region.opener.0,
                region.opener.1,
            ));
        }
        Ok(())
    }
}

fn unmatched(name: &'static str, at: (Span, LineColumn)) -> DirectiveError {
    DirectiveError::new(DirectiveErrorKind::Unmatched(name.into()), at.0, at.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_analysis::{PreprocSymbol, tokenize};

    fn run(source: &str, env: &Environment) -> Result<Preprocessed, DirectiveError> {
        preprocess(tokenize(source).unwrap(), env)
    }

    fn visible(source: &str, env: &Environment) -> Vec<String> {
        run(source, env)
            .unwrap()
            .tokens
            .iter()
            .filter(|t| t.is_visible() && !t.kind().is_eof())
            .map(|t| t.text().to_string())
            .collect()
    }

    fn server() -> Environment {
        Environment::new().with(PreprocSymbol::Server, true)
    }

    #[test]
    fn taken_branch_stays_visible() {
        let source = "#Если Сервер Тогда\nА = 1;\n#Иначе\nБ = 2;\n#КонецЕсли";
        assert_eq!(visible(source, &server()), ["А", "=", "1", ";"]);
        assert_eq!(visible(source, &Environment::new()), ["Б", "=", "2", ";"]);
    }

    #[test]
    fn first_true_branch_wins() {
        let source = "#Если Клиент Тогда\nА\n#ИначеЕсли Сервер Тогда\nБ\n\
                      #ИначеЕсли НЕ Клиент Тогда\nВ\n#Иначе\nГ\n#КонецЕсли";
        assert_eq!(visible(source, &server()), ["Б"]);
        assert_eq!(visible(source, &Environment::new()), ["В"]);
        let client = Environment::new().with(PreprocSymbol::Client, true);
        assert_eq!(visible(source, &client), ["А"]);
    }

    #[test]
    fn unknown_symbol_defaults_to_false() {
        let source = "#Если НеизвестныйСимвол Тогда\nА\n#КонецЕсли\nБ";
        assert_eq!(visible(source, &Environment::new()), ["Б"]);
    }

    #[test]
    fn nested_blocks_in_dead_code_are_tracked() {
        let source = "#Если Клиент Тогда\n\
                      #Если Сервер Тогда\nА\n#Иначе\nБ\n#КонецЕсли\n\
                      #Иначе\nВ\n#КонецЕсли";
        let result = run(source, &server()).unwrap();
        let texts: Vec<_> = result
            .tokens
            .iter()
            .filter(|t| t.is_visible() && !t.kind().is_eof())
            .map(Token::text)
            .collect();
        assert_eq!(texts, ["В"]);
        // only the outer chain is live: #Если, #Иначе, #КонецЕсли
        assert_eq!(result.directives.len(), 3);
        let nested_hash = result
            .tokens
            .iter()
            .filter(|t| matches!(t.kind(), TokenKind::Hash))
            .nth(1)
            .unwrap();
        assert_eq!(nested_hash.channel(), Channel::Deleted);
    }

    #[test]
    fn delete_and_insert_blocks() {
        let source = "Если СтароеУсловие\n\
                      #Удаление\nИ Старое\n#КонецУдаления\n\
                      #Вставка\nИ Новое\n#КонецВставки\nТогда";
        let result = run(source, &Environment::new()).unwrap();
        let span = Span::new(0, u32::try_from(source.len()).unwrap());
        assert_eq!(
            visible_text(&result.tokens, span),
            "ЕслиСтароеУсловиеИНовоеТогда"
        );
        assert!(result.tokens.iter().any(|t| t.text() == "Старое"
            && t.channel() == Channel::Deleted));
    }

    #[test]
    fn insert_inside_dead_branch_stays_dead() {
        let source = "#Если Клиент Тогда\n#Вставка\nА\n#КонецВставки\n#КонецЕсли\nБ";
        assert_eq!(visible(source, &server()), ["Б"]);
    }

    #[test]
    fn directives_are_anchored_to_their_hash() {
        let result = run("А\n#Область Р\nБ\n#КонецОбласти", &Environment::new()).unwrap();
        let anchors: Vec<_> = result.directives.iter().map(|d| d.token_index).collect();
        assert_eq!(anchors, [1, 5]);
    }

    #[test]
    fn regions_form_a_tree() {
        let source = "#Область Внешняя\n#Область Внутренняя\nА\n#КонецОбласти\n\
                      #КонецОбласти\n#Область Вторая\n#КонецОбласти";
        let result = run(source, &Environment::new()).unwrap();
        assert_eq!(result.regions.len(), 2);
        assert_eq!(result.regions[0].name.name, "Внешняя");
        assert_eq!(result.regions[0].children.len(), 1);
        assert_eq!(result.regions[0].children[0].name.name, "Внутренняя");
        assert_eq!(result.regions[1].name.name, "Вторая");
    }

    #[test]
    fn region_markers_do_not_hide_code() {
        let source = "#Область Р\nА\n#КонецОбласти";
        assert_eq!(visible(source, &Environment::new()), ["А"]);
    }

    #[test]
    fn unmatched_directives() {
        for (source, name) in [
            ("#Иначе", "#Иначе"),
            ("#ИначеЕсли Сервер Тогда", "#ИначеЕсли"),
            ("#КонецЕсли", "#КонецЕсли"),
            ("#КонецОбласти", "#КонецОбласти"),
            ("#КонецУдаления", "#КонецУдаления"),
            ("#Если Сервер Тогда\n#Иначе\n#Иначе\n#КонецЕсли", "#Иначе"),
            ("#Вставка\n#Если Сервер Тогда\n#КонецВставки\n#КонецЕсли", "#КонецВставки"),
        ] {
            let err = run(source, &server()).unwrap_err();
            assert_eq!(err.kind, DirectiveErrorKind::Unmatched(name.into()), "{source}");
        }
    }

    #[test]
    fn unterminated_blocks() {
        for (source, name) in [
            ("#Если Сервер Тогда\nА", "#Если"),
            ("#Удаление\nА", "#Удаление"),
            ("#Вставка", "#Вставка"),
            ("#Область Р", "#Область"),
        ] {
            let err = run(source, &server()).unwrap_err();
            assert_eq!(err.kind, DirectiveErrorKind::Unterminated(name.into()), "{source}");
            assert_eq!(err.position, LineColumn::START);
        }
    }

    #[test]
    fn dead_conditions_are_still_checked() {
        for source in [
            "#Если Клиент Тогда\n#Если ( Тогда\n#КонецЕсли\n#КонецЕсли",
            "#Удаление\n#Если ( Тогда\n#КонецЕсли\n#КонецУдаления",
        ] {
            let err = run(source, &server()).unwrap_err();
            assert!(
                matches!(err.kind, DirectiveErrorKind::MalformedCondition(_)),
                "{source}: {err}"
            );
            assert_eq!(err.position, LineColumn::new(2, 9), "{source}");
        }
    }

    #[test]
    fn region_closed_only_in_a_dead_branch() {
        let source = "#Область Р\n#Если Клиент Тогда\n#КонецОбласти\n#КонецЕсли";
        let err = run(source, &server()).unwrap_err();
        assert_eq!(err.kind, DirectiveErrorKind::Unterminated("#Область".into()));
        assert_eq!(err.position, LineColumn::START);

        let client = Environment::new().with(PreprocSymbol::Client, true);
        let result = run(source, &client).unwrap();
        assert_eq!(result.regions[0].name.name, "Р");

        let source = "#Если Клиент Тогда\n#Область Р\n#КонецЕсли\n#КонецОбласти";
        let err = run(source, &server()).unwrap_err();
        assert_eq!(err.kind, DirectiveErrorKind::Unmatched("#КонецОбласти".into()));
    }

    #[test]
    fn multiline_string_patched_by_delete_and_insert() {
        let source = "А = \"выбрать\n#Удаление\n|старое\n#КонецУдаления\n\
                      #Вставка\n|новое\n#КонецВставки\n|\";";
        let result = run(source, &Environment::new()).unwrap();
        let span = Span::new(0, u32::try_from(source.len()).unwrap());
        assert_eq!(
            visible_text(&result.tokens, span),
            "А=\"выбрать|новое|\";"
        );
    }
}
