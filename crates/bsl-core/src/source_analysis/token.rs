// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Token types for BSL lexical analysis.
//!
//! # Token Structure
//!
//! Each token consists of:
//! - A [`TokenKind`] indicating the type of token
//! - The exact lexeme it was built from
//! - A [`Span`] and the [`LineColumn`] of its first character
//! - A [`Channel`] deciding whether the grammar ever sees it
//!
//! Keywords are bilingual (Russian and English spellings) and matched without
//! regard to case, so `Если`, `ЕСЛИ` and `if` are the same [`Keyword::If`].

use std::fmt;

use ecow::EcoString;

use super::{LineColumn, Span};

/// Reserved words of the language.
///
/// The await word (`Ждать` / `Await`) is deliberately absent: it is a soft
/// keyword and is lexed as an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    If,
    Then,
    ElseIf,
    Else,
    EndIf,
    For,
    Each,
    In,
    To,
    While,
    Do,
    EndDo,
    Procedure,
    Function,
    EndProcedure,
    EndFunction,
    Var,
    Export,
    Val,
    Return,
    Continue,
    Break,
    And,
    Or,
    Not,
    Try,
    Except,
    Raise,
    EndTry,
    New,
    Execute,
    True,
    False,
    Undefined,
    Null,
    Goto,
    AddHandler,
    RemoveHandler,
    Async,
}

impl Keyword {
    /// Looks up a keyword by any of its spellings, ignoring case.
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        let lower = word.to_lowercase();
        let keyword = match lower.as_str() {
            "если" | "if" => Self::If,
            "тогда" | "then" => Self::Then,
            "иначеесли" | "elsif" => Self::ElseIf,
            "иначе" | "else" => Self::Else,
            "конецесли" | "endif" => Self::EndIf,
            "для" | "for" => Self::For,
            "каждого" | "each" => Self::Each,
            "из" | "in" => Self::In,
            "по" | "to" => Self::To,
            "пока" | "while" => Self::While,
            "цикл" | "do" => Self::Do,
            "конеццикла" | "enddo" => Self::EndDo,
            "процедура" | "procedure" => Self::Procedure,
            "функция" | "function" => Self::Function,
            "конецпроцедуры" | "endprocedure" => Self::EndProcedure,
            "конецфункции" | "endfunction" => Self::EndFunction,
            "перем" | "var" => Self::Var,
            "экспорт" | "export" => Self::Export,
            "знач" | "val" => Self::Val,
            "возврат" | "return" => Self::Return,
            "продолжить" | "continue" => Self::Continue,
            "прервать" | "break" => Self::Break,
            "и" | "and" => Self::And,
            "или" | "or" => Self::Or,
            "не" | "not" => Self::Not,
            "попытка" | "try" => Self::Try,
            "исключение" | "except" => Self::Except,
            "вызватьисключение" | "raise" => Self::Raise,
            "конецпопытки" | "endtry" => Self::EndTry,
            "новый" | "new" => Self::New,
            "выполнить" | "execute" => Self::Execute,
            "истина" | "true" => Self::True,
            "ложь" | "false" => Self::False,
            "неопределено" | "undefined" => Self::Undefined,
            "null" => Self::Null,
            "перейти" | "goto" => Self::Goto,
            "добавитьобработчик" | "addhandler" => Self::AddHandler,
            "удалитьобработчик" | "removehandler" => Self::RemoveHandler,
            "асинх" | "async" => Self::Async,
            _ => return None,
        };
        Some(keyword)
    }

    /// The canonical (Russian) spelling, used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::If => "Если",
            Self::Then => "Тогда",
            Self::ElseIf => "ИначеЕсли",
            Self::Else => "Иначе",
            Self::EndIf => "КонецЕсли",
            Self::For => "Для",
            Self::Each => "Каждого",
            Self::In => "Из",
            Self::To => "По",
            Self::While => "Пока",
            Self::Do => "Цикл",
            Self::EndDo => "КонецЦикла",
            Self::Procedure => "Процедура",
            Self::Function => "Функция",
            Self::EndProcedure => "КонецПроцедуры",
            Self::EndFunction => "КонецФункции",
            Self::Var => "Перем",
            Self::Export => "Экспорт",
            Self::Val => "Знач",
            Self::Return => "Возврат",
            Self::Continue => "Продолжить",
            Self::Break => "Прервать",
            Self::And => "И",
            Self::Or => "ИЛИ",
            Self::Not => "НЕ",
            Self::Try => "Попытка",
            Self::Except => "Исключение",
            Self::Raise => "ВызватьИсключение",
            Self::EndTry => "КонецПопытки",
            Self::New => "Новый",
            Self::Execute => "Выполнить",
            Self::True => "Истина",
            Self::False => "Ложь",
            Self::Undefined => "Неопределено",
            Self::Null => "NULL",
            Self::Goto => "Перейти",
            Self::AddHandler => "ДобавитьОбработчик",
            Self::RemoveHandler => "УдалитьОбработчик",
            Self::Async => "Асинх",
        }
    }

    /// Returns `true` for the keywords that close or split a code block.
    #[must_use]
    pub const fn ends_code_block(self) -> bool {
        matches!(
            self,
            Self::EndIf
                | Self::ElseIf
                | Self::Else
                | Self::EndDo
                | Self::Except
                | Self::EndTry
                | Self::EndProcedure
                | Self::EndFunction
        )
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The word following `#` on a directive line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKeyword {
    If,
    ElseIf,
    Else,
    EndIf,
    Region,
    EndRegion,
    Use,
    Insert,
    EndInsert,
    Delete,
    EndDelete,
}

impl DirectiveKeyword {
    /// Looks up a directive keyword by any of its spellings, ignoring case.
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        let lower = word.to_lowercase();
        let keyword = match lower.as_str() {
            "если" | "if" => Self::If,
            "иначеесли" | "elsif" | "elseif" => Self::ElseIf,
            "иначе" | "else" => Self::Else,
            "конецесли" | "endif" => Self::EndIf,
            "область" | "region" => Self::Region,
            "конецобласти" | "endregion" => Self::EndRegion,
            "использовать" | "use" => Self::Use,
            "вставка" | "insert" => Self::Insert,
            "конецвставки" | "endinsert" => Self::EndInsert,
            "удаление" | "delete" => Self::Delete,
            "конецудаления" | "enddelete" => Self::EndDelete,
            _ => return None,
        };
        Some(keyword)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::If => "#Если",
            Self::ElseIf => "#ИначеЕсли",
            Self::Else => "#Иначе",
            Self::EndIf => "#КонецЕсли",
            Self::Region => "#Область",
            Self::EndRegion => "#КонецОбласти",
            Self::Use => "#Использовать",
            Self::Insert => "#Вставка",
            Self::EndInsert => "#КонецВставки",
            Self::Delete => "#Удаление",
            Self::EndDelete => "#КонецУдаления",
        }
    }
}

impl fmt::Display for DirectiveKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution-context compiler directives (`&НаКлиенте` and friends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompilerDirective {
    AtClient,
    AtServer,
    AtServerNoContext,
    AtClientAtServerNoContext,
    AtClientAtServer,
}

impl CompilerDirective {
    /// Looks up a compiler directive by name (without the `&`), ignoring case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        let directive = match lower.as_str() {
            "наклиенте" | "atclient" => Self::AtClient,
            "насервере" | "atserver" => Self::AtServer,
            "насерверебезконтекста" | "atservernocontext" => Self::AtServerNoContext,
            "наклиентенасерверебезконтекста" | "atclientatservernocontext" => {
                Self::AtClientAtServerNoContext
            }
            "наклиентенасервере" | "atclientatserver" => Self::AtClientAtServer,
            _ => return None,
        };
        Some(directive)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AtClient => "&НаКлиенте",
            Self::AtServer => "&НаСервере",
            Self::AtServerNoContext => "&НаСервереБезКонтекста",
            Self::AtClientAtServerNoContext => "&НаКлиентеНаСервереБезКонтекста",
            Self::AtClientAtServer => "&НаКлиентеНаСервере",
        }
    }
}

/// The kind of token, not including source location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // === Names and literals ===
    /// An identifier, including the soft await word: `Запрос`, `Ждать`
    Identifier(EcoString),
    /// A reserved word: `Если`, `КонецЦикла`, `Истина`
    Keyword(Keyword),
    /// A numeric literal: `42`, `3.14`
    Number(EcoString),
    /// A complete single-line string; the payload has `""` unescaped
    String(EcoString),
    /// First line of a multiline string: `"выбрать` (payload without the quote)
    StringStart(EcoString),
    /// A middle line of a multiline string: `|часть строки` (payload without `|`)
    StringPart(EcoString),
    /// Last line of a multiline string: `|конец строки"`
    StringTail(EcoString),
    /// A date literal: `'20240101'` (payload without quotes)
    Date(EcoString),

    // === Operators ===
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    /// `=`, both assignment and equality
    Equal,
    /// `<>`
    NotEqual,

    // === Punctuation ===
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
    Semicolon,
    Dot,
    /// Ternary operator introducer: `?`
    Question,
    Colon,
    /// Label sigil: `~`
    Tilde,

    // === Sigils ===
    /// An annotation: `&Перед` (payload is the name without `&`)
    Annotation(EcoString),
    /// An execution-context directive: `&НаСервере`
    CompilerDirective(CompilerDirective),

    // === Preprocessor ===
    /// `#!...` on the very first line
    Shebang(EcoString),
    /// The `#` opening a directive line
    Hash,
    /// The directive word after `#`
    Directive(DirectiveKeyword),
    /// The argument of `#Использовать`: `lib-name`, `./lib`
    UseReference(EcoString),

    /// End of file
    Eof,
}

impl TokenKind {
    /// Returns `true` if this token is the given keyword.
    #[must_use]
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self, Self::Keyword(k) if *k == keyword)
    }

    /// Returns `true` if this token is an identifier.
    #[must_use]
    pub const fn is_identifier(&self) -> bool {
        matches!(self, Self::Identifier(_))
    }

    /// Returns `true` if this token is a literal value (keyword literals included).
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(
            self,
            Self::Number(_)
                | Self::String(_)
                | Self::StringStart(_)
                | Self::Date(_)
                | Self::Keyword(Keyword::True | Keyword::False | Keyword::Undefined | Keyword::Null)
        )
    }

    /// Returns `true` if this is the end-of-file token.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }

    /// A short human-readable description, used in "expected ... found ..." messages.
    #[must_use]
    pub fn describe(&self) -> EcoString {
        match self {
            Self::Identifier(name) => ecow::eco_format!("identifier `{name}`"),
            Self::Number(n) => ecow::eco_format!("number `{n}`"),
            Self::String(_) | Self::StringStart(_) | Self::StringPart(_) | Self::StringTail(_) => {
                "string literal".into()
            }
            Self::Date(_) => "date literal".into(),
            Self::Eof => "end of file".into(),
            other => ecow::eco_format!("`{other}`"),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(s) | Self::Number(s) => write!(f, "{s}"),
            Self::Keyword(k) => write!(f, "{k}"),
            Self::String(s) => write!(f, "\"{s}\""),
            Self::StringStart(s) => write!(f, "\"{s}"),
            Self::StringPart(s) => write!(f, "|{s}"),
            Self::StringTail(s) => write!(f, "|{s}\""),
            Self::Date(s) => write!(f, "'{s}'"),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Star => write!(f, "*"),
            Self::Slash => write!(f, "/"),
            Self::Percent => write!(f, "%"),
            Self::Less => write!(f, "<"),
            Self::LessEqual => write!(f, "<="),
            Self::Greater => write!(f, ">"),
            Self::GreaterEqual => write!(f, ">="),
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "<>"),
            Self::LeftParen => write!(f, "("),
            Self::RightParen => write!(f, ")"),
            Self::LeftBracket => write!(f, "["),
            Self::RightBracket => write!(f, "]"),
            Self::Comma => write!(f, ","),
            Self::Semicolon => write!(f, ";"),
            Self::Dot => write!(f, "."),
            Self::Question => write!(f, "?"),
            Self::Colon => write!(f, ":"),
            Self::Tilde => write!(f, "~"),
            Self::Annotation(name) => write!(f, "&{name}"),
            Self::CompilerDirective(d) => write!(f, "{}", d.as_str()),
            Self::Shebang(s) => write!(f, "#!{s}"),
            Self::Hash => write!(f, "#"),
            Self::Directive(d) => write!(f, "{d}"),
            Self::UseReference(s) => write!(f, "{s}"),
            Self::Eof => write!(f, "<eof>"),
        }
    }
}

/// Decides who gets to see a token.
///
/// The lexer assigns [`Channel::Visible`] or [`Channel::Directive`]; the
/// region engine later moves tokens inside dead conditional branches and
/// `#Удаление` blocks to [`Channel::Deleted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Channel {
    /// Part of the effective program text.
    #[default]
    Visible,
    /// A directive line (`#Если ... Тогда`, `#Область Имя`, ...).
    Directive,
    /// Excised code: dead branches and deleted regions.
    Deleted,
}

/// A token with its kind, lexeme, location and channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    text: EcoString,
    span: Span,
    position: LineColumn,
    channel: Channel,
}

impl Token {
    /// Creates a new visible token.
    #[must_use]
    pub fn new(kind: TokenKind, text: impl Into<EcoString>, span: Span, position: LineColumn) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
            position,
            channel: Channel::Visible,
        }
    }

    /// Returns the same token on another channel.
    #[must_use]
    pub fn on_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    /// Returns the token kind.
    #[must_use]
    pub const fn kind(&self) -> &TokenKind {
        &self.kind
    }

    /// Returns the exact source text of the token.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the source span.
    #[must_use]
    pub const fn span(&self) -> Span {
        self.span
    }

    /// Returns the line and column of the first character.
    #[must_use]
    pub const fn position(&self) -> LineColumn {
        self.position
    }

    /// Returns the channel.
    #[must_use]
    pub const fn channel(&self) -> Channel {
        self.channel
    }

    /// Returns `true` if the grammar sees this token.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.channel == Channel::Visible
    }

    /// Consumes the token and returns its kind.
    #[must_use]
    pub fn into_kind(self) -> TokenKind {
        self.kind
    }

    pub(crate) fn set_channel(&mut self, channel: Channel) {
        self.channel = channel;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_bilingual_and_case_insensitive() {
        assert_eq!(Keyword::from_word("Если"), Some(Keyword::If));
        assert_eq!(Keyword::from_word("ЕСЛИ"), Some(Keyword::If));
        assert_eq!(Keyword::from_word("if"), Some(Keyword::If));
        assert_eq!(Keyword::from_word("конецесли"), Some(Keyword::EndIf));
        assert_eq!(Keyword::from_word("EndProcedure"), Some(Keyword::EndProcedure));
        assert_eq!(Keyword::from_word("null"), Some(Keyword::Null));
        assert_eq!(Keyword::from_word("Запрос"), None);
    }

    #[test]
    fn await_word_is_not_reserved() {
        assert_eq!(Keyword::from_word("Ждать"), None);
        assert_eq!(Keyword::from_word("Await"), None);
    }

    #[test]
    fn directive_keywords() {
        assert_eq!(DirectiveKeyword::from_word("Область"), Some(DirectiveKeyword::Region));
        assert_eq!(DirectiveKeyword::from_word("EndRegion"), Some(DirectiveKeyword::EndRegion));
        assert_eq!(DirectiveKeyword::from_word("КОНЕЦУДАЛЕНИЯ"), Some(DirectiveKeyword::EndDelete));
        assert_eq!(DirectiveKeyword::from_word("Просто"), None);
    }

    #[test]
    fn compiler_directives_are_a_closed_set() {
        assert_eq!(
            CompilerDirective::from_name("НаКлиентеНаСервереБезКонтекста"),
            Some(CompilerDirective::AtClientAtServerNoContext)
        );
        assert_eq!(CompilerDirective::from_name("AtServer"), Some(CompilerDirective::AtServer));
        assert_eq!(CompilerDirective::from_name("Аннотация"), None);
    }

    #[test]
    fn token_kind_describe() {
        assert_eq!(TokenKind::Identifier("А".into()).describe(), "identifier `А`");
        assert_eq!(TokenKind::Keyword(Keyword::Then).describe(), "`Тогда`");
        assert_eq!(TokenKind::Eof.describe(), "end of file");
        assert_eq!(TokenKind::NotEqual.to_string(), "<>");
    }

    #[test]
    fn token_channel_round_trip() {
        let token = Token::new(
            TokenKind::Identifier("x".into()),
            "x",
            Span::new(0, 1),
            LineColumn::START,
        );
        assert!(token.is_visible());
        let hidden = token.on_channel(Channel::Deleted);
        assert_eq!(hidden.channel(), Channel::Deleted);
        assert_eq!(hidden.text(), "x");
    }

    #[test]
    fn literal_predicates() {
        assert!(TokenKind::Keyword(Keyword::True).is_literal());
        assert!(TokenKind::Date("20240101".into()).is_literal());
        assert!(!TokenKind::Identifier("x".into()).is_literal());
        assert!(TokenKind::Keyword(Keyword::EndDo).is_keyword(Keyword::EndDo));
    }
}
