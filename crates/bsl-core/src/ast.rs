// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Abstract Syntax Tree (AST) definitions for BSL.
//!
//! The tree is rooted at [`File`] and built once per parse; consumers only
//! read it. Every node carries a [`Span`] into the original source, so the
//! effective text of any node can be recovered with
//! [`ParsedFile::visible_text`](crate::source_analysis::ParsedFile::visible_text).
//!
//! # Shape
//!
//! ```text
//! File
//! ├── shebang, preprocessor directives
//! ├── VarDeclaration* Перем А Экспорт;
//! ├── Subroutine*     Процедура Имя(Параметры) ... КонецПроцедуры
//! └── Block           top-level statements
//! ```
//!
//! Statements own their nested blocks; expressions own their operands.
//! Postfix chains are left-nested: `а.Б()[0]` is
//! `Index(Call(Member(а, Б)), 0)`.

use ecow::EcoString;

use crate::source_analysis::{CompilerDirective, PreprocSymbol, Span};

// ============================================================================
// File and declarations
// ============================================================================

/// A whole source file.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    /// `#!...` line, only possible at the very start of the file.
    pub shebang: Option<Shebang>,
    /// Directives before the first declaration or statement.
    pub preprocessor: Vec<Directive>,
    /// Every live directive of the file, in source order.
    pub directives: Vec<Directive>,
    /// Module variable declarations.
    pub module_vars: Vec<VarDeclaration>,
    /// Procedures and functions.
    pub subroutines: Vec<Subroutine>,
    /// Top-level statements after the last subroutine.
    pub body: Block,
    /// Source location spanning the entire file.
    pub span: Span,
}

/// The `#!` interpreter line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shebang {
    /// Text after `#!`.
    pub command: EcoString,
    pub span: Span,
}

/// `Перем А, Б Экспорт;` at module level or at the start of a subroutine.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclaration {
    pub annotations: Vec<Annotation>,
    pub compiler_directive: Option<CompilerDirective>,
    pub declarators: Vec<VarDeclarator>,
    pub span: Span,
}

/// One name in a `Перем` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarDeclarator {
    pub name: Identifier,
    /// `Экспорт` follows the name.
    pub export: bool,
    pub span: Span,
}

/// Procedure or function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubroutineKind {
    Procedure,
    Function,
}

/// A procedure or function declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Subroutine {
    pub annotations: Vec<Annotation>,
    pub compiler_directive: Option<CompilerDirective>,
    /// Declared with `Асинх`.
    pub is_async: bool,
    pub kind: SubroutineKind,
    pub name: Identifier,
    pub params: Vec<Parameter>,
    pub export: bool,
    /// Local `Перем` declarations at the start of the body.
    pub vars: Vec<VarDeclaration>,
    pub body: Block,
    pub span: Span,
}

/// A formal parameter: `&Аннотация Знач Имя = 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub annotations: Vec<Annotation>,
    /// Passed with `Знач`.
    pub by_value: bool,
    pub name: Identifier,
    /// Default value: a possibly signed number or another literal.
    pub default: Option<Literal>,
    pub span: Span,
}

/// `&Имя` or `&Имя(параметры)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub name: Identifier,
    pub params: Vec<AnnotationParam>,
    pub span: Span,
}

/// One annotation argument: `Имя`, `Имя = литерал` or `литерал`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationParam {
    pub name: Option<Identifier>,
    pub value: Option<Literal>,
    pub span: Span,
}

// ============================================================================
// Preprocessor
// ============================================================================

/// A live preprocessor directive.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub kind: DirectiveKind,
    /// From `#` to the end of the directive line.
    pub span: Span,
}

/// The kinds of `#` directive.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveKind {
    If(PreprocExpr),
    ElseIf(PreprocExpr),
    Else,
    EndIf,
    Region(Identifier),
    EndRegion,
    Use(LibraryReference),
    Insert,
    EndInsert,
    Delete,
    EndDelete,
}

/// Argument of `#Использовать`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryReference {
    /// Library name or path, quotes removed.
    pub name: EcoString,
    /// Written as a quoted path.
    pub quoted: bool,
    pub span: Span,
}

/// Boolean condition of `#Если` / `#ИначеЕсли`.
///
/// `И` binds tighter than `ИЛИ`; parentheses produce no node of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreprocExpr {
    Symbol {
        symbol: PreprocSymbol,
        span: Span,
    },
    Not {
        operand: Box<PreprocExpr>,
        span: Span,
    },
    And {
        operands: Vec<PreprocExpr>,
        span: Span,
    },
    Or {
        operands: Vec<PreprocExpr>,
        span: Span,
    },
}

impl PreprocExpr {
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Symbol { span, .. }
            | Self::Not { span, .. }
            | Self::And { span, .. }
            | Self::Or { span, .. } => *span,
        }
    }
}

/// A `#Область` / `#КонецОбласти` pair and the regions nested in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub name: Identifier,
    /// From `#Область` to the end of the `#КонецОбласти` line.
    pub span: Span,
    pub children: Vec<Region>,
}

// ============================================================================
// Statements
// ============================================================================

/// A sequence of statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `цель = значение`
    Assignment {
        target: Expression,
        value: Expression,
        span: Span,
    },

    /// A call used as a statement: `Сообщить(Текст)`, `Запрос.Выполнить()`.
    Call(Expression),

    /// An await used as a statement: `Ждать Операция()`.
    Await(Expression),

    /// `Если ... Тогда ... ИначеЕсли ... Иначе ... КонецЕсли`
    If {
        /// The `Если` branch followed by every `ИначеЕсли` branch.
        branches: Vec<ConditionalBranch>,
        else_branch: Option<Block>,
        span: Span,
    },

    /// `Пока условие Цикл ... КонецЦикла`
    While {
        condition: Expression,
        body: Block,
        span: Span,
    },

    /// `Для счетчик = начало По конец Цикл ... КонецЦикла`
    For {
        variable: Identifier,
        start: Expression,
        end: Expression,
        body: Block,
        span: Span,
    },

    /// `Для Каждого элемент Из коллекция Цикл ... КонецЦикла`
    ForEach {
        variable: Identifier,
        collection: Expression,
        body: Block,
        span: Span,
    },

    /// `Попытка ... Исключение ... КонецПопытки`
    Try {
        body: Block,
        handler: Block,
        span: Span,
    },

    Return {
        value: Option<Expression>,
        span: Span,
    },

    Continue {
        span: Span,
    },

    Break {
        span: Span,
    },

    /// `ВызватьИсключение`, optionally with an argument.
    Raise {
        argument: Option<RaiseArgument>,
        span: Span,
    },

    /// `Выполнить код`
    Execute {
        code: Expression,
        span: Span,
    },

    /// `Перейти ~Метка`
    Goto {
        label: Identifier,
        span: Span,
    },

    /// `ДобавитьОбработчик событие, обработчик`
    AddHandler {
        event: Expression,
        handler: Expression,
        span: Span,
    },

    /// `УдалитьОбработчик событие, обработчик`
    RemoveHandler {
        event: Expression,
        handler: Expression,
        span: Span,
    },

    /// `~Метка:` optionally followed by the statement it marks.
    Labeled {
        label: Identifier,
        statement: Option<Box<Statement>>,
        span: Span,
    },

    /// A bare `;`.
    Empty {
        span: Span,
    },

    /// A directive between statements.
    Preprocessor(Directive),
}

impl Statement {
    /// Returns the span of this statement.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Assignment { span, .. }
            | Self::If { span, .. }
            | Self::While { span, .. }
            | Self::For { span, .. }
            | Self::ForEach { span, .. }
            | Self::Try { span, .. }
            | Self::Return { span, .. }
            | Self::Continue { span }
            | Self::Break { span }
            | Self::Raise { span, .. }
            | Self::Execute { span, .. }
            | Self::Goto { span, .. }
            | Self::AddHandler { span, .. }
            | Self::RemoveHandler { span, .. }
            | Self::Labeled { span, .. }
            | Self::Empty { span } => *span,
            Self::Call(expression) | Self::Await(expression) => expression.span(),
            Self::Preprocessor(directive) => directive.span,
        }
    }
}

/// `условие Тогда блок` inside an `Если` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalBranch {
    pub condition: Expression,
    pub body: Block,
    pub span: Span,
}

/// What follows `ВызватьИсключение`.
#[derive(Debug, Clone, PartialEq)]
pub enum RaiseArgument {
    /// `ВызватьИсключение "Текст"`
    Expression(Expression),
    /// `ВызватьИсключение(Текст, Категория, Код, Подробности)`, up to four slots.
    CallParams {
        args: Vec<Option<Expression>>,
        span: Span,
    },
}

// ============================================================================
// Expressions
// ============================================================================

/// A BSL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A literal value.
    Literal(Literal, Span),

    /// A variable, property or global name.
    Identifier(Identifier),

    /// `левый оп правый`
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
        span: Span,
    },

    /// `НЕ операнд`, `-операнд`, `+операнд`
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
        span: Span,
    },

    /// `Ждать операнд`
    Await {
        operand: Box<Expression>,
        span: Span,
    },

    /// `Новый Тип(аргументы)` or `Новый(ТипИлиИмя, аргументы)`.
    New {
        /// Set for the named form; for the dynamic form the type is the first argument.
        type_name: Option<Identifier>,
        args: Vec<Option<Expression>>,
        span: Span,
    },

    /// `?(условие, да, нет)`
    Ternary {
        condition: Box<Expression>,
        then_branch: Box<Expression>,
        else_branch: Box<Expression>,
        span: Span,
    },

    /// A parenthesized expression.
    Parenthesized {
        expression: Box<Expression>,
        span: Span,
    },

    /// `получатель.Имя`
    Member {
        receiver: Box<Expression>,
        name: Identifier,
        span: Span,
    },

    /// `получатель[индекс]`
    Index {
        receiver: Box<Expression>,
        index: Box<Expression>,
        span: Span,
    },

    /// `имя(аргументы)` where the callee is an identifier or a member access.
    /// Omitted arguments are `None`.
    Call {
        callee: Box<Expression>,
        args: Vec<Option<Expression>>,
        span: Span,
    },
}

impl Expression {
    /// Returns the span of this expression.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Literal(_, span)
            | Self::Binary { span, .. }
            | Self::Unary { span, .. }
            | Self::Await { span, .. }
            | Self::New { span, .. }
            | Self::Ternary { span, .. }
            | Self::Parenthesized { span, .. }
            | Self::Member { span, .. }
            | Self::Index { span, .. }
            | Self::Call { span, .. } => *span,
            Self::Identifier(id) => id.span,
        }
    }

    /// Returns true if the last postfix modifier is a call.
    #[must_use]
    pub const fn is_call(&self) -> bool {
        matches!(self, Self::Call { .. })
    }

    /// Returns true if this expression can be assigned to.
    #[must_use]
    pub const fn is_assignable(&self) -> bool {
        matches!(
            self,
            Self::Identifier(_) | Self::Member { .. } | Self::Index { .. }
        )
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// Numeric text as written, sign included for default values: `42`, `-1.5`.
    Number(EcoString),
    /// String content with `""` unescaped and multiline pieces joined by `\n`.
    String(EcoString),
    /// Date digits without quotes: `20240101000000`.
    Date(EcoString),
    /// `Истина` / `Ложь`
    Boolean(bool),
    /// `Неопределено`
    Undefined,
    /// `NULL`
    Null,
}

/// A name with its location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: EcoString,
    pub span: Span,
}

impl Identifier {
    /// Creates a new identifier.
    #[must_use]
    pub fn new(name: impl Into<EcoString>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// Binary operators, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Or => "ИЛИ",
            Self::And => "И",
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Plus,
    Minus,
}
