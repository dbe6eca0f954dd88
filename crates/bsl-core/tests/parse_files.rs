// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! End-to-end tests for the public `parse` entry point.
//!
//! Each test feeds a whole file through lexing, region resolution and
//! parsing, then checks the tree and the reconstructed visible text.

use bsl_core::ast::{DirectiveKind, Expression, Literal, Statement, SubroutineKind};
use bsl_core::source_analysis::{
    DirectiveErrorKind, Environment, ParseError, PreprocSymbol, Span, parse,
};

fn whole(source: &str) -> Span {
    Span::new(0, u32::try_from(source.len()).unwrap())
}

const EXTENSION_FUNCTION: &str = "\
&ИзменениеИКонтроль(\"ПроверитьЗавершитьДоговорВАрхиве\")
Функция ХФ164150_ПроверитьЗавершитьДоговорВАрхиве(ДоговорОбъект, ДопНастройки, ИмяРеквизитаДатаОкончания)
\tТекущаяДата   = НачалоДня(ТекущаяДатаСеанса());
\t#Удаление
\tЕсли СтароеУсловие
\t#КонецУдаления
\t#Вставка
\tНовоеУсловие = Выражение;
\tЕсли НовоеУсловие
\t#КонецВставки
\t\tИ ЧастьСтарогоУсловия Тогда
\t\t    Возврат Истина;
\tКонецЕсли;
\tВозврат Ложь;
КонецФункции";

#[test]
fn deleted_code_leaves_the_effective_function() {
    let parsed = parse(EXTENSION_FUNCTION, &Environment::new()).unwrap();
    assert_eq!(parsed.file.subroutines.len(), 1);

    let function = &parsed.file.subroutines[0];
    assert_eq!(function.kind, SubroutineKind::Function);
    assert_eq!(function.annotations[0].name.name, "ИзменениеИКонтроль");
    assert_eq!(function.params.len(), 3);

    let text = parsed.visible_text(function.span);
    for marker in ["#Удаление", "#КонецУдаления", "#Вставка", "#КонецВставки", "СтароеУсловие"] {
        assert!(!text.contains(marker), "{marker} leaked into {text}");
    }
    assert!(text.contains("ИЧастьСтарогоУсловияТогда"), "{text}");

    let statements = &function.body.statements;
    let Some(Statement::If { branches, .. }) = statements.iter().find(|s| matches!(s, Statement::If { .. }))
    else {
        panic!("no conditional in {statements:?}");
    };
    assert_eq!(
        parsed.visible_text(branches[0].condition.span()),
        "НовоеУсловиеИЧастьСтарогоУсловия"
    );
    assert!(matches!(statements.last(), Some(Statement::Return { value: Some(_), .. })));
}

#[test]
fn insert_and_delete_markers_are_recorded() {
    let parsed = parse(EXTENSION_FUNCTION, &Environment::new()).unwrap();
    let kinds: Vec<_> = parsed.file.directives.iter().map(|d| d.kind.clone()).collect();
    assert_eq!(
        kinds,
        [
            DirectiveKind::Delete,
            DirectiveKind::EndDelete,
            DirectiveKind::Insert,
            DirectiveKind::EndInsert,
        ]
    );
}

#[test]
fn condition_split_by_directives() {
    let source = "\
If true or false
    #If Server Then
        Or true
    #EndIf
    Then
EndIf;";
    let plain = parse(source, &Environment::new()).unwrap();
    let server = parse(source, &Environment::new().with(PreprocSymbol::Server, true)).unwrap();

    let condition = |parsed: &bsl_core::source_analysis::ParsedFile| {
        let Some(Statement::If { branches, .. }) = parsed.file.body.statements.first() else {
            panic!("expected a conditional");
        };
        parsed.visible_text(branches[0].condition.span())
    };
    assert_eq!(condition(&plain), "trueorfalse");
    assert_eq!(condition(&server), "trueorfalseOrtrue");
    assert_eq!(plain.file.directives.len(), 2);
}

#[test]
fn while_condition_split_by_directives() {
    let source = "\
while (true
    #If Server Then
        Or true
    #EndIf
    ) do
enddo;";
    assert!(parse(source, &Environment::new()).is_ok());
    assert!(parse(source, &Environment::new().with_name("Server", true)).is_ok());
}

#[test]
fn alternatives_inside_an_assignment() {
    let source = "\
a = false
    #If Server Then
        Or true
    #else
        Or false
    #EndIf
    and true;";
    let parsed = parse(source, &Environment::new()).unwrap();
    assert_eq!(parsed.visible_text(whole(source)), "a=falseOrfalseandtrue;");
}

#[test]
fn deleted_string_piece() {
    let source = "\
А = \"выбрать
#Удаление
|часть строки
#КонецУдаления
|конец строки\";";
    let parsed = parse(source, &Environment::new()).unwrap();
    let Some(Statement::Assignment { value, .. }) = parsed.file.body.statements.first() else {
        panic!("expected an assignment");
    };
    let Expression::Literal(Literal::String(text), _) = value else {
        panic!("expected a string, got {value:?}");
    };
    assert_eq!(text, "выбрать\nконец строки");
}

#[test]
fn library_references() {
    let source = "#Использовать lib\n#Использовать \"./lib\"\n#Использовать lib-name\n#Использовать 1lib\n";
    let parsed = parse(source, &Environment::new()).unwrap();
    let references: Vec<_> = parsed
        .file
        .preprocessor
        .iter()
        .filter_map(|d| match &d.kind {
            DirectiveKind::Use(reference) => Some((reference.name.to_string(), reference.quoted)),
            _ => None,
        })
        .collect();
    assert_eq!(
        references,
        [
            ("lib".to_string(), false),
            ("./lib".to_string(), true),
            ("lib-name".to_string(), false),
            ("1lib".to_string(), false),
        ]
    );
}

#[test]
fn shebang_only_on_the_first_line() {
    let parsed = parse("#!/usr/bin/env oscript\nСообщить(1);", &Environment::new()).unwrap();
    let shebang = parsed.file.shebang.as_ref().unwrap();
    assert_eq!(shebang.command, "/usr/bin/env oscript");
    assert_eq!(parsed.file.body.statements.len(), 1);

    assert!(parse("#!", &Environment::new()).unwrap().file.shebang.is_some());
    assert!(matches!(
        parse("Сообщить(1);\n#!/bin/sh", &Environment::new()),
        Err(ParseError::Lex(_) | ParseError::Directive(_))
    ));
}

#[test]
fn directive_vocabulary() {
    for source in [
        "#Область А\n#КонецОбласти",
        "#Если А Тогда\n#ИначеЕсли А Тогда\n#Иначе\n#КонецЕсли",
        "#Использовать А",
        "#Region A\n#EndRegion",
        "#if A then\n#elsif B then\n#else\n#endif",
    ] {
        assert!(parse(source, &Environment::new()).is_ok(), "{source}");
    }

    let Err(ParseError::Directive(err)) = parse("#Просто", &Environment::new()) else {
        panic!("unknown directive accepted");
    };
    assert!(matches!(err.kind, DirectiveErrorKind::UnknownDirective(_)));
}

#[test]
fn unbalanced_blocks_are_errors() {
    let cases = [
        ("#КонецЕсли", "unmatched"),
        ("#Если Сервер Тогда\nА = 1;", "unterminated"),
        ("#Область А", "unterminated"),
        ("#Удаление\n#КонецВставки", "unmatched"),
    ];
    for (source, what) in cases {
        let Err(ParseError::Directive(err)) = parse(source, &Environment::new()) else {
            panic!("{source:?} should fail");
        };
        match what {
            "unmatched" => assert!(matches!(err.kind, DirectiveErrorKind::Unmatched(_)), "{err}"),
            _ => assert!(matches!(err.kind, DirectiveErrorKind::Unterminated(_)), "{err}"),
        }
    }
}

#[test]
fn regions_form_a_tree() {
    let source = "\
#Область Внешняя
#Область Внутренняя
Процедура А()
КонецПроцедуры
#КонецОбласти
#КонецОбласти
#Область Вторая
#КонецОбласти";
    let parsed = parse(source, &Environment::new()).unwrap();
    let names: Vec<_> = parsed.regions.iter().map(|r| r.name.name.as_str()).collect();
    assert_eq!(names, ["Внешняя", "Вторая"]);
    assert_eq!(parsed.regions[0].children[0].name.name, "Внутренняя");
    assert_eq!(parsed.file.subroutines.len(), 1);
}

#[test]
fn whole_module() {
    let source = "\
#Если Сервер Или ТолстыйКлиентОбычноеПриложение Или ВнешнееСоединение Тогда
Перем А Экспорт;
#Область ПрограммныйИнтерфейс
&НаСервере
Процедура Тест() Экспорт
    Перем Б;
    Б = Новый Структура(\"А\", 1);
    Для Каждого Элемент Из Б Цикл
        Если Элемент.Значение > 0 Тогда
            Продолжить;
        КонецЕсли;
    КонецЦикла;
КонецПроцедуры
#КонецОбласти
Сообщить();
#КонецЕсли
";
    let env: Environment = serde_json::from_str(r#"{"symbols": {"Server": true}}"#).unwrap();
    let parsed = parse(source, &env).unwrap();
    assert_eq!(parsed.file.module_vars.len(), 1);
    assert_eq!(parsed.file.subroutines.len(), 1);
    assert_eq!(parsed.file.subroutines[0].vars.len(), 1);
    assert!(parsed.file.body.statements.iter().any(|s| matches!(s, Statement::Call(_))));

    let client = parse(source, &Environment::new().with_name("Клиент", true)).unwrap();
    assert!(client.file.module_vars.is_empty());
    assert!(client.file.subroutines.is_empty());
    assert_eq!(client.visible_tokens().count(), 0);
}

#[test]
fn errors_carry_positions() {
    let Err(ParseError::Syntax(err)) = parse(
        "Процедура А()\n    Если Б Тогда\nКонецПроцедуры",
        &Environment::new(),
    ) else {
        panic!("expected a syntax error");
    };
    assert_eq!(err.position.line, 3);
    assert_eq!(err.position.column, 1);
    assert!(err.expected.iter().any(|e| e.contains("КонецЕсли")), "{:?}", err.expected);
}
