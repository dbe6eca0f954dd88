// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Method-description comments.
//!
//! The comment block above a procedure or function documents it in a loose
//! convention:
//!
//! ```text
//! // Выполняет запрос.
//! //
//! // Параметры:
//! //  Текст - Строка - текст запроса
//! //
//! // Возвращаемое значение:
//! //  ТаблицаЗначений
//! //
//! // См. ОбщийМодуль.Запросы
//! ```
//!
//! [`tokenize`] splits such a block into [`DescriptionToken`]s and
//! [`MethodDescription::parse`] groups them into sections. Neither can fail.

mod lexer;
mod reader;

pub use lexer::{DescriptionToken, DescriptionTokenKind, tokenize};
pub use reader::{Hyperlink, MethodDescription, ParameterDescription};
