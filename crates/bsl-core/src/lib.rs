// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Front end for the 1C:Enterprise scripting language (BSL).
//!
//! This crate contains:
//! - Lexical analysis with a separate directive-line mode
//! - The preprocessor region engine (`#Если`, `#Область`, `#Удаление`, ...)
//! - Parsing into a typed tree ([`ast`])
//! - A lexer and reader for method-description comments
//!
//! ```
//! use bsl_core::source_analysis::{Environment, parse};
//!
//! let env = Environment::new().with_name("Сервер", true);
//! let parsed = parse("#Если Сервер Тогда\nА = 1;\n#КонецЕсли", &env).unwrap();
//! assert_eq!(parsed.file.directives.len(), 2);
//! assert_eq!(parsed.visible_tokens().count(), 4);
//! ```

pub mod ast;
pub mod method_description;
pub mod source_analysis;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::ast::{Expression, File, Identifier, Literal, Statement};
    pub use crate::source_analysis::{Environment, ParseError, ParsedFile, Span, parse};
}
