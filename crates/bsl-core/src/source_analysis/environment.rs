// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Preprocessor symbols and the environment that gives them truth values.
//!
//! The environment is the only configuration a parse takes. It is built once,
//! never mutated during a parse and can be shared freely between threads.
//!
//! ```
//! use bsl_core::source_analysis::{Environment, PreprocSymbol};
//!
//! let env = Environment::new()
//!     .with(PreprocSymbol::Server, true)
//!     .with_name("ВнешнееСоединение", true);
//! assert!(env.is_defined(&PreprocSymbol::Server));
//! assert!(env.is_defined(&PreprocSymbol::ExternalConnection));
//! assert!(!env.is_defined(&PreprocSymbol::Client));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use ecow::EcoString;
use serde::Deserialize;

/// A name usable in a `#Если` condition.
///
/// Execution-context symbols match their Russian or English spelling exactly;
/// OS symbols match without regard to case. Anything else is
/// [`PreprocSymbol::Unknown`], which is a valid leaf and not an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PreprocSymbol {
    Client,
    AtClient,
    AtServer,
    MobileAppClient,
    MobileAppServer,
    MobileClient,
    MobileStandaloneServer,
    ThickClientOrdinaryApplication,
    ThickClientManagedApplication,
    Server,
    ExternalConnection,
    ThinClient,
    WebClient,
    Insert,
    EndInsert,
    Delete,
    EndDelete,
    Windows,
    Linux,
    MacOS,
    Unknown(EcoString),
}

/// `(symbol, Russian spelling, English spelling)` for exact-case symbols.
const CONTEXT_SYMBOLS: &[(PreprocSymbol, &str, &str)] = &[
    (PreprocSymbol::Client, "Клиент", "Client"),
    (PreprocSymbol::AtClient, "НаКлиенте", "AtClient"),
    (PreprocSymbol::AtServer, "НаСервере", "AtServer"),
    (
        PreprocSymbol::MobileAppClient,
        "МобильноеПриложениеКлиент",
        "MobileAppClient",
    ),
    (
        PreprocSymbol::MobileAppServer,
        "МобильноеПриложениеСервер",
        "MobileAppServer",
    ),
    (PreprocSymbol::MobileClient, "МобильныйКлиент", "MobileClient"),
    (
        PreprocSymbol::MobileStandaloneServer,
        "МобильныйАвтономныйСервер",
        "MobileStandaloneServer",
    ),
    (
        PreprocSymbol::ThickClientOrdinaryApplication,
        "ТолстыйКлиентОбычноеПриложение",
        "ThickClientOrdinaryApplication",
    ),
    (
        PreprocSymbol::ThickClientManagedApplication,
        "ТолстыйКлиентУправляемоеПриложение",
        "ThickClientManagedApplication",
    ),
    (PreprocSymbol::Server, "Сервер", "Server"),
    (
        PreprocSymbol::ExternalConnection,
        "ВнешнееСоединение",
        "ExternalConnection",
    ),
    (PreprocSymbol::ThinClient, "ТонкийКлиент", "ThinClient"),
    (PreprocSymbol::WebClient, "ВебКлиент", "WebClient"),
    (PreprocSymbol::Insert, "Вставка", "Insert"),
    (PreprocSymbol::EndInsert, "КонецВставки", "EndInsert"),
    (PreprocSymbol::Delete, "Удаление", "Delete"),
    (PreprocSymbol::EndDelete, "КонецУдаления", "EndDelete"),
];

const OS_SYMBOLS: &[(PreprocSymbol, &str)] = &[
    (PreprocSymbol::Windows, "Windows"),
    (PreprocSymbol::Linux, "Linux"),
    (PreprocSymbol::MacOS, "MacOS"),
];

impl PreprocSymbol {
    /// Classifies a symbol name. Never fails.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if let Some((symbol, _, _)) = CONTEXT_SYMBOLS
            .iter()
            .find(|(_, russian, english)| name == *russian || name == *english)
        {
            return symbol.clone();
        }
        if let Some((symbol, _)) = OS_SYMBOLS
            .iter()
            .find(|(_, spelling)| name.eq_ignore_ascii_case(spelling))
        {
            return symbol.clone();
        }
        Self::Unknown(EcoString::from(name))
    }

    /// The canonical spelling: Russian for context symbols, the given
    /// name for unknown ones.
    #[must_use]
    pub fn name(&self) -> &str {
        if let Self::Unknown(name) = self {
            return name;
        }
        CONTEXT_SYMBOLS
            .iter()
            .find(|(symbol, _, _)| symbol == self)
            .map(|(_, russian, _)| *russian)
            .or_else(|| {
                OS_SYMBOLS
                    .iter()
                    .find(|(symbol, _)| symbol == self)
                    .map(|(_, spelling)| *spelling)
            })
            .unwrap_or_default()
    }

    /// Returns `true` for names outside the closed symbol set.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for PreprocSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Truth values for preprocessor symbols.
///
/// Symbols that were never set are false. Deserializes from
/// `{"symbols": {"Сервер": true, "Linux": true}}`; Russian and English
/// spellings of the same symbol address the same flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "EnvironmentConfig")]
pub struct Environment {
    symbols: HashMap<PreprocSymbol, bool>,
}

#[derive(Deserialize)]
struct EnvironmentConfig {
    #[serde(default)]
    symbols: BTreeMap<String, bool>,
}

impl From<EnvironmentConfig> for Environment {
    fn from(config: EnvironmentConfig) -> Self {
        config
            .symbols
            .iter()
            .fold(Self::new(), |env, (name, value)| env.with_name(name, *value))
    }
}

impl Environment {
    /// An environment where every symbol is false.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the environment with `symbol` set to `value`.
    #[must_use]
    pub fn with(mut self, symbol: PreprocSymbol, value: bool) -> Self {
        self.symbols.insert(symbol, value);
        self
    }

    /// Returns the environment with the symbol spelled `name` set to `value`.
    #[must_use]
    pub fn with_name(self, name: &str, value: bool) -> Self {
        self.with(PreprocSymbol::from_name(name), value)
    }

    /// Truth value of a symbol; unset symbols are false.
    #[must_use]
    pub fn is_defined(&self, symbol: &PreprocSymbol) -> bool {
        self.symbols.get(symbol).copied().unwrap_or(false)
    }
}

impl FromIterator<(PreprocSymbol, bool)> for Environment {
    fn from_iter<I: IntoIterator<Item = (PreprocSymbol, bool)>>(iter: I) -> Self {
        Self {
            symbols: iter.into_iter().collect(),
        }
    }
}
