// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Fuzz target for parser crash safety testing.
//!
//! Arbitrary UTF-8 goes through lexing, region resolution and parsing under
//! two environments. Every phase must return either a tree or an error;
//! panics and stack overflows are failures. The method-description reader
//! gets the same input.

#![no_main]

use bsl_core::method_description::MethodDescription;
use bsl_core::source_analysis::{Environment, parse};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Invalid UTF-8 is the caller's concern, not the parser's
    if let Ok(source) = std::str::from_utf8(data) {
        let _ = parse(source, &Environment::new());
        let _ = parse(source, &Environment::new().with_name("Сервер", true));
        let _ = MethodDescription::parse(source);
    }
});
