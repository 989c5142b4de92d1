// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Placeholder grammar
//!
//! ```text
//! full_placeholder    ::= "{{" [ marker " " ] expr "}}"   ; whole string
//! inline_placeholder  ::= "{{" expr "}}"                  ; inside a string
//! marker              ::= "*" | "+" | "?"
//! expr                ::= any text not containing "{{"
//! section_field_name  ::= "{{#" identifier "}}"
//! section_value_name  ::= "{{*}}" | "{{+}}" | "{{?}}"
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

use crate::cardinality::Cardinality;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

static FULL_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\{\{(?:([*+?]) )?(.+)\}\}$").expect("valid placeholder pattern")
});

static SECTION_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{\{#(\w+)\}\}$").expect("valid section pattern"));

/// A string that is entirely one placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder<'a> {
    /// Contract declared by the marker
    pub cardinality: Cardinality,
    /// Expression text
    pub expression: &'a str,
}

/// A placeholder embedded in a larger string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinePlaceholder<'a> {
    /// Byte range of the whole `{{...}}` occurrence
    pub span: Range<usize>,
    /// Expression text
    pub expression: &'a str,
}

/// Match `text` against the anchored full-value grammar
pub fn parse_full_placeholder(text: &str) -> Option<Placeholder<'_>> {
    let captures = FULL_PLACEHOLDER.captures(text)?;
    let expression = captures.get(2)?.as_str();
    if expression.contains(OPEN) {
        return None;
    }

    let cardinality = captures
        .get(1)
        .and_then(|m| m.as_str().chars().next())
        .and_then(Cardinality::from_marker)
        .unwrap_or(Cardinality::Required);

    Some(Placeholder {
        cardinality,
        expression,
    })
}

/// Find all non-overlapping inline placeholders, leftmost first
pub fn find_inline_placeholders(text: &str) -> Vec<InlinePlaceholder<'_>> {
    let mut found = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find(OPEN) {
        let start = cursor + offset;
        let body_start = start + OPEN.len();
        let Some(close) = text[body_start..].find(CLOSE) else {
            break;
        };
        let body = &text[body_start..body_start + close];

        // The body may not open another placeholder; retry from the next brace
        if body.is_empty() || body.contains(OPEN) {
            cursor = start + 1;
            continue;
        }

        let end = body_start + close + CLOSE.len();
        found.push(InlinePlaceholder {
            span: start..end,
            expression: body,
        });
        cursor = end;
    }

    found
}

/// Whether a field name claims to open a section
pub fn is_section_field(name: &str) -> bool {
    name.starts_with("{{#")
}

/// Extract the loop variable from a `{{#name}}` field name
pub fn parse_section_field(name: &str) -> Option<&str> {
    SECTION_FIELD
        .captures(name)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

/// Parse a section value field name
pub fn parse_section_value_field(name: &str) -> Option<Cardinality> {
    match name {
        "{{*}}" => Some(Cardinality::ZeroOrMore),
        "{{+}}" => Some(Cardinality::OneOrMore),
        "{{?}}" => Some(Cardinality::Optional),
        _ => None,
    }
}
