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

//! Scalar coercion for placeholders embedded in strings

use crate::error::{Result, TemplateError};
use crate::grammar::InlinePlaceholder;
use crate::value::ResultValue;

/// Render the single scalar result of an inline placeholder
pub fn render_scalar(expression: &str, results: Vec<ResultValue>) -> Result<String> {
    if results.len() != 1 {
        return Err(TemplateError::MultipleOrEmptyResultInStringContext {
            expression: expression.to_string(),
            count: results.len(),
        });
    }

    let value = &results[0];
    value
        .render_text()
        .ok_or_else(|| TemplateError::ComplexValueInStringContext {
            expression: expression.to_string(),
            value_type: value.type_name().to_string(),
        })
}

/// Replace every inline placeholder of `text` with its rendered value.
///
/// Text outside the placeholders is copied verbatim. `evaluate` is called
/// once per placeholder, in order of appearance.
pub fn render_inline<F>(
    text: &str,
    placeholders: &[InlinePlaceholder<'_>],
    mut evaluate: F,
) -> Result<String>
where
    F: FnMut(&str) -> Result<Vec<ResultValue>>,
{
    let mut output = String::with_capacity(text.len());
    let mut last = 0;

    for placeholder in placeholders {
        output.push_str(&text[last..placeholder.span.start]);
        let results = evaluate(placeholder.expression)?;
        output.push_str(&render_scalar(placeholder.expression, results)?);
        last = placeholder.span.end;
    }
    output.push_str(&text[last..]);

    Ok(output)
}
