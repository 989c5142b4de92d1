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

//! Classification of template nodes

use serde_json::{Map, Value};

use crate::grammar::{self, InlinePlaceholder, Placeholder};

/// How a template node has to be resolved
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode<'a> {
    /// String that is entirely one placeholder
    FullPlaceholder(Placeholder<'a>),
    /// String with embedded placeholders
    Inline {
        /// Source string
        text: &'a str,
        /// Placeholders in order of appearance
        placeholders: Vec<InlinePlaceholder<'a>>,
    },
    /// Two-field section object
    Section(SectionNode<'a>),
    /// Ordinary object
    Object(&'a Map<String, Value>),
    /// Array
    Array(&'a [Value]),
    /// Anything else, passed through unchanged
    Literal(&'a Value),
}

/// The raw fields of a section object, not yet validated
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionNode<'a> {
    /// Field name expected to be `{{#name}}`
    pub section_field: &'a str,
    /// Value of the section field, expected to be a placeholder
    pub statement: &'a Value,
    /// Field name expected to be `{{*}}`, `{{+}}` or `{{?}}`
    pub value_field: &'a str,
    /// Sub-template evaluated per iteration
    pub template: &'a Value,
}

/// Decide how `value` is resolved.
///
/// An object is a section when it has exactly two fields and one of them
/// opens with `{{#`. Its fields are checked by the section evaluator, so a
/// malformed section is reported instead of being treated as an object.
pub fn classify(value: &Value) -> TemplateNode<'_> {
    match value {
        Value::String(text) => {
            if let Some(placeholder) = grammar::parse_full_placeholder(text) {
                return TemplateNode::FullPlaceholder(placeholder);
            }
            let placeholders = grammar::find_inline_placeholders(text);
            if placeholders.is_empty() {
                TemplateNode::Literal(value)
            } else {
                TemplateNode::Inline {
                    text: text.as_str(),
                    placeholders,
                }
            }
        }
        Value::Object(obj) => match section_fields(obj) {
            Some(section) => TemplateNode::Section(section),
            None => TemplateNode::Object(obj),
        },
        Value::Array(items) => TemplateNode::Array(items),
        other => TemplateNode::Literal(other),
    }
}

fn section_fields(obj: &Map<String, Value>) -> Option<SectionNode<'_>> {
    if obj.len() != 2 {
        return None;
    }
    let mut fields = obj.iter();
    let first = fields.next()?;
    let second = fields.next()?;

    let ((section_field, statement), (value_field, template)) =
        if grammar::is_section_field(first.0) {
            (first, second)
        } else if grammar::is_section_field(second.0) {
            (second, first)
        } else {
            return None;
        };

    Some(SectionNode {
        section_field: section_field.as_str(),
        statement,
        value_field: value_field.as_str(),
        template,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cardinality::Cardinality;
    use serde_json::json;

    #[test]
    fn test_classify_strings() {
        let full = json!("{{* X.category}}");
        assert!(matches!(
            classify(&full),
            TemplateNode::FullPlaceholder(Placeholder {
                cardinality: Cardinality::ZeroOrMore,
                expression: "X.category"
            })
        ));

        let inline = json!("Value is {{X.value}} mmol/L");
        match classify(&inline) {
            TemplateNode::Inline { placeholders, .. } => assert_eq!(placeholders.len(), 1),
            other => panic!("expected inline node, got {other:?}"),
        }

        let literal = json!("final");
        assert_eq!(classify(&literal), TemplateNode::Literal(&literal));
    }

    #[test]
    fn test_classify_section_in_either_order() {
        let section = json!({"{{#m}}": "{{items}}", "{{*}}": {"ref": "{{%m.ref}}"}});
        let reversed = json!({"{{*}}": {"ref": "{{%m.ref}}"}, "{{#m}}": "{{items}}"});

        for value in [&section, &reversed] {
            match classify(value) {
                TemplateNode::Section(node) => {
                    assert_eq!(node.section_field, "{{#m}}");
                    assert_eq!(node.value_field, "{{*}}");
                    assert_eq!(node.statement, &json!("{{items}}"));
                }
                other => panic!("expected section, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_malformed_section_still_classified_as_section() {
        let value = json!({"{{#bad name}}": "{{items}}", "{{*}}": {}});
        assert!(matches!(classify(&value), TemplateNode::Section(_)));
    }

    #[test]
    fn test_ordinary_objects() {
        let three = json!({"{{#m}}": "{{items}}", "{{*}}": {}, "extra": 1});
        assert!(matches!(classify(&three), TemplateNode::Object(_)));

        let plain = json!({"a": 1, "b": 2});
        assert!(matches!(classify(&plain), TemplateNode::Object(_)));

        assert!(matches!(classify(&json!([1, 2])), TemplateNode::Array(_)));
        assert!(matches!(classify(&json!(3)), TemplateNode::Literal(_)));
        assert!(matches!(classify(&Value::Null), TemplateNode::Literal(_)));
    }
}
